//! Many product scrapes through one browser session.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use costumedb_core::{AppConfig, BatchItem, ScrapeOutcome};
use futures::FutureExt;

use crate::browser::{BrowserLauncher, BrowserSession};
use crate::canonical::canonicalize;
use crate::error::ScrapeError;
use crate::product::{ProductScraper, ScraperSettings};
use crate::retry::{retry_with_delay, RetryPolicy};

/// Drives a [`ProductScraper`] over a list of URLs.
///
/// Each batch launches exactly one session and closes it exactly once after
/// the last URL, including when scraping panics. Items are scraped in input
/// order, one at a time, and a failure on one item never affects another.
#[derive(Debug, Clone, Default)]
pub struct BatchOrchestrator {
    scraper: ProductScraper,
    policy: RetryPolicy,
    item_delay: Duration,
}

impl BatchOrchestrator {
    #[must_use]
    pub fn new(scraper: ProductScraper, policy: RetryPolicy) -> Self {
        Self {
            scraper,
            policy,
            item_delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(
            ProductScraper::new(ScraperSettings::from_app_config(config)),
            RetryPolicy::from_app_config(config),
        )
        .with_item_delay(Duration::from_millis(config.import_delay_ms))
    }

    /// Pause between consecutive items.
    #[must_use]
    pub fn with_item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = delay;
        self
    }

    /// Scrapes every URL and returns one item per input, in input order.
    ///
    /// URLs are canonicalized first and the canonical form is reported. If
    /// the session cannot be launched, every item fails with the launch
    /// reason.
    pub async fn scrape_batch<L: BrowserLauncher>(
        &self,
        launcher: &L,
        urls: &[String],
    ) -> Vec<BatchItem> {
        if urls.is_empty() {
            return Vec::new();
        }
        let canonical: Vec<String> = urls.iter().map(|u| canonicalize(u)).collect();

        let session = match launcher.launch().await {
            Ok(session) => session,
            Err(source) => {
                let err = ScrapeError::Launch(source);
                tracing::error!(error = %err, items = canonical.len(), "batch aborted before first item");
                let outcome = err.to_outcome();
                return canonical
                    .into_iter()
                    .map(|url| BatchItem {
                        url,
                        outcome: outcome.clone(),
                    })
                    .collect();
            }
        };

        let run = AssertUnwindSafe(self.run_items(&session, &canonical))
            .catch_unwind()
            .await;

        if let Err(err) = session.close().await {
            tracing::warn!(error = %err, "failed to close browser session");
        }

        match run {
            Ok(items) => items,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Scrapes a single URL in its own session.
    pub async fn scrape_one<L: BrowserLauncher>(&self, launcher: &L, url: &str) -> BatchItem {
        let mut items = self.scrape_batch(launcher, &[url.to_owned()]).await;
        items.pop().unwrap_or_else(|| BatchItem {
            url: canonicalize(url),
            outcome: ScrapeOutcome::Failure {
                reason: "batch returned no result".to_owned(),
                retriable: false,
            },
        })
    }

    async fn run_items<S: BrowserSession>(&self, session: &S, urls: &[String]) -> Vec<BatchItem> {
        let total = urls.len();
        let mut items = Vec::with_capacity(total);
        for (index, url) in urls.iter().enumerate() {
            if index > 0 && !self.item_delay.is_zero() {
                tokio::time::sleep(self.item_delay).await;
            }
            let outcome =
                match retry_with_delay(self.policy, || self.scraper.try_scrape(session, url)).await {
                    Ok(product) => ScrapeOutcome::Success(product),
                    Err(err) => err.into(),
                };
            tracing::info!(
                url = %url,
                item = index + 1,
                total,
                success = outcome.is_success(),
                "batch item finished"
            );
            items.push(BatchItem {
                url: url.clone(),
                outcome,
            });
        }
        items
    }
}
