//! Single product-page scrape: navigate, wait until ready, extract.

use std::time::Duration;

use costumedb_core::{AppConfig, ExtractedProduct, ScrapeOutcome};

use crate::browser::BrowserSession;
use crate::error::ScrapeError;
use crate::extract::{ExtractorConfig, FieldExtractor, TITLE_SELECTOR};

/// Timing knobs for product-page scrapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScraperSettings {
    /// How long to wait for the title element after navigation.
    pub ready_timeout: Duration,
    /// Pause after the page is ready so late widgets can render.
    pub settle_delay: Duration,
    pub extractor: ExtractorConfig,
}

impl ScraperSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            ready_timeout: Duration::from_secs(config.scraper_ready_timeout_secs),
            settle_delay: Duration::from_millis(config.scraper_settle_delay_ms),
            extractor: ExtractorConfig::from_app_config(config),
        }
    }
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_secs(3),
            extractor: ExtractorConfig::default(),
        }
    }
}

/// Stages of one product scrape, recorded in logs on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Navigate,
    AwaitReady,
    Extract,
}

/// Scrapes one product page through a session it does not own.
#[derive(Debug, Clone, Default)]
pub struct ProductScraper {
    settings: ScraperSettings,
    extractor: FieldExtractor,
}

impl ProductScraper {
    #[must_use]
    pub fn new(settings: ScraperSettings) -> Self {
        Self {
            settings,
            extractor: FieldExtractor::new(settings.extractor),
        }
    }

    /// Scrapes `url`, folding any error into a failure outcome.
    pub async fn scrape<S: BrowserSession>(&self, session: &S, url: &str) -> ScrapeOutcome {
        match self.try_scrape(session, url).await {
            Ok(product) => ScrapeOutcome::Success(product),
            Err(err) => err.into(),
        }
    }

    /// Scrapes `url`, leaving the session open whatever happens.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::Navigation`] if the page fails to load.
    /// - [`ScrapeError::NotReady`] if the title never appears.
    /// - [`ScrapeError::EmptyTitle`] if the title is blank.
    /// - [`ScrapeError::Session`] if the browser fails mid-read.
    pub async fn try_scrape<S: BrowserSession>(
        &self,
        session: &S,
        url: &str,
    ) -> Result<ExtractedProduct, ScrapeError> {
        let result = self.run(session, url).await;
        match &result {
            Ok(product) => tracing::info!(url, title = %product.title, "scraped product"),
            Err((stage, err)) => tracing::warn!(
                url,
                stage = ?stage,
                retriable = err.is_retriable(),
                error = %err,
                "product scrape failed"
            ),
        }
        result.map_err(|(_, err)| err)
    }

    async fn run<S: BrowserSession>(
        &self,
        session: &S,
        url: &str,
    ) -> Result<ExtractedProduct, (Stage, ScrapeError)> {
        session.navigate(url).await.map_err(|source| {
            (
                Stage::Navigate,
                ScrapeError::Navigation {
                    url: url.to_owned(),
                    source,
                },
            )
        })?;

        if let Err(err) = session
            .wait_for_element(TITLE_SELECTOR, self.settings.ready_timeout)
            .await
        {
            let err = if err.is_missing_element() {
                ScrapeError::NotReady {
                    url: url.to_owned(),
                    selector: TITLE_SELECTOR.to_owned(),
                    timeout_ms: self.settings.ready_timeout.as_millis(),
                }
            } else {
                ScrapeError::Session {
                    url: url.to_owned(),
                    source: err,
                }
            };
            return Err((Stage::AwaitReady, err));
        }

        if !self.settings.settle_delay.is_zero() {
            tokio::time::sleep(self.settings.settle_delay).await;
        }

        self.extractor
            .extract(session, url)
            .await
            .map_err(|err| (Stage::Extract, err))
    }
}
