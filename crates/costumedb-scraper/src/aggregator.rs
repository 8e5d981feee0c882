//! Product-link discovery on aggregator costume-guide pages.

use std::collections::HashSet;
use std::time::Duration;

use costumedb_core::{AggregatorPage, AggregatorProduct, AppConfig};
use reqwest::Url;

use crate::browser::{BrowserLauncher, BrowserSession};
use crate::canonical::{
    canonicalize, ensure_scheme, extract_product_id, host_matches, is_marketplace_url,
    is_redirect_url, resolve_redirect,
};
use crate::error::ScrapeError;
use crate::retry::{retry_with_delay, RetryPolicy};

/// Domain of the costume-guide site whose own links are never products.
pub const AGGREGATOR_DOMAIN: &str = "costumewall.com";

/// Anchors inside the guide's product hotspots, tried before falling back to
/// every anchor on the page.
pub const HOTSPOT_SELECTORS: &[&str] = &[".hotspot a", ".product-hotspot a", "a.hotspot"];

pub const PAGE_TITLE_SELECTORS: &[&str] = &["h1.entry-title", ".entry-title", "h1"];

pub const UNTITLED: &str = "Untitled Costume";

const TITLE_PREFIXES: &[&str] = &["How to Dress Like ", "Dress Like ", "DIY "];
const TITLE_SUFFIXES: &[&str] = &[" Costume Guide", " Costume", " Cosplay"];

/// Share and social links that appear on every guide page.
const IGNORED_HOSTS: &[&str] = &[
    "facebook.com",
    "twitter.com",
    "x.com",
    "pinterest.com",
    "instagram.com",
    "youtube.com",
    "reddit.com",
    "tiktok.com",
];

const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight); document.body.scrollHeight";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorSettings {
    pub ready_timeout: Duration,
    pub settle_delay: Duration,
}

impl AggregatorSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            ready_timeout: Duration::from_secs(config.scraper_ready_timeout_secs),
            settle_delay: Duration::from_millis(config.scraper_settle_delay_ms),
        }
    }
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_secs(2),
        }
    }
}

/// A product link classified from a raw `href`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    /// Canonical marketplace URL, or the absolute external URL.
    pub url: String,
    /// Marketplace product id when the link points at the marketplace.
    pub product_id: Option<String>,
}

impl DiscoveredLink {
    #[must_use]
    pub fn is_target_marketplace(&self) -> bool {
        self.product_id.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AggregatorLinkScraper {
    settings: AggregatorSettings,
}

impl AggregatorLinkScraper {
    #[must_use]
    pub fn new(settings: AggregatorSettings) -> Self {
        Self { settings }
    }

    /// Collects the distinct product links on the guide page at `url`.
    ///
    /// A page with no marketplace links is a valid, empty result. Anchors
    /// that cannot be read are skipped.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::Navigation`] if the page fails to load.
    /// - [`ScrapeError::NotReady`] if the document body never appears.
    /// - [`ScrapeError::Session`] if listing anchors fails.
    pub async fn scrape_page<S: BrowserSession>(
        &self,
        session: &S,
        url: &str,
    ) -> Result<AggregatorPage, ScrapeError> {
        session
            .navigate(url)
            .await
            .map_err(|source| ScrapeError::Navigation {
                url: url.to_owned(),
                source,
            })?;

        if let Err(err) = session.wait_for_element("body", self.settings.ready_timeout).await {
            return Err(if err.is_missing_element() {
                ScrapeError::NotReady {
                    url: url.to_owned(),
                    selector: "body".to_owned(),
                    timeout_ms: self.settings.ready_timeout.as_millis(),
                }
            } else {
                ScrapeError::Session {
                    url: url.to_owned(),
                    source: err,
                }
            });
        }

        // Lazy-loaded hotspots only render once scrolled into view.
        if let Err(err) = session.execute_script(SCROLL_SCRIPT).await {
            tracing::debug!(url, error = %err, "scroll script failed");
        }
        if !self.settings.settle_delay.is_zero() {
            tokio::time::sleep(self.settings.settle_delay).await;
        }

        let title = self.page_title(session).await;
        let anchors = anchors(session, url).await?;
        let base = Url::parse(url).ok();

        let mut seen = HashSet::new();
        let mut products = Vec::new();
        for anchor in &anchors {
            let (href, title_attr, text) = match read_anchor(session, anchor).await {
                Ok(parts) => parts,
                Err(err) => {
                    tracing::debug!(url, error = %err, "skipping unreadable anchor");
                    continue;
                }
            };
            let Some(link) = href.as_deref().and_then(|h| classify_link(h, base.as_ref())) else {
                continue;
            };
            if !seen.insert(link.url.clone()) {
                continue;
            }
            let label = choose_label(title_attr.as_deref(), text.as_deref(), &link);
            products.push(AggregatorProduct {
                is_target_marketplace: link.is_target_marketplace(),
                canonical_url: link.url,
                label,
            });
        }

        let page = AggregatorPage {
            source_url: url.to_owned(),
            title,
            products,
        };
        tracing::info!(
            url,
            title = %page.title,
            anchors = anchors.len(),
            marketplace = page.marketplace_count(),
            other = page.products.len() - page.marketplace_count(),
            "scraped aggregator page"
        );
        Ok(page)
    }

    /// Launches a session, scrapes `url` under `policy`, and closes the
    /// session whatever the result.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::Launch`] if no session could be started, otherwise the
    /// last error from [`Self::scrape_page`].
    pub async fn scrape_with_launcher<L: BrowserLauncher>(
        &self,
        launcher: &L,
        policy: RetryPolicy,
        url: &str,
    ) -> Result<AggregatorPage, ScrapeError> {
        let session = launcher.launch().await.map_err(ScrapeError::Launch)?;
        let result = retry_with_delay(policy, || self.scrape_page(&session, url)).await;
        if let Err(err) = session.close().await {
            tracing::warn!(url, error = %err, "failed to close browser session");
        }
        result
    }

    async fn page_title<S: BrowserSession>(&self, session: &S) -> String {
        for selector in PAGE_TITLE_SELECTORS {
            let Ok(element) = session.find_element(selector).await else {
                continue;
            };
            if let Ok(text) = session.element_text(&element).await {
                if let Some(title) = clean_page_title(&text) {
                    return title;
                }
            }
        }
        UNTITLED.to_owned()
    }
}

async fn anchors<S: BrowserSession>(session: &S, url: &str) -> Result<Vec<S::Element>, ScrapeError> {
    let session_err = |source| ScrapeError::Session {
        url: url.to_owned(),
        source,
    };
    for selector in HOTSPOT_SELECTORS {
        let found = session.find_elements(selector).await.map_err(session_err)?;
        if !found.is_empty() {
            tracing::debug!(url, selector, count = found.len(), "using hotspot anchors");
            return Ok(found);
        }
    }
    session.find_elements("a").await.map_err(session_err)
}

type AnchorParts = (Option<String>, Option<String>, Option<String>);

async fn read_anchor<S: BrowserSession>(
    session: &S,
    anchor: &S::Element,
) -> Result<AnchorParts, crate::error::BrowserError> {
    let href = session.element_attribute(anchor, "href").await?;
    let title = session.element_attribute(anchor, "title").await?;
    let text = session.element_text(anchor).await?;
    Ok((href, title, Some(text)))
}

/// Strips the guide's boilerplate from an `h1`, e.g.
/// `"How to Dress Like Jack Sparrow Costume Guide"` becomes `"Jack Sparrow"`.
#[must_use]
pub fn clean_page_title(raw: &str) -> Option<String> {
    let mut title = crate::extract::collapse_whitespace(raw);
    for prefix in TITLE_PREFIXES {
        if title.len() >= prefix.len()
            && title.is_char_boundary(prefix.len())
            && title[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            title = title[prefix.len()..].to_owned();
            break;
        }
    }
    for suffix in TITLE_SUFFIXES {
        let Some(split) = title.len().checked_sub(suffix.len()) else {
            continue;
        };
        if title.is_char_boundary(split) && title[split..].eq_ignore_ascii_case(suffix) {
            title.truncate(split);
            break;
        }
    }
    let title = title.trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_owned())
    }
}

/// Classifies one `href` relative to the page it was found on.
///
/// Returns `None` for links that are not products: fragments, non-http
/// schemes, the aggregator's own pages, social links, and marketplace links
/// without a product id. Redirect links are unwrapped first.
#[must_use]
pub fn classify_link(href: &str, base: Option<&Url>) -> Option<DiscoveredLink> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let absolute = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    if !matches!(absolute.scheme(), "http" | "https") {
        return None;
    }
    let host = absolute.host_str()?.to_owned();
    if host_matches(&host, AGGREGATOR_DOMAIN) || IGNORED_HOSTS.iter().any(|d| host_matches(&host, d))
    {
        return None;
    }

    let raw = absolute.to_string();
    let destination = if is_redirect_url(&raw) {
        let resolved = resolve_redirect(&raw);
        ensure_scheme(&resolved).unwrap_or(resolved)
    } else {
        raw
    };

    if is_marketplace_url(&destination) {
        let product_id = extract_product_id(&destination)?;
        return Some(DiscoveredLink {
            url: canonicalize(&destination),
            product_id: Some(product_id),
        });
    }

    Some(DiscoveredLink {
        url: destination,
        product_id: None,
    })
}

/// Picks a display label: the `title` attribute, then the visible text, then
/// `Product {id}` for marketplace links or the host for external ones.
#[must_use]
pub fn choose_label(title_attr: Option<&str>, text: Option<&str>, link: &DiscoveredLink) -> String {
    let pick = |value: Option<&str>| {
        value
            .map(crate::extract::collapse_whitespace)
            .filter(|v| !v.is_empty())
    };
    if let Some(label) = pick(title_attr).or_else(|| pick(text)) {
        return label;
    }
    match &link.product_id {
        Some(id) => format!("Product {id}"),
        None => Url::parse(&link.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_owned()))
            .unwrap_or_else(|| link.url.clone()),
    }
}

#[cfg(test)]
#[path = "aggregator_test.rs"]
mod tests;
