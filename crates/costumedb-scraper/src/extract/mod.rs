//! Field extraction from a loaded marketplace product page.
//!
//! Every field except the title is best-effort: strategies are tried in
//! order, lookup failures are logged at `debug` and skipped, and a field
//! with no result is `None`.

mod description;
mod strategies;
mod text;

use std::time::Duration;

use costumedb_core::{AppConfig, ExtractedProduct};

use crate::browser::BrowserSession;
use crate::error::ScrapeError;

pub use description::{
    build_description, DescriptionSection, ABOUT_SELECTORS, DESCRIPTION_SELECTORS,
    DETAIL_SECTION_ROWS, MAX_FEATURE_BULLETS, OVERVIEW_SELECTORS,
};
pub use strategies::{
    material, BrandStrategy, ColorStrategy, ImageStrategy, PriceStrategy, BRAND_STRATEGIES,
    COLOR_STRATEGIES, DETAIL_TABLE_ROWS, FEATURE_BULLET_SETS, IMAGE_STRATEGIES,
    PRICE_STRATEGIES,
};
pub use text::{
    clean_brand, collapse_whitespace, color_from_bullet, color_from_title, labelled_value,
    split_label_value, substantially_contained, tidy_block, COLOR_WORDS,
};

/// The element whose presence marks a product page as loaded.
pub const TITLE_SELECTOR: &str = "#productTitle";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// How long to wait for the title and brand elements.
    pub element_wait: Duration,
}

impl ExtractorConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            element_wait: Duration::from_millis(config.scraper_element_wait_ms),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            element_wait: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FieldExtractor {
    config: ExtractorConfig,
}

impl FieldExtractor {
    #[must_use]
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Reads every field from the page `session` currently shows.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::EmptyTitle`] when the title element is missing or blank.
    /// - [`ScrapeError::Session`] when the browser fails while reading the title.
    pub async fn extract<S: BrowserSession>(
        &self,
        session: &S,
        url: &str,
    ) -> Result<ExtractedProduct, ScrapeError> {
        let title = self
            .title(session)
            .await
            .map_err(|source| ScrapeError::Session {
                url: url.to_owned(),
                source,
            })?
            .ok_or_else(|| ScrapeError::EmptyTitle {
                url: url.to_owned(),
            })?;

        let brand = self.brand(session).await;
        let price = price(session).await;
        let color = color(session, &title).await;
        let material = material(session).await;
        let description = build_description(session).await;
        let image_url = image_url(session).await;

        tracing::debug!(
            url,
            has_brand = brand.is_some(),
            has_price = price.is_some(),
            has_color = color.is_some(),
            has_material = material.is_some(),
            has_description = description.is_some(),
            has_image = image_url.is_some(),
            "extracted product fields"
        );

        Ok(ExtractedProduct {
            title,
            brand,
            price,
            color,
            material,
            description,
            image_url,
        })
    }

    /// `Ok(None)` when the title never appears or is blank.
    async fn title<S: BrowserSession>(
        &self,
        session: &S,
    ) -> Result<Option<String>, crate::error::BrowserError> {
        let element = match session
            .wait_for_element(TITLE_SELECTOR, self.config.element_wait)
            .await
        {
            Ok(element) => element,
            Err(err) if err.is_missing_element() => return Ok(None),
            Err(err) => return Err(err),
        };
        let text = session.element_text(&element).await?;
        Ok(text::non_empty(collapse_whitespace(&text)))
    }

    async fn brand<S: BrowserSession>(&self, session: &S) -> Option<String> {
        for strategy in BRAND_STRATEGIES {
            if let Some(brand) = strategy.apply(session, self.config.element_wait).await {
                return Some(brand);
            }
        }
        None
    }
}

async fn price<S: BrowserSession>(session: &S) -> Option<rust_decimal::Decimal> {
    for strategy in PRICE_STRATEGIES {
        if let Some(price) = strategy.apply(session).await {
            return Some(price);
        }
    }
    None
}

async fn color<S: BrowserSession>(session: &S, title: &str) -> Option<String> {
    for strategy in COLOR_STRATEGIES {
        if let Some(color) = strategy.apply(session, title).await {
            return Some(color);
        }
    }
    None
}

async fn image_url<S: BrowserSession>(session: &S) -> Option<String> {
    for strategy in IMAGE_STRATEGIES {
        if let Some(src) = strategy.apply(session).await {
            return Some(src);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Session lookups that swallow errors
// ---------------------------------------------------------------------------

async fn raw_text<S: BrowserSession>(session: &S, selector: &str, wait: Duration) -> Option<String> {
    let element = match session.wait_for_element(selector, wait).await {
        Ok(element) => element,
        Err(err) => {
            tracing::debug!(selector, error = %err, "selector lookup failed");
            return None;
        }
    };
    match session.element_text(&element).await {
        Ok(text) => Some(text),
        Err(err) => {
            tracing::debug!(selector, error = %err, "reading element text failed");
            None
        }
    }
}

/// Single-line text of the first match, whitespace collapsed.
pub(crate) async fn text_of<S: BrowserSession>(
    session: &S,
    selector: &str,
    wait: Duration,
) -> Option<String> {
    raw_text(session, selector, wait)
        .await
        .and_then(|t| text::non_empty(collapse_whitespace(&t)))
}

/// Multi-line text of the first match with blank lines removed.
pub(crate) async fn block_of<S: BrowserSession>(session: &S, selector: &str) -> Option<String> {
    raw_text(session, selector, Duration::ZERO)
        .await
        .and_then(|t| text::non_empty(tidy_block(&t)))
}

/// Non-blank texts of every match, in document order. Unreadable elements
/// are skipped.
pub(crate) async fn texts_of<S: BrowserSession>(session: &S, selector: &str) -> Vec<String> {
    let elements = match session.find_elements(selector).await {
        Ok(elements) => elements,
        Err(err) => {
            tracing::debug!(selector, error = %err, "selector lookup failed");
            return Vec::new();
        }
    };
    let mut texts = Vec::with_capacity(elements.len());
    for element in &elements {
        match session.element_text(element).await {
            Ok(text) => {
                let text = tidy_block(&text);
                if !text.is_empty() {
                    texts.push(text);
                }
            }
            Err(err) => tracing::debug!(selector, error = %err, "reading element text failed"),
        }
    }
    texts
}

pub(crate) async fn attribute_of<S: BrowserSession>(
    session: &S,
    selector: &str,
    name: &str,
    wait: Duration,
) -> Option<String> {
    let element = match session.wait_for_element(selector, wait).await {
        Ok(element) => element,
        Err(err) => {
            tracing::debug!(selector, error = %err, "selector lookup failed");
            return None;
        }
    };
    match session.element_attribute(&element, name).await {
        Ok(value) => value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty()),
        Err(err) => {
            tracing::debug!(selector, attribute = name, error = %err, "reading attribute failed");
            None
        }
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
