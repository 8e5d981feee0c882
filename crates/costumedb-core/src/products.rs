use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Structured fields pulled from one marketplace product page.
///
/// `title` is always non-empty; every other field is best-effort and `None`
/// when no extraction strategy produced a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedProduct {
    pub title: String,
    pub brand: Option<String>,
    /// Listed price, never negative.
    pub price: Option<Decimal>,
    pub color: Option<String>,
    pub material: Option<String>,
    /// Sectioned text, e.g. `"FEATURES:\n...\n\nDESCRIPTION:\n..."`.
    pub description: Option<String>,
    /// Marketplace CDN URL of the main product image.
    pub image_url: Option<String>,
}

/// Result of attempting to scrape a single product URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScrapeOutcome {
    Success(ExtractedProduct),
    Failure {
        reason: String,
        /// Set where the failure happened; callers never infer it from `reason`.
        retriable: bool,
    },
}

impl ScrapeOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub fn product(&self) -> Option<&ExtractedProduct> {
        match self {
            Self::Success(product) => Some(product),
            Self::Failure { .. } => None,
        }
    }

    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure { reason, .. } => Some(reason),
        }
    }
}

/// One entry of a batch scrape, paired with the canonical URL it was scraped from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub url: String,
    pub outcome: ScrapeOutcome,
}

/// A distinct product link discovered on an aggregator page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorProduct {
    /// Canonical marketplace URL, or the raw URL for other retailers.
    pub canonical_url: String,
    pub label: String,
    pub is_target_marketplace: bool,
}

/// Everything discovered on one aggregator page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorPage {
    pub source_url: String,
    /// Character/costume name with site boilerplate stripped.
    pub title: String,
    pub products: Vec<AggregatorProduct>,
}

impl AggregatorPage {
    /// Products hosted on the target marketplace, in discovery order.
    pub fn marketplace(&self) -> impl Iterator<Item = &AggregatorProduct> {
        self.products.iter().filter(|p| p.is_target_marketplace)
    }

    /// Products from any other retailer, in discovery order.
    pub fn non_marketplace(&self) -> impl Iterator<Item = &AggregatorProduct> {
        self.products.iter().filter(|p| !p.is_target_marketplace)
    }

    #[must_use]
    pub fn marketplace_count(&self) -> usize {
        self.marketplace().count()
    }
}
