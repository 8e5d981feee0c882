//! Ordered per-field strategy lists. The first strategy producing a value wins.

use std::time::Duration;

use rust_decimal::Decimal;

use super::text::{clean_brand, color_from_bullet, color_from_title, labelled_value};
use super::{attribute_of, text_of, texts_of};
use crate::browser::BrowserSession;
use crate::price::{join_price_parts, parse_price};

/// Rows of the product-details tables.
pub const DETAIL_TABLE_ROWS: &[&str] = &[
    "#productDetails_detailBullets_sections1 tr",
    ".prodDetTable tr",
    "#productDetails_techSpec_section_1 tr",
    "#detailBullets_feature_div li",
];

/// Feature bullet selector sets, tried in order.
pub const FEATURE_BULLET_SETS: &[&str] = &[
    "#feature-bullets ul li span.a-list-item",
    "#featurebullets_feature_div li",
    "#feature-bullets-btf ul li span.a-list-item",
    "#productFactsDesktop_feature_div ul li span",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrandStrategy {
    /// Byline or product-overview cell, waited for up to the element wait.
    Byline(&'static str),
}

pub const BRAND_STRATEGIES: &[BrandStrategy] = &[
    BrandStrategy::Byline("#bylineInfo"),
    BrandStrategy::Byline(".po-brand .po-break-word"),
];

impl BrandStrategy {
    pub async fn apply<S: BrowserSession>(self, session: &S, wait: Duration) -> Option<String> {
        match self {
            Self::Byline(selector) => text_of(session, selector, wait)
                .await
                .and_then(|t| clean_brand(&t)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceStrategy {
    /// A single element holding the full formatted price.
    Formatted(&'static str),
    /// Separate whole and fraction elements; a missing fraction means `00`.
    WholeAndFraction {
        whole: &'static str,
        fraction: &'static str,
    },
}

pub const PRICE_STRATEGIES: &[PriceStrategy] = &[
    PriceStrategy::Formatted(".a-price .a-offscreen"),
    PriceStrategy::WholeAndFraction {
        whole: ".a-price-whole",
        fraction: ".a-price-fraction",
    },
    PriceStrategy::Formatted("#priceblock_ourprice"),
    PriceStrategy::Formatted("#priceblock_dealprice"),
    PriceStrategy::Formatted(".apexPriceToPay .a-offscreen"),
    PriceStrategy::Formatted("span.a-price span.a-offscreen"),
];

impl PriceStrategy {
    pub async fn apply<S: BrowserSession>(self, session: &S) -> Option<Decimal> {
        match self {
            Self::Formatted(selector) => text_of(session, selector, Duration::ZERO)
                .await
                .and_then(|t| parse_price(&t)),
            Self::WholeAndFraction { whole, fraction } => {
                let whole = text_of(session, whole, Duration::ZERO).await?;
                let fraction = text_of(session, fraction, Duration::ZERO).await;
                join_price_parts(&whole, fraction.as_deref())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorStrategy {
    /// A color word (plus neighbours) in the already-extracted title.
    TitleVocabulary,
    /// The currently selected variant in the twister widget.
    SelectedVariant(&'static str),
    /// A details-table row labelled color/colour.
    DetailsTable,
    /// A `Color: X` phrase in a feature bullet.
    FeatureBullets,
}

pub const COLOR_STRATEGIES: &[ColorStrategy] = &[
    ColorStrategy::TitleVocabulary,
    ColorStrategy::SelectedVariant("#variation_color_name .selection"),
    ColorStrategy::SelectedVariant(".po-color .po-break-word"),
    ColorStrategy::SelectedVariant("[data-csa-c-content-id='variation_color_name'] .selection"),
    ColorStrategy::SelectedVariant("#inline-twister-expanded-dimension-text-color_name"),
    ColorStrategy::DetailsTable,
    ColorStrategy::FeatureBullets,
];

impl ColorStrategy {
    pub async fn apply<S: BrowserSession>(self, session: &S, title: &str) -> Option<String> {
        match self {
            Self::TitleVocabulary => color_from_title(title),
            Self::SelectedVariant(selector) => text_of(session, selector, Duration::ZERO).await,
            Self::DetailsTable => details_value(session, &["color", "colour"]).await,
            Self::FeatureBullets => {
                for selector in FEATURE_BULLET_SETS {
                    let found = texts_of(session, selector)
                        .await
                        .iter()
                        .find_map(|b| color_from_bullet(b));
                    if found.is_some() {
                        return found;
                    }
                }
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStrategy {
    /// `src` of the main gallery image.
    Source(&'static str),
}

pub const IMAGE_STRATEGIES: &[ImageStrategy] = &[
    ImageStrategy::Source("#landingImage"),
    ImageStrategy::Source("#imgBlkFront"),
];

impl ImageStrategy {
    pub async fn apply<S: BrowserSession>(self, session: &S) -> Option<String> {
        match self {
            Self::Source(selector) => attribute_of(session, selector, "src", Duration::ZERO)
                .await
                .filter(|src| !src.starts_with("data:")),
        }
    }
}

/// Material comes only from the details table.
pub async fn material<S: BrowserSession>(session: &S) -> Option<String> {
    details_value(session, &["material", "fabric"]).await
}

/// Value of the first details row, across every table, whose label contains
/// one of `keywords`.
pub(crate) async fn details_value<S: BrowserSession>(
    session: &S,
    keywords: &[&str],
) -> Option<String> {
    for selector in DETAIL_TABLE_ROWS {
        if let Some(value) = texts_of(session, selector)
            .await
            .iter()
            .find_map(|row| labelled_value(row, keywords))
        {
            return Some(value);
        }
    }
    None
}
