//! Sectioned product description.
//!
//! Sections are emitted under uppercase headers in a fixed order and joined
//! by a blank line. `OVERVIEW` is a last resort used only when every other
//! section came up empty.

use std::collections::HashSet;

use super::strategies::FEATURE_BULLET_SETS;
use super::text::{
    contains_review_content, contains_review_marker, is_boilerplate_bullet,
    split_label_value, substantially_contained,
};
use super::{block_of, texts_of};
use crate::browser::BrowserSession;

pub const MAX_FEATURE_BULLETS: usize = 15;
const MIN_BULLET_CHARS: usize = 15;
const MIN_DESCRIPTION_CHARS: usize = 20;
const MIN_DETAIL_ROW_CHARS: usize = 5;
const MIN_OVERVIEW_CHARS: usize = 50;
/// Rows sharing this many leading characters are treated as duplicates.
const DETAIL_DEDUPE_PREFIX: usize = 50;

pub const DESCRIPTION_SELECTORS: &[&str] = &[
    "#productDescription",
    "#productDescription_feature_div",
    "#productDescription p",
    "#aplus_feature_div",
    "#aplus",
];

pub const DETAIL_SECTION_ROWS: &[&str] = &[
    "#productDetails_detailBullets_sections1 tr",
    ".prodDetTable tr",
    "#productDetails_techSpec_section_1 tr",
    "#productDetails_techSpec_section_2 tr",
    "#productDetails_db_sections tr",
    ".a-keyvalue tr",
];

pub const ABOUT_SELECTORS: &[&str] = &[
    "#productFactsDesktop_feature_div",
    "#detailBullets_feature_div",
    "#detailBulletsWrapper_feature_div",
];

pub const OVERVIEW_SELECTORS: &[&str] = &[
    "#productOverview_feature_div",
    "#centerCol",
    "#ppd",
    "#dp-container",
];

const SKIPPED_DETAIL_ROWS: &[&str] = &["best sellers rank", "customer reviews"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionSection {
    Features,
    Description,
    ProductDetails,
    AboutThisItem,
    Overview,
}

impl DescriptionSection {
    #[must_use]
    pub fn header(self) -> &'static str {
        match self {
            Self::Features => "FEATURES:",
            Self::Description => "DESCRIPTION:",
            Self::ProductDetails => "PRODUCT DETAILS:",
            Self::AboutThisItem => "ABOUT THIS ITEM:",
            Self::Overview => "OVERVIEW:",
        }
    }
}

/// Assembles the description, or `None` when no section produced text.
pub async fn build_description<S: BrowserSession>(session: &S) -> Option<String> {
    let mut sections: Vec<(DescriptionSection, String)> = Vec::new();

    if let Some(body) = features(session).await {
        sections.push((DescriptionSection::Features, body));
    }
    if let Some(body) = product_description(session).await {
        sections.push((DescriptionSection::Description, body));
    }
    if let Some(body) = product_details(session).await {
        sections.push((DescriptionSection::ProductDetails, body));
    }
    if let Some(body) = about_this_item(session).await {
        let prior = sections
            .iter()
            .map(|(_, b)| b.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if substantially_contained(&body, &prior) {
            tracing::debug!("about-this-item block repeats earlier sections, skipping");
        } else {
            sections.push((DescriptionSection::AboutThisItem, body));
        }
    }
    if sections.is_empty() {
        if let Some(body) = overview(session).await {
            sections.push((DescriptionSection::Overview, body));
        }
    }

    render_sections(&sections)
}

pub(crate) fn render_sections(sections: &[(DescriptionSection, String)]) -> Option<String> {
    if sections.is_empty() {
        return None;
    }
    Some(
        sections
            .iter()
            .map(|(section, body)| format!("{}\n{body}", section.header()))
            .collect::<Vec<_>>()
            .join("\n\n"),
    )
}

async fn features<S: BrowserSession>(session: &S) -> Option<String> {
    for selector in FEATURE_BULLET_SETS {
        let bullets = select_feature_bullets(&texts_of(session, selector).await);
        if !bullets.is_empty() {
            return Some(bullets.join("\n"));
        }
    }
    None
}

async fn product_description<S: BrowserSession>(session: &S) -> Option<String> {
    for selector in DESCRIPTION_SELECTORS {
        let Some(text) = block_of(session, selector).await else {
            continue;
        };
        if text.chars().count() > MIN_DESCRIPTION_CHARS && !contains_review_content(&text) {
            return Some(text);
        }
    }
    None
}

async fn product_details<S: BrowserSession>(session: &S) -> Option<String> {
    let mut rows = Vec::new();
    for selector in DETAIL_SECTION_ROWS {
        rows.extend(texts_of(session, selector).await);
    }
    let rows = select_detail_rows(rows);
    if rows.is_empty() {
        None
    } else {
        Some(rows.join("\n"))
    }
}

async fn about_this_item<S: BrowserSession>(session: &S) -> Option<String> {
    for selector in ABOUT_SELECTORS {
        let Some(text) = block_of(session, selector).await else {
            continue;
        };
        let text = text
            .lines()
            .filter(|line| !line.eq_ignore_ascii_case("about this item"))
            .collect::<Vec<_>>()
            .join("\n");
        if text.chars().count() > MIN_DESCRIPTION_CHARS && !contains_review_marker(&text) {
            return Some(text);
        }
    }
    None
}

async fn overview<S: BrowserSession>(session: &S) -> Option<String> {
    for selector in OVERVIEW_SELECTORS {
        let Some(text) = block_of(session, selector).await else {
            continue;
        };
        let kept = truncate_at_reviews(&text);
        if kept.chars().count() >= MIN_OVERVIEW_CHARS {
            return Some(kept);
        }
    }
    None
}

/// Filters raw bullet texts down to real features.
///
/// Stops at the first review marker and after [`MAX_FEATURE_BULLETS`] kept
/// bullets; drops short lines and interface boilerplate.
pub(crate) fn select_feature_bullets(texts: &[String]) -> Vec<String> {
    let mut kept = Vec::new();
    for text in texts {
        if contains_review_marker(text) {
            break;
        }
        let lower = text.to_lowercase();
        if text.chars().count() > MIN_BULLET_CHARS
            && !is_boilerplate_bullet(text)
            && !lower.contains("about this item")
        {
            kept.push(text.clone());
        }
        if kept.len() >= MAX_FEATURE_BULLETS {
            break;
        }
    }
    kept
}

/// Formats and deduplicates details-table rows.
///
/// Rows with a recognisable label are rendered as `Label: value`. Ranking and
/// review rows are skipped, as are rows whose first 50 characters repeat an
/// earlier row.
pub(crate) fn select_detail_rows(rows: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    for row in rows {
        let lower = row.to_lowercase();
        if SKIPPED_DETAIL_ROWS.iter().any(|s| lower.contains(s)) {
            continue;
        }
        let line = match split_label_value(&row) {
            Some((label, value)) => format!("{label}: {value}"),
            None => row.replace('\n', " "),
        };
        if line.chars().count() <= MIN_DETAIL_ROW_CHARS {
            continue;
        }
        let key: String = line.to_lowercase().chars().take(DETAIL_DEDUPE_PREFIX).collect();
        if seen.insert(key) {
            kept.push(line);
        }
    }
    kept
}

fn truncate_at_reviews(text: &str) -> String {
    text.lines()
        .take_while(|line| !contains_review_marker(line))
        .collect::<Vec<_>>()
        .join("\n")
}
