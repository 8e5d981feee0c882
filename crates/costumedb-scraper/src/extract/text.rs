//! Pure text helpers shared by the extraction strategies.

use std::sync::LazyLock;

use regex::Regex;

/// Color words recognised in product titles, in priority order.
pub const COLOR_WORDS: &[&str] = &[
    "black", "white", "blue", "red", "green", "yellow", "orange", "purple", "pink", "brown",
    "gray", "grey", "navy", "royal", "teal", "maroon", "olive", "tan", "beige", "cream",
    "burgundy", "charcoal", "khaki",
];

/// Phrases that mark the start of customer-review content.
pub const REVIEW_MARKERS: &[&str] = &[
    "customer reviews",
    "out of 5 stars",
    "verified purchase",
    "reviewed in",
    "people found this helpful",
    "one person found this helpful",
];

/// Interface chrome that shows up inside bullet lists.
pub const BULLET_BOILERPLATE: &[&str] = &["see more", "see less", "report", "translate review"];

/// Markers of marketing blocks that are not about the item itself.
const BRAND_STORY_MARKERS: &[&str] = &["from the brand", "brand story"];

/// Bidi control marks the marketplace puts around detail-list separators.
const INVISIBLE_MARKS: &[char] = &['\u{200e}', '\u{200f}', '\u{200b}', '\u{feff}'];

static TITLE_COLOR_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    COLOR_WORDS
        .iter()
        .map(|word| {
            Regex::new(&format!(r"(?i)(?:\b\w+\s+)?\b{word}\b(?:\s+\w+)?"))
                .expect("valid title color regex")
        })
        .collect()
});

static BULLET_COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bcolou?r\s*[:：]\s*([^,.;\n]+)").expect("valid bullet color regex")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Collapses runs of whitespace to single spaces and trims.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Trims every line, drops blank lines, and rejoins with `\n`.
#[must_use]
pub fn tidy_block(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Normalises a byline such as `"Visit the Rubie's Store"` or
/// `"Brand: Rubie's"` to the bare brand name.
#[must_use]
pub fn clean_brand(raw: &str) -> Option<String> {
    let text = collapse_whitespace(raw);
    let lower = text.to_lowercase();
    let stripped = if lower.starts_with("visit the ") && lower.ends_with(" store") {
        text.get("visit the ".len()..text.len().saturating_sub(" store".len()))
    } else if lower.starts_with("brand:") {
        text.get("brand:".len()..)
    } else {
        None
    };
    non_empty(stripped.unwrap_or(&text).trim().to_owned())
}

/// Finds the first color word from [`COLOR_WORDS`] in `title`, with at most
/// one adjacent word on either side, e.g. `"Navy Blue Jacket"`.
#[must_use]
pub fn color_from_title(title: &str) -> Option<String> {
    TITLE_COLOR_RES
        .iter()
        .find_map(|re| re.find(title))
        .map(|m| collapse_whitespace(m.as_str()))
        .and_then(non_empty)
}

/// Extracts `X` from a bullet containing `Color: X`.
#[must_use]
pub fn color_from_bullet(text: &str) -> Option<String> {
    BULLET_COLOR_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| collapse_whitespace(m.as_str()))
        .and_then(non_empty)
}

/// Splits a details row at its first colon-like separator.
///
/// Rendered table rows separate header and value cells with a tab, so a tab
/// counts as a separator too. Returns `(label, value)` with invisible marks
/// removed, or `None` when either side is empty.
#[must_use]
pub fn split_label_value(row: &str) -> Option<(String, String)> {
    let cleaned: String = row.chars().filter(|c| !INVISIBLE_MARKS.contains(c)).collect();
    let (label, value) = cleaned.split_once([':', '：', '\t'])?;
    let label = collapse_whitespace(label);
    let value = collapse_whitespace(value.trim_start_matches([':', '：']));
    if label.is_empty() || value.is_empty() {
        return None;
    }
    Some((label, value))
}

/// Returns the value of a details row whose label contains any of `keywords`.
#[must_use]
pub fn labelled_value(row: &str, keywords: &[&str]) -> Option<String> {
    let (label, value) = split_label_value(row)?;
    let label = label.to_lowercase();
    keywords
        .iter()
        .any(|k| label.contains(k))
        .then_some(value)
}

#[must_use]
pub fn contains_review_marker(text: &str) -> bool {
    let lower = text.to_lowercase();
    REVIEW_MARKERS.iter().any(|m| lower.contains(m))
}

/// Review markers plus bullet boilerplate and brand-story blocks.
#[must_use]
pub fn contains_review_content(text: &str) -> bool {
    let lower = text.to_lowercase();
    REVIEW_MARKERS
        .iter()
        .chain(BULLET_BOILERPLATE)
        .chain(BRAND_STORY_MARKERS)
        .any(|m| lower.contains(m))
}

#[must_use]
pub fn is_boilerplate_bullet(text: &str) -> bool {
    let lower = text.to_lowercase();
    BULLET_BOILERPLATE.iter().any(|m| lower.contains(m))
}

/// Lower-cased, whitespace-collapsed form used for containment checks.
pub(crate) fn comparable(text: &str) -> String {
    collapse_whitespace(&text.to_lowercase())
}

/// Returns `true` when most of `block`'s lines already appear in `prior`.
///
/// A block counts as contained when at least 80% of its non-blank lines are
/// substrings of the earlier text.
#[must_use]
pub fn substantially_contained(block: &str, prior: &str) -> bool {
    let prior = comparable(prior);
    let lines: Vec<String> = block
        .lines()
        .map(comparable)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return true;
    }
    let found = lines.iter().filter(|l| prior.contains(l.as_str())).count();
    found * 5 >= lines.len() * 4
}
