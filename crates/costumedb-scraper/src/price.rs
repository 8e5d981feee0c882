//! Price text parsing.

use std::str::FromStr;

use rust_decimal::Decimal;

/// Largest value the `clothing_items.price` column (`NUMERIC(10, 2)`) can hold.
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2); // 9_999_999_999e-2

/// Parses a displayed price such as `"$1,234.56"` into a [`Decimal`].
///
/// The first run of digits and separators is taken, thousands separators are
/// dropped, and the result is rounded to cents. Ranges like `"$20 - $30"`
/// yield the lower bound. Returns `None` when the text holds no number, the
/// number is malformed, a minus sign precedes it, or it exceeds [`MAX_PRICE`].
#[must_use]
pub fn parse_price(text: &str) -> Option<Decimal> {
    let start = text.find(|c: char| c.is_ascii_digit() || c == '.')?;
    let prefix = &text[..start];
    if prefix.contains(['-', '\u{2212}']) {
        return None;
    }

    let token: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .filter(|c| *c != ',')
        .collect();
    let token = token.trim_end_matches('.');
    if !token.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }

    let value = Decimal::from_str(token).ok()?;
    let value = value.round_dp(2);
    if value.is_sign_negative() || value > MAX_PRICE {
        return None;
    }
    Some(value)
}

/// Joins the whole and fractional parts of a split price display.
///
/// Non-digits are stripped from both parts; a missing fraction defaults to
/// `"00"`. Returns `None` when the whole part has no digits.
#[must_use]
pub fn join_price_parts(whole: &str, fraction: Option<&str>) -> Option<Decimal> {
    let whole: String = whole.chars().filter(char::is_ascii_digit).collect();
    if whole.is_empty() {
        return None;
    }
    let fraction: String = fraction
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    let fraction = if fraction.is_empty() {
        "00".to_owned()
    } else {
        fraction
    };
    parse_price(&format!("{whole}.{fraction}"))
}
