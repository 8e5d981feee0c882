//! Canonical marketplace URLs and affiliate-redirect resolution.
//!
//! Every function here is pure and total: inputs that cannot be parsed or
//! that do not belong to the marketplace come back unchanged.

use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::Url;

/// Registrable domain of the target marketplace.
pub const MARKETPLACE_DOMAIN: &str = "amazon.com";

/// Prefix of every canonical product URL; the product id follows it.
pub const CANONICAL_PREFIX: &str = "https://www.amazon.com/dp/";

/// Affiliate link shorteners whose destination is carried in the query string.
pub const REDIRECT_DOMAINS: &[&str] = &["geni.us"];

/// Query parameters holding the redirect destination, in priority order.
pub const REDIRECT_PARAMS: &[&str] = &["GR_URL", "amazon"];

static PRODUCT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)/(?:dp|gp/product)/([a-z0-9]{10})(?:/|$)").expect("valid product id regex")
});

/// Returns `true` if `host` is `domain` itself or one of its subdomains.
pub(crate) fn host_matches(host: &str, domain: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}

fn parsed_host(url: &Url) -> Option<&str> {
    url.host_str().filter(|h| !h.is_empty())
}

/// Returns `true` if `raw` parses as a URL hosted on the marketplace.
#[must_use]
pub fn is_marketplace_url(raw: &str) -> bool {
    Url::parse(raw.trim())
        .ok()
        .as_ref()
        .and_then(parsed_host)
        .is_some_and(|host| host_matches(host, MARKETPLACE_DOMAIN))
}

/// Returns `true` if `raw` parses as a URL on one of the [`REDIRECT_DOMAINS`].
#[must_use]
pub fn is_redirect_url(raw: &str) -> bool {
    Url::parse(raw.trim())
        .ok()
        .as_ref()
        .and_then(parsed_host)
        .is_some_and(|host| REDIRECT_DOMAINS.iter().any(|d| host_matches(host, d)))
}

/// Extracts the upper-cased product id from a marketplace URL.
///
/// Recognises `/dp/{id}` and `/gp/product/{id}` anywhere in the path, where
/// `{id}` is exactly ten alphanumeric characters followed by `/` or the end
/// of the path. Returns `None` for non-marketplace or unparsable URLs.
#[must_use]
pub fn extract_product_id(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = parsed_host(&url)?;
    if !host_matches(host, MARKETPLACE_DOMAIN) {
        return None;
    }
    PRODUCT_ID_RE
        .captures(url.path())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_uppercase())
}

/// Maps any URL naming a marketplace product to its canonical form.
///
/// `https://amazon.com/Some-Slug/dp/b08xyz1234/ref=sr_1?th=1` becomes
/// `https://www.amazon.com/dp/B08XYZ1234`. Anything else, including
/// marketplace URLs without a product id, is returned unchanged, so the
/// function is idempotent.
#[must_use]
pub fn canonicalize(raw: &str) -> String {
    match extract_product_id(raw) {
        Some(id) => format!("{CANONICAL_PREFIX}{id}"),
        None => raw.to_owned(),
    }
}

/// Unwraps an affiliate redirect link to the destination it carries.
///
/// For hosts on [`REDIRECT_DOMAINS`], the first parameter from
/// [`REDIRECT_PARAMS`] present in the query (names compared
/// case-insensitively) is percent-decoded once and returned. Any other
/// input, a missing parameter, or a value that does not decode to UTF-8
/// yields `raw` unchanged.
#[must_use]
pub fn resolve_redirect(raw: &str) -> String {
    let Ok(url) = Url::parse(raw.trim()) else {
        return raw.to_owned();
    };
    let is_redirect = parsed_host(&url)
        .is_some_and(|host| REDIRECT_DOMAINS.iter().any(|d| host_matches(host, d)));
    if !is_redirect {
        return raw.to_owned();
    }
    let Some(query) = url.query() else {
        return raw.to_owned();
    };

    let pairs: Vec<(&str, &str)> = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .collect();

    for param in REDIRECT_PARAMS {
        let Some((_, value)) = pairs
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(param))
        else {
            continue;
        };
        return match percent_decode_str(value).decode_utf8() {
            Ok(decoded) if !decoded.trim().is_empty() => decoded.trim().to_owned(),
            Ok(_) => raw.to_owned(),
            Err(err) => {
                tracing::debug!(url = raw, error = %err, "redirect destination is not UTF-8");
                raw.to_owned()
            }
        };
    }
    raw.to_owned()
}

/// Redirect hops followed by [`normalize_url`] before giving up.
const MAX_REDIRECT_HOPS: usize = 5;

/// Resolves affiliate redirects, then canonicalizes the destination.
///
/// Nested redirects are followed up to a small hop limit. Destinations
/// without a scheme get `https://`. Non-redirect input behaves exactly like
/// [`canonicalize`]. The result is a fixed point: normalizing it again
/// returns it unchanged.
#[must_use]
pub fn normalize_url(raw: &str) -> String {
    let mut current = raw.to_owned();
    for _ in 0..MAX_REDIRECT_HOPS {
        if !is_redirect_url(&current) {
            break;
        }
        let destination = resolve_redirect(&current);
        let destination = ensure_scheme(&destination).unwrap_or(destination);
        if destination == current {
            break;
        }
        current = destination;
    }
    canonicalize(&current)
}

/// Trims `raw` and prefixes `https://` when it carries no scheme.
///
/// Returns `None` for blank input.
#[must_use]
pub fn ensure_scheme(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains("://") {
        return Some(trimmed.to_owned());
    }
    let without_slashes = trimmed.trim_start_matches('/');
    Some(format!("https://{without_slashes}"))
}

#[cfg(test)]
#[path = "canonical_test.rs"]
mod tests;
