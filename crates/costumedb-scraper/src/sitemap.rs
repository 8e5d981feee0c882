//! Sitemap fetching for bulk imports.

use std::collections::HashSet;
use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;

use crate::error::SitemapError;

/// HTTP client for XML sitemaps.
pub struct SitemapClient {
    client: Client,
}

impl SitemapClient {
    /// Creates a client with the given request timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`SitemapError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, SitemapError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Fetches `url` and returns its page locations in document order,
    /// without duplicates.
    ///
    /// # Errors
    ///
    /// - [`SitemapError::Http`] on network failure.
    /// - [`SitemapError::UnexpectedStatus`] for any non-2xx response.
    /// - [`SitemapError::Xml`] when the body is not well-formed XML.
    /// - [`SitemapError::Empty`] when the document lists no pages.
    pub async fn fetch_page_urls(&self, url: &str) -> Result<Vec<String>, SitemapError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/xml,text/xml;q=0.9,*/*;q=0.8")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SitemapError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let body = response.text().await?;
        let locs = parse_sitemap_locs(&body)?;
        if locs.is_empty() {
            return Err(SitemapError::Empty {
                url: url.to_owned(),
            });
        }
        tracing::info!(url, pages = locs.len(), "fetched sitemap");
        Ok(locs)
    }
}

/// Extracts `<loc>` values in document order.
///
/// Text content is entity-unescaped; CDATA content is taken literally.
/// `<image:loc>` and other prefixed locations are ignored, as are non-http(s)
/// values and repeats.
///
/// # Errors
///
/// Returns [`SitemapError::Xml`] if the document is malformed.
pub fn parse_sitemap_locs(xml: &str) -> Result<Vec<String>, SitemapError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut seen = HashSet::new();
    let mut locs = Vec::new();
    let mut in_loc = false;
    let mut current = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"loc" => {
                in_loc = true;
                current.clear();
            }
            Event::End(e) if e.name().as_ref() == b"loc" => {
                in_loc = false;
                let loc = current.trim();
                if (loc.starts_with("http://") || loc.starts_with("https://"))
                    && seen.insert(loc.to_owned())
                {
                    locs.push(loc.to_owned());
                }
            }
            Event::Text(e) if in_loc => {
                current.push_str(&e.unescape()?);
            }
            Event::CData(e) if in_loc => {
                current.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(locs)
}

/// Returns `true` for URLs that look like an XML sitemap rather than a page.
#[must_use]
pub fn looks_like_sitemap_url(url: &str) -> bool {
    let path = reqwest::Url::parse(url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_else(|_| url.to_lowercase());
    std::path::Path::new(&path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}
