pub mod aggregator;
pub mod batch;
pub mod browser;
pub mod canonical;
pub mod error;
pub mod extract;
pub mod price;
pub mod product;
pub mod retry;
pub mod sitemap;

pub use aggregator::{AggregatorLinkScraper, AggregatorSettings};
pub use batch::BatchOrchestrator;
pub use browser::{BrowserLauncher, BrowserSession, ChromiumLauncher, ChromiumOptions};
pub use canonical::{
    canonicalize, ensure_scheme, extract_product_id, normalize_url, resolve_redirect,
};
pub use error::{BrowserError, BrowserErrorKind, ScrapeError, SitemapError};
pub use extract::{ExtractorConfig, FieldExtractor};
pub use price::{parse_price, MAX_PRICE};
pub use product::{ProductScraper, ScraperSettings};
pub use retry::{retry_with_delay, RetryPolicy};
pub use sitemap::{looks_like_sitemap_url, SitemapClient};
