//! `costumedb import`: aggregator pages to outfits.
//!
//! Pages are processed one at a time. A page that fails is reported and
//! counted but never aborts the rest of the run.

use costumedb_core::{AggregatorPage, AppConfig, BatchItem, ExtractedProduct, ScrapeOutcome};
use costumedb_db::NewMissingProduct;
use costumedb_scraper::{
    ensure_scheme, looks_like_sitemap_url, AggregatorLinkScraper, AggregatorSettings,
    BatchOrchestrator, BrowserLauncher, ChromiumLauncher, ChromiumOptions, RetryPolicy,
    SitemapClient,
};
use sqlx::PgPool;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ImportTotals {
    pub pages: usize,
    pub imported_pages: usize,
    pub skipped_pages: usize,
    pub failed_pages: usize,
    pub created_items: usize,
    pub reused_items: usize,
    pub failed_items: usize,
    pub missing_products: usize,
}

impl ImportTotals {
    /// `true` when no page or product scrape failed.
    pub(crate) fn succeeded(&self) -> bool {
        self.failed_pages == 0 && self.failed_items == 0
    }

    pub(crate) fn summary_line(&self) -> String {
        format!(
            "{} pages: {} imported, {} skipped, {} failed; {} new items, {} reused, {} failed, {} missing",
            self.pages,
            self.imported_pages,
            self.skipped_pages,
            self.failed_pages,
            self.created_items,
            self.reused_items,
            self.failed_items,
            self.missing_products,
        )
    }
}

/// What to persist for one aggregator page once its products are scraped.
#[derive(Debug, PartialEq)]
pub(crate) struct PagePlan<'a> {
    /// Canonical URL and product for each successful scrape, in page order.
    pub scraped: Vec<(&'a str, &'a ExtractedProduct)>,
    /// Other-retailer links and failed scrapes.
    pub missing: Vec<NewMissingProduct>,
    /// Marketplace products whose scrape failed.
    pub failed_items: usize,
}

/// Pairs batch results with the page's marketplace products and collects
/// everything that could not be imported.
///
/// `items` must be the batch result for `page.marketplace()` in order.
pub(crate) fn plan_page<'a>(page: &'a AggregatorPage, items: &'a [BatchItem]) -> PagePlan<'a> {
    let mut plan = PagePlan {
        scraped: Vec::new(),
        missing: Vec::new(),
        failed_items: 0,
    };

    for (product, item) in page.marketplace().zip(items) {
        match item.outcome.product() {
            Some(scraped) => plan.scraped.push((item.url.as_str(), scraped)),
            None => {
                plan.failed_items += 1;
                plan.missing.push(NewMissingProduct {
                    product_name: product.label.clone(),
                    original_url: Some(product.canonical_url.clone()),
                });
            }
        }
    }
    for product in page.non_marketplace() {
        plan.missing.push(NewMissingProduct {
            product_name: product.label.clone(),
            original_url: Some(product.canonical_url.clone()),
        });
    }

    plan
}

/// Resolves the import target to the list of aggregator pages to visit.
async fn resolve_pages(
    config: &AppConfig,
    url: &str,
    limit: Option<usize>,
) -> anyhow::Result<Vec<String>> {
    let url = ensure_scheme(url).ok_or_else(|| anyhow::anyhow!("invalid URL: {url}"))?;

    let mut pages = if looks_like_sitemap_url(&url) {
        let client = SitemapClient::new(config.http_timeout_secs, &config.browser_user_agent)?;
        client.fetch_page_urls(&url).await?
    } else {
        vec![url]
    };

    if let Some(limit) = limit {
        pages.truncate(limit);
    }
    Ok(pages)
}

/// Imports every page behind `url`.
///
/// With `dry_run` the discovered products are printed and nothing is
/// scraped or written; `pool` is unused and may be `None`.
///
/// # Errors
///
/// Returns an error if the sitemap cannot be fetched or `url` is invalid.
/// Per-page failures are counted in the returned totals.
pub(crate) async fn run_import(
    pool: Option<&PgPool>,
    config: &AppConfig,
    url: &str,
    dry_run: bool,
    limit: Option<usize>,
) -> anyhow::Result<ImportTotals> {
    let pages = resolve_pages(config, url, limit).await?;
    let launcher = ChromiumLauncher::new(ChromiumOptions::from_app_config(config));
    let aggregator = AggregatorLinkScraper::new(AggregatorSettings::from_app_config(config));
    let policy = RetryPolicy::from_app_config(config);
    let orchestrator = BatchOrchestrator::from_app_config(config);

    let mut totals = ImportTotals {
        pages: pages.len(),
        ..ImportTotals::default()
    };

    for (index, page_url) in pages.iter().enumerate() {
        println!("[{}/{}] {page_url}", index + 1, pages.len());

        if let Some(pool) = pool {
            match costumedb_db::find_outfit_by_bulk_url(pool, page_url).await {
                Ok(Some(outfit)) => {
                    println!("  skipped: already imported as outfit {}", outfit.id);
                    totals.skipped_pages += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(url = %page_url, error = %e, "failed to check for existing outfit");
                    println!("  failed: {e}");
                    totals.failed_pages += 1;
                    continue;
                }
            }
        }

        let page = match aggregator
            .scrape_with_launcher(&launcher, policy, page_url)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                println!("  failed: {e}");
                totals.failed_pages += 1;
                continue;
            }
        };

        let marketplace = page.marketplace_count();
        println!(
            "  {}: {marketplace} marketplace products, {} other",
            page.title,
            page.products.len() - marketplace
        );
        if marketplace == 0 {
            println!("  skipped: no marketplace products");
            totals.skipped_pages += 1;
            continue;
        }

        let Some(pool) = pool.filter(|_| !dry_run) else {
            for product in &page.products {
                println!("    {} {}", product.canonical_url, product.label);
            }
            continue;
        };

        match import_page(pool, &orchestrator, &launcher, &page).await {
            Ok(page_totals) => {
                totals.imported_pages += 1;
                totals.created_items += page_totals.created_items;
                totals.reused_items += page_totals.reused_items;
                totals.failed_items += page_totals.failed_items;
                totals.missing_products += page_totals.missing_products;
            }
            Err(e) => {
                tracing::error!(url = %page_url, error = %e, "page import failed");
                println!("  failed: {e:#}");
                totals.failed_pages += 1;
            }
        }
    }

    println!("{}", totals.summary_line());
    Ok(totals)
}

/// Scrapes one page's marketplace products and writes its outfit.
///
/// Returns per-page counts in an [`ImportTotals`] with only the item fields
/// set.
async fn import_page<L: BrowserLauncher>(
    pool: &PgPool,
    orchestrator: &BatchOrchestrator,
    launcher: &L,
    page: &AggregatorPage,
) -> anyhow::Result<ImportTotals> {
    let items = scrape_marketplace(orchestrator, launcher, page).await;
    let plan = plan_page(page, &items);
    persist_page(pool, page, &plan).await
}

/// Batch-scrapes the page's marketplace products, printing one line each.
pub(crate) async fn scrape_marketplace<L: BrowserLauncher>(
    orchestrator: &BatchOrchestrator,
    launcher: &L,
    page: &AggregatorPage,
) -> Vec<BatchItem> {
    let urls: Vec<String> = page.marketplace().map(|p| p.canonical_url.clone()).collect();
    let items = orchestrator.scrape_batch(launcher, &urls).await;

    for item in &items {
        match &item.outcome {
            ScrapeOutcome::Success(product) => {
                println!("    ok   {} {}", item.url, product.title);
            }
            ScrapeOutcome::Failure { reason, .. } => {
                println!("    FAIL {} {reason}", item.url);
            }
        }
    }
    items
}

/// Saves the scraped products, then writes the outfit and its missing
/// products.
///
/// The outfit is written even when no product was scraped, so the page is
/// recorded as imported and its failures land in `missing_products`.
///
/// # Errors
///
/// Returns an error if any database write fails.
pub(crate) async fn persist_page(
    pool: &PgPool,
    page: &AggregatorPage,
    plan: &PagePlan<'_>,
) -> anyhow::Result<ImportTotals> {
    let mut totals = ImportTotals {
        failed_items: plan.failed_items,
        ..ImportTotals::default()
    };

    let mut item_ids = Vec::with_capacity(plan.scraped.len());
    for (url, product) in &plan.scraped {
        let saved = costumedb_db::save_scraped_product(pool, url, product).await?;
        if saved.created {
            totals.created_items += 1;
        } else {
            totals.reused_items += 1;
        }
        item_ids.push(saved.id);
    }

    let outfit = costumedb_db::create_outfit_with_items(
        pool,
        &costumedb_db::NewOutfit {
            name: page.title.clone(),
            description: None,
            from_bulk_url: Some(page.source_url.clone()),
        },
        &item_ids,
    )
    .await?;
    totals.missing_products =
        costumedb_db::insert_missing_products(pool, outfit.id, &plan.missing).await?;

    if item_ids.is_empty() {
        tracing::warn!(
            outfit_id = outfit.id,
            url = %page.source_url,
            failed = plan.failed_items,
            "no marketplace product could be scraped"
        );
    }
    println!(
        "  outfit {} created: {} items, {} missing",
        outfit.id,
        item_ids.len(),
        totals.missing_products
    );
    tracing::info!(
        outfit_id = outfit.id,
        url = %page.source_url,
        created = totals.created_items,
        reused = totals.reused_items,
        failed = totals.failed_items,
        missing = totals.missing_products,
        "imported page"
    );
    Ok(totals)
}

#[cfg(test)]
#[path = "import_test.rs"]
mod tests;
