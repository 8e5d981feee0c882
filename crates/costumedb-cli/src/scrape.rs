//! `costumedb scrape`: ad-hoc product scrapes.

use costumedb_core::AppConfig;
use costumedb_scraper::{ensure_scheme, BatchOrchestrator, ChromiumLauncher, ChromiumOptions};
use sqlx::PgPool;

/// Scrapes `urls` in one browser session and prints one JSON line per URL.
///
/// When `pool` is set, successful scrapes are saved, reusing any record that
/// already has the same canonical URL.
///
/// Returns `true` when every URL was scraped (and saved, if requested).
///
/// # Errors
///
/// Returns an error if any URL is malformed or an outcome cannot be
/// serialized.
pub(crate) async fn run_scrape(
    pool: Option<&PgPool>,
    config: &AppConfig,
    urls: &[String],
) -> anyhow::Result<bool> {
    let urls = urls
        .iter()
        .map(|u| ensure_scheme(u).ok_or_else(|| anyhow::anyhow!("invalid URL: {u}")))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let launcher = ChromiumLauncher::new(ChromiumOptions::from_app_config(config));
    let items = BatchOrchestrator::from_app_config(config)
        .scrape_batch(&launcher, &urls)
        .await;

    let mut all_ok = true;
    for item in &items {
        println!("{}", serde_json::to_string(item)?);

        let Some(product) = item.outcome.product() else {
            all_ok = false;
            continue;
        };
        let Some(pool) = pool else {
            continue;
        };
        match costumedb_db::save_scraped_product(pool, &item.url, product).await {
            Ok(saved) => tracing::info!(
                id = saved.id,
                created = saved.created,
                url = %item.url,
                "saved product"
            ),
            Err(e) => {
                tracing::error!(url = %item.url, error = %e, "failed to save product");
                all_ok = false;
            }
        }
    }

    Ok(all_ok)
}
