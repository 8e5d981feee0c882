//! `costumedb reconcile`: URL normalization and duplicate merging.

use costumedb_db::{CatalogReconciler, PgCatalog, ReconcileSummary};
use sqlx::PgPool;

/// Runs both reconciliation phases and prints the counts.
///
/// Returns `false` if any record or group failed.
///
/// # Errors
///
/// Returns an error if the catalog cannot be listed.
pub(crate) async fn run_reconcile(pool: &PgPool) -> anyhow::Result<bool> {
    let catalog = PgCatalog::new(pool.clone());
    let summary = CatalogReconciler::new(costumedb_scraper::normalize_url)
        .run(&catalog)
        .await?;

    println!("{}", render_summary(&summary));
    Ok(summary.normalize_failures == 0 && summary.failed_groups == 0)
}

fn render_summary(summary: &ReconcileSummary) -> String {
    let mut out = format!(
        "scanned {} records\nnormalized {} urls\nmerged {} duplicate groups, removed {} records",
        summary.records_scanned, summary.normalized, summary.duplicate_groups, summary.removed
    );
    if summary.normalize_failures > 0 || summary.failed_groups > 0 {
        out.push_str(&format!(
            "\nfailures: {} urls, {} groups (see logs)",
            summary.normalize_failures, summary.failed_groups
        ));
    }
    out
}
