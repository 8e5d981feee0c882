//! Offline unit tests for costumedb-db pool configuration and row types.
//! These tests do not require a live database connection.

use costumedb_core::{AppConfig, Environment};
use costumedb_db::{CatalogRecord, ClothingItemRow, PoolConfig, ReconcileSummary};

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: Some("postgres://example".to_string()),
        env: Environment::Test,
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        browser_executable: None,
        browser_user_agent: "ua".to_string(),
        scraper_page_load_timeout_secs: 30,
        scraper_ready_timeout_secs: 10,
        scraper_element_wait_ms: 5000,
        scraper_settle_delay_ms: 3000,
        scraper_max_attempts: 3,
        scraper_retry_delay_secs: 5,
        http_timeout_secs: 30,
        import_delay_ms: 0,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`ClothingItemRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn clothing_item_row_has_expected_fields() {
    use chrono::Utc;
    use rust_decimal::Decimal;

    let row = ClothingItemRow {
        id: 1,
        title: "Pirate Tricorn Hat".to_string(),
        display_title: None,
        brand: Some("Rubie's".to_string()),
        category: None,
        subcategory: None,
        color: Some("Black".to_string()),
        material: None,
        description: None,
        price: Some(Decimal::new(1999, 2)),
        product_url: Some("https://www.amazon.com/dp/B0HATHAT01".to_string()),
        image_url: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    assert_eq!(row.id, 1);
    assert_eq!(row.price, Some(Decimal::new(1999, 2)));
}

#[test]
fn reconcile_summary_defaults_to_zero() {
    let summary = ReconcileSummary::default();
    assert_eq!(summary.records_scanned, 0);
    assert_eq!(summary.removed, 0);
    assert_eq!(summary.failed_groups, 0);

    let record = CatalogRecord {
        id: 3,
        product_url: None,
    };
    assert!(record.product_url.is_none());
}
