//! Live integration tests for costumedb-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/costumedb-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use costumedb_core::ExtractedProduct;
use costumedb_db::{
    create_outfit_with_items, delete_clothing_item, find_clothing_item_by_product_url,
    find_outfit_by_bulk_url, insert_clothing_item, insert_missing_products, run_migrations,
    save_scraped_product, update_product_url, CatalogReconciler, CatalogStore, DbError,
    NewClothingItem, NewMissingProduct, NewOutfit, PgCatalog,
};
use costumedb_scraper::normalize_url;
use rust_decimal::Decimal;

const HAT: &str = "https://www.amazon.com/dp/B0HATHAT01";
const WIG: &str = "https://www.amazon.com/dp/B0WIGWIG01";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn product(title: &str) -> ExtractedProduct {
    ExtractedProduct {
        title: title.to_string(),
        brand: Some("Rubie's".to_string()),
        price: Some(Decimal::new(2499, 2)),
        color: Some("Black".to_string()),
        material: None,
        description: Some("FEATURES:\n- Adjustable".to_string()),
        image_url: None,
    }
}

async fn insert_item(pool: &sqlx::PgPool, url: Option<&str>) -> i64 {
    let item = NewClothingItem {
        title: "Test Item".to_string(),
        brand: None,
        color: None,
        material: None,
        description: None,
        price: None,
        product_url: url.map(str::to_string),
        image_url: None,
    };
    insert_clothing_item(pool, &item)
        .await
        .unwrap_or_else(|e| panic!("insert_item failed for {url:?}: {e}"))
}

async fn item_ids(pool: &sqlx::PgPool) -> Vec<i64> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM clothing_items ORDER BY id")
        .fetch_all(pool)
        .await
        .expect("item_ids query failed")
}

async fn item_url(pool: &sqlx::PgPool, id: i64) -> Option<String> {
    sqlx::query_scalar::<_, Option<String>>("SELECT product_url FROM clothing_items WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("item_url query failed")
}

async fn outfit_item_ids(pool: &sqlx::PgPool, outfit_id: i64) -> Vec<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT clothing_item_id FROM outfit_items WHERE outfit_id = $1 ORDER BY id",
    )
    .bind(outfit_id)
    .fetch_all(pool)
    .await
    .expect("outfit_item_ids query failed")
}

async fn missing_products(pool: &sqlx::PgPool, outfit_id: i64) -> Vec<(String, String)> {
    sqlx::query_as::<_, (String, String)>(
        "SELECT product_name, status FROM missing_products WHERE outfit_id = $1 ORDER BY id",
    )
    .bind(outfit_id)
    .fetch_all(pool)
    .await
    .expect("missing_products query failed")
}

fn outfit(name: &str, bulk_url: &str) -> NewOutfit {
    NewOutfit {
        name: name.to_string(),
        description: None,
        from_bulk_url: Some(bulk_url.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Section 1: Migrations and clothing items
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn migrations_are_already_applied(pool: sqlx::PgPool) {
    let applied = run_migrations(&pool).await.expect("run_migrations failed");
    assert_eq!(applied, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn save_scraped_product_reuses_existing_url(pool: sqlx::PgPool) {
    let first = save_scraped_product(&pool, HAT, &product("Tricorn Hat"))
        .await
        .expect("first save failed");
    let second = save_scraped_product(&pool, HAT, &product("Tricorn Hat (again)"))
        .await
        .expect("second save failed");

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.id, second.id);

    let row = find_clothing_item_by_product_url(&pool, HAT)
        .await
        .expect("find failed")
        .expect("expected a row");
    assert_eq!(row.id, first.id);
    assert_eq!(row.title, "Tricorn Hat");
    assert_eq!(row.price, Some(Decimal::new(2499, 2)));
    assert_eq!(item_ids(&pool).await.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn find_by_product_url_returns_oldest_match(pool: sqlx::PgPool) {
    let first = insert_item(&pool, Some(HAT)).await;
    insert_item(&pool, Some(HAT)).await;

    let found = find_clothing_item_by_product_url(&pool, HAT)
        .await
        .expect("find failed")
        .expect("expected a row");
    assert_eq!(found.id, first);
    assert!(find_clothing_item_by_product_url(&pool, WIG).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_and_delete_missing_rows_are_not_found(pool: sqlx::PgPool) {
    assert!(matches!(
        update_product_url(&pool, 999, HAT).await,
        Err(DbError::NotFound)
    ));
    assert!(matches!(
        delete_clothing_item(&pool, 999).await,
        Err(DbError::NotFound)
    ));
}

// ---------------------------------------------------------------------------
// Section 2: Outfits and missing products
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn outfit_is_created_with_slug_and_items(pool: sqlx::PgPool) {
    let hat = insert_item(&pool, Some(HAT)).await;
    let wig = insert_item(&pool, Some(WIG)).await;
    let page = "https://costumewall.com/dress-like-jack-sparrow/";

    let row = create_outfit_with_items(&pool, &outfit("Jack Sparrow", page), &[hat, wig, hat])
        .await
        .expect("create_outfit_with_items failed");

    assert_eq!(row.slug.as_deref(), Some(format!("jack-sparrow-{}", row.id).as_str()));
    assert_eq!(row.status, 0);
    assert_eq!(outfit_item_ids(&pool, row.id).await, vec![hat, wig]);

    let found = find_outfit_by_bulk_url(&pool, page)
        .await
        .unwrap()
        .expect("outfit should be found by bulk url");
    assert_eq!(found.id, row.id);
    assert!(find_outfit_by_bulk_url(&pool, "https://costumewall.com/other/")
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn outfit_with_unknown_item_is_rolled_back(pool: sqlx::PgPool) {
    let page = "https://costumewall.com/dress-like-elsa/";
    let result = create_outfit_with_items(&pool, &outfit("Elsa", page), &[424_242]).await;

    assert!(result.is_err());
    assert!(find_outfit_by_bulk_url(&pool, page).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn missing_products_are_recorded_as_pending(pool: sqlx::PgPool) {
    let row = create_outfit_with_items(
        &pool,
        &outfit("Link", "https://costumewall.com/dress-like-link/"),
        &[],
    )
    .await
    .unwrap();

    let written = insert_missing_products(
        &pool,
        row.id,
        &[
            NewMissingProduct {
                product_name: "Master Sword".to_string(),
                original_url: Some("https://www.etsy.com/listing/1/sword".to_string()),
            },
            NewMissingProduct {
                product_name: "Product B0SHIELD01".to_string(),
                original_url: Some("https://www.amazon.com/dp/B0SHIELD01".to_string()),
            },
        ],
    )
    .await
    .unwrap();

    assert_eq!(written, 2);
    let rows = missing_products(&pool, row.id).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].0, "Master Sword");
    assert!(rows.iter().all(|(_, status)| status == "pending"));
}

// ---------------------------------------------------------------------------
// Section 3: Reconciliation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn reconcile_normalizes_then_merges_into_minimum_id(pool: sqlx::PgPool) {
    let survivor = insert_item(&pool, Some("https://amazon.com/Hat/dp/b0hathat01/ref=sr_1?th=1")).await;
    let dup_a = insert_item(&pool, Some(HAT)).await;
    let dup_b = insert_item(
        &pool,
        Some("https://geni.us/h?GR_URL=https%3A%2F%2Fwww.amazon.com%2Fdp%2FB0HATHAT01"),
    )
    .await;
    let wig = insert_item(&pool, Some(WIG)).await;
    let unlinked = insert_item(&pool, None).await;

    let sparrow = create_outfit_with_items(
        &pool,
        &outfit("Jack Sparrow", "https://costumewall.com/dress-like-jack-sparrow/"),
        &[dup_a, wig],
    )
    .await
    .unwrap();
    let hook = create_outfit_with_items(
        &pool,
        &outfit("Captain Hook", "https://costumewall.com/dress-like-captain-hook/"),
        &[survivor, dup_b],
    )
    .await
    .unwrap();

    let catalog = PgCatalog::new(pool.clone());
    let summary = CatalogReconciler::new(normalize_url).run(&catalog).await.unwrap();

    assert_eq!(summary.records_scanned, 5);
    assert_eq!(summary.normalized, 2);
    assert_eq!(summary.duplicate_groups, 1);
    assert_eq!(summary.removed, 2);
    assert_eq!(summary.failed_groups, 0);

    assert_eq!(item_ids(&pool).await, vec![survivor, wig, unlinked]);
    assert_eq!(item_url(&pool, survivor).await.as_deref(), Some(HAT));

    let mut sparrow_items = outfit_item_ids(&pool, sparrow.id).await;
    sparrow_items.sort_unstable();
    assert_eq!(sparrow_items, vec![survivor, wig]);
    assert_eq!(outfit_item_ids(&pool, hook.id).await, vec![survivor]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn reconcile_rerun_is_a_no_op(pool: sqlx::PgPool) {
    insert_item(&pool, Some("https://amazon.com/dp/B0HATHAT01?tag=x")).await;
    insert_item(&pool, Some(HAT)).await;

    let catalog = PgCatalog::new(pool.clone());
    let reconciler = CatalogReconciler::new(normalize_url);
    reconciler.run(&catalog).await.unwrap();
    let second = reconciler.run(&catalog).await.unwrap();

    assert_eq!(second.records_scanned, 1);
    assert_eq!(second.normalized, 0);
    assert_eq!(second.duplicate_groups, 0);
    assert_eq!(catalog.find_by_product_url(HAT).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn merge_group_with_missing_member_rolls_back(pool: sqlx::PgPool) {
    let survivor = insert_item(&pool, Some(HAT)).await;
    let member = insert_item(&pool, Some(HAT)).await;
    let row = create_outfit_with_items(
        &pool,
        &outfit("Elsa", "https://costumewall.com/dress-like-elsa/"),
        &[member],
    )
    .await
    .unwrap();

    let catalog = PgCatalog::new(pool.clone());
    let result = catalog.merge_group(survivor, &[member, 999_999]).await;

    assert!(matches!(result, Err(DbError::NotFound)));
    assert_eq!(item_ids(&pool).await.len(), 2);
    assert_eq!(outfit_item_ids(&pool, row.id).await, vec![member]);
}
