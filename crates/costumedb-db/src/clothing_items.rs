//! Database operations for `clothing_items`.

use chrono::{DateTime, Utc};
use costumedb_core::ExtractedProduct;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `clothing_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClothingItemRow {
    pub id: i64,
    pub title: String,
    /// Shortened title for outfit pages; filled in by editors, never by the scraper.
    pub display_title: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    /// Canonical marketplace URL once `costumedb reconcile` has run. Legacy
    /// rows may still hold tracking-laden URLs.
    pub product_url: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable fields of a clothing item.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClothingItem {
    pub title: String,
    pub brand: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub product_url: Option<String>,
    pub image_url: Option<String>,
}

impl NewClothingItem {
    /// Builds an insertable item from a scraped product and the canonical
    /// URL it was scraped from.
    #[must_use]
    pub fn from_extracted(product: &ExtractedProduct, product_url: &str) -> Self {
        Self {
            title: product.title.clone(),
            brand: product.brand.clone(),
            color: product.color.clone(),
            material: product.material.clone(),
            description: product.description.clone(),
            price: product.price,
            product_url: Some(product_url.to_owned()),
            image_url: product.image_url.clone(),
        }
    }
}

/// Result of a duplicate-aware save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedItem {
    pub id: i64,
    /// `false` when an existing record with the same URL was reused.
    pub created: bool,
}

const SELECT_COLUMNS: &str = "SELECT id, title, display_title, brand, category, subcategory, \
     color, material, description, price, product_url, image_url, created_at, updated_at \
     FROM clothing_items";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts a clothing item and returns its new `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_clothing_item(pool: &PgPool, item: &NewClothingItem) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO clothing_items \
             (title, brand, color, material, description, price, product_url, image_url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING id",
    )
    .bind(&item.title)
    .bind(&item.brand)
    .bind(&item.color)
    .bind(&item.material)
    .bind(&item.description)
    .bind(item.price)
    .bind(&item.product_url)
    .bind(&item.image_url)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Returns the oldest record whose `product_url` equals `url` exactly.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_clothing_item_by_product_url(
    pool: &PgPool,
    url: &str,
) -> Result<Option<ClothingItemRow>, DbError> {
    let row = sqlx::query_as::<_, ClothingItemRow>(&format!(
        "{SELECT_COLUMNS} WHERE product_url = $1 ORDER BY id LIMIT 1"
    ))
    .bind(url)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Rewrites one record's `product_url`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has `id`, or [`DbError::Sqlx`] on
/// query failure.
pub async fn update_product_url(pool: &PgPool, id: i64, url: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE clothing_items SET product_url = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(url)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Deletes one clothing item. Join rows referencing it cascade.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has `id`, or [`DbError::Sqlx`] on
/// query failure.
pub async fn delete_clothing_item(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM clothing_items WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Saves a scraped product unless a record with the same URL already exists.
///
/// `product_url` must already be canonical; lookups are exact matches.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the lookup or insert fails.
pub async fn save_scraped_product(
    pool: &PgPool,
    product_url: &str,
    product: &ExtractedProduct,
) -> Result<SavedItem, DbError> {
    if let Some(existing) = find_clothing_item_by_product_url(pool, product_url).await? {
        tracing::debug!(id = existing.id, url = product_url, "reusing existing clothing item");
        return Ok(SavedItem {
            id: existing.id,
            created: false,
        });
    }

    let id = insert_clothing_item(pool, &NewClothingItem::from_extracted(product, product_url))
        .await?;
    tracing::debug!(id, url = product_url, "inserted clothing item");
    Ok(SavedItem { id, created: true })
}
