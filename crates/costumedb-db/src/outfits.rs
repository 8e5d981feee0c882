//! Database operations for `outfits` and the `outfit_items` join table.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::DbError;

/// Draft outfits are hidden until an editor publishes them.
pub const OUTFIT_STATUS_DRAFT: i32 = 0;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `outfits` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutfitRow {
    pub id: i64,
    pub name: String,
    /// `{slugified name}-{id}`; `NULL` only for rows written outside this crate.
    pub slug: Option<String>,
    pub description: Option<String>,
    pub status: i32,
    /// Aggregator page the outfit was imported from.
    pub from_bulk_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOutfit {
    pub name: String,
    pub description: Option<String>,
    pub from_bulk_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns the outfit imported from `url`, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_outfit_by_bulk_url(pool: &PgPool, url: &str) -> Result<Option<OutfitRow>, DbError> {
    let row = sqlx::query_as::<_, OutfitRow>(
        "SELECT id, name, slug, description, status, from_bulk_url, created_at, updated_at \
         FROM outfits \
         WHERE from_bulk_url = $1 \
         ORDER BY id \
         LIMIT 1",
    )
    .bind(url)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Creates a draft outfit and links `item_ids` to it in one transaction.
///
/// Repeated ids are linked once. The slug is derived from the name and the
/// new row's id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is written in
/// that case.
pub async fn create_outfit_with_items(
    pool: &PgPool,
    outfit: &NewOutfit,
    item_ids: &[i64],
) -> Result<OutfitRow, DbError> {
    let mut tx = pool.begin().await?;

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO outfits (name, description, status, from_bulk_url) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id",
    )
    .bind(&outfit.name)
    .bind(&outfit.description)
    .bind(OUTFIT_STATUS_DRAFT)
    .bind(&outfit.from_bulk_url)
    .fetch_one(&mut *tx)
    .await?;

    let row = sqlx::query_as::<_, OutfitRow>(
        "UPDATE outfits SET slug = $2 WHERE id = $1 \
         RETURNING id, name, slug, description, status, from_bulk_url, created_at, updated_at",
    )
    .bind(id)
    .bind(outfit_slug(&outfit.name, id))
    .fetch_one(&mut *tx)
    .await?;

    for item_id in item_ids {
        sqlx::query(
            "INSERT INTO outfit_items (outfit_id, clothing_item_id) \
             VALUES ($1, $2) \
             ON CONFLICT (outfit_id, clothing_item_id) DO NOTHING",
        )
        .bind(id)
        .bind(item_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::debug!(outfit_id = id, items = item_ids.len(), "created outfit");
    Ok(row)
}

/// Moves every outfit link from clothing item `from` to `to`.
///
/// Outfits that already link `to` keep their existing row and drop the link
/// to `from`, so `(outfit_id, clothing_item_id)` stays unique. Takes a
/// connection so callers can run it inside a transaction.
///
/// Returns the number of links moved.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either statement fails.
pub async fn repoint_outfit_items(
    conn: &mut PgConnection,
    from: i64,
    to: i64,
) -> Result<u64, DbError> {
    sqlx::query(
        "DELETE FROM outfit_items AS dup \
         WHERE dup.clothing_item_id = $1 \
           AND EXISTS ( \
               SELECT 1 FROM outfit_items AS keep \
               WHERE keep.outfit_id = dup.outfit_id AND keep.clothing_item_id = $2 \
           )",
    )
    .bind(from)
    .bind(to)
    .execute(&mut *conn)
    .await?;

    let moved = sqlx::query("UPDATE outfit_items SET clothing_item_id = $2 WHERE clothing_item_id = $1")
        .bind(from)
        .bind(to)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    Ok(moved)
}

/// Lower-cases `name` and joins its alphanumeric runs with `-`.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

fn outfit_slug(name: &str, id: i64) -> String {
    let base = slugify(name);
    if base.is_empty() {
        format!("outfit-{id}")
    } else {
        format!("{base}-{id}")
    }
}
