//! Database operations for `missing_products`.

use sqlx::PgPool;

use crate::DbError;

/// An aggregator product that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMissingProduct {
    pub product_name: String,
    pub original_url: Option<String>,
}

/// Records `products` as pending for `outfit_id` in one transaction.
///
/// Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; nothing is written in that
/// case.
pub async fn insert_missing_products(
    pool: &PgPool,
    outfit_id: i64,
    products: &[NewMissingProduct],
) -> Result<usize, DbError> {
    if products.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    for product in products {
        sqlx::query(
            "INSERT INTO missing_products (outfit_id, product_name, original_url) \
             VALUES ($1, $2, $3)",
        )
        .bind(outfit_id)
        .bind(&product.product_name)
        .bind(&product.original_url)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(products.len())
}

