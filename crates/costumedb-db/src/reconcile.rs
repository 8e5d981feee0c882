//! Catalog URL normalization and duplicate merging.
//!
//! Reconciliation runs in two phases over a [`CatalogStore`]:
//!
//! 1. **Normalize**: every record with a URL is rewritten to its normalized
//!    form (redirects resolved, then canonicalized). A second run makes no
//!    updates.
//! 2. **Dedupe**: records sharing a URL are merged into the lowest id. Each
//!    group's membership is re-read just before merging. The other members'
//!    outfit links move to the survivor, then the members are deleted.
//!
//! Failures are counted per record (normalize) or per group (dedupe) and
//! never stop the remaining work.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use sqlx::PgPool;

use crate::outfits::repoint_outfit_items;
use crate::DbError;

/// The reconciler's view of a clothing item.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CatalogRecord {
    pub id: i64,
    pub product_url: Option<String>,
}

/// Records sharing one URL. The survivor is always the smallest id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub canonical_url: String,
    pub member_ids: BTreeSet<i64>,
}

impl DuplicateGroup {
    #[must_use]
    pub fn survivor(&self) -> Option<i64> {
        self.member_ids.first().copied()
    }

    /// Members to merge into the survivor, in ascending id order.
    #[must_use]
    pub fn others(&self) -> Vec<i64> {
        self.member_ids.iter().skip(1).copied().collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub records_scanned: usize,
    pub normalized: usize,
    pub normalize_failures: usize,
    pub duplicate_groups: usize,
    pub removed: usize,
    pub failed_groups: usize,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Persistence operations the reconciler needs.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Every record, ordered by id.
    async fn list_records(&self) -> Result<Vec<CatalogRecord>, DbError>;

    /// Records whose URL equals `url` exactly, ordered by id.
    async fn find_by_product_url(&self, url: &str) -> Result<Vec<CatalogRecord>, DbError>;

    async fn update_product_url(&self, id: i64, url: &str) -> Result<(), DbError>;

    /// Moves every outfit link from `from` to `to`; returns the links moved.
    async fn repoint_references(&self, from: i64, to: i64) -> Result<u64, DbError>;

    async fn delete_record(&self, id: i64) -> Result<(), DbError>;

    /// Folds `others` into `survivor` and returns how many records were
    /// removed.
    ///
    /// The default repoints then deletes each member in turn and is not
    /// atomic; stores with transactions should override it.
    async fn merge_group(&self, survivor: i64, others: &[i64]) -> Result<usize, DbError> {
        for &id in others {
            self.repoint_references(id, survivor).await?;
            self.delete_record(id).await?;
        }
        Ok(others.len())
    }
}

/// [`CatalogStore`] over the `clothing_items` and `outfit_items` tables.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalog {
    async fn list_records(&self) -> Result<Vec<CatalogRecord>, DbError> {
        let rows = sqlx::query_as::<_, CatalogRecord>(
            "SELECT id, product_url FROM clothing_items ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_by_product_url(&self, url: &str) -> Result<Vec<CatalogRecord>, DbError> {
        let rows = sqlx::query_as::<_, CatalogRecord>(
            "SELECT id, product_url FROM clothing_items WHERE product_url = $1 ORDER BY id",
        )
        .bind(url)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_product_url(&self, id: i64, url: &str) -> Result<(), DbError> {
        crate::clothing_items::update_product_url(&self.pool, id, url).await
    }

    async fn repoint_references(&self, from: i64, to: i64) -> Result<u64, DbError> {
        let mut conn = self.pool.acquire().await?;
        repoint_outfit_items(&mut conn, from, to).await
    }

    async fn delete_record(&self, id: i64) -> Result<(), DbError> {
        crate::clothing_items::delete_clothing_item(&self.pool, id).await
    }

    /// Repoints and deletes every member in a single transaction, so a group
    /// is either fully merged or left untouched.
    async fn merge_group(&self, survivor: i64, others: &[i64]) -> Result<usize, DbError> {
        let mut tx = self.pool.begin().await?;
        for &id in others {
            repoint_outfit_items(&mut tx, id, survivor).await?;
            let deleted = sqlx::query("DELETE FROM clothing_items WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            if deleted == 0 {
                return Err(DbError::NotFound);
            }
        }
        tx.commit().await?;
        Ok(others.len())
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Groups records by exact URL and keeps only groups with more than one
/// member. Records without a URL are ignored. Output is ordered by URL.
#[must_use]
pub fn group_duplicates(records: &[CatalogRecord]) -> Vec<DuplicateGroup> {
    let mut by_url: BTreeMap<&str, BTreeSet<i64>> = BTreeMap::new();
    for record in records {
        let Some(url) = record.product_url.as_deref().filter(|u| !u.trim().is_empty()) else {
            continue;
        };
        by_url.entry(url).or_default().insert(record.id);
    }
    by_url
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(url, member_ids)| DuplicateGroup {
            canonical_url: url.to_owned(),
            member_ids,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Runs the normalize and dedupe phases with a caller-supplied URL
/// normalizer. The normalizer must be idempotent.
pub struct CatalogReconciler<F> {
    normalize_url: F,
}

impl<F> CatalogReconciler<F>
where
    F: Fn(&str) -> String + Send + Sync,
{
    #[must_use]
    pub fn new(normalize_url: F) -> Self {
        Self { normalize_url }
    }

    /// Runs normalize, then dedupe.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] only if the store cannot list its records.
    /// Per-record and per-group failures are counted in the summary.
    pub async fn run<S: CatalogStore + ?Sized>(&self, store: &S) -> Result<ReconcileSummary, DbError> {
        let mut summary = self.normalize(store).await?;
        let dedupe = self.dedupe(store).await?;
        summary.duplicate_groups = dedupe.duplicate_groups;
        summary.removed = dedupe.removed;
        summary.failed_groups = dedupe.failed_groups;
        tracing::info!(
            scanned = summary.records_scanned,
            normalized = summary.normalized,
            normalize_failures = summary.normalize_failures,
            groups = summary.duplicate_groups,
            removed = summary.removed,
            failed_groups = summary.failed_groups,
            "catalog reconciled"
        );
        Ok(summary)
    }

    /// Rewrites every non-canonical URL. Only the normalize counters of the
    /// returned summary are set.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot list its records.
    pub async fn normalize<S: CatalogStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<ReconcileSummary, DbError> {
        let records = store.list_records().await?;
        let mut summary = ReconcileSummary {
            records_scanned: records.len(),
            ..ReconcileSummary::default()
        };

        for record in &records {
            let Some(url) = record.product_url.as_deref().filter(|u| !u.trim().is_empty()) else {
                continue;
            };
            let canonical = (self.normalize_url)(url);
            if canonical == url {
                continue;
            }
            match store.update_product_url(record.id, &canonical).await {
                Ok(()) => {
                    tracing::debug!(id = record.id, from = url, to = %canonical, "normalized url");
                    summary.normalized += 1;
                }
                Err(err) => {
                    tracing::warn!(id = record.id, url, error = %err, "failed to normalize url");
                    summary.normalize_failures += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Merges every group of records sharing a URL. Only the dedupe
    /// counters of the returned summary are set.
    ///
    /// Each group is re-read with [`CatalogStore::find_by_product_url`]
    /// before merging, so records removed or rewritten since the listing
    /// are left alone. A group that no longer has two members is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot list its records.
    pub async fn dedupe<S: CatalogStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<ReconcileSummary, DbError> {
        let records = store.list_records().await?;
        let groups = group_duplicates(&records);
        let mut summary = ReconcileSummary {
            records_scanned: records.len(),
            duplicate_groups: groups.len(),
            ..ReconcileSummary::default()
        };

        for listed in &groups {
            let group = match refresh_group(store, listed).await {
                Ok(Some(group)) => group,
                Ok(None) => {
                    tracing::debug!(group = %listed.canonical_url, "duplicate group dissolved");
                    continue;
                }
                Err(err) => {
                    tracing::warn!(
                        group = %listed.canonical_url,
                        error = %err,
                        "failed to re-read duplicate group"
                    );
                    summary.failed_groups += 1;
                    continue;
                }
            };
            let Some(survivor) = group.survivor() else {
                continue;
            };
            let others = group.others();
            match store.merge_group(survivor, &others).await {
                Ok(removed) => {
                    tracing::info!(group = %group.canonical_url, survivor, removed, "merged duplicates");
                    summary.removed += removed;
                }
                Err(err) => {
                    tracing::warn!(
                        group = %group.canonical_url,
                        survivor,
                        members = ?others,
                        error = %err,
                        "failed to merge duplicate group"
                    );
                    summary.failed_groups += 1;
                }
            }
        }

        Ok(summary)
    }
}

/// Current members of `group`, or `None` once fewer than two remain.
async fn refresh_group<S: CatalogStore + ?Sized>(
    store: &S,
    group: &DuplicateGroup,
) -> Result<Option<DuplicateGroup>, DbError> {
    let member_ids: BTreeSet<i64> = store
        .find_by_product_url(&group.canonical_url)
        .await?
        .into_iter()
        .map(|record| record.id)
        .collect();
    if member_ids.len() < 2 {
        return Ok(None);
    }
    Ok(Some(DuplicateGroup {
        canonical_url: group.canonical_url.clone(),
        member_ids,
    }))
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
