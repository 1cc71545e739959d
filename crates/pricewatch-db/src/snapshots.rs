//! Database operations for the append-only `price_snapshots` store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

const SNAPSHOT_COLUMNS: &str =
    "id, asin, source, seller_sku, price, currency, price_type, data_source, observed_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `price_snapshots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceSnapshotRow {
    pub id: i64,
    pub asin: String,
    /// `own` or `competitor:<label>`.
    pub source: String,
    pub seller_sku: Option<String>,
    pub price: Decimal,
    pub currency: String,
    /// `baseline` or `observed`.
    pub price_type: String,
    /// `initialization` or `monitoring`.
    pub data_source: String,
    pub observed_at: DateTime<Utc>,
}

/// Input for a new snapshot. `price_type` and `data_source` are implied by
/// which insert function is called.
#[derive(Debug, Clone)]
pub struct NewPriceSnapshot<'a> {
    pub asin: &'a str,
    pub source: &'a str,
    pub seller_sku: Option<&'a str>,
    pub price: Decimal,
    pub currency: &'a str,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts a baseline snapshot unless the `(asin, source)` series already has
/// any snapshot.
///
/// Returns `true` when a row was written. Safe under concurrent callers: the
/// partial unique index on baselines turns a lost race into a no-op.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_baseline_if_absent(
    pool: &PgPool,
    snapshot: &NewPriceSnapshot<'_>,
) -> Result<bool, DbError> {
    let inserted = sqlx::query_scalar::<_, i64>(
        "INSERT INTO price_snapshots \
             (asin, source, seller_sku, price, currency, price_type, data_source) \
         SELECT $1, $2, $3, $4, $5, 'baseline', 'initialization' \
         WHERE NOT EXISTS ( \
             SELECT 1 FROM price_snapshots WHERE asin = $1 AND source = $2 \
         ) \
         ON CONFLICT (asin, source) WHERE price_type = 'baseline' DO NOTHING \
         RETURNING id",
    )
    .bind(snapshot.asin)
    .bind(snapshot.source)
    .bind(snapshot.seller_sku)
    .bind(snapshot.price)
    .bind(snapshot.currency)
    .fetch_optional(pool)
    .await?;

    Ok(inserted.is_some())
}

/// Appends an observed snapshot written by the monitoring pass.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_observed_snapshot(
    pool: &PgPool,
    snapshot: &NewPriceSnapshot<'_>,
) -> Result<PriceSnapshotRow, DbError> {
    let row = sqlx::query_as::<_, PriceSnapshotRow>(&format!(
        "INSERT INTO price_snapshots \
             (asin, source, seller_sku, price, currency, price_type, data_source) \
         VALUES ($1, $2, $3, $4, $5, 'observed', 'monitoring') \
         RETURNING {SNAPSHOT_COLUMNS}"
    ))
    .bind(snapshot.asin)
    .bind(snapshot.source)
    .bind(snapshot.seller_sku)
    .bind(snapshot.price)
    .bind(snapshot.currency)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Deletes snapshots observed before `cutoff`, except the most recent
/// snapshot of each `(asin, source)` series.
///
/// Returns the number of rows deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_snapshots_older_than(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "DELETE FROM price_snapshots s \
         WHERE s.observed_at < $1 \
           AND EXISTS ( \
               SELECT 1 FROM price_snapshots newer \
               WHERE newer.asin = s.asin \
                 AND newer.source = s.source \
                 AND (newer.observed_at, newer.id) > (s.observed_at, s.id) \
           )",
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Most recent snapshot for a series: greatest `observed_at`, ties broken by
/// greatest `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_latest_snapshot(
    pool: &PgPool,
    asin: &str,
    source: &str,
) -> Result<Option<PriceSnapshotRow>, DbError> {
    let row = sqlx::query_as::<_, PriceSnapshotRow>(&format!(
        "SELECT {SNAPSHOT_COLUMNS} \
         FROM price_snapshots \
         WHERE asin = $1 AND source = $2 \
         ORDER BY observed_at DESC, id DESC \
         LIMIT 1"
    ))
    .bind(asin)
    .bind(source)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Distinct ASINs with at least one snapshot of any type. A first
/// observation seeded by a monitoring pass counts as initialized.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_initialized_asins(pool: &PgPool) -> Result<Vec<String>, DbError> {
    let rows = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT asin FROM price_snapshots ORDER BY asin",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Snapshots for `asin` (every source) observed at or after `since`, newest
/// first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_snapshot_history(
    pool: &PgPool,
    asin: &str,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<PriceSnapshotRow>, DbError> {
    let rows = sqlx::query_as::<_, PriceSnapshotRow>(&format!(
        "SELECT {SNAPSHOT_COLUMNS} \
         FROM price_snapshots \
         WHERE asin = $1 AND observed_at >= $2 \
         ORDER BY observed_at DESC, id DESC \
         LIMIT $3"
    ))
    .bind(asin)
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_snapshots(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM price_snapshots")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_monitored_asins(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(DISTINCT asin) FROM price_snapshots")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Time of the newest snapshot in the store, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_snapshot_at(pool: &PgPool) -> Result<Option<DateTime<Utc>>, DbError> {
    let at = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
        "SELECT MAX(observed_at) FROM price_snapshots",
    )
    .fetch_one(pool)
    .await?;
    Ok(at)
}
