//! Database operations for `price_alerts`.
//!
//! Alerts are immutable once written apart from `is_read`. Dismissal is a
//! hard delete. Every mutation here is a no-op rather than an error when the
//! target row is already in the requested state or no longer exists.

use chrono::{DateTime, Utc};
use pricewatch_core::{AlertFilter, AlertPriority, AlertType};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

const ALERT_COLUMNS: &str = "id, asin, seller_sku, product_name, old_price, new_price, \
     price_change, price_change_percent, currency, alert_type, competitor_name, priority, \
     threshold_triggered, is_read, created_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `price_alerts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceAlertRow {
    pub id: i64,
    pub asin: String,
    pub seller_sku: Option<String>,
    pub product_name: Option<String>,
    pub old_price: Decimal,
    pub new_price: Decimal,
    pub price_change: Decimal,
    pub price_change_percent: Decimal,
    pub currency: String,
    pub alert_type: String,
    /// `NULL` when the alert concerns our own listing.
    pub competitor_name: Option<String>,
    pub priority: String,
    pub threshold_triggered: Decimal,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for [`insert_price_alert`].
#[derive(Debug, Clone)]
pub struct NewPriceAlert<'a> {
    pub asin: &'a str,
    pub seller_sku: Option<&'a str>,
    pub product_name: Option<&'a str>,
    pub old_price: Decimal,
    pub new_price: Decimal,
    pub price_change: Decimal,
    pub price_change_percent: Decimal,
    pub currency: &'a str,
    pub alert_type: AlertType,
    pub competitor_name: Option<&'a str>,
    pub priority: AlertPriority,
    pub threshold_triggered: Decimal,
}

/// Feed counters, all computed over the whole table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct AlertCountsRow {
    pub total: i64,
    pub unread: i64,
    pub high_priority: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AlertGroupCountRow {
    pub alert_type: String,
    pub priority: String,
    pub count: i64,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_price_alert(
    pool: &PgPool,
    alert: &NewPriceAlert<'_>,
) -> Result<PriceAlertRow, DbError> {
    let row = sqlx::query_as::<_, PriceAlertRow>(&format!(
        "INSERT INTO price_alerts \
             (asin, seller_sku, product_name, old_price, new_price, price_change, \
              price_change_percent, currency, alert_type, competitor_name, priority, \
              threshold_triggered) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         RETURNING {ALERT_COLUMNS}"
    ))
    .bind(alert.asin)
    .bind(alert.seller_sku)
    .bind(alert.product_name)
    .bind(alert.old_price)
    .bind(alert.new_price)
    .bind(alert.price_change)
    .bind(alert.price_change_percent)
    .bind(alert.currency)
    .bind(alert.alert_type.as_str())
    .bind(alert.competitor_name)
    .bind(alert.priority.as_str())
    .bind(alert.threshold_triggered)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks one alert read. Returns `false` when no alert has that id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_alert_read(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("UPDATE price_alerts SET is_read = TRUE WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Marks every unread alert read. Returns how many changed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_all_alerts_read(pool: &PgPool) -> Result<u64, DbError> {
    let result = sqlx::query("UPDATE price_alerts SET is_read = TRUE WHERE NOT is_read")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Hard-deletes one alert. Returns how many rows were removed (0 or 1).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_price_alert(pool: &PgPool, id: i64) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM price_alerts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Hard-deletes every alert whose id is in `ids`. Unknown ids are ignored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_price_alerts(pool: &PgPool, ids: &[i64]) -> Result<u64, DbError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query("DELETE FROM price_alerts WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Deletes alerts that are read and were created before `cutoff`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_read_alerts_older_than(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM price_alerts WHERE is_read AND created_at < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Fetches a single alert by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_price_alert(pool: &PgPool, id: i64) -> Result<PriceAlertRow, DbError> {
    sqlx::query_as::<_, PriceAlertRow>(&format!(
        "SELECT {ALERT_COLUMNS} FROM price_alerts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Lists alerts newest first, narrowed by `filter`.
///
/// `high_priority` matches `high` and `critical`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_price_alerts(
    pool: &PgPool,
    filter: AlertFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<PriceAlertRow>, DbError> {
    let predicate = match filter {
        AlertFilter::All => "TRUE",
        AlertFilter::Unread => "NOT is_read",
        AlertFilter::HighPriority => "priority IN ('high', 'critical')",
    };

    let rows = sqlx::query_as::<_, PriceAlertRow>(&format!(
        "SELECT {ALERT_COLUMNS} \
         FROM price_alerts \
         WHERE {predicate} \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_price_alerts(pool: &PgPool) -> Result<AlertCountsRow, DbError> {
    let row = sqlx::query_as::<_, AlertCountsRow>(
        "SELECT COUNT(*) AS total, \
                COUNT(*) FILTER (WHERE NOT is_read) AS unread, \
                COUNT(*) FILTER (WHERE priority IN ('high', 'critical')) AS high_priority \
         FROM price_alerts",
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_alerts_since(pool: &PgPool, since: DateTime<Utc>) -> Result<i64, DbError> {
    let count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM price_alerts WHERE created_at >= $1")
            .bind(since)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

/// Alert counts created at or after `since`, grouped by type and priority.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_alerts_grouped_since(
    pool: &PgPool,
    since: DateTime<Utc>,
) -> Result<Vec<AlertGroupCountRow>, DbError> {
    let rows = sqlx::query_as::<_, AlertGroupCountRow>(
        "SELECT alert_type, priority, COUNT(*) AS count \
         FROM price_alerts \
         WHERE created_at >= $1 \
         GROUP BY alert_type, priority \
         ORDER BY alert_type, priority",
    )
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
