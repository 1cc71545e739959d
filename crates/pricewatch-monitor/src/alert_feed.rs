//! The alert feed polled by the notification UI, and its mutations.
//!
//! Every mutation is retry-safe: marking an already-read alert, or dismissing
//! an alert that no longer exists, succeeds without error.

use chrono::{DateTime, Utc};
use pricewatch_core::{AlertFilter, AlertPriority, AlertType, ParseEnumError};
use pricewatch_db::{
    count_price_alerts, delete_price_alert, delete_price_alerts, list_price_alerts,
    mark_alert_read, mark_all_alerts_read, PriceAlertRow,
};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use crate::error::MonitorError;

/// Default page size for the feed.
pub const DEFAULT_ALERT_LIMIT: i64 = 50;

/// An alert as presented to feed clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceAlert {
    pub id: i64,
    pub asin: String,
    pub seller_sku: Option<String>,
    pub product_name: Option<String>,
    pub old_price: Decimal,
    pub new_price: Decimal,
    pub price_change: Decimal,
    pub price_change_percent: Decimal,
    pub currency: String,
    pub alert_type: AlertType,
    pub competitor_name: Option<String>,
    pub priority: AlertPriority,
    pub threshold_triggered: Decimal,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PriceAlertRow> for PriceAlert {
    type Error = MonitorError;

    fn try_from(row: PriceAlertRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = move |e: ParseEnumError| MonitorError::CorruptRow {
            table: "price_alerts",
            id,
            reason: e.to_string(),
        };
        let alert_type = row.alert_type.parse::<AlertType>().map_err(corrupt)?;
        let priority = row.priority.parse::<AlertPriority>().map_err(corrupt)?;
        Ok(Self {
            id: row.id,
            asin: row.asin,
            seller_sku: row.seller_sku,
            product_name: row.product_name,
            old_price: row.old_price,
            new_price: row.new_price,
            price_change: row.price_change,
            price_change_percent: row.price_change_percent,
            currency: row.currency,
            alert_type,
            competitor_name: row.competitor_name,
            priority,
            threshold_triggered: row.threshold_triggered,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertCounts {
    pub total: i64,
    pub unread: i64,
    pub high_priority: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertFeed {
    pub success: bool,
    pub alerts: Vec<PriceAlert>,
    pub counts: AlertCounts,
}

/// One page of alerts matching `filter`, newest first, plus store-wide counts.
///
/// # Errors
///
/// Returns [`MonitorError::Db`] on query failure, or
/// [`MonitorError::CorruptRow`] if a stored alert has an unknown type or
/// priority.
pub async fn get_price_alerts(
    pool: &PgPool,
    filter: AlertFilter,
    limit: i64,
    offset: i64,
) -> Result<AlertFeed, MonitorError> {
    let rows = list_price_alerts(pool, filter, limit.max(1), offset.max(0)).await?;
    let alerts = rows
        .into_iter()
        .map(PriceAlert::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let counts = count_price_alerts(pool).await?;

    Ok(AlertFeed {
        success: true,
        alerts,
        counts: AlertCounts {
            total: counts.total,
            unread: counts.unread,
            high_priority: counts.high_priority,
        },
    })
}

/// # Errors
///
/// Returns [`MonitorError::Db`] if the update fails.
pub async fn mark_alert_as_read(pool: &PgPool, id: i64) -> Result<(), MonitorError> {
    if !mark_alert_read(pool, id).await? {
        tracing::debug!(alert_id = id, "alerts: mark-read on unknown alert");
    }
    Ok(())
}

/// Returns the number of alerts that changed state.
///
/// # Errors
///
/// Returns [`MonitorError::Db`] if the update fails.
pub async fn mark_all_alerts_as_read(pool: &PgPool) -> Result<u64, MonitorError> {
    Ok(mark_all_alerts_read(pool).await?)
}

/// Permanently deletes one alert.
///
/// # Errors
///
/// Returns [`MonitorError::Db`] if the delete fails.
pub async fn dismiss_alert(pool: &PgPool, id: i64) -> Result<(), MonitorError> {
    delete_price_alert(pool, id).await?;
    Ok(())
}

/// Permanently deletes every alert in `ids`. Returns the number deleted.
///
/// # Errors
///
/// Returns [`MonitorError::Db`] if the delete fails.
pub async fn dismiss_multiple_alerts(pool: &PgPool, ids: &[i64]) -> Result<u64, MonitorError> {
    Ok(delete_price_alerts(pool, ids).await?)
}
