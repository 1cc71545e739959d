//! Read-only aggregates over the snapshot store, alert store, and run ledger.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use pricewatch_core::{RunType, SnapshotSource};
use pricewatch_db::{
    count_alerts_grouped_since, count_alerts_since, count_monitored_asins, count_price_alerts,
    count_snapshots, last_completed_run_at, latest_snapshot_at, list_snapshot_history,
    PriceSnapshotRow,
};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use crate::error::MonitorError;

/// Window used for `recentAlerts`.
const RECENT_ALERT_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringStatistics {
    pub total_historical_records: i64,
    pub total_alerts: i64,
    /// Alerts created in the last 24 hours.
    pub recent_alerts: i64,
    /// Price alerts. Every alert is a price alert; kept separate for clients
    /// that render it on its own.
    pub price_alerts: i64,
    pub unread_alerts: i64,
    pub monitored_products_count: i64,
    pub last_monitoring_run: Option<DateTime<Utc>>,
}

/// Alert counts by type and by priority over a trailing window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertBreakdown {
    pub days: u32,
    pub total: i64,
    pub by_type: BTreeMap<String, i64>,
    pub by_priority: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistoryPoint {
    pub source: String,
    /// Competitor label for competitor series, `None` for the own listing.
    pub competitor_name: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub price_type: String,
    pub observed_at: DateTime<Utc>,
}

impl From<PriceSnapshotRow> for PriceHistoryPoint {
    fn from(row: PriceSnapshotRow) -> Self {
        let competitor_name = SnapshotSource::from_key(&row.source)
            .and_then(|s| s.competitor_name().map(str::to_string));
        Self {
            source: row.source,
            competitor_name,
            price: row.price,
            currency: row.currency,
            price_type: row.price_type,
            observed_at: row.observed_at,
        }
    }
}

/// Headline numbers for the monitoring dashboard.
///
/// `lastMonitoringRun` is the completion time of the latest succeeded
/// monitoring run, or the newest snapshot time when the ledger has none.
///
/// # Errors
///
/// Returns [`MonitorError::Db`] if any aggregate query fails.
pub async fn monitoring_statistics(pool: &PgPool) -> Result<MonitoringStatistics, MonitorError> {
    let total_historical_records = count_snapshots(pool).await?;
    let counts = count_price_alerts(pool).await?;
    let recent_alerts =
        count_alerts_since(pool, Utc::now() - Duration::hours(RECENT_ALERT_HOURS)).await?;
    let monitored_products_count = count_monitored_asins(pool).await?;

    let last_monitoring_run = match last_completed_run_at(pool, RunType::Monitor).await? {
        Some(at) => Some(at),
        None => latest_snapshot_at(pool).await?,
    };

    Ok(MonitoringStatistics {
        total_historical_records,
        total_alerts: counts.total,
        recent_alerts,
        price_alerts: counts.total,
        unread_alerts: counts.unread,
        monitored_products_count,
        last_monitoring_run,
    })
}

/// # Errors
///
/// Returns [`MonitorError::Db`] if the grouped count query fails.
pub async fn alert_breakdown(pool: &PgPool, days: u32) -> Result<AlertBreakdown, MonitorError> {
    let since = Utc::now() - Duration::days(i64::from(days));
    let groups = count_alerts_grouped_since(pool, since).await?;

    let mut breakdown = AlertBreakdown {
        days,
        ..AlertBreakdown::default()
    };
    for group in groups {
        breakdown.total += group.count;
        *breakdown.by_type.entry(group.alert_type).or_insert(0) += group.count;
        *breakdown.by_priority.entry(group.priority).or_insert(0) += group.count;
    }
    Ok(breakdown)
}

/// Snapshot history for one ASIN across all its series, newest first.
///
/// # Errors
///
/// Returns [`MonitorError::Db`] if the history query fails.
pub async fn price_history(
    pool: &PgPool,
    asin: &str,
    days: u32,
    limit: i64,
) -> Result<Vec<PriceHistoryPoint>, MonitorError> {
    let since = Utc::now() - Duration::days(i64::from(days));
    let rows = list_snapshot_history(pool, asin, since, limit.max(1)).await?;
    Ok(rows.into_iter().map(PriceHistoryPoint::from).collect())
}
