//! Retention cleanup of old snapshots and read alerts.

use chrono::{Duration, Utc};
use pricewatch_core::{RunType, TriggerSource};
use pricewatch_db::{delete_read_alerts_older_than, delete_snapshots_older_than};
use serde::Serialize;

use crate::engine::MonitorEngine;
use crate::ledger;
use crate::source::PriceSource;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupSummary {
    pub success: bool,
    pub deleted_snapshots: u64,
    pub deleted_alerts: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<S: PriceSource> MonitorEngine<S> {
    /// Deletes snapshots older than the snapshot retention window, keeping the
    /// newest snapshot of every series, and read alerts older than the alert
    /// retention window.
    ///
    /// Time gating (the daily run hour) belongs to the caller.
    pub async fn cleanup_old_monitoring_data(&self, trigger: TriggerSource) -> CleanupSummary {
        let run_id = ledger::begin(&self.pool, RunType::Cleanup, trigger).await;
        let now = Utc::now();
        let snapshot_cutoff = now - Duration::days(i64::from(self.settings.snapshot_retention_days));
        let alert_cutoff = now - Duration::days(i64::from(self.settings.alert_retention_days));

        let deleted_snapshots = match delete_snapshots_older_than(&self.pool, snapshot_cutoff).await {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(error = %e, "cleanup: failed to delete old snapshots");
                let message = e.to_string();
                ledger::fail(&self.pool, run_id, &message).await;
                return CleanupSummary {
                    success: false,
                    error: Some(message),
                    ..CleanupSummary::default()
                };
            }
        };

        let deleted_alerts = match delete_read_alerts_older_than(&self.pool, alert_cutoff).await {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(error = %e, "cleanup: failed to delete old alerts");
                let message = e.to_string();
                ledger::fail(&self.pool, run_id, &message).await;
                return CleanupSummary {
                    success: false,
                    deleted_snapshots,
                    error: Some(message),
                    ..CleanupSummary::default()
                };
            }
        };

        tracing::info!(deleted_snapshots, deleted_alerts, "cleanup: complete");
        let total = usize::try_from(deleted_snapshots.saturating_add(deleted_alerts))
            .unwrap_or(usize::MAX);
        ledger::succeed(&self.pool, run_id, total, 0).await;

        CleanupSummary {
            success: true,
            deleted_snapshots,
            deleted_alerts,
            error: None,
        }
    }
}
