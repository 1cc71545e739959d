//! The hourly cron entrypoint.

use axum::{extract::State, http::HeaderMap, Extension, Json};
use chrono::{DateTime, Local, Timelike, Utc};
use pricewatch_core::{MonitoringConfig, TriggerSource};
use pricewatch_monitor::{CleanupSummary, MonitorSummary};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::middleware::{bearer_matches_secret, RequestId};

use super::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub(super) struct CronResponse {
    success: bool,
    monitoring: MonitorSummary,
    /// `null` unless this call ran in the cleanup hour.
    cleanup: Option<CleanupSummary>,
    timestamp: DateTime<Utc>,
}

pub(super) fn cleanup_due(local_hour: u32, cleanup_hour: u32) -> bool {
    local_hour == cleanup_hour
}

/// Runs a zero-threshold monitoring pass, plus retention cleanup when the
/// server's local hour is the configured cleanup hour.
pub(super) async fn monitor_prices(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<CronResponse>, ApiError> {
    if !bearer_matches_secret(&headers, state.cron.secret.as_deref()) {
        return Err(ApiError::new(req_id.0, "unauthorized", "Unauthorized"));
    }

    tracing::info!("cron: starting scheduled price monitoring");
    let config = MonitoringConfig::with_threshold(Decimal::ZERO);
    let monitoring = state
        .engine
        .monitor_prices_and_create_alerts(&config, TriggerSource::Cron)
        .await;

    if !monitoring.success {
        let message = monitoring
            .error
            .clone()
            .unwrap_or_else(|| "monitoring pass failed".to_string());
        return Err(ApiError::new(req_id.0, "internal_error", message));
    }

    let cleanup = if cleanup_due(Local::now().hour(), state.cron.cleanup_hour) {
        Some(
            state
                .engine
                .cleanup_old_monitoring_data(TriggerSource::Cron)
                .await,
        )
    } else {
        None
    };

    Ok(Json(CronResponse {
        success: true,
        monitoring,
        cleanup,
        timestamp: Utc::now(),
    }))
}
