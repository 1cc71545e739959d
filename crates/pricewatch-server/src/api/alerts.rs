//! Alert feed handlers polled by the notification UI.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use pricewatch_core::AlertFilter;
use pricewatch_monitor::{
    alert_breakdown, dismiss_alert, dismiss_multiple_alerts, get_price_alerts, mark_alert_as_read,
    mark_all_alerts_as_read, AlertBreakdown, AlertFeed,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_monitor_error, normalize_limit, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct AlertListQuery {
    pub filter: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DismissRequest {
    pub ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StatisticsQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(super) struct MutationResponse {
    success: bool,
    /// Rows affected, for bulk mutations.
    #[serde(skip_serializing_if = "Option::is_none")]
    affected: Option<u64>,
}

#[derive(Debug, Serialize)]
pub(super) struct AlertStatisticsResponse {
    success: bool,
    statistics: AlertBreakdown,
}

impl MutationResponse {
    fn ok() -> Self {
        Self {
            success: true,
            affected: None,
        }
    }

    fn affected(n: u64) -> Self {
        Self {
            success: true,
            affected: Some(n),
        }
    }
}

pub(super) async fn list_alerts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<AlertListQuery>,
) -> Result<Json<AlertFeed>, ApiError> {
    let filter = match query.filter.as_deref() {
        None | Some("") => AlertFilter::default(),
        Some(raw) => raw
            .parse::<AlertFilter>()
            .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?,
    };

    let feed = get_price_alerts(
        &state.pool,
        filter,
        normalize_limit(query.limit),
        query.offset.unwrap_or(0).max(0),
    )
    .await
    .map_err(|e| map_monitor_error(req_id.0.clone(), &e))?;
    Ok(Json(feed))
}

pub(super) async fn mark_read(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<MutationResponse>, ApiError> {
    mark_alert_as_read(&state.pool, id)
        .await
        .map_err(|e| map_monitor_error(req_id.0.clone(), &e))?;
    Ok(Json(MutationResponse::ok()))
}

pub(super) async fn mark_all_read(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<MutationResponse>, ApiError> {
    let n = mark_all_alerts_as_read(&state.pool)
        .await
        .map_err(|e| map_monitor_error(req_id.0.clone(), &e))?;
    Ok(Json(MutationResponse::affected(n)))
}

pub(super) async fn dismiss_one(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<MutationResponse>, ApiError> {
    dismiss_alert(&state.pool, id)
        .await
        .map_err(|e| map_monitor_error(req_id.0.clone(), &e))?;
    Ok(Json(MutationResponse::ok()))
}

pub(super) async fn dismiss_many(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<DismissRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let n = dismiss_multiple_alerts(&state.pool, &body.ids)
        .await
        .map_err(|e| map_monitor_error(req_id.0.clone(), &e))?;
    Ok(Json(MutationResponse::affected(n)))
}

pub(super) async fn alert_statistics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<StatisticsQuery>,
) -> Result<Json<AlertStatisticsResponse>, ApiError> {
    let days = query.days.unwrap_or(30).clamp(1, 3650);
    let statistics = alert_breakdown(&state.pool, days)
        .await
        .map_err(|e| map_monitor_error(req_id.0.clone(), &e))?;
    Ok(Json(AlertStatisticsResponse {
        success: true,
        statistics,
    }))
}
