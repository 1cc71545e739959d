//! Monitoring control and reporting handlers.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Extension, Json,
};
use pricewatch_core::{extract_or_validate_asin, MonitoringConfig, TriggerSource};
use pricewatch_monitor::{
    monitoring_statistics, InitFromDbOptions, InitFromDbSummary, InitializationSummary,
    MonitorSummary, MonitoringStatistics, PriceHistoryPoint,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_monitor_error, normalize_limit, ApiError, AppState};

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct InitializeResponse {
    #[serde(flatten)]
    summary: InitializationSummary,
    /// Inputs that were neither an ASIN nor an Amazon product URL.
    invalid_asins: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct StatisticsResponse {
    success: bool,
    statistics: MonitoringStatistics,
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    pub days: Option<u32>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct HistoryResponse {
    success: bool,
    asin: String,
    history: Vec<PriceHistoryPoint>,
}

const ASINS_REQUIRED: &str = "ASINs array is required";

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Discovers every ASIN in the listing tables, initializes new ones in
/// batches, then runs one monitoring pass. An empty body uses defaults.
pub(super) async fn init_from_db(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Bytes,
) -> Result<Json<InitFromDbSummary>, ApiError> {
    let options = if body.iter().all(u8::is_ascii_whitespace) {
        InitFromDbOptions::default()
    } else {
        serde_json::from_slice::<InitFromDbOptions>(&body).map_err(|e| {
            ApiError::new(
                req_id.0.clone(),
                "validation_error",
                format!("invalid request body: {e}"),
            )
        })?
    };

    tracing::info!(
        batch_size = options.batch_size,
        max_asins = options.max_asins,
        "api: init-from-db requested"
    );
    let summary = state.engine.init_from_db(options, TriggerSource::Api).await;
    Ok(Json(summary))
}

/// Seeds baselines for the ASINs in `{asins: [...]}`. Entries may be bare
/// ASINs or Amazon product URLs.
pub(super) async fn initialize(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Bytes,
) -> Result<Json<InitializeResponse>, ApiError> {
    let value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|_| ApiError::new(req_id.0.clone(), "bad_request", ASINS_REQUIRED))?;
    let Some(entries) = value.get("asins").and_then(serde_json::Value::as_array) else {
        return Err(ApiError::new(req_id.0, "bad_request", ASINS_REQUIRED));
    };

    let mut asins = Vec::with_capacity(entries.len());
    let mut invalid_asins = Vec::new();
    for entry in entries {
        let raw = entry.as_str().unwrap_or_default();
        match extract_or_validate_asin(raw) {
            Ok(asin) if !asins.contains(&asin) => asins.push(asin),
            Ok(_) => {}
            Err(_) => invalid_asins.push(entry.as_str().map_or_else(|| entry.to_string(), str::to_string)),
        }
    }

    let mut summary = state
        .engine
        .initialize_products(&asins, TriggerSource::Api)
        .await;
    summary.failed += invalid_asins.len();

    Ok(Json(InitializeResponse {
        summary,
        invalid_asins,
    }))
}

/// Runs one monitoring pass at a zero threshold.
pub(super) async fn manual_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<MonitorSummary>, ApiError> {
    let config = MonitoringConfig::default();
    let summary = state
        .engine
        .monitor_prices_and_create_alerts(&config, TriggerSource::Api)
        .await;
    if !summary.success {
        let message = summary
            .error
            .unwrap_or_else(|| "monitoring pass failed".to_string());
        return Err(ApiError::new(req_id.0, "internal_error", message));
    }
    Ok(Json(summary))
}

pub(super) async fn statistics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<StatisticsResponse>, ApiError> {
    let statistics = monitoring_statistics(&state.pool)
        .await
        .map_err(|e| map_monitor_error(req_id.0.clone(), &e))?;
    Ok(Json(StatisticsResponse {
        success: true,
        statistics,
    }))
}

pub(super) async fn price_history(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(raw_asin): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let asin = extract_or_validate_asin(&raw_asin)
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;
    let days = query.days.unwrap_or(30).clamp(1, 3650);

    let history = pricewatch_monitor::price_history(
        &state.pool,
        &asin,
        days,
        normalize_limit(query.limit.or(Some(100))),
    )
    .await
    .map_err(|e| map_monitor_error(req_id.0.clone(), &e))?;

    Ok(Json(HistoryResponse {
        success: true,
        asin,
        history,
    }))
}
