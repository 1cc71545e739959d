mod alerts;
mod cron;
mod monitoring;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use pricewatch_monitor::{ListingPriceSource, MonitorEngine, MonitorError};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState,
};

/// The engine as wired in the server: prices come from the listing tables.
pub type Engine = MonitorEngine<ListingPriceSource>;

/// Settings for the cron entrypoint.
#[derive(Debug, Clone, Default)]
pub struct CronSettings {
    /// Bearer secret. `None` rejects every cron request.
    pub secret: Option<String>,
    /// Local wall-clock hour at which a cron call also runs cleanup.
    pub cleanup_hour: u32,
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub engine: Arc<Engine>,
    pub cron: Arc<CronSettings>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    success: bool,
    error: String,
    code: String,
    timestamp: DateTime<Utc>,
    request_id: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    success: bool,
    status: &'static str,
    database: &'static str,
    timestamp: DateTime<Utc>,
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            error: message.into(),
            code: code.into(),
            timestamp: Utc::now(),
            request_id: request_id.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_monitor_error(request_id: String, error: &MonitorError) -> ApiError {
    tracing::error!(error = %error, "monitoring query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/monitoring/init-from-db",
            post(monitoring::init_from_db),
        )
        .route("/api/monitoring/initialize", post(monitoring::initialize))
        .route("/api/monitoring/manual-run", post(monitoring::manual_run))
        .route("/api/monitoring/statistics", get(monitoring::statistics))
        .route(
            "/api/monitoring/history/{asin}",
            get(monitoring::price_history),
        )
        .route("/api/alerts", get(alerts::list_alerts))
        .route("/api/alerts/statistics", get(alerts::alert_statistics))
        .route("/api/alerts/read-all", post(alerts::mark_all_read))
        .route("/api/alerts/dismiss", post(alerts::dismiss_many))
        .route(
            "/api/alerts/{id}",
            axum::routing::delete(alerts::dismiss_one),
        )
        .route("/api/alerts/{id}/read", post(alerts::mark_read))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    // The cron route authenticates with CRON_SECRET instead of API keys.
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/cron/monitor-prices", get(cron::monitor_prices));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match pricewatch_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthData {
                success: true,
                status: "ok",
                database: "ok",
                timestamp: Utc::now(),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthData {
                    success: false,
                    status: "degraded",
                    database: "unavailable",
                    timestamp: Utc::now(),
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use pricewatch_monitor::{EngineSettings, ListingPriceSource, MonitorEngine};
    use tower::ServiceExt;

    use super::{build_app, default_rate_limit_state, AppState, CronSettings};
    use crate::middleware::AuthState;

    pub(crate) const CRON_SECRET: &str = "test-cron-secret";

    pub(crate) fn app_with(pool: sqlx::PgPool, auth: AuthState, cleanup_hour: u32) -> Router {
        let settings = EngineSettings {
            init_batch_delay: std::time::Duration::ZERO,
            ..EngineSettings::default()
        };
        let engine = MonitorEngine::new(
            pool.clone(),
            ListingPriceSource::new(pool.clone()),
            settings,
        );
        let state = AppState {
            pool,
            engine: Arc::new(engine),
            cron: Arc::new(CronSettings {
                secret: Some(CRON_SECRET.to_string()),
                cleanup_hour,
            }),
        };
        build_app(state, auth, default_rate_limit_state())
    }

    pub(crate) fn app(pool: sqlx::PgPool) -> Router {
        // Hour 25 never matches, so cron calls never clean up.
        app_with(pool, AuthState::disabled(), 25)
    }

    pub(crate) async fn send(
        app: Router,
        request: Request<Body>,
    ) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).expect("json parse")
        };
        (status, json)
    }

    pub(crate) fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    pub(crate) fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    pub(crate) async fn seed_own_listing(pool: &sqlx::PgPool, asin: &str, price: &str) {
        let main_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO amzn_competitive_pricing_main (asin, seller_sku) VALUES ($1, $2) RETURNING id",
        )
        .bind(asin)
        .bind(format!("SKU-{asin}"))
        .fetch_one(pool)
        .await
        .expect("insert own listing");

        sqlx::query(
            "INSERT INTO amzn_competitive_prices (pricing_main_id, price_amount, price_currency) \
             VALUES ($1, $2::NUMERIC, 'USD')",
        )
        .bind(main_id)
        .bind(price)
        .execute(pool)
        .await
        .expect("insert own price");
    }
}
