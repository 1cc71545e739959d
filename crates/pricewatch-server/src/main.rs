mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use pricewatch_monitor::{EngineSettings, ListingPriceSource, MonitorEngine};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState, CronSettings},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(pricewatch_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting pricewatch-server");

    let pool_config = pricewatch_db::PoolConfig::from_app_config(&config);
    let pool = pricewatch_db::connect_pool(&config.database_url, pool_config).await?;
    pricewatch_db::run_migrations(&pool).await?;

    let feed = pricewatch_feed::PricingServiceClient::from_app_config(&config)?;
    if feed.is_none() {
        tracing::info!("PRICING_SERVICE_URL not set; monitoring reads listing prices as stored");
    }
    let engine = Arc::new(
        MonitorEngine::new(
            pool.clone(),
            ListingPriceSource::new(pool.clone()),
            EngineSettings::from_app_config(&config),
        )
        .with_feed(feed),
    );

    let _scheduler = scheduler::build_scheduler(Arc::clone(&engine), Arc::clone(&config)).await?;

    if config.cron_secret.is_none() {
        tracing::warn!("CRON_SECRET not set; /api/cron/monitor-prices will reject every request");
    }
    let auth = AuthState::from_config(&config)?;
    let state = AppState {
        pool,
        engine,
        cron: Arc::new(CronSettings {
            secret: config.cron_secret.clone(),
            cleanup_hour: config.cleanup_hour,
        }),
    };
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
