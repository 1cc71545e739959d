use std::time::Duration;

use pricewatch_core::{AlertThresholds, AppConfig};
use pricewatch_feed::PricingServiceClient;
use sqlx::PgPool;

use crate::source::PriceSource;

/// Tunables shared by every engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub thresholds: AlertThresholds,
    /// ASINs diffed concurrently within one pass. Values below 1 act as 1.
    pub max_concurrency: usize,
    pub init_batch_delay: Duration,
    pub snapshot_retention_days: u32,
    pub alert_retention_days: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            thresholds: AlertThresholds::default(),
            max_concurrency: 1,
            init_batch_delay: Duration::from_secs(1),
            snapshot_retention_days: 365,
            alert_retention_days: 60,
        }
    }
}

impl EngineSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            thresholds: config.alert_thresholds,
            max_concurrency: config.monitor_max_concurrency,
            init_batch_delay: Duration::from_millis(config.init_batch_delay_ms),
            snapshot_retention_days: config.snapshot_retention_days,
            alert_retention_days: config.alert_retention_days,
        }
    }
}

/// The monitoring engine. Owns the process-wide pool handle, the price
/// source, and the optional upstream refresh client; every operation borrows
/// them from here.
pub struct MonitorEngine<S> {
    pub(crate) pool: PgPool,
    pub(crate) source: S,
    pub(crate) feed: Option<PricingServiceClient>,
    pub(crate) settings: EngineSettings,
}

impl<S: PriceSource> MonitorEngine<S> {
    #[must_use]
    pub fn new(pool: PgPool, source: S, settings: EngineSettings) -> Self {
        Self {
            pool,
            source,
            feed: None,
            settings,
        }
    }

    /// Refresh listing prices through the pricing service before each pass.
    #[must_use]
    pub fn with_feed(mut self, feed: Option<PricingServiceClient>) -> Self {
        self.feed = feed;
        self
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}
