use std::net::SocketAddr;

use crate::alerts::AlertThresholds;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Bearer secret accepted by the cron trigger endpoint. `None` rejects
    /// every cron request.
    pub cron_secret: Option<String>,
    pub api_keys: Vec<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub alert_thresholds: AlertThresholds,
    pub snapshot_retention_days: u32,
    pub alert_retention_days: u32,
    pub cleanup_hour: u32,
    pub init_batch_delay_ms: u64,
    pub monitor_max_concurrency: usize,
    pub scheduler_enabled: bool,
    pub monitor_cron: String,
    pub cleanup_cron: String,
    pub pricing_service_url: Option<String>,
    pub feed_request_timeout_secs: u64,
    pub feed_max_retries: u32,
    pub feed_retry_backoff_base_secs: u64,
    pub user_agent: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("cron_secret", &self.cron_secret.as_ref().map(|_| "[redacted]"))
            .field("api_keys", &format_args!("[{} redacted]", self.api_keys.len()))
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("alert_thresholds", &self.alert_thresholds)
            .field("snapshot_retention_days", &self.snapshot_retention_days)
            .field("alert_retention_days", &self.alert_retention_days)
            .field("cleanup_hour", &self.cleanup_hour)
            .field("init_batch_delay_ms", &self.init_batch_delay_ms)
            .field("monitor_max_concurrency", &self.monitor_max_concurrency)
            .field("scheduler_enabled", &self.scheduler_enabled)
            .field("monitor_cron", &self.monitor_cron)
            .field("cleanup_cron", &self.cleanup_cron)
            .field("pricing_service_url", &self.pricing_service_url)
            .field("feed_request_timeout_secs", &self.feed_request_timeout_secs)
            .field("feed_max_retries", &self.feed_max_retries)
            .field(
                "feed_retry_backoff_base_secs",
                &self.feed_retry_backoff_base_secs,
            )
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl AppConfig {
    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self.env, Environment::Development)
    }
}
