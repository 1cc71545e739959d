pub mod alerts;
pub mod app_config;
pub mod asin;
pub mod config;
pub mod monitoring;

pub use alerts::{
    AlertFilter, AlertPriority, AlertThresholds, AlertType, ParseEnumError, PriceChange,
};
pub use app_config::{AppConfig, Environment};
pub use asin::{extract_or_validate_asin, is_valid_asin, AsinError};
pub use config::{load_app_config, load_app_config_from_env};
pub use monitoring::{MonitoringConfig, RunType, SnapshotSource, TriggerSource};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
