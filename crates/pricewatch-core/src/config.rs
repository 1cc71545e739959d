use std::str::FromStr;

use rust_decimal::Decimal;

use crate::alerts::AlertThresholds;
use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the real environment so the
/// rules can be tested with a plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        parse_value::<SocketAddr>(var, &or_default(var, default))
    };

    let parse_u32 =
        |var: &str, default: &str| parse_value::<u32>(var, &or_default(var, default));
    let parse_u64 =
        |var: &str, default: &str| parse_value::<u64>(var, &or_default(var, default));
    let parse_usize =
        |var: &str, default: &str| parse_value::<usize>(var, &or_default(var, default));
    let parse_bool =
        |var: &str, default: &str| parse_value::<bool>(var, &or_default(var, default));
    let parse_percent =
        |var: &str, default: &str| parse_value::<Decimal>(var, &or_default(var, default));

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("PRICEWATCH_ENV", "development"))?;
    let bind_addr = parse("PRICEWATCH_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("PRICEWATCH_LOG_LEVEL", "info");
    let cron_secret = optional("CRON_SECRET");
    let api_keys = or_default("PRICEWATCH_API_KEYS", "")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect();

    let db_max_connections = parse_u32("PRICEWATCH_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PRICEWATCH_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PRICEWATCH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let alert_thresholds = AlertThresholds {
        significant_change_percent: parse_percent("PRICEWATCH_SIGNIFICANT_CHANGE_PERCENT", "25")?,
        critical_percent: parse_percent("PRICEWATCH_PRIORITY_CRITICAL_PERCENT", "30")?,
        high_percent: parse_percent("PRICEWATCH_PRIORITY_HIGH_PERCENT", "15")?,
        medium_percent: parse_percent("PRICEWATCH_PRIORITY_MEDIUM_PERCENT", "5")?,
    };
    alert_thresholds
        .validate()
        .map_err(|reason| ConfigError::InvalidEnvVar {
            var: "PRICEWATCH_PRIORITY_*_PERCENT".to_string(),
            reason,
        })?;

    let snapshot_retention_days = parse_u32("PRICEWATCH_SNAPSHOT_RETENTION_DAYS", "365")?;
    let alert_retention_days = parse_u32("PRICEWATCH_ALERT_RETENTION_DAYS", "60")?;

    let cleanup_hour = parse_u32("PRICEWATCH_CLEANUP_HOUR", "2")?;
    if cleanup_hour > 23 {
        return Err(ConfigError::InvalidEnvVar {
            var: "PRICEWATCH_CLEANUP_HOUR".to_string(),
            reason: format!("hour must be 0-23, got {cleanup_hour}"),
        });
    }

    let init_batch_delay_ms = parse_u64("PRICEWATCH_INIT_BATCH_DELAY_MS", "1000")?;
    let monitor_max_concurrency = parse_usize("PRICEWATCH_MONITOR_MAX_CONCURRENCY", "1")?;

    let scheduler_enabled = parse_bool("PRICEWATCH_SCHEDULER_ENABLED", "true")?;
    let monitor_cron = or_default("PRICEWATCH_MONITOR_CRON", "0 0 * * * *");
    let cleanup_cron = or_default("PRICEWATCH_CLEANUP_CRON", "0 0 2 * * *");

    let pricing_service_url = optional("PRICEWATCH_PRICING_SERVICE_URL");
    let feed_request_timeout_secs = parse_u64("PRICEWATCH_FEED_TIMEOUT_SECS", "30")?;
    let feed_max_retries = parse_u32("PRICEWATCH_FEED_MAX_RETRIES", "3")?;
    let feed_retry_backoff_base_secs = parse_u64("PRICEWATCH_FEED_BACKOFF_BASE_SECS", "5")?;
    let user_agent = or_default("PRICEWATCH_USER_AGENT", "pricewatch/0.1 (price-monitoring)");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        cron_secret,
        api_keys,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        alert_thresholds,
        snapshot_retention_days,
        alert_retention_days,
        cleanup_hour,
        init_batch_delay_ms,
        monitor_max_concurrency,
        scheduler_enabled,
        monitor_cron,
        cleanup_cron,
        pricing_service_url,
        feed_request_timeout_secs,
        feed_max_retries,
        feed_retry_backoff_base_secs,
        user_agent,
    })
}

fn parse_value<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PRICEWATCH_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
