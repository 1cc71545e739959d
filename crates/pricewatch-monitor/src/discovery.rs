//! ASIN discovery: the set of ASINs to track, computed fresh on every run.

use std::collections::{BTreeSet, HashSet};

use pricewatch_core::MonitoringConfig;
use pricewatch_db::{list_initialized_asins, list_tracked_asins, TrackedAsinRow};
use sqlx::PgPool;

use crate::error::MonitorError;

/// Union of the ASINs in the own-listing, competitor, and catalog tables.
///
/// Read errors are logged and yield an empty set; callers treat an empty set
/// as "nothing to do".
pub async fn fetch_unique_asins(pool: &PgPool) -> BTreeSet<String> {
    match list_tracked_asins(pool).await {
        Ok(rows) => rows.into_iter().map(|row| row.asin).collect(),
        Err(e) => {
            tracing::error!(error = %e, "discovery: failed to read ASINs from listing tables");
            BTreeSet::new()
        }
    }
}

/// Tracked ASINs in scope for `config`, with their seller SKUs when known.
///
/// # Errors
///
/// Returns [`MonitorError::Db`] if the listing tables cannot be read.
pub async fn discover_tracked_asins(
    pool: &PgPool,
    config: &MonitoringConfig,
) -> Result<Vec<TrackedAsinRow>, MonitorError> {
    let rows = list_tracked_asins(pool).await?;
    Ok(rows
        .into_iter()
        .filter(|row| config.includes(&row.asin, &row.seller_skus))
        .collect())
}

/// Drops ASINs that already have snapshot history, preserving input order.
///
/// If the snapshot store cannot be read every ASIN is returned; baseline
/// inserts are idempotent so re-initializing is harmless.
pub async fn filter_new_asins(pool: &PgPool, asins: Vec<String>) -> Vec<String> {
    let existing: HashSet<String> = match list_initialized_asins(pool).await {
        Ok(rows) => rows.into_iter().collect(),
        Err(e) => {
            tracing::warn!(error = %e, "discovery: failed to read initialized ASINs, treating all as new");
            return asins;
        }
    };
    asins
        .into_iter()
        .filter(|asin| !existing.contains(asin))
        .collect()
}
