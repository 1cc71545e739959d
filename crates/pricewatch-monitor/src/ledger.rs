//! Run-ledger bookkeeping around engine operations.
//!
//! Ledger writes never decide the outcome of the job they describe: a failure
//! to record a run is logged and the job proceeds.

use pricewatch_core::{RunType, TriggerSource};
use pricewatch_db::{
    complete_monitoring_run, create_monitoring_run, fail_monitoring_run, start_monitoring_run,
};
use sqlx::PgPool;

/// Creates and starts a run. Returns `None` if the ledger is unavailable.
pub(crate) async fn begin(pool: &PgPool, run_type: RunType, trigger: TriggerSource) -> Option<i64> {
    let run = match create_monitoring_run(pool, run_type, trigger).await {
        Ok(run) => run,
        Err(e) => {
            tracing::warn!(run_type = run_type.as_str(), error = %e, "ledger: failed to create run");
            return None;
        }
    };

    if let Err(e) = start_monitoring_run(pool, run.id).await {
        tracing::warn!(run_id = run.id, error = %e, "ledger: failed to start run");
        return None;
    }

    Some(run.id)
}

pub(crate) async fn succeed(
    pool: &PgPool,
    run_id: Option<i64>,
    records_processed: usize,
    alerts_created: usize,
) {
    let Some(id) = run_id else { return };
    let processed = i32::try_from(records_processed).unwrap_or(i32::MAX);
    let alerts = i32::try_from(alerts_created).unwrap_or(i32::MAX);
    if let Err(e) = complete_monitoring_run(pool, id, processed, alerts).await {
        tracing::warn!(run_id = id, error = %e, "ledger: failed to complete run");
    }
}

pub(crate) async fn fail(pool: &PgPool, run_id: Option<i64>, message: &str) {
    let Some(id) = run_id else { return };
    if let Err(e) = fail_monitoring_run(pool, id, message).await {
        tracing::warn!(run_id = id, error = %e, "ledger: failed to mark run failed");
    }
}
