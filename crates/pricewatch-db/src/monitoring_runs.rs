//! Database operations for the `monitoring_runs` ledger.
//!
//! A run moves `queued -> running -> succeeded | failed`. Transition functions
//! reject rows that are not in the expected prior status.

use chrono::{DateTime, Utc};
use pricewatch_core::{RunType, TriggerSource};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const RUN_COLUMNS: &str = "id, public_id, run_type, trigger_source, status, started_at, \
     completed_at, records_processed, alerts_created, error_message, created_at";

/// A row from the `monitoring_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MonitoringRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub run_type: String,
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub records_processed: i32,
    pub alerts_created: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Creates a new run in `queued` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_monitoring_run(
    pool: &PgPool,
    run_type: RunType,
    trigger_source: TriggerSource,
) -> Result<MonitoringRunRow, DbError> {
    let row = sqlx::query_as::<_, MonitoringRunRow>(&format!(
        "INSERT INTO monitoring_runs (public_id, run_type, trigger_source, status) \
         VALUES ($1, $2, $3, 'queued') \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(run_type.as_str())
    .bind(trigger_source.as_str())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `queued`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn start_monitoring_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE monitoring_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Marks a run as `succeeded` and records its counters.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_monitoring_run(
    pool: &PgPool,
    id: i64,
    records_processed: i32,
    alerts_created: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE monitoring_runs \
         SET status = 'succeeded', completed_at = NOW(), \
             records_processed = $1, alerts_created = $2 \
         WHERE id = $3 AND status = 'running'",
    )
    .bind(records_processed)
    .bind(alerts_created)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a run as `failed` with an error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_monitoring_run(
    pool: &PgPool,
    id: i64,
    error_message: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE monitoring_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_monitoring_run(pool: &PgPool, id: i64) -> Result<MonitoringRunRow, DbError> {
    sqlx::query_as::<_, MonitoringRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM monitoring_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_monitoring_runs(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<MonitoringRunRow>, DbError> {
    let rows = sqlx::query_as::<_, MonitoringRunRow>(&format!(
        "SELECT {RUN_COLUMNS} \
         FROM monitoring_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Completion time of the latest succeeded run of `run_type`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn last_completed_run_at(
    pool: &PgPool,
    run_type: RunType,
) -> Result<Option<DateTime<Utc>>, DbError> {
    let at = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
        "SELECT MAX(completed_at) FROM monitoring_runs \
         WHERE run_type = $1 AND status = 'succeeded'",
    )
    .bind(run_type.as_str())
    .fetch_one(pool)
    .await?;

    Ok(at)
}
