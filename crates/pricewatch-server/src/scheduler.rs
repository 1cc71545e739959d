//! Background job scheduler.
//!
//! Registers the in-process monitoring and retention jobs at server startup.
//! The jobs run unless `PRICEWATCH_SCHEDULER_ENABLED` is set to `false`; it
//! defaults to `true`. Deployments driven by an external cron hitting
//! `/api/cron/monitor-prices` set it to `false` to avoid duplicate passes.

use std::sync::Arc;

use pricewatch_core::{AppConfig, MonitoringConfig, TriggerSource};
use rust_decimal::Decimal;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::api::Engine;

/// Builds and starts the background job scheduler.
///
/// Returns `Ok(None)` when the scheduler is disabled. The returned handle
/// must be kept alive for the lifetime of the process; dropping it shuts
/// down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    engine: Arc<Engine>,
    config: Arc<AppConfig>,
) -> Result<Option<JobScheduler>, JobSchedulerError> {
    if !config.scheduler_enabled {
        tracing::info!("scheduler: disabled");
        return Ok(None);
    }

    let scheduler = JobScheduler::new().await?;

    register_monitor_job(&scheduler, Arc::clone(&engine), &config.monitor_cron).await?;
    register_cleanup_job(&scheduler, engine, &config.cleanup_cron).await?;

    scheduler.start().await?;
    tracing::info!(
        monitor_cron = %config.monitor_cron,
        cleanup_cron = %config.cleanup_cron,
        "scheduler: started"
    );
    Ok(Some(scheduler))
}

/// Register the recurring zero-threshold monitoring pass.
async fn register_monitor_job(
    scheduler: &JobScheduler,
    engine: Arc<Engine>,
    schedule: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let engine = Arc::clone(&engine);

        Box::pin(async move {
            tracing::info!("scheduler: starting monitoring pass");
            let config = MonitoringConfig::with_threshold(Decimal::ZERO);
            let summary = engine
                .monitor_prices_and_create_alerts(&config, TriggerSource::Scheduler)
                .await;
            if summary.success {
                tracing::info!(
                    processed = summary.processed,
                    failed = summary.failed,
                    alerts_created = summary.alerts_created,
                    "scheduler: monitoring pass complete"
                );
            } else {
                tracing::error!(
                    error = summary.error.as_deref().unwrap_or("unknown"),
                    "scheduler: monitoring pass failed"
                );
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Register the daily retention cleanup.
async fn register_cleanup_job(
    scheduler: &JobScheduler,
    engine: Arc<Engine>,
    schedule: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let engine = Arc::clone(&engine);

        Box::pin(async move {
            tracing::info!("scheduler: starting retention cleanup");
            let summary = engine
                .cleanup_old_monitoring_data(TriggerSource::Scheduler)
                .await;
            if summary.success {
                tracing::info!(
                    deleted_snapshots = summary.deleted_snapshots,
                    deleted_alerts = summary.deleted_alerts,
                    "scheduler: retention cleanup complete"
                );
            } else {
                tracing::error!(
                    error = summary.error.as_deref().unwrap_or("unknown"),
                    "scheduler: retention cleanup failed"
                );
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
