//! Monitoring command handlers for the CLI.
//!
//! Each subcommand drives the same engine operation the HTTP surface exposes,
//! recorded on the run ledger with a `cli` trigger.

use clap::Subcommand;
use pricewatch_core::{extract_or_validate_asin, MonitoringConfig, TriggerSource};
use pricewatch_monitor::{monitoring_statistics, InitFromDbOptions, DEFAULT_BATCH_SIZE};
use rust_decimal::Decimal;

use crate::Engine;

/// Sub-commands available under `monitor`.
#[derive(Debug, Subcommand)]
pub enum MonitorCommands {
    /// Run one monitoring pass over every tracked ASIN
    Run {
        /// Minimum absolute percent change that raises an alert
        #[arg(long, default_value = "0")]
        threshold: Decimal,
        /// Restrict the pass to these ASINs (repeatable)
        #[arg(long = "asin")]
        asins: Vec<String>,
        /// Restrict the pass to these seller SKUs (repeatable)
        #[arg(long = "sku")]
        skus: Vec<String>,
    },
    /// Discover ASINs in the listing tables, seed baselines, then run a pass
    Init {
        /// ASINs initialized per batch
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Cap on uninitialized ASINs handled per call; 0 means no cap
        #[arg(long, default_value_t = 0)]
        max_asins: usize,
    },
    /// Seed baselines for specific ASINs or Amazon product URLs
    Initialize {
        #[arg(required = true)]
        asins: Vec<String>,
    },
    /// Delete snapshots and alerts past their retention window
    Cleanup,
    /// Print monitoring statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Dispatch a `monitor` subcommand.
///
/// # Errors
///
/// Returns an error if an operation reports failure or a statistics query
/// fails. Per-ASIN failures inside a pass are reported, not propagated.
pub(crate) async fn run(engine: &Engine, command: MonitorCommands) -> anyhow::Result<()> {
    match command {
        MonitorCommands::Run {
            threshold,
            asins,
            skus,
        } => run_monitor(engine, threshold, asins, skus).await,
        MonitorCommands::Init {
            batch_size,
            max_asins,
        } => run_init(engine, batch_size, max_asins).await,
        MonitorCommands::Initialize { asins } => run_initialize(engine, &asins).await,
        MonitorCommands::Cleanup => run_cleanup(engine).await,
        MonitorCommands::Stats { json } => run_stats(engine, json).await,
    }
}

async fn run_monitor(
    engine: &Engine,
    threshold: Decimal,
    asins: Vec<String>,
    skus: Vec<String>,
) -> anyhow::Result<()> {
    if threshold.is_sign_negative() {
        anyhow::bail!("--threshold must not be negative");
    }
    let config = MonitoringConfig {
        alert_threshold_percent: threshold,
        enabled_asins: asins,
        enabled_skus: skus,
    };

    let summary = engine
        .monitor_prices_and_create_alerts(&config, TriggerSource::Cli)
        .await;
    if !summary.success {
        anyhow::bail!(
            "monitoring pass failed: {}",
            summary.error.as_deref().unwrap_or("unknown error")
        );
    }

    println!(
        "processed {} ASINs, {} without a current price, {} alerts created",
        summary.processed, summary.failed, summary.alerts_created
    );
    if let Some(refresh) = &summary.refresh {
        println!(
            "pricing service refresh: {} ASINs in {} chunks, {} chunks failed",
            refresh.requested, refresh.chunks, refresh.failed_chunks
        );
    }
    Ok(())
}

async fn run_init(engine: &Engine, batch_size: usize, max_asins: usize) -> anyhow::Result<()> {
    if batch_size == 0 {
        anyhow::bail!("--batch-size must be at least 1");
    }
    let options = InitFromDbOptions {
        batch_size,
        max_asins,
    };

    let summary = engine.init_from_db(options, TriggerSource::Cli).await;
    println!("{}", summary.message);
    println!(
        "found {}  processed {}  already initialized {}  initialized {}  failed {}  success rate {}%",
        summary.total_asins_found,
        summary.asins_processed,
        summary.already_initialized,
        summary.initialized,
        summary.failed,
        summary.success_rate
    );
    if let Some(monitoring) = &summary.monitoring {
        println!(
            "monitoring: processed {}, alerts created {}",
            monitoring.processed, monitoring.alerts_created
        );
    }
    if !summary.success {
        anyhow::bail!("initialization did not complete");
    }
    Ok(())
}

async fn run_initialize(engine: &Engine, raw: &[String]) -> anyhow::Result<()> {
    let mut asins: Vec<String> = Vec::with_capacity(raw.len());
    for input in raw {
        match extract_or_validate_asin(input) {
            Ok(asin) if !asins.contains(&asin) => asins.push(asin),
            Ok(_) => {}
            Err(e) => eprintln!("warning: skipping {input:?}: {e}"),
        }
    }
    if asins.is_empty() {
        anyhow::bail!("no valid ASINs given");
    }

    let summary = engine.initialize_products(&asins, TriggerSource::Cli).await;
    println!(
        "initialized {}, already initialized {}, failed {}",
        summary.initialized, summary.skipped, summary.failed
    );
    Ok(())
}

async fn run_cleanup(engine: &Engine) -> anyhow::Result<()> {
    let summary = engine.cleanup_old_monitoring_data(TriggerSource::Cli).await;
    if !summary.success {
        anyhow::bail!(
            "cleanup failed: {}",
            summary.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!(
        "deleted {} snapshots and {} alerts",
        summary.deleted_snapshots, summary.deleted_alerts
    );
    Ok(())
}

async fn run_stats(engine: &Engine, json: bool) -> anyhow::Result<()> {
    let stats = monitoring_statistics(engine.pool()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let last_run = stats.last_monitoring_run.map_or_else(
        || "never".to_string(),
        |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    println!("{:<26}{}", "monitored products", stats.monitored_products_count);
    println!("{:<26}{}", "historical records", stats.total_historical_records);
    println!("{:<26}{}", "alerts", stats.total_alerts);
    println!("{:<26}{}", "alerts (last 24h)", stats.recent_alerts);
    println!("{:<26}{}", "unread alerts", stats.unread_alerts);
    println!("{:<26}{}", "last monitoring run", last_run);
    Ok(())
}
