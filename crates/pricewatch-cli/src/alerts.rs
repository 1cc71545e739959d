//! Alert feed command handlers for the CLI.

use clap::Subcommand;
use pricewatch_core::AlertFilter;
use pricewatch_monitor::{get_price_alerts, mark_all_alerts_as_read};
use sqlx::PgPool;

/// Sub-commands available under `alerts`.
#[derive(Debug, Subcommand)]
pub enum AlertsCommands {
    /// List recent alerts, newest first
    List {
        /// One of: all, unread, high_priority
        #[arg(long, default_value = "all")]
        filter: AlertFilter,
        /// Maximum number of alerts to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
    /// Mark every unread alert as read
    ReadAll,
}

/// Dispatch an `alerts` subcommand.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run(pool: &PgPool, command: AlertsCommands) -> anyhow::Result<()> {
    match command {
        AlertsCommands::List {
            filter,
            limit,
            offset,
        } => run_list(pool, filter, limit, offset).await,
        AlertsCommands::ReadAll => {
            let n = mark_all_alerts_as_read(pool).await?;
            println!("marked {n} alerts as read");
            Ok(())
        }
    }
}

async fn run_list(
    pool: &PgPool,
    filter: AlertFilter,
    limit: i64,
    offset: i64,
) -> anyhow::Result<()> {
    let feed = get_price_alerts(pool, filter, limit.clamp(1, 500), offset).await?;

    if feed.alerts.is_empty() {
        let scope = match filter {
            AlertFilter::All => "",
            AlertFilter::Unread => "unread ",
            AlertFilter::HighPriority => "high-priority ",
        };
        println!("no {scope}alerts; run `monitor run` first");
    } else {
        let header = format!(
            "{:<8}{:<12}{:<20}{:<10}{:>10}{:>10}{:>10}  {:<6}SOURCE",
            "ID", "ASIN", "TYPE", "PRIORITY", "OLD", "NEW", "CHANGE%", "READ"
        );
        println!("{header}");
        for alert in &feed.alerts {
            println!(
                "{:<8}{:<12}{:<20}{:<10}{:>10}{:>10}{:>10}  {:<6}{}",
                alert.id,
                alert.asin,
                alert.alert_type.as_str(),
                alert.priority.as_str(),
                alert.old_price,
                alert.new_price,
                alert.price_change_percent.round_dp(2),
                if alert.is_read { "yes" } else { "no" },
                alert.competitor_name.as_deref().unwrap_or("own"),
            );
        }
    }

    println!(
        "\ntotal {}  unread {}  high priority {}",
        feed.counts.total, feed.counts.unread, feed.counts.high_priority
    );
    Ok(())
}
