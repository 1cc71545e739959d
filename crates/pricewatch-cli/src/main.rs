mod alerts;
mod monitor;

use clap::{Parser, Subcommand};
use pricewatch_monitor::{EngineSettings, ListingPriceSource, MonitorEngine};
use tracing_subscriber::EnvFilter;

use crate::alerts::AlertsCommands;
use crate::monitor::MonitorCommands;

#[derive(Debug, Parser)]
#[command(name = "pricewatch-cli")]
#[command(about = "Price monitoring and alerting command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Run monitoring passes, initialization, and retention cleanup
    Monitor {
        #[command(subcommand)]
        command: MonitorCommands,
    },
    /// Inspect and acknowledge price alerts
    Alerts {
        #[command(subcommand)]
        command: AlertsCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

type Engine = MonitorEngine<ListingPriceSource>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("pricewatch-cli: no command given; try --help");
        return Ok(());
    };

    let config = pricewatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let pool_config = pricewatch_db::PoolConfig::from_app_config(&config);
    let pool = pricewatch_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => {
                pricewatch_db::ping(&pool).await?;
                println!("database ok");
            }
            DbCommands::Migrate => {
                let applied = pricewatch_db::run_migrations(&pool).await?;
                println!("migrations applied: {applied}");
            }
        },
        Commands::Monitor { command } => {
            let feed = pricewatch_feed::PricingServiceClient::from_app_config(&config)?;
            let engine: Engine = MonitorEngine::new(
                pool.clone(),
                ListingPriceSource::new(pool),
                EngineSettings::from_app_config(&config),
            )
            .with_feed(feed);
            monitor::run(&engine, command).await?;
        }
        Commands::Alerts { command } => alerts::run(&pool, command).await?,
    }

    Ok(())
}
