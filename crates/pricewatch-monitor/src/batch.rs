//! Bulk initialization from the listing tables (`init-from-db`).

use std::collections::HashSet;

use pricewatch_core::{MonitoringConfig, RunType, TriggerSource};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::diff::MonitorSummary;
use crate::discovery::{fetch_unique_asins, filter_new_asins};
use crate::engine::MonitorEngine;
use crate::ledger;
use crate::source::PriceSource;

pub const DEFAULT_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InitFromDbOptions {
    pub batch_size: usize,
    /// Cap on uninitialized ASINs handled by one call. `0` means no cap.
    /// ASINs past the cap are also left out of the follow-up monitoring pass.
    pub max_asins: usize,
}

impl Default for InitFromDbOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_asins: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitFromDbSummary {
    pub success: bool,
    pub message: String,
    #[serde(rename = "totalASINsFound")]
    pub total_asins_found: usize,
    /// ASINs that had no history and went through initialization.
    #[serde(rename = "asinsProcessed")]
    pub asins_processed: usize,
    pub already_initialized: usize,
    pub initialized: usize,
    pub failed: usize,
    /// `initialized / asinsProcessed` as a whole percentage.
    pub success_rate: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitoring: Option<MonitorSummary>,
}

/// Splits `items` into consecutive batches of at most `size` items.
/// A `size` of zero is treated as one.
#[must_use]
pub fn create_batches<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(<[T]>::to_vec).collect()
}

fn success_rate(initialized: usize, processed: usize) -> u32 {
    if processed == 0 {
        return 0;
    }
    let rate = Decimal::from(initialized) * Decimal::ONE_HUNDRED / Decimal::from(processed);
    rate.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .try_into()
        .unwrap_or(0)
}

impl<S: PriceSource> MonitorEngine<S> {
    /// Discovers ASINs, initializes the ones without history in batches, then
    /// runs one monitoring pass at a zero threshold.
    pub async fn init_from_db(
        &self,
        options: InitFromDbOptions,
        trigger: TriggerSource,
    ) -> InitFromDbSummary {
        let asins: Vec<String> = fetch_unique_asins(&self.pool).await.into_iter().collect();
        if asins.is_empty() {
            tracing::info!("init-from-db: no ASINs found in listing tables");
            return InitFromDbSummary {
                success: true,
                message: "No ASINs found in database tables".to_string(),
                ..InitFromDbSummary::default()
            };
        }
        let total_asins_found = asins.len();

        // The cap applies to ASINs without history only.
        let mut new_asins = filter_new_asins(&self.pool, asins.clone()).await;
        let already_initialized = total_asins_found - new_asins.len();
        let mut monitor_config = MonitoringConfig::with_threshold(Decimal::ZERO);
        if options.max_asins > 0 && new_asins.len() > options.max_asins {
            tracing::info!(
                new_asins = new_asins.len(),
                max_asins = options.max_asins,
                "init-from-db: capping this call"
            );
            let deferred: HashSet<String> =
                new_asins.split_off(options.max_asins).into_iter().collect();
            // Deferred ASINs stay unobserved so a later call initializes them.
            monitor_config.enabled_asins = asins
                .into_iter()
                .filter(|asin| !deferred.contains(asin))
                .collect();
        }

        if new_asins.is_empty() {
            tracing::info!(total_asins_found, "init-from-db: all ASINs already initialized");
            let monitoring = self
                .monitor_prices_and_create_alerts(&monitor_config, trigger)
                .await;
            return InitFromDbSummary {
                success: monitoring.success,
                message: "All ASINs already initialized, ran monitoring only".to_string(),
                total_asins_found,
                already_initialized,
                monitoring: Some(monitoring),
                ..InitFromDbSummary::default()
            };
        }

        let run_id = ledger::begin(&self.pool, RunType::Initialize, trigger).await;
        let batches = create_batches(&new_asins, options.batch_size);
        let batch_count = batches.len();
        let mut initialized = 0;
        let mut failed = 0;

        for (index, batch) in batches.iter().enumerate() {
            tracing::info!(
                batch = index + 1,
                batches = batch_count,
                size = batch.len(),
                "init-from-db: initializing batch"
            );
            let result = self.initialize_monitoring_for_products(batch).await;
            initialized += result.initialized + result.skipped;
            failed += result.failed;

            if index + 1 < batch_count && !self.settings.init_batch_delay.is_zero() {
                tokio::time::sleep(self.settings.init_batch_delay).await;
            }
        }
        ledger::succeed(&self.pool, run_id, initialized, 0).await;

        let monitoring = self
            .monitor_prices_and_create_alerts(&monitor_config, trigger)
            .await;

        tracing::info!(
            total_asins_found,
            initialized,
            failed,
            "init-from-db: complete"
        );
        InitFromDbSummary {
            success: true,
            message: "Historical data initialization completed".to_string(),
            total_asins_found,
            asins_processed: new_asins.len(),
            already_initialized,
            initialized,
            failed,
            success_rate: success_rate(initialized, new_asins.len()),
            monitoring: Some(monitoring),
        }
    }
}
