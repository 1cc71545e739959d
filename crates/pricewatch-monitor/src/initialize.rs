//! Baseline initialization: seed one snapshot per (ASIN, source) series.

use futures::stream::{self, StreamExt};
use pricewatch_core::{RunType, TriggerSource};
use pricewatch_db::{insert_baseline_if_absent, NewPriceSnapshot};
use serde::Serialize;

use crate::engine::MonitorEngine;
use crate::error::MonitorError;
use crate::ledger;
use crate::source::PriceSource;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializationSummary {
    pub success: bool,
    /// ASINs that received at least one new baseline.
    pub initialized: usize,
    /// ASINs whose every series already had a baseline.
    pub skipped: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitOutcome {
    Initialized,
    Skipped,
    Failed,
}

impl<S: PriceSource> MonitorEngine<S> {
    /// Seeds baselines for `asins`, recording the run on the ledger.
    pub async fn initialize_products(
        &self,
        asins: &[String],
        trigger: TriggerSource,
    ) -> InitializationSummary {
        let run_id = ledger::begin(&self.pool, RunType::Initialize, trigger).await;
        let summary = self.initialize_monitoring_for_products(asins).await;
        ledger::succeed(
            &self.pool,
            run_id,
            summary.initialized + summary.skipped,
            0,
        )
        .await;
        summary
    }

    /// Fetches the current prices of each ASIN and inserts a baseline for
    /// every series that has none. Repeated calls never add a second baseline.
    ///
    /// A price-source or persistence failure for one ASIN counts it as failed
    /// and the batch continues.
    pub async fn initialize_monitoring_for_products(
        &self,
        asins: &[String],
    ) -> InitializationSummary {
        let max_concurrent = self.settings.max_concurrency.max(1);

        let outcomes: Vec<InitOutcome> = stream::iter(asins.iter().cloned())
            .map(|asin| async move {
                match self.initialize_asin(&asin).await {
                    Ok(true) => InitOutcome::Initialized,
                    Ok(false) => InitOutcome::Skipped,
                    Err(e) => {
                        tracing::warn!(asin = %asin, error = %e, "initialize: failed to seed baseline");
                        InitOutcome::Failed
                    }
                }
            })
            .buffer_unordered(max_concurrent)
            .collect()
            .await;

        let mut summary = InitializationSummary {
            success: true,
            ..InitializationSummary::default()
        };
        for outcome in outcomes {
            match outcome {
                InitOutcome::Initialized => summary.initialized += 1,
                InitOutcome::Skipped => summary.skipped += 1,
                InitOutcome::Failed => summary.failed += 1,
            }
        }

        tracing::info!(
            initialized = summary.initialized,
            skipped = summary.skipped,
            failed = summary.failed,
            "initialize: complete"
        );
        summary
    }

    /// Returns `true` if at least one baseline was inserted.
    async fn initialize_asin(&self, asin: &str) -> Result<bool, MonitorError> {
        let observations = self.source.current_prices(asin).await?;

        let mut inserted_any = false;
        for obs in &observations {
            let source_key = obs.source.key();
            let snapshot = NewPriceSnapshot {
                asin,
                source: &source_key,
                seller_sku: obs.seller_sku.as_deref(),
                price: obs.price,
                currency: &obs.currency,
            };
            if insert_baseline_if_absent(&self.pool, &snapshot).await? {
                tracing::debug!(asin = %asin, source = %source_key, price = %obs.price, "initialize: baseline seeded");
                inserted_any = true;
            }
        }
        Ok(inserted_any)
    }
}
