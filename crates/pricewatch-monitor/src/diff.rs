//! The monitoring pass: diff each tracked series against its latest snapshot
//! and raise alerts for qualifying changes.

use futures::stream::{self, StreamExt};
use pricewatch_core::{MonitoringConfig, PriceChange, RunType, TriggerSource};
use pricewatch_db::{
    get_latest_snapshot, insert_observed_snapshot, insert_price_alert, NewPriceAlert,
    NewPriceSnapshot, TrackedAsinRow,
};
use pricewatch_feed::RefreshSummary;
use serde::Serialize;

use crate::discovery::discover_tracked_asins;
use crate::engine::MonitorEngine;
use crate::ledger;
use crate::source::{PriceObservation, PriceSource};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSummary {
    pub success: bool,
    /// ASINs whose current prices were fetched and diffed.
    pub processed: usize,
    /// ASINs skipped because no current price could be fetched.
    pub failed: usize,
    pub alerts_created: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh: Option<RefreshSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MonitorSummary {
    fn failure(error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
            ..Self::default()
        }
    }
}

enum AsinOutcome {
    Processed { alerts: usize },
    Skipped,
}

impl<S: PriceSource> MonitorEngine<S> {
    /// Runs one monitoring pass over every tracked ASIN in scope for `config`.
    ///
    /// Per-ASIN failures are logged and never abort the pass. The pass only
    /// reports `success: false` when the tracked ASIN set cannot be read.
    pub async fn monitor_prices_and_create_alerts(
        &self,
        config: &MonitoringConfig,
        trigger: TriggerSource,
    ) -> MonitorSummary {
        tracing::info!(
            trigger = trigger.as_str(),
            threshold = %config.alert_threshold_percent,
            "monitor: starting pass"
        );
        let run_id = ledger::begin(&self.pool, RunType::Monitor, trigger).await;

        let tracked = match discover_tracked_asins(&self.pool, config).await {
            Ok(tracked) => tracked,
            Err(e) => {
                tracing::error!(error = %e, "monitor: failed to discover tracked ASINs");
                let message = e.to_string();
                ledger::fail(&self.pool, run_id, &message).await;
                return MonitorSummary::failure(message);
            }
        };

        let refresh = match &self.feed {
            Some(feed) if !tracked.is_empty() => {
                let asins: Vec<String> = tracked.iter().map(|t| t.asin.clone()).collect();
                Some(feed.refresh_asins(&asins).await)
            }
            _ => None,
        };

        let max_concurrent = self.settings.max_concurrency.max(1);
        let tracked_count = tracked.len();
        let outcomes: Vec<AsinOutcome> = stream::iter(tracked)
            .map(|row| async move { self.process_asin(&row, config).await })
            .buffer_unordered(max_concurrent)
            .collect()
            .await;

        let mut summary = MonitorSummary {
            success: true,
            refresh,
            ..MonitorSummary::default()
        };
        for outcome in outcomes {
            match outcome {
                AsinOutcome::Processed { alerts } => {
                    summary.processed += 1;
                    summary.alerts_created += alerts;
                }
                AsinOutcome::Skipped => summary.failed += 1,
            }
        }

        if summary.failed > 0 {
            tracing::warn!(
                failed = summary.failed,
                tracked = tracked_count,
                "monitor: some ASINs had no current price"
            );
        }
        tracing::info!(
            processed = summary.processed,
            alerts_created = summary.alerts_created,
            "monitor: pass complete"
        );

        ledger::succeed(&self.pool, run_id, summary.processed, summary.alerts_created).await;
        summary
    }

    async fn process_asin(&self, tracked: &TrackedAsinRow, config: &MonitoringConfig) -> AsinOutcome {
        let observations = match self.source.current_prices(&tracked.asin).await {
            Ok(observations) => observations,
            Err(e) => {
                tracing::warn!(asin = %tracked.asin, error = %e, "monitor: skipping ASIN");
                return AsinOutcome::Skipped;
            }
        };

        let mut alerts = 0;
        for obs in &observations {
            if self.process_observation(tracked, obs, config).await {
                alerts += 1;
            }
        }
        AsinOutcome::Processed { alerts }
    }

    /// Diffs one observation against its series and appends it. Returns
    /// `true` if an alert was inserted.
    async fn process_observation(
        &self,
        tracked: &TrackedAsinRow,
        obs: &PriceObservation,
        config: &MonitoringConfig,
    ) -> bool {
        let asin = tracked.asin.as_str();
        let source_key = obs.source.key();

        let previous = match get_latest_snapshot(&self.pool, asin, &source_key).await {
            Ok(previous) => previous,
            Err(e) => {
                tracing::error!(asin = %asin, source = %source_key, error = %e, "monitor: failed to read latest snapshot");
                return false;
            }
        };

        let change = match &previous {
            None => {
                tracing::debug!(asin = %asin, source = %source_key, "monitor: no prior snapshot, seeding series");
                None
            }
            Some(prev) if !prev.currency.eq_ignore_ascii_case(&obs.currency) => {
                tracing::warn!(
                    asin = %asin,
                    source = %source_key,
                    previous_currency = %prev.currency,
                    currency = %obs.currency,
                    "monitor: currency changed, reseeding series"
                );
                None
            }
            Some(prev) => {
                let change = PriceChange::compute(prev.price, obs.price);
                if change.is_none() {
                    tracing::info!(asin = %asin, source = %source_key, "monitor: previous price is zero, not alerting");
                }
                change.filter(|c| c.qualifies(config.alert_threshold_percent))
            }
        };

        let seller_sku = obs
            .seller_sku
            .as_deref()
            .or(tracked.seller_sku.as_deref());

        let snapshot = NewPriceSnapshot {
            asin,
            source: &source_key,
            seller_sku,
            price: obs.price,
            currency: &obs.currency,
        };
        if let Err(e) = insert_observed_snapshot(&self.pool, &snapshot).await {
            tracing::error!(asin = %asin, source = %source_key, error = %e, "monitor: failed to append snapshot");
        }

        let Some(change) = change else {
            return false;
        };

        let thresholds = &self.settings.thresholds;
        let alert = NewPriceAlert {
            asin,
            seller_sku,
            product_name: obs.product_name.as_deref(),
            old_price: change.old_price,
            new_price: change.new_price,
            price_change: change.change,
            price_change_percent: change.change_percent,
            currency: &obs.currency,
            alert_type: change.alert_type(thresholds),
            competitor_name: obs.source.competitor_name(),
            priority: change.priority(thresholds),
            threshold_triggered: config.alert_threshold_percent,
        };
        match insert_price_alert(&self.pool, &alert).await {
            Ok(row) => {
                tracing::info!(
                    asin = %asin,
                    source = %source_key,
                    alert_id = row.id,
                    alert_type = alert.alert_type.as_str(),
                    priority = alert.priority.as_str(),
                    change_percent = %change.change_percent,
                    "monitor: alert created"
                );
                true
            }
            Err(e) => {
                tracing::error!(asin = %asin, source = %source_key, error = %e, "monitor: failed to insert alert");
                false
            }
        }
    }
}
