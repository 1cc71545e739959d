//! The price-monitoring engine: ASIN discovery, baseline initialization, the
//! diff/alert pass, retention cleanup, and the alert feed.

pub mod alert_feed;
pub mod batch;
pub mod cleanup;
pub mod diff;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod initialize;
mod ledger;
pub mod source;
pub mod statistics;

pub use alert_feed::{
    dismiss_alert, dismiss_multiple_alerts, get_price_alerts, mark_alert_as_read,
    mark_all_alerts_as_read, AlertCounts, AlertFeed, PriceAlert, DEFAULT_ALERT_LIMIT,
};
pub use batch::{create_batches, InitFromDbOptions, InitFromDbSummary, DEFAULT_BATCH_SIZE};
pub use cleanup::CleanupSummary;
pub use diff::MonitorSummary;
pub use discovery::{discover_tracked_asins, fetch_unique_asins, filter_new_asins};
pub use engine::{EngineSettings, MonitorEngine};
pub use error::MonitorError;
pub use initialize::InitializationSummary;
pub use source::{ListingPriceSource, PriceObservation, PriceSource};
pub use statistics::{
    alert_breakdown, monitoring_statistics, price_history, AlertBreakdown, MonitoringStatistics,
    PriceHistoryPoint,
};
