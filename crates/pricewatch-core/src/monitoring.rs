use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-run parameters for a monitoring pass. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitoringConfig {
    /// Minimum `|percent|` change that raises an alert. Zero fires on any change.
    pub alert_threshold_percent: Decimal,
    /// Restrict the pass to these ASINs. Empty means all.
    #[serde(alias = "enabledASINs")]
    pub enabled_asins: Vec<String>,
    /// Restrict the pass to these seller SKUs. Empty means all.
    #[serde(alias = "enabledSKUs")]
    pub enabled_skus: Vec<String>,
}

impl MonitoringConfig {
    #[must_use]
    pub fn with_threshold(alert_threshold_percent: Decimal) -> Self {
        Self {
            alert_threshold_percent,
            ..Self::default()
        }
    }

    /// Whether a tracked ASIN is in scope for this run.
    ///
    /// `seller_skus` is every SKU the ASIN is listed under; the SKU filter
    /// matches if any of them is enabled. When both filters are set, both
    /// must match. An ASIN without a known SKU is excluded by a non-empty SKU
    /// filter.
    #[must_use]
    pub fn includes<S: AsRef<str>>(&self, asin: &str, seller_skus: &[S]) -> bool {
        let asin_ok =
            self.enabled_asins.is_empty() || self.enabled_asins.iter().any(|a| a == asin);
        let sku_ok = self.enabled_skus.is_empty()
            || seller_skus
                .iter()
                .any(|sku| self.enabled_skus.iter().any(|s| s == sku.as_ref()));
        asin_ok && sku_ok
    }
}

/// What started a monitoring run; recorded on the run ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Cron,
    Scheduler,
    Api,
    Cli,
}

impl TriggerSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerSource::Cron => "cron",
            TriggerSource::Scheduler => "scheduler",
            TriggerSource::Api => "api",
            TriggerSource::Cli => "cli",
        }
    }
}

impl std::fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of work a monitoring run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunType {
    Monitor,
    Initialize,
    Cleanup,
}

impl RunType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunType::Monitor => "monitor",
            RunType::Initialize => "initialize",
            RunType::Cleanup => "cleanup",
        }
    }
}

/// The series a snapshot belongs to: the seller's own listing or a named
/// competitor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SnapshotSource {
    Own,
    Competitor(String),
}

const COMPETITOR_PREFIX: &str = "competitor:";

impl SnapshotSource {
    /// Storage key for the `source` column.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            SnapshotSource::Own => "own".to_string(),
            SnapshotSource::Competitor(label) => format!("{COMPETITOR_PREFIX}{label}"),
        }
    }

    /// Parse a stored key back into a source. Unknown keys yield `None`.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        if key == "own" {
            return Some(SnapshotSource::Own);
        }
        key.strip_prefix(COMPETITOR_PREFIX)
            .filter(|label| !label.is_empty())
            .map(|label| SnapshotSource::Competitor(label.to_string()))
    }

    /// Name recorded on alerts. `None` for the seller's own listing.
    #[must_use]
    pub fn competitor_name(&self) -> Option<&str> {
        match self {
            SnapshotSource::Own => None,
            SnapshotSource::Competitor(label) => Some(label),
        }
    }
}

impl std::fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filters_include_everything() {
        let cfg = MonitoringConfig::default();
        assert!(cfg.includes("B000123456", &[] as &[&str]));
        assert!(cfg.includes("B000123456", &["SKU-1"]));
    }

    #[test]
    fn asin_filter_excludes_others() {
        let cfg = MonitoringConfig {
            enabled_asins: vec!["B000123456".to_string()],
            ..MonitoringConfig::default()
        };
        assert!(cfg.includes("B000123456", &[] as &[&str]));
        assert!(!cfg.includes("B000999999", &[] as &[&str]));
    }

    #[test]
    fn both_filters_must_match() {
        let cfg = MonitoringConfig {
            enabled_asins: vec!["B000123456".to_string()],
            enabled_skus: vec!["SKU-1".to_string()],
            ..MonitoringConfig::default()
        };
        assert!(cfg.includes("B000123456", &["SKU-1"]));
        assert!(!cfg.includes("B000123456", &["SKU-2"]));
        assert!(!cfg.includes("B000123456", &[] as &[&str]));
    }

    #[test]
    fn sku_filter_matches_any_listed_sku() {
        let cfg = MonitoringConfig {
            enabled_skus: vec!["Z-9".to_string()],
            ..MonitoringConfig::default()
        };
        assert!(cfg.includes("B000123456", &["A-1", "Z-9"]));
        assert!(!cfg.includes("B000123456", &["A-1"]));
    }

    #[test]
    fn deserializes_camel_case_and_legacy_aliases() {
        let cfg: MonitoringConfig = serde_json::from_str(
            r#"{"alertThresholdPercent": 5, "enabledASINs": ["B000123456"], "enabledSKUs": []}"#,
        )
        .expect("deserialize");
        assert_eq!(cfg.alert_threshold_percent, Decimal::from(5));
        assert_eq!(cfg.enabled_asins, vec!["B000123456".to_string()]);

        let empty: MonitoringConfig = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(empty, MonitoringConfig::default());
    }

    #[test]
    fn source_keys_parse_back() {
        let own = SnapshotSource::Own;
        let rival = SnapshotSource::Competitor("Acme".to_string());
        assert_eq!(SnapshotSource::from_key(&own.key()), Some(own));
        assert_eq!(rival.key(), "competitor:Acme");
        assert_eq!(SnapshotSource::from_key("competitor:Acme"), Some(rival));
        assert_eq!(SnapshotSource::from_key("competitor:"), None);
        assert_eq!(SnapshotSource::from_key("mystery"), None);
    }

    #[test]
    fn competitor_name_is_none_for_own() {
        assert_eq!(SnapshotSource::Own.competitor_name(), None);
        assert_eq!(
            SnapshotSource::Competitor("Acme".to_string()).competitor_name(),
            Some("Acme")
        );
    }
}
