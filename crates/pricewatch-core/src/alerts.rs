use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} \"{value}\"")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    PriceIncrease,
    PriceDecrease,
    SignificantChange,
}

impl AlertType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AlertType::PriceIncrease => "price_increase",
            AlertType::PriceDecrease => "price_decrease",
            AlertType::SignificantChange => "significant_change",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price_increase" => Ok(AlertType::PriceIncrease),
            "price_decrease" => Ok(AlertType::PriceDecrease),
            "significant_change" => Ok(AlertType::SignificantChange),
            other => Err(ParseEnumError {
                kind: "alert type",
                value: other.to_string(),
            }),
        }
    }
}

/// Ordered from least to most urgent so `Ord` follows severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertPriority {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AlertPriority::Low => "low",
            AlertPriority::Medium => "medium",
            AlertPriority::High => "high",
            AlertPriority::Critical => "critical",
        }
    }

    /// Priorities surfaced by the `high_priority` feed filter.
    #[must_use]
    pub fn is_high(self) -> bool {
        self >= AlertPriority::High
    }
}

impl std::fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertPriority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(AlertPriority::Low),
            "medium" => Ok(AlertPriority::Medium),
            "high" => Ok(AlertPriority::High),
            "critical" => Ok(AlertPriority::Critical),
            other => Err(ParseEnumError {
                kind: "alert priority",
                value: other.to_string(),
            }),
        }
    }
}

/// Which slice of the alert feed to return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertFilter {
    #[default]
    All,
    Unread,
    HighPriority,
}

impl AlertFilter {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AlertFilter::All => "all",
            AlertFilter::Unread => "unread",
            AlertFilter::HighPriority => "high_priority",
        }
    }
}

impl FromStr for AlertFilter {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(AlertFilter::All),
            "unread" => Ok(AlertFilter::Unread),
            "high_priority" => Ok(AlertFilter::HighPriority),
            other => Err(ParseEnumError {
                kind: "alert filter",
                value: other.to_string(),
            }),
        }
    }
}

/// Percentage cut-offs used to classify a price change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertThresholds {
    /// `|percent|` at or above this is a `significant_change` regardless of sign.
    pub significant_change_percent: Decimal,
    pub critical_percent: Decimal,
    pub high_percent: Decimal,
    pub medium_percent: Decimal,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            significant_change_percent: Decimal::from(25),
            critical_percent: Decimal::from(30),
            high_percent: Decimal::from(15),
            medium_percent: Decimal::from(5),
        }
    }
}

impl AlertThresholds {
    /// Check that all cut-offs are non-negative and the priority tiers are
    /// ordered `critical >= high >= medium`.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the thresholds are inconsistent.
    pub fn validate(&self) -> Result<(), String> {
        let all = [
            self.significant_change_percent,
            self.critical_percent,
            self.high_percent,
            self.medium_percent,
        ];
        if all.iter().any(Decimal::is_sign_negative) {
            return Err("alert thresholds must not be negative".to_string());
        }
        if self.critical_percent < self.high_percent || self.high_percent < self.medium_percent {
            return Err(format!(
                "priority tiers must satisfy critical >= high >= medium, got {} / {} / {}",
                self.critical_percent, self.high_percent, self.medium_percent
            ));
        }
        Ok(())
    }
}

/// The delta between a previous and a current price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceChange {
    pub old_price: Decimal,
    pub new_price: Decimal,
    /// `new - old`.
    pub change: Decimal,
    /// `change / old * 100`, rounded half away from zero to 4 places.
    pub change_percent: Decimal,
}

impl PriceChange {
    /// Compute the change from `old_price` to `new_price`.
    ///
    /// Returns `None` when `old_price` is zero; a percentage is undefined
    /// and such a pair never produces an alert.
    #[must_use]
    pub fn compute(old_price: Decimal, new_price: Decimal) -> Option<Self> {
        if old_price.is_zero() {
            return None;
        }
        let change = new_price - old_price;
        let change_percent = (change / old_price * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero);
        Some(Self {
            old_price,
            new_price,
            change,
            change_percent,
        })
    }

    #[must_use]
    pub fn abs_percent(&self) -> Decimal {
        self.change_percent.abs()
    }

    /// Whether this change should raise an alert under `threshold_percent`.
    ///
    /// A zero change never qualifies. A threshold of zero fires on any
    /// nonzero change.
    #[must_use]
    pub fn qualifies(&self, threshold_percent: Decimal) -> bool {
        !self.change.is_zero() && self.abs_percent() >= threshold_percent
    }

    #[must_use]
    pub fn alert_type(&self, thresholds: &AlertThresholds) -> AlertType {
        if self.abs_percent() >= thresholds.significant_change_percent {
            AlertType::SignificantChange
        } else if self.change.is_sign_negative() {
            AlertType::PriceDecrease
        } else {
            AlertType::PriceIncrease
        }
    }

    #[must_use]
    pub fn priority(&self, thresholds: &AlertThresholds) -> AlertPriority {
        let pct = self.abs_percent();
        if pct >= thresholds.critical_percent {
            AlertPriority::Critical
        } else if pct >= thresholds.high_percent {
            AlertPriority::High
        } else if pct >= thresholds.medium_percent {
            AlertPriority::Medium
        } else {
            AlertPriority::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("valid decimal")
    }

    #[test]
    fn compute_decrease_matches_reference_scenario() {
        let change = PriceChange::compute(dec("19.99"), dec("17.99")).expect("nonzero old");
        assert_eq!(change.change, dec("-2.00"));
        assert_eq!(change.change_percent, dec("-10.0050"));
    }

    #[test]
    fn compute_returns_none_for_zero_previous() {
        assert!(PriceChange::compute(Decimal::ZERO, dec("5.00")).is_none());
    }

    #[test]
    fn equal_prices_never_qualify() {
        let change = PriceChange::compute(dec("10.00"), dec("10.00")).expect("nonzero old");
        assert!(!change.qualifies(Decimal::ZERO));
    }

    #[test]
    fn zero_threshold_fires_on_any_change() {
        let change = PriceChange::compute(dec("100.00"), dec("100.01")).expect("nonzero old");
        assert!(change.qualifies(Decimal::ZERO));
    }

    #[test]
    fn threshold_is_inclusive() {
        let change = PriceChange::compute(dec("100"), dec("105")).expect("nonzero old");
        assert!(change.qualifies(dec("5")));
        assert!(!change.qualifies(dec("5.0001")));
    }

    #[test]
    fn alert_type_follows_sign_below_significant_tier() {
        let t = AlertThresholds::default();
        let up = PriceChange::compute(dec("10"), dec("11")).expect("nonzero old");
        let down = PriceChange::compute(dec("10"), dec("9")).expect("nonzero old");
        assert_eq!(up.alert_type(&t), AlertType::PriceIncrease);
        assert_eq!(down.alert_type(&t), AlertType::PriceDecrease);
    }

    #[test]
    fn alert_type_is_significant_at_or_above_tier() {
        let t = AlertThresholds::default();
        let big_drop = PriceChange::compute(dec("100"), dec("75")).expect("nonzero old");
        let big_rise = PriceChange::compute(dec("100"), dec("140")).expect("nonzero old");
        assert_eq!(big_drop.alert_type(&t), AlertType::SignificantChange);
        assert_eq!(big_rise.alert_type(&t), AlertType::SignificantChange);
    }

    #[test]
    fn priority_tiers_are_total() {
        let t = AlertThresholds::default();
        let cases = [
            ("100", "101", AlertPriority::Low),
            ("100", "95", AlertPriority::Medium),
            ("100", "115", AlertPriority::High),
            ("100", "70", AlertPriority::Critical),
            ("100", "400", AlertPriority::Critical),
        ];
        for (old, new, expected) in cases {
            let change = PriceChange::compute(dec(old), dec(new)).expect("nonzero old");
            assert_eq!(change.priority(&t), expected, "{old} -> {new}");
        }
    }

    #[test]
    fn reference_scenario_is_medium_decrease() {
        let t = AlertThresholds::default();
        let change = PriceChange::compute(dec("19.99"), dec("17.99")).expect("nonzero old");
        assert_eq!(change.alert_type(&t), AlertType::PriceDecrease);
        assert_eq!(change.priority(&t), AlertPriority::Medium);
    }

    #[test]
    fn enums_round_trip_through_str() {
        for ty in [
            AlertType::PriceIncrease,
            AlertType::PriceDecrease,
            AlertType::SignificantChange,
        ] {
            assert_eq!(ty.as_str().parse::<AlertType>(), Ok(ty));
        }
        assert_eq!("critical".parse::<AlertPriority>(), Ok(AlertPriority::Critical));
        assert!("urgent".parse::<AlertPriority>().is_err());
    }

    #[test]
    fn alert_filter_parses_feed_names() {
        assert_eq!("high_priority".parse::<AlertFilter>(), Ok(AlertFilter::HighPriority));
        assert_eq!("unread".parse::<AlertFilter>(), Ok(AlertFilter::Unread));
        assert_eq!(AlertFilter::default(), AlertFilter::All);
        assert!("starred".parse::<AlertFilter>().is_err());
    }

    #[test]
    fn high_priority_filter_includes_critical() {
        assert!(AlertPriority::Critical.is_high());
        assert!(AlertPriority::High.is_high());
        assert!(!AlertPriority::Medium.is_high());
    }

    #[test]
    fn validate_rejects_negative_threshold() {
        let t = AlertThresholds {
            medium_percent: dec("-1"),
            ..AlertThresholds::default()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&AlertType::SignificantChange).expect("serialize");
        assert_eq!(json, "\"significant_change\"");
    }
}
