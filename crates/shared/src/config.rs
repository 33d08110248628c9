//! Application configuration management.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Per-event ownership settings.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Approval threshold table.
    #[serde(default)]
    pub approval: ApprovalConfig,
    /// Variance reporting settings.
    #[serde(default)]
    pub variance: VarianceConfig,
    /// Forecast settings.
    #[serde(default)]
    pub forecast: ForecastConfig,
    /// Notification outbox settings.
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Per-event ownership configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Maximum time a mutation waits for the event lock before failing.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    250
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// Approval threshold configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalConfig {
    /// Role name (lowercase) to maximum auto-approve amount.
    #[serde(default = "default_thresholds")]
    pub thresholds: BTreeMap<String, Decimal>,
    /// Amounts above this need an admin rather than a manager to decide.
    #[serde(default)]
    pub manager_limit: Option<Decimal>,
}

fn default_thresholds() -> BTreeMap<String, Decimal> {
    BTreeMap::from([
        ("participant".to_string(), Decimal::ZERO),
        ("volunteer".to_string(), Decimal::ONE_HUNDRED),
        ("organizer".to_string(), Decimal::ONE_THOUSAND),
        ("manager".to_string(), Decimal::from(5_000)),
        ("admin".to_string(), Decimal::from(10_000)),
    ])
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            thresholds: default_thresholds(),
            manager_limit: None,
        }
    }
}

/// Variance reporting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VarianceConfig {
    /// Utilization percent at which a category is reported as near its limit.
    #[serde(default = "default_alert_threshold_percent")]
    pub alert_threshold_percent: Decimal,
}

fn default_alert_threshold_percent() -> Decimal {
    Decimal::from(80)
}

impl Default for VarianceConfig {
    fn default() -> Self {
        Self {
            alert_threshold_percent: default_alert_threshold_percent(),
        }
    }
}

/// Forecast configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastConfig {
    /// Length of the trailing velocity window in days.
    #[serde(default = "default_trailing_window_days")]
    pub trailing_window_days: u32,
    /// Windows shorter than this many days are flagged low confidence.
    #[serde(default = "default_low_confidence_days")]
    pub low_confidence_days: u32,
}

fn default_trailing_window_days() -> u32 {
    7
}

fn default_low_confidence_days() -> u32 {
    1
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            trailing_window_days: default_trailing_window_days(),
            low_confidence_days: default_low_confidence_days(),
        }
    }
}

/// Notification outbox configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Delivery attempts per notification before it is given up on.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Hours a delivered notification is kept before the outbox drops it.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u32,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retention_hours() -> u32 {
    24
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retention_hours: default_retention_hours(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("EVENTIQ")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_without_sources() {
        let config = temp_env::with_vars_unset(
            ["EVENTIQ__ENGINE__LOCK_TIMEOUT_MS", "RUN_MODE"],
            AppConfig::load,
        )
        .unwrap();

        assert_eq!(config.engine.lock_timeout_ms, 250);
        assert_eq!(config.forecast.trailing_window_days, 7);
        assert_eq!(config.forecast.low_confidence_days, 1);
        assert_eq!(config.variance.alert_threshold_percent, dec!(80));
        assert_eq!(config.notifications.max_attempts, 5);
        assert_eq!(config.notifications.retention_hours, 24);
        assert_eq!(config.approval.thresholds.get("organizer"), Some(&dec!(1000)));
    }

    #[test]
    fn test_environment_overrides() {
        let config = temp_env::with_vars(
            [
                ("EVENTIQ__ENGINE__LOCK_TIMEOUT_MS", Some("40")),
                ("EVENTIQ__FORECAST__TRAILING_WINDOW_DAYS", Some("14")),
            ],
            AppConfig::load,
        )
        .unwrap();

        assert_eq!(config.engine.lock_timeout_ms, 40);
        assert_eq!(config.forecast.trailing_window_days, 14);
    }
}
