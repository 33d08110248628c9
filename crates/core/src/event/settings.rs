//! Engine settings resolved from application configuration.

use std::time::Duration;

use eventiq_shared::AppConfig;

use crate::approval::ApprovalPolicy;
use crate::budget::BudgetError;
use crate::forecast::ForecastEngine;
use crate::variance::VarianceAnalyzer;

/// Settings shared by every event budget in a registry.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Bounded wait for the per-event lock.
    pub lock_timeout: Duration,
    /// Approval policy new events start with.
    pub policy: ApprovalPolicy,
    /// Variance analyzer.
    pub variance: VarianceAnalyzer,
    /// Forecast engine.
    pub forecast: ForecastEngine,
    /// Delivery attempts per notification.
    pub notification_attempts: u32,
    /// How long delivered notifications stay in the outbox.
    pub notification_retention: chrono::Duration,
}

impl EngineSettings {
    /// Builds settings from configuration.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::UnknownRole` or `InvalidAllocation` for a bad
    /// threshold table.
    pub fn from_config(config: &AppConfig) -> Result<Self, BudgetError> {
        Ok(Self {
            lock_timeout: Duration::from_millis(config.engine.lock_timeout_ms),
            policy: ApprovalPolicy::from_config(&config.approval)?,
            variance: VarianceAnalyzer::new(config.variance.alert_threshold_percent),
            forecast: ForecastEngine::new(
                config.forecast.trailing_window_days,
                config.forecast.low_confidence_days,
            ),
            notification_attempts: config.notifications.max_attempts,
            notification_retention: chrono::Duration::hours(i64::from(
                config.notifications.retention_hours,
            )),
        })
    }

    /// Replaces the lock timeout.
    #[must_use]
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Replaces the approval policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ApprovalPolicy) -> Self {
        self.policy = policy;
        self
    }
}
