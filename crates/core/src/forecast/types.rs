//! Forecast report types.

use chrono::{DateTime, Utc};
use eventiq_shared::types::EventId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Range of plausible end-of-event totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceWindow {
    /// Projection at the slowest observed daily rate.
    pub lower: Decimal,
    /// Projection at the fastest observed daily rate.
    pub upper: Decimal,
}

impl ConfidenceWindow {
    /// A zero-width window at `value`.
    #[must_use]
    pub const fn point(value: Decimal) -> Self {
        Self {
            lower: value,
            upper: value,
        }
    }

    /// Returns true if `value` lies within the window.
    #[must_use]
    pub fn contains(&self, value: Decimal) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Run-rate projection for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryForecast {
    /// Category name.
    pub category: String,
    /// Allocation.
    pub allocated_amount: Decimal,
    /// Approved + Posted so far.
    pub approved_amount: Decimal,
    /// `approved / elapsed_days * total_days`, or `approved` before any time elapsed.
    pub projected_amount: Decimal,
    /// Projected amount exceeds the allocation.
    pub overrun: bool,
}

/// End-of-event spend projection. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastReport {
    /// Event the report is for.
    pub event_id: EventId,
    /// Point in time the projection was made for.
    pub as_of: DateTime<Utc>,
    /// `current_approved_total + velocity_per_day * remaining_days`.
    pub projected_total: Decimal,
    /// `total_budget - projected_total`; negative means a projected overrun.
    pub projected_variance: Decimal,
    /// Categories whose run rate exceeds their allocation.
    pub projected_overrun_categories: Vec<String>,
    /// Slowest-day and fastest-day projections.
    pub confidence_window: ConfidenceWindow,
    /// Too little history to trust the velocity.
    pub low_confidence: bool,
    /// Posted spend per day over the trailing window.
    pub velocity_per_day: Decimal,
    /// Posted spend inside the trailing window.
    pub posted_in_window: Decimal,
    /// Length of the trailing window actually used, in days.
    pub window_days: Decimal,
    /// Days from event start to `as_of` (clamped to the event span).
    pub elapsed_days: Decimal,
    /// Days from `as_of` to event end; zero once the event is over.
    pub remaining_days: Decimal,
    /// Event span in days.
    pub total_days: Decimal,
    /// Approved + Posted across all categories.
    pub current_approved_total: Decimal,
    /// Per-category run rates, in configuration order.
    pub categories: Vec<CategoryForecast>,
}
