//! Spend projection from posted-expense velocity.
//!
//! Time is measured in fractional days (`seconds / 86400`) so a forecast made
//! mid-day is not rounded to a whole day. The trailing window is the shorter
//! of the configured window and the time since event start. A window shorter
//! than the low-confidence cutoff still projects, but the report is flagged.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use super::types::{CategoryForecast, ConfidenceWindow, ForecastReport};
use crate::budget::{BudgetConfiguration, BudgetError};
use crate::ledger::{ExpenseLedger, ExpenseStatus};

const SECONDS_PER_DAY: i64 = 86_400;

/// Pure read-side projection over a configuration and ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastEngine {
    trailing_window_days: u32,
    low_confidence_days: u32,
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new(7, 1)
    }
}

impl ForecastEngine {
    /// Creates an engine with the given trailing window and low-confidence cutoff.
    #[must_use]
    pub const fn new(trailing_window_days: u32, low_confidence_days: u32) -> Self {
        Self {
            trailing_window_days,
            low_confidence_days,
        }
    }

    /// Project end-of-event spend as of `as_of`.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::IndeterminateForecast` if the event has no end date
    /// or the run rate projects past the representable range.
    pub fn project(
        &self,
        config: &BudgetConfiguration,
        ledger: &ExpenseLedger,
        as_of: DateTime<Utc>,
    ) -> Result<ForecastReport, BudgetError> {
        let end = config.event_end.ok_or_else(|| {
            BudgetError::IndeterminateForecast(format!(
                "event {} has no declared end date",
                config.event_id
            ))
        })?;
        let start = config.event_start;

        let effective = as_of.clamp(start, end);
        let elapsed = effective - start;
        let remaining = end - effective;
        let window = elapsed.min(Duration::days(i64::from(self.trailing_window_days)));
        let window_start = effective - window;

        let total_days = to_days(end - start);
        let elapsed_days = to_days(elapsed);
        let remaining_days = to_days(remaining);
        let window_days = to_days(window);

        let posted: Vec<_> = ledger
            .records()
            .iter()
            .filter(|r| r.status == ExpenseStatus::Posted)
            .filter_map(|r| r.posted_at.map(|at| (at, r.amount)))
            .filter(|(at, _)| *at >= window_start && *at <= effective)
            .collect();
        let posted_in_window: Decimal = posted.iter().map(|(_, amount)| *amount).sum();

        let current_approved_total: Decimal = ledger
            .records()
            .iter()
            .filter(|r| r.status.is_committed())
            .map(|r| r.amount)
            .sum();

        let low_confidence =
            window.is_zero() || window < Duration::days(i64::from(self.low_confidence_days));

        let velocity = if window.is_zero() {
            Decimal::ZERO
        } else {
            posted_in_window
                .checked_div(window_days)
                .ok_or_else(|| out_of_range(config))?
        };

        let run_rate = |rate: Decimal| {
            rate.checked_mul(remaining_days)
                .and_then(|extra| current_approved_total.checked_add(extra))
                .ok_or_else(|| out_of_range(config))
        };
        let projected = run_rate(velocity)?;
        let confidence_window = match daily_range(&posted, effective, window) {
            Some((slowest, fastest)) => ConfidenceWindow {
                lower: run_rate(slowest)?.min(projected),
                upper: run_rate(fastest)?.max(projected),
            },
            None => ConfidenceWindow::point(projected),
        };

        let categories = config
            .categories
            .iter()
            .map(|allocation| -> Result<CategoryForecast, BudgetError> {
                let allocated_amount = config.allocation_amount(allocation);
                let approved_amount: Decimal = ledger
                    .records()
                    .iter()
                    .filter(|r| r.status.is_committed() && r.in_category(&allocation.name))
                    .map(|r| r.amount)
                    .sum();
                let projected_amount = if elapsed_days.is_zero() {
                    approved_amount
                } else {
                    approved_amount
                        .checked_div(elapsed_days)
                        .and_then(|rate| rate.checked_mul(total_days))
                        .ok_or_else(|| out_of_range(config))?
                };
                Ok(CategoryForecast {
                    category: allocation.name.clone(),
                    allocated_amount,
                    approved_amount,
                    projected_amount: projected_amount.round_dp(2),
                    overrun: projected_amount > allocated_amount,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let projected_total = projected.round_dp(2);

        debug!(
            event_id = %config.event_id,
            %as_of,
            velocity = %velocity.round_dp(2),
            projected_total = %projected_total,
            low_confidence,
            "Projected event spend"
        );

        Ok(ForecastReport {
            event_id: config.event_id,
            as_of,
            projected_total,
            projected_variance: config.total_amount - projected_total,
            projected_overrun_categories: categories
                .iter()
                .filter(|c| c.overrun)
                .map(|c| c.category.clone())
                .collect(),
            confidence_window: ConfidenceWindow {
                lower: confidence_window.lower.round_dp(2),
                upper: confidence_window.upper.round_dp(2),
            },
            low_confidence,
            velocity_per_day: velocity.round_dp(2),
            posted_in_window,
            window_days: window_days.round_dp(4),
            elapsed_days: elapsed_days.round_dp(4),
            remaining_days: remaining_days.round_dp(4),
            total_days: total_days.round_dp(4),
            current_approved_total,
            categories,
        })
    }
}

fn out_of_range(config: &BudgetConfiguration) -> BudgetError {
    BudgetError::IndeterminateForecast(format!(
        "projection for event {} is out of range",
        config.event_id
    ))
}

fn to_days(duration: Duration) -> Decimal {
    Decimal::from(duration.num_seconds()) / Decimal::from(SECONDS_PER_DAY)
}

/// Slowest and fastest whole-day posted totals in the window, counting back
/// from `effective`. `None` if the window holds no whole day.
fn daily_range(
    posted: &[(DateTime<Utc>, Decimal)],
    effective: DateTime<Utc>,
    window: Duration,
) -> Option<(Decimal, Decimal)> {
    let whole_days = window.num_days();
    if whole_days == 0 {
        return None;
    }

    let buckets = (0..whole_days).map(|day| {
        let bucket_end = effective - Duration::days(day);
        let bucket_start = bucket_end - Duration::days(1);
        posted
            .iter()
            .filter(|(at, _)| *at > bucket_start && *at <= bucket_end)
            .map(|(_, amount)| *amount)
            .sum::<Decimal>()
    });

    buckets.fold(None, |range, total| match range {
        None => Some((total, total)),
        Some((slowest, fastest)) => Some((slowest.min(total), fastest.max(total))),
    })
}
