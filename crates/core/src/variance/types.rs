//! Variance report types.

use eventiq_shared::types::{Currency, EventId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where a category stands against its own allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceStatus {
    /// Below the alert threshold.
    WithinAllocation,
    /// At or above the alert threshold, still within allocation.
    NearLimit,
    /// Approved spend exceeds the allocation; the excess is drawn contingency.
    OverBudget,
}

/// Allocated vs committed vs posted for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryVariance {
    /// Category name.
    pub category: String,
    /// Share of the pool.
    pub allocated_percent: Decimal,
    /// `total * allocated_percent / 100`.
    pub allocated_amount: Decimal,
    /// Approved + Posted.
    pub approved_amount: Decimal,
    /// Posted only.
    pub posted_amount: Decimal,
    /// Waiting for a manager.
    pub pending_amount: Decimal,
    /// `allocated_amount - approved_amount`; negative only when drawing contingency.
    pub remaining: Decimal,
    /// `approved_amount / allocated_amount * 100`, two decimal places.
    pub percent_used: Decimal,
    /// Number of Approved + Posted expenses.
    pub approved_count: usize,
    /// Number of PendingApproval expenses.
    pub pending_count: usize,
    /// Number of Posted expenses.
    pub posted_count: usize,
    /// Approved but receipt not yet confirmed.
    pub awaiting_receipt_count: usize,
    /// Contingency held by this category's live expenses.
    pub contingency_drawn: Decimal,
    /// Position against the allocation.
    pub status: VarianceStatus,
}

/// Event-wide totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarianceSummary {
    /// Total pool.
    pub total_budget: Decimal,
    /// Sum of category allocations.
    pub allocated_total: Decimal,
    /// Sum of approved amounts.
    pub approved_total: Decimal,
    /// Sum of posted amounts.
    pub posted_total: Decimal,
    /// Sum of pending amounts.
    pub pending_total: Decimal,
    /// `total_budget - approved_total`.
    pub remaining_total: Decimal,
    /// `approved_total / total_budget * 100`, two decimal places.
    pub percent_used: Decimal,
    /// Contingency pool size.
    pub contingency_total: Decimal,
    /// Contingency held by live expenses.
    pub contingency_drawn: Decimal,
    /// Contingency still drawable.
    pub contingency_remaining: Decimal,
    /// Pool assigned to neither a category nor contingency.
    pub unallocated_amount: Decimal,
    /// Categories flagged over budget.
    pub over_budget_categories: Vec<String>,
}

/// Point-in-time variance report. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarianceSnapshot {
    /// Event the report is for.
    pub event_id: EventId,
    /// Currency of every amount.
    pub currency: Currency,
    /// Configuration revision the report was computed against.
    pub revision: u32,
    /// Requested categories, in configuration order.
    pub categories: Vec<CategoryVariance>,
    /// Event-wide totals, independent of the category filter.
    pub summary: VarianceSummary,
}

impl VarianceSnapshot {
    /// Finds a category line by name (case-insensitive).
    #[must_use]
    pub fn category(&self, name: &str) -> Option<&CategoryVariance> {
        let needle = name.trim();
        self.categories
            .iter()
            .find(|c| c.category.eq_ignore_ascii_case(needle))
    }
}
