//! Budget configuration types.

use chrono::{DateTime, Utc};
use eventiq_shared::types::{Currency, EventId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::BudgetError;

/// A named slice of the budget pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAllocation {
    /// Category name (unique within a configuration, case-insensitive).
    pub name: String,
    /// Share of the total pool, 0-100.
    pub allocated_percent: Decimal,
}

impl CategoryAllocation {
    /// Creates a category allocation.
    pub fn new(name: impl Into<String>, allocated_percent: Decimal) -> Self {
        Self {
            name: name.into(),
            allocated_percent,
        }
    }
}

/// Structured allocation request accepted by `create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRequest {
    /// Total pool for the event.
    pub total_amount: Decimal,
    /// Currency code, e.g. "USD".
    pub currency: String,
    /// Ordered category list.
    pub categories: Vec<CategoryAllocation>,
    /// Shared contingency reserve, 0-100.
    pub contingency_percent: Decimal,
    /// When the event (and its spending) starts.
    pub event_start: DateTime<Utc>,
    /// When the event ends, if declared.
    pub event_end: Option<DateTime<Utc>>,
}

/// Lifecycle status of a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationStatus {
    /// Accepts revisions and expenses.
    Active,
    /// Read-only; kept for audit history.
    Archived,
}

/// Per-category commitments, as seen by the ledger.
///
/// Used to check that a revision cannot orphan or undercut existing spend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryUsage {
    /// Expenses in PendingApproval, Approved or Posted.
    pub live_count: usize,
    /// Expenses in Posted.
    pub posted_count: usize,
    /// Sum of amounts reserving capacity (PendingApproval + Approved + Posted).
    pub reserved: Decimal,
    /// Part of `reserved` covered by the contingency pool.
    pub contingency_drawn: Decimal,
}

impl CategoryUsage {
    /// Amount reserved against the category's own allocation.
    #[must_use]
    pub fn own_reserved(&self) -> Decimal {
        self.reserved - self.contingency_drawn
    }
}

/// The budget for one event: total pool, category split, contingency reserve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfiguration {
    /// Event this budget belongs to.
    pub event_id: EventId,
    /// Total pool. `create` guarantees `total_amount * 100` is representable.
    pub total_amount: Decimal,
    /// Currency of every amount in this budget.
    pub currency: Currency,
    /// Shared contingency reserve, 0-100.
    pub contingency_percent: Decimal,
    /// Ordered categories.
    pub categories: Vec<CategoryAllocation>,
    /// Event start.
    pub event_start: DateTime<Utc>,
    /// Event end, if declared.
    pub event_end: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: ConfigurationStatus,
    /// Incremented on every successful revision.
    pub revision: u32,
    /// Organizer who created the budget.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl BudgetConfiguration {
    /// Looks up a category by name (trimmed, case-insensitive).
    #[must_use]
    pub fn category(&self, name: &str) -> Option<&CategoryAllocation> {
        let needle = name.trim();
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(needle))
    }

    /// Allocated amount for a category, computed on demand.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::UnknownCategory` if the category is absent.
    pub fn allocated_amount(&self, name: &str) -> Result<Decimal, BudgetError> {
        self.category(name)
            .map(|c| self.allocation_amount(c))
            .ok_or_else(|| BudgetError::UnknownCategory(name.trim().to_string()))
    }

    /// Amount for one of this configuration's categories.
    #[must_use]
    pub fn allocation_amount(&self, allocation: &CategoryAllocation) -> Decimal {
        self.percent_of_total(allocation.allocated_percent)
    }

    /// Size of the shared contingency pool.
    #[must_use]
    pub fn contingency_amount(&self) -> Decimal {
        self.percent_of_total(self.contingency_percent)
    }

    /// Sum of category percentages (contingency excluded).
    #[must_use]
    pub fn allocated_percent_total(&self) -> Decimal {
        self.categories.iter().map(|c| c.allocated_percent).sum()
    }

    /// Percent of the pool assigned to neither a category nor contingency.
    #[must_use]
    pub fn unallocated_percent(&self) -> Decimal {
        Decimal::ONE_HUNDRED - self.allocated_percent_total() - self.contingency_percent
    }

    /// Amount assigned to neither a category nor contingency.
    #[must_use]
    pub fn unallocated_amount(&self) -> Decimal {
        self.percent_of_total(self.unallocated_percent())
    }

    /// Returns true while the configuration accepts mutations.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ConfigurationStatus::Active
    }

    /// Fails with `ConfigurationArchived` unless the configuration is active.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::ConfigurationArchived` for archived budgets.
    pub fn ensure_active(&self) -> Result<(), BudgetError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(BudgetError::ConfigurationArchived)
        }
    }

    fn percent_of_total(&self, percent: Decimal) -> Decimal {
        self.total_amount * percent / Decimal::ONE_HUNDRED
    }
}

/// Normalized key used to match category names across revisions.
#[must_use]
pub fn category_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}
