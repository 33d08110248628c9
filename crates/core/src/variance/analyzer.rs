//! Variance computation over a configuration and ledger.

use rust_decimal::Decimal;

use super::types::{CategoryVariance, VarianceSnapshot, VarianceStatus, VarianceSummary};
use crate::budget::{BudgetConfiguration, BudgetError, CategoryAllocation};
use crate::ledger::{ExpenseLedger, ExpenseStatus};

/// Default percent-used at which a category is flagged `NearLimit`.
pub const DEFAULT_ALERT_THRESHOLD_PERCENT: Decimal = Decimal::from_parts(80, 0, 0, false, 0);

/// Pure read-side projection; holds only its alert threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarianceAnalyzer {
    alert_threshold_percent: Decimal,
}

impl Default for VarianceAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_THRESHOLD_PERCENT)
    }
}

impl VarianceAnalyzer {
    /// Creates an analyzer with the given `NearLimit` threshold.
    #[must_use]
    pub const fn new(alert_threshold_percent: Decimal) -> Self {
        Self {
            alert_threshold_percent,
        }
    }

    /// Variance for one category or, with `None`, all of them.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::UnknownCategory` if a named category is absent.
    pub fn snapshot(
        &self,
        config: &BudgetConfiguration,
        ledger: &ExpenseLedger,
        category: Option<&str>,
    ) -> Result<VarianceSnapshot, BudgetError> {
        let all: Vec<_> = config
            .categories
            .iter()
            .map(|c| self.category_variance(config, ledger, c))
            .collect();

        let summary = Self::summarize(config, ledger, &all);

        let categories = match category {
            None => all,
            Some(name) => {
                let wanted = config
                    .category(name)
                    .ok_or_else(|| BudgetError::UnknownCategory(name.trim().to_string()))?;
                all.into_iter().filter(|c| c.category == wanted.name).collect()
            }
        };

        Ok(VarianceSnapshot {
            event_id: config.event_id,
            currency: config.currency,
            revision: config.revision,
            categories,
            summary,
        })
    }

    fn category_variance(
        &self,
        config: &BudgetConfiguration,
        ledger: &ExpenseLedger,
        allocation: &CategoryAllocation,
    ) -> CategoryVariance {
        let allocated_amount = config.allocation_amount(allocation);

        let mut line = CategoryVariance {
            category: allocation.name.clone(),
            allocated_percent: allocation.allocated_percent,
            allocated_amount,
            approved_amount: Decimal::ZERO,
            posted_amount: Decimal::ZERO,
            pending_amount: Decimal::ZERO,
            remaining: Decimal::ZERO,
            percent_used: Decimal::ZERO,
            approved_count: 0,
            pending_count: 0,
            posted_count: 0,
            awaiting_receipt_count: 0,
            contingency_drawn: Decimal::ZERO,
            status: VarianceStatus::WithinAllocation,
        };

        for record in ledger
            .records()
            .iter()
            .filter(|r| r.in_category(&allocation.name))
        {
            match record.status {
                ExpenseStatus::PendingApproval => {
                    line.pending_amount += record.amount;
                    line.pending_count += 1;
                }
                ExpenseStatus::Approved => {
                    line.approved_amount += record.amount;
                    line.approved_count += 1;
                    line.awaiting_receipt_count += 1;
                }
                ExpenseStatus::Posted => {
                    line.approved_amount += record.amount;
                    line.posted_amount += record.amount;
                    line.approved_count += 1;
                    line.posted_count += 1;
                }
                ExpenseStatus::Draft | ExpenseStatus::Rejected => continue,
            }
            line.contingency_drawn += record.contingency_draw;
        }

        line.remaining = allocated_amount - line.approved_amount;
        line.percent_used = percent_of(line.approved_amount, allocated_amount);
        // a category only holds contingency once its own allocation is spoken for
        line.status = if line.remaining < Decimal::ZERO || line.contingency_drawn > Decimal::ZERO {
            VarianceStatus::OverBudget
        } else if allocated_amount > Decimal::ZERO
            && line.percent_used >= self.alert_threshold_percent
        {
            VarianceStatus::NearLimit
        } else {
            VarianceStatus::WithinAllocation
        };
        line
    }

    fn summarize(
        config: &BudgetConfiguration,
        ledger: &ExpenseLedger,
        lines: &[CategoryVariance],
    ) -> VarianceSummary {
        let approved_total: Decimal = lines.iter().map(|l| l.approved_amount).sum();
        let contingency_total = config.contingency_amount();
        let contingency_drawn = ledger.contingency_drawn();

        VarianceSummary {
            total_budget: config.total_amount,
            allocated_total: lines.iter().map(|l| l.allocated_amount).sum(),
            approved_total,
            posted_total: lines.iter().map(|l| l.posted_amount).sum(),
            pending_total: lines.iter().map(|l| l.pending_amount).sum(),
            remaining_total: config.total_amount - approved_total,
            percent_used: percent_of(approved_total, config.total_amount),
            contingency_total,
            contingency_drawn,
            contingency_remaining: (contingency_total - contingency_drawn).max(Decimal::ZERO),
            unallocated_amount: config.unallocated_amount(),
            over_budget_categories: lines
                .iter()
                .filter(|l| l.status == VarianceStatus::OverBudget)
                .map(|l| l.category.clone())
                .collect(),
        }
    }
}

/// `part / whole * 100` to two places; zero for an empty whole, saturating
/// for a vanishingly small one.
fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    part.checked_div(whole).map_or(Decimal::MAX, |ratio| {
        ratio.saturating_mul(Decimal::ONE_HUNDRED).round_dp(2)
    })
}
