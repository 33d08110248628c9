//! Expense ledger domain types.

use chrono::{DateTime, Utc};
use eventiq_shared::types::{ExpenseId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::approval::{RequiredApproval, Role};
use crate::budget::category_key;

/// Expense status in the approval workflow.
///
/// The valid transitions are:
/// - Draft → PendingApproval (submit)
/// - Draft → Approved (submit, auto-approved by policy)
/// - PendingApproval → Approved (approve)
/// - PendingApproval → Rejected (reject, terminal)
/// - Approved → Posted (post, terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    /// Recorded but not yet submitted; reserves nothing.
    Draft,
    /// Submitted and waiting for a manager.
    PendingApproval,
    /// Approved, waiting for receipt confirmation.
    Approved,
    /// Rejected by a manager (terminal).
    Rejected,
    /// Paid with receipt confirmed (terminal).
    Posted,
}

impl ExpenseStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Posted => "posted",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "pending_approval" | "pending" => Some(Self::PendingApproval),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "posted" => Some(Self::Posted),
            _ => None,
        }
    }

    /// Returns true if the amount holds category capacity.
    #[must_use]
    pub fn reserves_capacity(&self) -> bool {
        matches!(self, Self::PendingApproval | Self::Approved | Self::Posted)
    }

    /// Returns true if the amount counts as approved spend.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Approved | Self::Posted)
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Expense submission from the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseSubmission {
    /// Category to charge.
    pub category_name: String,
    /// Positive amount in the budget currency.
    pub amount: Decimal,
    /// Opaque vendor reference.
    pub vendor_ref: String,
    /// Opaque receipt reference, if already uploaded.
    pub receipt_ref: Option<String>,
    /// Allow the shared contingency pool to cover what the category cannot.
    pub draw_contingency: bool,
    /// Free-form description.
    pub description: Option<String>,
}

impl ExpenseSubmission {
    /// Creates a submission without contingency draw.
    pub fn new(
        category_name: impl Into<String>,
        amount: Decimal,
        vendor_ref: impl Into<String>,
    ) -> Self {
        Self {
            category_name: category_name.into(),
            amount,
            vendor_ref: vendor_ref.into(),
            receipt_ref: None,
            draw_contingency: false,
            description: None,
        }
    }

    /// Requests a contingency draw if the category allocation is exhausted.
    #[must_use]
    pub fn drawing_contingency(mut self) -> Self {
        self.draw_contingency = true;
        self
    }

    /// Attaches a receipt reference.
    #[must_use]
    pub fn with_receipt(mut self, receipt_ref: impl Into<String>) -> Self {
        self.receipt_ref = Some(receipt_ref.into());
        self
    }
}

/// An expense record. Never deleted; rejection is a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    /// Expense ID.
    pub id: ExpenseId,
    /// Category (canonical name at submission).
    pub category_name: String,
    /// Amount.
    pub amount: Decimal,
    /// Opaque vendor reference.
    pub vendor_ref: String,
    /// Opaque receipt reference.
    pub receipt_ref: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// Submitter.
    pub submitted_by: UserId,
    /// Submitter's role at submission.
    pub submitter_role: Role,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record left Draft.
    pub submitted_at: Option<DateTime<Utc>>,
    /// Current status.
    pub status: ExpenseStatus,
    /// Whether the submitter asked to draw on contingency.
    pub draw_contingency_requested: bool,
    /// Approval requirement snapshotted at submission.
    pub required_approval: Option<RequiredApproval>,
    /// Part of `amount` covered by the contingency pool.
    pub contingency_draw: Decimal,
    /// Approver (the submitter for auto-approvals).
    pub approved_by: Option<UserId>,
    /// Rejecting manager.
    pub rejected_by: Option<UserId>,
    /// When approval or rejection happened.
    pub decided_at: Option<DateTime<Utc>>,
    /// Reason given on rejection.
    pub rejection_reason: Option<String>,
    /// Who confirmed the receipt.
    pub posted_by: Option<UserId>,
    /// When the receipt was confirmed.
    pub posted_at: Option<DateTime<Utc>>,
}

impl ExpenseRecord {
    /// Returns true if the expense was approved without a manager.
    #[must_use]
    pub fn is_auto_approved(&self) -> bool {
        self.status.is_committed() && self.required_approval == Some(RequiredApproval::AutoApproved)
    }

    /// Returns true if the expense belongs to the category (case-insensitive).
    #[must_use]
    pub fn in_category(&self, name: &str) -> bool {
        category_key(&self.category_name) == category_key(name)
    }
}

/// Filter for listing expenses. Empty fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseFilter {
    /// Only this category.
    pub category: Option<String>,
    /// Only this status.
    pub status: Option<ExpenseStatus>,
    /// Only this submitter.
    pub submitted_by: Option<UserId>,
}

impl ExpenseFilter {
    /// Returns true if the record passes every set criterion.
    #[must_use]
    pub fn matches(&self, record: &ExpenseRecord) -> bool {
        self.category.as_deref().is_none_or(|c| record.in_category(c))
            && self.status.is_none_or(|s| record.status == s)
            && self.submitted_by.is_none_or(|u| record.submitted_by == u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str() {
        assert_eq!(ExpenseStatus::Draft.as_str(), "draft");
        assert_eq!(ExpenseStatus::PendingApproval.as_str(), "pending_approval");
        assert_eq!(ExpenseStatus::Approved.as_str(), "approved");
        assert_eq!(ExpenseStatus::Rejected.as_str(), "rejected");
        assert_eq!(ExpenseStatus::Posted.as_str(), "posted");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(ExpenseStatus::parse("PENDING"), Some(ExpenseStatus::PendingApproval));
        assert_eq!(ExpenseStatus::parse("Posted"), Some(ExpenseStatus::Posted));
        assert_eq!(ExpenseStatus::parse("voided"), None);
    }

    #[test]
    fn test_status_capacity_classification() {
        assert!(!ExpenseStatus::Draft.reserves_capacity());
        assert!(ExpenseStatus::PendingApproval.reserves_capacity());
        assert!(ExpenseStatus::Approved.reserves_capacity());
        assert!(!ExpenseStatus::Rejected.reserves_capacity());
        assert!(ExpenseStatus::Posted.reserves_capacity());

        assert!(!ExpenseStatus::PendingApproval.is_committed());
        assert!(ExpenseStatus::Approved.is_committed());
        assert!(ExpenseStatus::Posted.is_committed());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ExpenseStatus::PendingApproval).unwrap();
        assert_eq!(json, "\"pending_approval\"");
    }
}
