//! Expense state machine.
//!
//! Validates status transitions and produces the audit data each transition
//! stamps on the record. Nothing here touches the ledger; the ledger applies
//! the returned action once every other check has passed.

use chrono::{DateTime, Utc};
use eventiq_shared::types::UserId;

use crate::approval::RequiredApproval;
use crate::budget::BudgetError;
use crate::ledger::types::{ExpenseRecord, ExpenseStatus};

/// A validated transition with its audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpenseAction {
    /// Draft submitted; lands in PendingApproval or, when auto-approved, Approved.
    Submit {
        /// The new status after submission.
        new_status: ExpenseStatus,
        /// Policy answer, snapshotted on the record.
        required_approval: RequiredApproval,
        /// The submitter.
        submitted_by: UserId,
        /// When the expense was submitted.
        submitted_at: DateTime<Utc>,
    },
    /// Pending expense approved by a manager.
    Approve {
        /// The approving user.
        approved_by: UserId,
        /// When it was approved.
        approved_at: DateTime<Utc>,
    },
    /// Pending expense rejected by a manager.
    Reject {
        /// The rejecting user.
        rejected_by: UserId,
        /// When it was rejected.
        rejected_at: DateTime<Utc>,
        /// The reason for rejection.
        reason: String,
    },
    /// Approved expense paid and receipt confirmed.
    Post {
        /// Who confirmed the receipt.
        posted_by: UserId,
        /// When it was posted.
        posted_at: DateTime<Utc>,
        /// Receipt reference to stamp.
        receipt_ref: String,
    },
}

impl ExpenseAction {
    /// Returns the new status resulting from this action.
    #[must_use]
    pub fn new_status(&self) -> ExpenseStatus {
        match self {
            Self::Submit { new_status, .. } => *new_status,
            Self::Approve { .. } => ExpenseStatus::Approved,
            Self::Reject { .. } => ExpenseStatus::Rejected,
            Self::Post { .. } => ExpenseStatus::Posted,
        }
    }

    /// Stamps the action onto a record.
    pub fn apply(self, record: &mut ExpenseRecord) {
        record.status = self.new_status();
        match self {
            Self::Submit {
                required_approval,
                submitted_by,
                submitted_at,
                new_status,
            } => {
                record.required_approval = Some(required_approval);
                record.submitted_at = Some(submitted_at);
                if new_status == ExpenseStatus::Approved {
                    record.approved_by = Some(submitted_by);
                    record.decided_at = Some(submitted_at);
                }
            }
            Self::Approve {
                approved_by,
                approved_at,
            } => {
                record.approved_by = Some(approved_by);
                record.decided_at = Some(approved_at);
            }
            Self::Reject {
                rejected_by,
                rejected_at,
                reason,
            } => {
                record.rejected_by = Some(rejected_by);
                record.decided_at = Some(rejected_at);
                record.rejection_reason = Some(reason);
            }
            Self::Post {
                posted_by,
                posted_at,
                receipt_ref,
            } => {
                record.posted_by = Some(posted_by);
                record.posted_at = Some(posted_at);
                record.receipt_ref = Some(receipt_ref);
            }
        }
    }
}

/// Stateless service validating expense transitions.
pub struct ExpenseWorkflow;

impl ExpenseWorkflow {
    /// Submit a draft expense.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::InvalidTransition` if not in Draft status.
    pub fn submit(
        current_status: ExpenseStatus,
        required_approval: RequiredApproval,
        submitted_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<ExpenseAction, BudgetError> {
        let new_status = match required_approval {
            RequiredApproval::AutoApproved => ExpenseStatus::Approved,
            RequiredApproval::ManagerApprovalRequired => ExpenseStatus::PendingApproval,
        };

        match current_status {
            ExpenseStatus::Draft => Ok(ExpenseAction::Submit {
                new_status,
                required_approval,
                submitted_by,
                submitted_at: now,
            }),
            _ => Err(BudgetError::InvalidTransition {
                from: current_status,
                to: new_status,
            }),
        }
    }

    /// Approve a pending expense.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::InvalidTransition` if not in PendingApproval status.
    pub fn approve(
        current_status: ExpenseStatus,
        approved_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<ExpenseAction, BudgetError> {
        match current_status {
            ExpenseStatus::PendingApproval => Ok(ExpenseAction::Approve {
                approved_by,
                approved_at: now,
            }),
            _ => Err(BudgetError::InvalidTransition {
                from: current_status,
                to: ExpenseStatus::Approved,
            }),
        }
    }

    /// Reject a pending expense.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` if not in PendingApproval status
    /// - `RejectionReasonRequired` if the reason is blank
    pub fn reject(
        current_status: ExpenseStatus,
        rejected_by: UserId,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<ExpenseAction, BudgetError> {
        if current_status != ExpenseStatus::PendingApproval {
            return Err(BudgetError::InvalidTransition {
                from: current_status,
                to: ExpenseStatus::Rejected,
            });
        }

        let reason = reason.trim().to_string();
        if reason.is_empty() {
            return Err(BudgetError::RejectionReasonRequired);
        }

        Ok(ExpenseAction::Reject {
            rejected_by,
            rejected_at: now,
            reason,
        })
    }

    /// Post an approved expense once its receipt is confirmed.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` unless in Approved status
    /// - `ReceiptRequired` if the receipt reference is blank
    pub fn post(
        current_status: ExpenseStatus,
        posted_by: UserId,
        receipt_ref: String,
        now: DateTime<Utc>,
    ) -> Result<ExpenseAction, BudgetError> {
        if current_status != ExpenseStatus::Approved {
            return Err(BudgetError::InvalidTransition {
                from: current_status,
                to: ExpenseStatus::Posted,
            });
        }

        let receipt_ref = receipt_ref.trim().to_string();
        if receipt_ref.is_empty() {
            return Err(BudgetError::ReceiptRequired);
        }

        Ok(ExpenseAction::Post {
            posted_by,
            posted_at: now,
            receipt_ref,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ExpenseStatus; 5] = [
        ExpenseStatus::Draft,
        ExpenseStatus::PendingApproval,
        ExpenseStatus::Approved,
        ExpenseStatus::Rejected,
        ExpenseStatus::Posted,
    ];

    #[test]
    fn test_submit_routes_by_policy() {
        let user = UserId::new();
        let auto = ExpenseWorkflow::submit(
            ExpenseStatus::Draft,
            RequiredApproval::AutoApproved,
            user,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(auto.new_status(), ExpenseStatus::Approved);

        let manual = ExpenseWorkflow::submit(
            ExpenseStatus::Draft,
            RequiredApproval::ManagerApprovalRequired,
            user,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(manual.new_status(), ExpenseStatus::PendingApproval);
    }

    #[test]
    fn test_submit_twice_fails() {
        let result = ExpenseWorkflow::submit(
            ExpenseStatus::PendingApproval,
            RequiredApproval::ManagerApprovalRequired,
            UserId::new(),
            Utc::now(),
        );
        assert!(matches!(result, Err(BudgetError::InvalidTransition { .. })));
    }

    #[test]
    fn test_approve_only_from_pending() {
        for status in ALL {
            let result = ExpenseWorkflow::approve(status, UserId::new(), Utc::now());
            assert_eq!(result.is_ok(), status == ExpenseStatus::PendingApproval);
        }
    }

    #[test]
    fn test_reject_requires_reason() {
        let result = ExpenseWorkflow::reject(
            ExpenseStatus::PendingApproval,
            UserId::new(),
            "   ".to_string(),
            Utc::now(),
        );
        assert_eq!(result, Err(BudgetError::RejectionReasonRequired));
    }

    #[test]
    fn test_reject_rejected_is_invalid_transition() {
        let result = ExpenseWorkflow::reject(
            ExpenseStatus::Rejected,
            UserId::new(),
            "duplicate".to_string(),
            Utc::now(),
        );
        assert_eq!(
            result,
            Err(BudgetError::InvalidTransition {
                from: ExpenseStatus::Rejected,
                to: ExpenseStatus::Rejected,
            })
        );
    }

    #[test]
    fn test_post_only_from_approved_with_receipt() {
        for status in ALL {
            let result =
                ExpenseWorkflow::post(status, UserId::new(), "rcpt-1".to_string(), Utc::now());
            assert_eq!(result.is_ok(), status == ExpenseStatus::Approved);
        }

        let result = ExpenseWorkflow::post(
            ExpenseStatus::Approved,
            UserId::new(),
            String::new(),
            Utc::now(),
        );
        assert_eq!(result, Err(BudgetError::ReceiptRequired));
    }
}
