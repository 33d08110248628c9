//! Notification types and the delivery seam.

use std::fmt;

use chrono::{DateTime, Utc};
use eventiq_shared::types::{EventId, ExpenseId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::{ExpenseRecord, ExpenseStatus};

/// Delivery errors. Never roll back the transition that produced the notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// The channel refused or failed to deliver.
    #[error("Failed to deliver notification: {0}")]
    Delivery(String),
    /// The channel is temporarily unreachable.
    #[error("Notification channel unavailable: {0}")]
    Unavailable(String),
}

/// What happened to the expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Submitted and waiting for a manager.
    ApprovalRequested,
    /// Approved by a manager or by policy.
    Approved,
    /// Rejected by a manager.
    Rejected,
    /// Receipt confirmed.
    Posted,
}

impl NotificationKind {
    /// The kind announcing a record's current status, if any.
    #[must_use]
    pub fn for_status(status: ExpenseStatus) -> Option<Self> {
        match status {
            ExpenseStatus::PendingApproval => Some(Self::ApprovalRequested),
            ExpenseStatus::Approved => Some(Self::Approved),
            ExpenseStatus::Rejected => Some(Self::Rejected),
            ExpenseStatus::Posted => Some(Self::Posted),
            ExpenseStatus::Draft => None,
        }
    }

    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApprovalRequested => "approval_requested",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Posted => "posted",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message produced by a committed ledger transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Event the expense belongs to.
    pub event_id: EventId,
    /// Expense the message is about.
    pub expense_id: ExpenseId,
    /// Transition that produced it.
    pub kind: NotificationKind,
    /// Category of the expense.
    pub category: String,
    /// Expense amount.
    pub amount: Decimal,
    /// Who submitted the expense.
    pub submitted_by: UserId,
    /// Who caused the transition.
    pub actor: UserId,
    /// Rejection reason, for `Rejected`.
    pub reason: Option<String>,
    /// When the transition committed.
    pub occurred_at: DateTime<Utc>,
}

impl Notification {
    /// Builds the notification for a record's current status.
    #[must_use]
    pub fn for_record(
        event_id: EventId,
        record: &ExpenseRecord,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> Option<Self> {
        let kind = NotificationKind::for_status(record.status)?;
        Some(Self {
            event_id,
            expense_id: record.id,
            kind,
            category: record.category_name.clone(),
            amount: record.amount,
            submitted_by: record.submitted_by,
            actor,
            reason: record.rejection_reason.clone(),
            occurred_at,
        })
    }
}

/// Delivery channel supplied by the notification collaborator (email, SMS, ...).
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` if delivery fails; the outbox retries later.
    fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}
