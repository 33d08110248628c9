//! Budget engine error types.
//!
//! Every rejected operation returns one of these variants. None of them are
//! fatal; validation variants are raised before any state changes.

use eventiq_shared::AppError;
use eventiq_shared::types::{EventId, ExpenseId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::approval::Role;
use crate::ledger::ExpenseStatus;

/// Errors that can occur in the budget engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BudgetError {
    /// Allocation request is malformed (percentages, names, amounts, schedule).
    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),

    /// Revision would orphan or undercut committed spend.
    #[error("Allocation locked: {0}")]
    AllocationLocked(String),

    /// Category is not part of the current configuration.
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    /// Submission would push the category past its capacity.
    #[error("Expense of {requested} exceeds available {available} in category {category}")]
    ExceedsAvailable {
        /// Category the expense was submitted against.
        category: String,
        /// Amount requested.
        requested: Decimal,
        /// Capacity left for this submission.
        available: Decimal,
    },

    /// Role is not known to the approval threshold table.
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Attempted an invalid status transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: ExpenseStatus,
        /// The attempted target status.
        to: ExpenseStatus,
    },

    /// Actor's role does not carry the required authority.
    #[error("Role {role} does not meet required role {required}")]
    InsufficientRole {
        /// The actor's role.
        role: Role,
        /// The role the operation needs.
        required: Role,
    },

    /// Forecast cannot be computed for this event.
    #[error("Indeterminate forecast: {0}")]
    IndeterminateForecast(String),

    /// Event lock could not be acquired within the bounded wait.
    #[error("Budget is locked by another operation (waited {waited_ms} ms)")]
    BudgetLocked {
        /// How long the caller waited.
        waited_ms: u64,
    },

    /// Expense amount is not a positive decimal.
    #[error("Expense amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    /// Expense does not exist in the ledger.
    #[error("Expense {0} not found")]
    ExpenseNotFound(ExpenseId),

    /// Event has no budget in the registry.
    #[error("No budget configured for event {0}")]
    EventNotFound(EventId),

    /// Event already has a budget in the registry.
    #[error("Budget already exists for event {0}")]
    EventAlreadyExists(EventId),

    /// Rejection requires a reason.
    #[error("Rejection reason is required")]
    RejectionReasonRequired,

    /// Posting requires a receipt reference.
    #[error("Receipt reference is required to post an expense")]
    ReceiptRequired,

    /// Configuration is archived and no longer accepts mutations.
    #[error("Budget configuration is archived")]
    ConfigurationArchived,
}

impl BudgetError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidAllocation(_)
            | Self::UnknownCategory(_)
            | Self::UnknownRole(_)
            | Self::InvalidTransition { .. }
            | Self::InvalidAmount(_)
            | Self::RejectionReasonRequired
            | Self::ReceiptRequired => 400,

            Self::InsufficientRole { .. } => 403,

            Self::ExpenseNotFound(_) | Self::EventNotFound(_) => 404,

            Self::AllocationLocked(_)
            | Self::EventAlreadyExists(_)
            | Self::ConfigurationArchived => 409,

            Self::ExceedsAvailable { .. } | Self::IndeterminateForecast(_) => 422,

            Self::BudgetLocked { .. } => 503,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAllocation(_) => "INVALID_ALLOCATION",
            Self::AllocationLocked(_) => "ALLOCATION_LOCKED",
            Self::UnknownCategory(_) => "UNKNOWN_CATEGORY",
            Self::ExceedsAvailable { .. } => "EXCEEDS_AVAILABLE",
            Self::UnknownRole(_) => "UNKNOWN_ROLE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::InsufficientRole { .. } => "INSUFFICIENT_ROLE",
            Self::IndeterminateForecast(_) => "INDETERMINATE_FORECAST",
            Self::BudgetLocked { .. } => "BUDGET_LOCKED",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::ExpenseNotFound(_) => "EXPENSE_NOT_FOUND",
            Self::EventNotFound(_) => "EVENT_NOT_FOUND",
            Self::EventAlreadyExists(_) => "EVENT_ALREADY_EXISTS",
            Self::RejectionReasonRequired => "REJECTION_REASON_REQUIRED",
            Self::ReceiptRequired => "RECEIPT_REQUIRED",
            Self::ConfigurationArchived => "CONFIGURATION_ARCHIVED",
        }
    }

    /// Returns true if retrying the same call unchanged may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BudgetLocked { .. })
    }
}

impl From<BudgetError> for AppError {
    fn from(err: BudgetError) -> Self {
        let message = err.to_string();
        match err {
            BudgetError::InvalidAllocation(_)
            | BudgetError::UnknownCategory(_)
            | BudgetError::UnknownRole(_)
            | BudgetError::InvalidAmount(_)
            | BudgetError::RejectionReasonRequired
            | BudgetError::ReceiptRequired => Self::Validation(message),
            BudgetError::InsufficientRole { .. } => Self::Forbidden(message),
            BudgetError::ExpenseNotFound(_) | BudgetError::EventNotFound(_) => {
                Self::NotFound(message)
            }
            BudgetError::EventAlreadyExists(_) | BudgetError::ConfigurationArchived => {
                Self::Conflict(message)
            }
            BudgetError::AllocationLocked(_)
            | BudgetError::ExceedsAvailable { .. }
            | BudgetError::InvalidTransition { .. }
            | BudgetError::IndeterminateForecast(_) => Self::BusinessRule(message),
            BudgetError::BudgetLocked { .. } => Self::Unavailable(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_exceeds_available_error() {
        let err = BudgetError::ExceedsAvailable {
            category: "Catering".to_string(),
            requested: dec!(2000),
            available: dec!(1000),
        };
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.error_code(), "EXCEEDS_AVAILABLE");
        assert!(err.to_string().contains("Catering"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = BudgetError::InvalidTransition {
            from: ExpenseStatus::Rejected,
            to: ExpenseStatus::Approved,
        };
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
        assert!(err.to_string().contains("rejected"));
        assert!(err.to_string().contains("approved"));
    }

    #[test]
    fn test_insufficient_role_error() {
        let err = BudgetError::InsufficientRole {
            role: Role::Volunteer,
            required: Role::Manager,
        };
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.error_code(), "INSUFFICIENT_ROLE");
        assert!(err.to_string().contains("volunteer"));
    }

    #[test]
    fn test_budget_locked_is_retryable() {
        let err = BudgetError::BudgetLocked { waited_ms: 250 };
        assert_eq!(err.status_code(), 503);
        assert!(err.is_retryable());

        let app: AppError = err.into();
        assert!(app.is_retryable());
    }

    #[test]
    fn test_validation_errors_map_to_app_validation() {
        let app: AppError = BudgetError::UnknownCategory("Gifts".to_string()).into();
        assert_eq!(app.error_code(), "VALIDATION_ERROR");

        let app: AppError = BudgetError::UnknownRole("intern".to_string()).into();
        assert_eq!(app.status_code(), 400);
    }

    #[test]
    fn test_business_rule_errors_map_to_422() {
        let app: AppError = BudgetError::AllocationLocked("posted spend".to_string()).into();
        assert_eq!(app.status_code(), 422);

        let app: AppError = BudgetError::IndeterminateForecast("no end".to_string()).into();
        assert_eq!(app.error_code(), "BUSINESS_RULE_VIOLATION");
    }
}
