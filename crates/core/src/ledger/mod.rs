//! Expense ledger.
//!
//! This module implements:
//! - Expense records and their status
//! - The approval state machine
//! - Category capacity checks with contingency draw
//! - The ledger that owns every record for one event

pub mod capacity;
pub mod service;
pub mod types;
pub mod workflow;

#[cfg(test)]
mod service_props;

pub use capacity::Headroom;
pub use service::ExpenseLedger;
pub use types::{ExpenseFilter, ExpenseRecord, ExpenseStatus, ExpenseSubmission};
pub use workflow::{ExpenseAction, ExpenseWorkflow};
