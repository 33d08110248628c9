//! Budget engine for EventIQ.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! It allocates a fixed pool of money across categories, runs expense submissions
//! through an approval workflow without overcommitting, and derives variance and
//! spend forecasts from ledger state.
//!
//! # Modules
//!
//! - `budget` - Budget configuration (pool, categories, contingency) and the error taxonomy
//! - `approval` - Roles and the approval threshold policy
//! - `ledger` - Expense records and their approval state machine
//! - `variance` - Allocated vs committed vs posted per category
//! - `forecast` - End-of-event spend projection from posted velocity
//! - `event` - Per-event exclusive owner, registry, and clock
//! - `notify` - Post-commit notification outbox

pub mod approval;
pub mod budget;
pub mod event;
pub mod forecast;
pub mod ledger;
pub mod notify;
pub mod variance;

pub use budget::BudgetError;
