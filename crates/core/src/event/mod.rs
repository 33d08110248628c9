//! Per-event ownership of budget state.
//!
//! # Modules
//!
//! - `budget` - `EventBudget`, the single writer for one event
//! - `registry` - `BudgetRegistry`, event id to budget
//! - `clock` - Time source
//! - `settings` - Engine settings resolved from `AppConfig`

pub mod budget;
pub mod clock;
pub mod registry;
pub mod settings;

#[cfg(test)]
mod tests;

pub use budget::{EventBudget, LedgerView};
pub use clock::{Clock, FixedClock, SystemClock};
pub use registry::BudgetRegistry;
pub use settings::EngineSettings;
