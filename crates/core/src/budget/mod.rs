//! Budget configuration: total pool, category allocations, contingency reserve.

pub mod error;
pub mod service;
pub mod types;


pub use error::BudgetError;
pub use service::BudgetService;
pub use types::{
    AllocationRequest, BudgetConfiguration, CategoryAllocation, CategoryUsage,
    ConfigurationStatus, category_key,
};
