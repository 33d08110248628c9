//! Variance: allocated vs committed vs posted, per category and event-wide.

pub mod analyzer;
pub mod types;


pub use analyzer::{DEFAULT_ALERT_THRESHOLD_PERCENT, VarianceAnalyzer};
pub use types::{CategoryVariance, VarianceSnapshot, VarianceStatus, VarianceSummary};
