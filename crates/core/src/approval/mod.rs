//! Roles and the approval threshold policy.
//!
//! # Modules
//!
//! - `role` - Closed, ordered role set and the acting identity
//! - `policy` - Threshold table and authority checks

pub mod policy;
pub mod role;

#[cfg(test)]
mod policy_props;

pub use policy::{ApprovalPolicy, ApprovalThresholds, RequiredApproval};
pub use role::{Actor, Role};
