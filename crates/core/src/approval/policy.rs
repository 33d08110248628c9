//! Approval threshold policy.
//!
//! Maps a submitter's role and an expense amount to the approval the expense
//! needs, and checks whether an actor may decide on a pending expense. The
//! policy is a pure evaluator; the ledger snapshots its answer at submission
//! so later threshold changes never touch decided expenses.

use std::collections::BTreeMap;

use eventiq_shared::config::ApprovalConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::role::Role;
use crate::budget::BudgetError;

/// Approval an expense needs, decided at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredApproval {
    /// Within the submitter's auto-approve threshold.
    AutoApproved,
    /// Must be approved or rejected by a manager.
    ManagerApprovalRequired,
}

/// Per-role maximum auto-approve amount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalThresholds {
    limits: BTreeMap<Role, Decimal>,
}

impl ApprovalThresholds {
    /// Creates an empty table. Every role is unknown until added.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the threshold for a role.
    #[must_use]
    pub fn with(mut self, role: Role, max_auto_approve: Decimal) -> Self {
        self.limits.insert(role, max_auto_approve);
        self
    }

    /// Builds the table from configuration keyed by role name.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::UnknownRole` for a key that is not a role and
    /// `BudgetError::InvalidAllocation` for a negative threshold.
    pub fn from_config(config: &ApprovalConfig) -> Result<Self, BudgetError> {
        let mut limits = BTreeMap::new();
        for (name, amount) in &config.thresholds {
            let role: Role = name.parse()?;
            if *amount < Decimal::ZERO {
                return Err(BudgetError::InvalidAllocation(format!(
                    "approval threshold for {role} cannot be negative"
                )));
            }
            limits.insert(role, *amount);
        }
        Ok(Self { limits })
    }

    /// Threshold for a role, if the role is configured.
    #[must_use]
    pub fn get(&self, role: Role) -> Option<Decimal> {
        self.limits.get(&role).copied()
    }

    /// Iterates configured roles, lowest privilege first.
    pub fn iter(&self) -> impl Iterator<Item = (Role, Decimal)> + '_ {
        self.limits.iter().map(|(role, amount)| (*role, *amount))
    }
}

/// Stateless evaluator over a threshold table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    thresholds: ApprovalThresholds,
    manager_limit: Option<Decimal>,
}

impl ApprovalPolicy {
    /// Creates a policy where any manager may decide any amount.
    #[must_use]
    pub fn new(thresholds: ApprovalThresholds) -> Self {
        Self {
            thresholds,
            manager_limit: None,
        }
    }

    /// Amounts above `limit` need an admin to decide.
    #[must_use]
    pub fn with_manager_limit(mut self, limit: Decimal) -> Self {
        self.manager_limit = Some(limit);
        self
    }

    /// Builds the policy from configuration.
    ///
    /// # Errors
    ///
    /// Propagates threshold table errors.
    pub fn from_config(config: &ApprovalConfig) -> Result<Self, BudgetError> {
        Ok(Self {
            thresholds: ApprovalThresholds::from_config(config)?,
            manager_limit: config.manager_limit,
        })
    }

    /// The threshold table in effect.
    #[must_use]
    pub fn thresholds(&self) -> &ApprovalThresholds {
        &self.thresholds
    }

    /// Determine the approval an expense needs.
    ///
    /// # Returns
    /// * `AutoApproved` if `amount <= thresholds[role]`
    /// * `ManagerApprovalRequired` otherwise
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::UnknownRole` if the role has no threshold.
    pub fn required_approval(
        &self,
        role: Role,
        amount: Decimal,
    ) -> Result<RequiredApproval, BudgetError> {
        let limit = self
            .thresholds
            .get(role)
            .ok_or_else(|| BudgetError::UnknownRole(role.to_string()))?;

        if amount <= limit {
            Ok(RequiredApproval::AutoApproved)
        } else {
            Ok(RequiredApproval::ManagerApprovalRequired)
        }
    }

    /// Same as [`Self::required_approval`] for a role name from an external caller.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::UnknownRole` if the name does not parse or has no threshold.
    pub fn required_approval_for(
        &self,
        role: &str,
        amount: Decimal,
    ) -> Result<RequiredApproval, BudgetError> {
        self.required_approval(role.parse()?, amount)
    }

    /// Check if an actor may approve or reject a pending expense.
    ///
    /// Managers decide up to the manager limit; admins have no limit.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::InsufficientRole` naming the role that would be needed.
    pub fn authorize_decision(&self, role: Role, amount: Decimal) -> Result<(), BudgetError> {
        let required = match self.manager_limit {
            Some(limit) if amount > limit => Role::Admin,
            _ => Role::Manager,
        };

        if role < required {
            return Err(BudgetError::InsufficientRole { role, required });
        }
        Ok(())
    }

    /// Check if an actor may create, revise or archive a budget configuration.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::InsufficientRole` below organizer.
    pub fn authorize_configuration(role: Role) -> Result<(), BudgetError> {
        if role < Role::Organizer {
            return Err(BudgetError::InsufficientRole {
                role,
                required: Role::Organizer,
            });
        }
        Ok(())
    }
}
