//! Roles resolved by the identity collaborator.

use std::fmt;
use std::str::FromStr;

use eventiq_shared::types::UserId;
use serde::{Deserialize, Serialize};

use crate::budget::BudgetError;

/// Role in the event organization.
///
/// Roles are ordered from lowest to highest privilege.
/// Higher roles can perform all actions of lower roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Event attendee.
    Participant = 0,
    /// Helper with small purchase authority.
    Volunteer = 1,
    /// Configures budgets and submits expenses.
    Organizer = 2,
    /// Approves expenses above auto-approve thresholds.
    Manager = 3,
    /// Full access.
    Admin = 4,
}

impl Role {
    /// Every role, lowest privilege first.
    pub const ALL: [Self; 5] = [
        Self::Participant,
        Self::Volunteer,
        Self::Organizer,
        Self::Manager,
        Self::Admin,
    ];

    /// Parse a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "participant" => Some(Self::Participant),
            "volunteer" => Some(Self::Volunteer),
            "organizer" => Some(Self::Organizer),
            "manager" => Some(Self::Manager),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Volunteer => "volunteer",
            Self::Organizer => "organizer",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = BudgetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| BudgetError::UnknownRole(s.to_string()))
    }
}

/// Caller identity and role, as supplied by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Who is acting.
    pub user_id: UserId,
    /// Their role for this event.
    pub role: Role,
}

impl Actor {
    /// Creates an actor.
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }
}
