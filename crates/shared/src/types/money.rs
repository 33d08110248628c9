//! Currency codes for budget amounts.
//!
//! CRITICAL: Amounts themselves are `rust_decimal::Decimal`, never floating-point.

use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes an event budget can be kept in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// US Dollar
    Usd,
    /// Euro
    Eur,
    /// Pound Sterling
    Gbp,
    /// Indian Rupee
    Inr,
    /// Canadian Dollar
    Cad,
    /// Australian Dollar
    Aud,
}

impl Currency {
    /// Returns the ISO code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Inr => "INR",
            Self::Cad => "CAD",
            Self::Aud => "AUD",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "GBP" => Ok(Self::Gbp),
            "INR" => Ok(Self::Inr),
            "CAD" => Ok(Self::Cad),
            "AUD" => Ok(Self::Aud),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}
