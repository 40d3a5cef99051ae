//! Plan type definitions.
//!
//! Represents the billing plans available for the premium theme catalog.

use serde::{Deserialize, Serialize};

/// Billing plan attached to a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    /// Month-to-month subscription.
    Monthly,

    /// Annual subscription with a 12-month commitment.
    /// Yearly subscribers are the entry point to the early-adopter
    /// lifetime conversion.
    Yearly,

    /// Non-expiring plan, granted by early-adopter conversion or a
    /// lifetime purchase.
    Lifetime,
}

impl PlanType {
    /// Returns true if this plan never expires.
    pub fn is_lifetime(&self) -> bool {
        matches!(self, PlanType::Lifetime)
    }

    /// Returns the display name for this plan.
    pub fn display_name(&self) -> &'static str {
        match self {
            PlanType::Monthly => "Monthly",
            PlanType::Yearly => "Yearly",
            PlanType::Lifetime => "Lifetime",
        }
    }

    /// Parses a plan from a checkout metadata value.
    ///
    /// Checkout payloads carry free-form plan hints ("year", "annual");
    /// anything unrecognized falls back to monthly.
    pub fn from_metadata(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "yearly" | "year" | "annual" => PlanType::Yearly,
            "lifetime" => PlanType::Lifetime,
            _ => PlanType::Monthly,
        }
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
