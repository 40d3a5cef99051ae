//! Billing handlers.
//!
//! Command and query handlers for the subscription and entitlement
//! lifecycle:
//!
//! ## Commands
//! - Processing billing provider webhooks (the only write entry point
//!   for subscription state)
//! - Downloading premium themes (credit consumption)
//!
//! ## Queries
//! - Resolve a user's entitlement
//! - Get the credit position and download history

mod download_theme;
mod get_credit_status;
mod get_entitlement;
mod process_billing_event;

// Commands
pub use download_theme::{DownloadThemeCommand, DownloadThemeHandler, DownloadThemeResult};
pub use process_billing_event::{
    ProcessBillingEventCommand, ProcessBillingEventHandler, ProcessBillingEventResult,
};

// Queries
pub use get_credit_status::{GetCreditStatusHandler, GetCreditStatusQuery, GetCreditStatusResult};
pub use get_entitlement::{GetEntitlementHandler, GetEntitlementQuery};
