//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod billing;

pub use billing::{
    // Commands
    DownloadThemeCommand,
    DownloadThemeHandler,
    DownloadThemeResult,
    ProcessBillingEventCommand,
    ProcessBillingEventHandler,
    ProcessBillingEventResult,
    // Queries
    GetCreditStatusHandler,
    GetCreditStatusQuery,
    GetCreditStatusResult,
    GetEntitlementHandler,
    GetEntitlementQuery,
};
