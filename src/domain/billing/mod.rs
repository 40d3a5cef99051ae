//! Billing domain - subscriptions, credits, and entitlements.
//!
//! Everything here is pure: webhook handlers and HTTP adapters drive
//! these types through the ports layer.

mod credits;
mod early_adopter;
mod entitlement;
mod errors;
mod event;
mod license;
mod plan;
mod status;
mod subscription;
mod verifier;

pub use credits::{evaluate_download, CreditStatus, DownloadDecision, MAX_CREDITS};
pub use early_adopter::EarlyAdopterProgram;
pub use entitlement::{resolve as resolve_entitlement, EntitlementStatus};
pub use errors::WebhookError;
pub use event::{
    BillingEvent, BillingEventData, BillingEventKind, CheckoutMetadata, CheckoutSessionObject,
    InvoiceLine, InvoiceLines, InvoiceObject, InvoicePeriod, SubscriptionObject,
};
pub use license::{LicenseEntitlement, LicenseKind, SUBSCRIPTION_MAX_SLOTS};
pub use plan::PlanType;
pub use status::SubscriptionStatus;
pub use subscription::{select_authoritative, Subscription};
pub use verifier::{SignatureHeader, WebhookVerifier};

#[cfg(test)]
pub use event::BillingEventBuilder;
#[cfg(test)]
pub use verifier::compute_test_signature;
