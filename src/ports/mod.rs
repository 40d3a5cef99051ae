//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Billing Ports
//!
//! - `WebhookEventLedger` - Webhook idempotency tracking with stale-lock reclaim
//! - `SubscriptionStore` - Subscription persistence and atomic credit consumption
//! - `DownloadLog` - Read side of the append-only download log
//! - `EarlyAdopterPool` - Bounded promotional slot pool
//! - `LicenseStore` - License entitlement persistence
//!
//! ## Supporting Ports
//!
//! - `UserDirectory` - User lookup for entitlement resolution
//! - `Mailer` - Outbound transactional email

mod download_log;
mod early_adopter_pool;
mod license_store;
mod mailer;
mod subscription_store;
mod user_directory;
mod webhook_ledger;

pub use download_log::DownloadLog;
pub use early_adopter_pool::EarlyAdopterPool;
pub use license_store::LicenseStore;
pub use mailer::Mailer;
pub use subscription_store::{CreditConsumption, DownloadRecord, SubscriptionStore};
pub use user_directory::{UserDirectory, UserRecord};
pub use webhook_ledger::{
    BeginOutcome, WebhookEventLedger, WebhookEventRecord, WebhookEventState, STALE_LOCK_TTL_SECS,
};
