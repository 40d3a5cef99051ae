//! In-memory adapters for testing and single-process development.
//!
//! Each adapter guards its state with a mutex so the concurrency
//! contracts of the ports hold within one process. They are not
//! suitable for multi-server deployments.

mod billing_store;
mod early_adopter_pool;
mod license_store;
mod user_directory;
mod webhook_ledger;

pub use billing_store::InMemoryBillingStore;
pub use early_adopter_pool::InMemoryEarlyAdopterPool;
pub use license_store::InMemoryLicenseStore;
pub use user_directory::InMemoryUserDirectory;
pub use webhook_ledger::InMemoryWebhookLedger;
