//! PostgreSQL adapters - Database implementations for persistence ports.
//!
//! Concurrency-sensitive operations (webhook lock acquisition, slot
//! claims, credit increments) are expressed as single conditional
//! statements or short transactions so the database arbitrates races.

mod early_adopter_pool;
mod license_store;
mod subscription_store;
mod user_directory;
mod webhook_ledger;

pub use early_adopter_pool::PostgresEarlyAdopterPool;
pub use license_store::PostgresLicenseStore;
pub use subscription_store::PostgresSubscriptionStore;
pub use user_directory::PostgresUserDirectory;
pub use webhook_ledger::PostgresWebhookLedger;
