//! Axum router configuration for billing endpoints.
//!
//! User endpoints require a bearer JWT; the webhook endpoint is
//! unauthenticated and verified via its HMAC signature instead.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    download_theme, get_extension_status, get_subscription, handle_billing_webhook,
    BillingAppState,
};

/// Create the authenticated billing API router.
///
/// # Routes
/// - `GET /extension/status` - Resolved entitlement for the extension
/// - `GET /subscription` - Credit position and download history
/// - `POST /download` - Download a premium theme
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/extension/status", get(get_extension_status))
        .route("/subscription", get(get_subscription))
        .route("/download", post(download_theme))
}

/// Create the billing webhook router.
///
/// Separate from the user routes because webhooks carry no bearer token
/// (they are verified via signature).
///
/// # Routes
/// - `POST /billing` - Process billing provider webhooks
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/billing", post(handle_billing_webhook))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::adapters::email::LogMailer;
    use crate::adapters::memory::{
        InMemoryBillingStore, InMemoryEarlyAdopterPool, InMemoryLicenseStore,
        InMemoryUserDirectory, InMemoryWebhookLedger,
    };
    use crate::config::EmailConfig;
    use crate::domain::billing::{EarlyAdopterProgram, WebhookVerifier};
    use crate::domain::foundation::Timestamp;

    fn test_state() -> BillingAppState {
        let billing_store = Arc::new(InMemoryBillingStore::new());
        BillingAppState {
            verifier: WebhookVerifier::new("whsec_test_secret_12345"),
            ledger: Arc::new(InMemoryWebhookLedger::new()),
            subscriptions: billing_store.clone(),
            downloads: billing_store,
            licenses: Arc::new(InMemoryLicenseStore::new()),
            slot_pool: Arc::new(InMemoryEarlyAdopterPool::new(EarlyAdopterProgram {
                is_active: true,
                used_slots: 0,
                max_slots: 60,
                cutoff_date: Timestamp::now().add_days(30),
            })),
            users: Arc::new(InMemoryUserDirectory::new()),
            mailer: Arc::new(LogMailer::new(&EmailConfig::default())),
        }
    }

    #[test]
    fn billing_routes_creates_router() {
        let router = billing_routes();
        let _: Router<()> = router.with_state(test_state());
    }

    #[test]
    fn webhook_routes_creates_router() {
        let router = webhook_routes();
        let _: Router<()> = router.with_state(test_state());
    }
}
