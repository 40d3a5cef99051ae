//! Mailer port.
//!
//! Transactional email notifications triggered from webhook handling.
//! All sends are fire-and-forget from the caller's perspective: a mail
//! failure must never fail the webhook, so implementations log and
//! swallow transport errors behind this interface.

use async_trait::async_trait;

use crate::domain::billing::PlanType;
use crate::domain::foundation::{DomainError, ThemeId, Timestamp};

/// Port for outbound transactional email.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Welcome email after a subscription checkout completes.
    async fn send_subscription_confirmation(
        &self,
        to: &str,
        plan: PlanType,
        license_key: &str,
    ) -> Result<(), DomainError>;

    /// Receipt for a one-off theme purchase.
    async fn send_theme_purchase(
        &self,
        to: &str,
        theme_id: &ThemeId,
        license_key: &str,
    ) -> Result<(), DomainError>;

    /// Congratulations note after an early-adopter slot converted the
    /// subscription to lifetime.
    async fn send_lifetime_conversion(&self, to: &str) -> Result<(), DomainError>;

    /// Heads-up a few days before a trial converts to paid.
    async fn send_trial_ending(
        &self,
        to: &str,
        trial_ends_at: &Timestamp,
    ) -> Result<(), DomainError>;

    /// Dunning notice after a failed renewal payment.
    async fn send_payment_failed(&self, to: &str) -> Result<(), DomainError>;
}
