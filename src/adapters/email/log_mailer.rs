//! Structured-log mailer.
//!
//! Emits each notification as a structured log event instead of
//! dispatching to an email provider. Used in development and as the
//! default until a provider adapter is wired in; callers already treat
//! mail as fire-and-forget, so swapping implementations is invisible to
//! the webhook flow.

use async_trait::async_trait;

use crate::config::EmailConfig;
use crate::domain::billing::PlanType;
use crate::domain::foundation::{DomainError, ThemeId, Timestamp};
use crate::ports::Mailer;

/// Mailer that records sends via `tracing` instead of a provider API.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            from: config.from_header(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_subscription_confirmation(
        &self,
        to: &str,
        plan: PlanType,
        license_key: &str,
    ) -> Result<(), DomainError> {
        tracing::info!(
            from = %self.from,
            to = %to,
            plan = ?plan,
            license_key = %license_key,
            "email: subscription confirmation"
        );
        Ok(())
    }

    async fn send_theme_purchase(
        &self,
        to: &str,
        theme_id: &ThemeId,
        license_key: &str,
    ) -> Result<(), DomainError> {
        tracing::info!(
            from = %self.from,
            to = %to,
            theme_id = %theme_id.as_str(),
            license_key = %license_key,
            "email: theme purchase receipt"
        );
        Ok(())
    }

    async fn send_lifetime_conversion(&self, to: &str) -> Result<(), DomainError> {
        tracing::info!(
            from = %self.from,
            to = %to,
            "email: lifetime conversion congratulations"
        );
        Ok(())
    }

    async fn send_trial_ending(
        &self,
        to: &str,
        trial_ends_at: &Timestamp,
    ) -> Result<(), DomainError> {
        tracing::info!(
            from = %self.from,
            to = %to,
            trial_ends_at = %trial_ends_at.as_datetime(),
            "email: trial ending reminder"
        );
        Ok(())
    }

    async fn send_payment_failed(&self, to: &str) -> Result<(), DomainError> {
        tracing::info!(
            from = %self.from,
            to = %to,
            "email: payment failed notice"
        );
        Ok(())
    }
}
