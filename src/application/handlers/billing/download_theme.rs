//! DownloadThemeHandler - Command handler for premium theme downloads.
//!
//! Re-evaluates eligibility against current state, then consumes a
//! credit through the store's atomic capped increment. Redownloads never
//! touch the counter.

use std::sync::Arc;

use crate::domain::billing::{
    evaluate_download, select_authoritative, CreditStatus, MAX_CREDITS,
};
use crate::domain::catalog;
use crate::domain::foundation::{DomainError, ErrorCode, ThemeId, Timestamp, UserId};
use crate::ports::{CreditConsumption, DownloadLog, DownloadRecord, SubscriptionStore, UserDirectory};

/// Command to download a premium theme.
#[derive(Debug, Clone)]
pub struct DownloadThemeCommand {
    pub user_id: UserId,
    pub theme_id: ThemeId,
}

/// Result of a download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadThemeResult {
    /// Download may proceed.
    Allowed {
        is_redownload: bool,
        /// Credit position after this download; absent for internal users.
        credits: Option<CreditStatus>,
    },
    /// Download refused, with the user-facing reason.
    Denied { reason: String },
}

/// Handler for theme download requests.
pub struct DownloadThemeHandler {
    subscriptions: Arc<dyn SubscriptionStore>,
    downloads: Arc<dyn DownloadLog>,
    users: Arc<dyn UserDirectory>,
}

impl DownloadThemeHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        downloads: Arc<dyn DownloadLog>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            subscriptions,
            downloads,
            users,
        }
    }

    pub async fn handle(
        &self,
        cmd: DownloadThemeCommand,
    ) -> Result<DownloadThemeResult, DomainError> {
        if !catalog::is_premium(&cmd.theme_id) {
            return Err(DomainError::new(
                ErrorCode::ThemeNotFound,
                format!("Unknown premium theme: {}", cmd.theme_id.as_str()),
            ));
        }

        let already_downloaded = self
            .downloads
            .has_downloaded(&cmd.user_id, &cmd.theme_id)
            .await?;

        // Internal users download without credit accounting
        if let Some(user) = self.users.find_by_id(&cmd.user_id).await? {
            if user.internal {
                return Ok(DownloadThemeResult::Allowed {
                    is_redownload: already_downloaded,
                    credits: None,
                });
            }
        }

        let records = self.subscriptions.find_all_by_user_id(&cmd.user_id).await?;
        let Some(subscription) = select_authoritative(&records) else {
            return Ok(DownloadThemeResult::Denied {
                reason: "No subscription".to_string(),
            });
        };

        let now = Timestamp::now();
        let decision = evaluate_download(subscription, already_downloaded, &now);
        if !decision.allowed {
            return Ok(DownloadThemeResult::Denied {
                reason: decision
                    .reason
                    .unwrap_or_else(|| "Download not allowed".to_string()),
            });
        }

        if decision.is_redownload {
            return Ok(DownloadThemeResult::Allowed {
                is_redownload: true,
                credits: Some(CreditStatus::of(subscription, &now)),
            });
        }

        let record = DownloadRecord {
            user_id: cmd.user_id.clone(),
            subscription_id: subscription.id,
            theme_id: cmd.theme_id.clone(),
            downloaded_at: now,
        };
        match self
            .subscriptions
            .consume_credit(&subscription.id, MAX_CREDITS, &record)
            .await?
        {
            CreditConsumption::Consumed => {
                // Project the post-increment position without a re-read
                let mut after = subscription.clone();
                after.credits_used += 1;
                tracing::info!(
                    user_id = %cmd.user_id.as_str(),
                    theme_id = %cmd.theme_id.as_str(),
                    credits_used = after.credits_used,
                    "theme download credit consumed"
                );
                Ok(DownloadThemeResult::Allowed {
                    is_redownload: false,
                    credits: Some(CreditStatus::of(&after, &now)),
                })
            }
            // A concurrent download won the last credit
            CreditConsumption::Exhausted => Ok(DownloadThemeResult::Denied {
                reason: "No credits remaining".to_string(),
            }),
        }
    }
}
