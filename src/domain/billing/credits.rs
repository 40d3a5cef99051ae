//! Download credit accounting.
//!
//! Each billing period grants [`MAX_CREDITS`] theme downloads. A theme
//! the user has downloaded before is exempt: redownloads bypass both the
//! credit limit and the post-cancellation grace restriction, because the
//! user already paid a credit for that theme.

use serde::Serialize;

use crate::domain::foundation::Timestamp;

use super::{Subscription, SubscriptionStatus};

/// Download credits granted per billing period.
pub const MAX_CREDITS: i32 = 3;

/// Outcome of a download eligibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub is_redownload: bool,
}

impl DownloadDecision {
    fn allowed(is_redownload: bool) -> Self {
        Self {
            allowed: true,
            reason: None,
            is_redownload,
        }
    }

    fn denied(reason: &str) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.to_string()),
            is_redownload: false,
        }
    }
}

/// Decide whether a download may proceed.
///
/// `already_downloaded` is whether a download record exists for this
/// (user, theme) pair. Check order matters: the redownload exemption
/// short-circuits the grace-period and credit checks, but never the
/// expired/period-ended checks.
pub fn evaluate_download(
    subscription: &Subscription,
    already_downloaded: bool,
    now: &Timestamp,
) -> DownloadDecision {
    if subscription.status == SubscriptionStatus::Expired {
        return DownloadDecision::denied("Subscription expired");
    }

    let period_over = subscription
        .current_period_end
        .map(|end| now.is_after(&end))
        .unwrap_or(false);
    if period_over && subscription.status != SubscriptionStatus::Active {
        return DownloadDecision::denied("Billing period ended");
    }

    if already_downloaded {
        return DownloadDecision::allowed(true);
    }

    if subscription.status == SubscriptionStatus::Canceled {
        return DownloadDecision::denied("New downloads blocked during grace period");
    }

    if subscription.credits_used >= MAX_CREDITS {
        return DownloadDecision::denied("No credits remaining");
    }

    DownloadDecision::allowed(false)
}

/// Pure projection of the credit position. Safe to call anytime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreditStatus {
    pub remaining: i32,
    pub used: i32,
    pub total: i32,
    pub resets_at: Option<Timestamp>,
    pub is_grace_period: bool,
}

impl CreditStatus {
    pub fn of(subscription: &Subscription, now: &Timestamp) -> Self {
        Self {
            remaining: (MAX_CREDITS - subscription.credits_used).max(0),
            used: subscription.credits_used,
            total: MAX_CREDITS,
            resets_at: subscription.current_period_end,
            is_grace_period: subscription.is_grace_period(now),
        }
    }
}
