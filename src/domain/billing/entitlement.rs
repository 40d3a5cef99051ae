//! Entitlement resolution.
//!
//! Pure read-side projection: turns the authoritative subscription (or
//! its absence) into the access flags clients consume. Never mutates.

use serde::Serialize;

use crate::domain::catalog;
use crate::domain::foundation::{ThemeId, Timestamp};

use super::{PlanType, Subscription, SubscriptionStatus};

/// Resolved entitlement, the shape clients consume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitlementStatus {
    pub has_subscription: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SubscriptionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanType>,
    pub is_lifetime: bool,
    pub has_full_access: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_ends_at: Option<Timestamp>,
    pub accessible_themes: Vec<ThemeId>,
}

impl EntitlementStatus {
    /// No subscription, no access.
    pub fn none() -> Self {
        Self {
            has_subscription: false,
            status: None,
            plan: None,
            is_lifetime: false,
            has_full_access: false,
            current_period_end: None,
            trial_ends_at: None,
            accessible_themes: Vec::new(),
        }
    }

    /// Synthetic lifetime entitlement for internal users, resolved from
    /// the user record's `internal` flag with no stored subscription.
    pub fn internal() -> Self {
        Self {
            has_subscription: true,
            status: Some(SubscriptionStatus::Active),
            plan: Some(PlanType::Lifetime),
            is_lifetime: true,
            has_full_access: true,
            current_period_end: None,
            trial_ends_at: None,
            accessible_themes: catalog::PREMIUM_THEMES.clone(),
        }
    }
}

/// Resolve the entitlement for an authoritative subscription.
///
/// `accessible_themes` is the full premium catalog when full access
/// holds, empty otherwise.
pub fn resolve(subscription: Option<&Subscription>) -> EntitlementStatus {
    let Some(sub) = subscription else {
        return EntitlementStatus::none();
    };

    let has_full_access = sub.has_full_access();
    EntitlementStatus {
        has_subscription: true,
        status: Some(sub.status),
        plan: Some(sub.plan),
        is_lifetime: sub.is_lifetime,
        has_full_access,
        current_period_end: sub.current_period_end,
        trial_ends_at: sub.trial_ends_at,
        accessible_themes: if has_full_access {
            catalog::PREMIUM_THEMES.clone()
        } else {
            Vec::new()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{SubscriptionId, UserId};

    fn subscription(status: SubscriptionStatus, is_lifetime: bool) -> Subscription {
        let now = Timestamp::now();
        Subscription {
            id: SubscriptionId::new(),
            user_id: UserId::new("user-1").unwrap(),
            external_subscription_id: "sub_abc".to_string(),
            external_customer_id: "cus_abc".to_string(),
            status,
            plan: if is_lifetime {
                PlanType::Lifetime
            } else {
                PlanType::Monthly
            },
            is_lifetime,
            current_period_start: Some(now.minus_days(10)),
            current_period_end: Some(now.add_days(20)),
            trial_ends_at: None,
            commitment_ends_at: None,
            canceled_at: None,
            lifetime_converted_at: None,
            credits_used: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn no_subscription_resolves_to_empty_entitlement() {
        let status = resolve(None);
        assert!(!status.has_subscription);
        assert!(!status.has_full_access);
        assert!(status.accessible_themes.is_empty());
    }

    #[test]
    fn active_subscription_gets_full_catalog() {
        let sub = subscription(SubscriptionStatus::Active, false);
        let status = resolve(Some(&sub));

        assert!(status.has_full_access);
        assert_eq!(status.accessible_themes, *catalog::PREMIUM_THEMES);
    }

    #[test]
    fn trialing_subscription_gets_full_catalog() {
        let sub = subscription(SubscriptionStatus::Trialing, false);
        let status = resolve(Some(&sub));
        assert!(status.has_full_access);
    }

    #[test]
    fn canceled_lifetime_keeps_full_catalog() {
        let sub = subscription(SubscriptionStatus::Canceled, true);
        let status = resolve(Some(&sub));

        assert!(status.has_full_access);
        assert!(status.is_lifetime);
        assert_eq!(status.accessible_themes, *catalog::PREMIUM_THEMES);
    }

    #[test]
    fn canceled_non_lifetime_gets_no_themes() {
        let sub = subscription(SubscriptionStatus::Canceled, false);
        let status = resolve(Some(&sub));

        assert!(status.has_subscription);
        assert!(!status.has_full_access);
        assert!(status.accessible_themes.is_empty());
    }

    #[test]
    fn internal_entitlement_is_synthetic_lifetime() {
        let status = EntitlementStatus::internal();
        assert!(status.has_full_access);
        assert!(status.is_lifetime);
        assert_eq!(status.plan, Some(PlanType::Lifetime));
        assert!(status.current_period_end.is_none());
    }
}
