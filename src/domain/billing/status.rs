//! Subscription status state machine.
//!
//! Defines all possible subscription states and valid transitions
//! according to the billing lifecycle.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Subscription status.
///
/// Represents the current state of a subscription record in the
/// billing lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Fully paid subscription with complete access.
    Active,

    /// Trial period before first payment. Full access with credit limits.
    Trialing,

    /// User requested cancellation; access continues until period end
    /// (the grace period), with new downloads restricted.
    Canceled,

    /// Subscription ended. No access. A resubscribe creates a new record.
    Expired,
}

impl SubscriptionStatus {
    /// Returns true if this status counts as "live" for record selection:
    /// a live record is authoritative over any number of newer dead ones.
    pub fn is_live(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trialing)
    }

    /// Returns true if the subscription is in its post-cancellation
    /// grace window given the period end.
    pub fn is_grace_period(
        &self,
        period_end: Option<&crate::domain::foundation::Timestamp>,
        now: &crate::domain::foundation::Timestamp,
    ) -> bool {
        matches!(self, SubscriptionStatus::Canceled)
            && period_end.map(|end| now.is_before(end)).unwrap_or(false)
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From TRIALING
            (Trialing, Active)
                | (Trialing, Canceled)
                | (Trialing, Expired)
            // From ACTIVE
                | (Active, Active) // Renewal
                | (Active, Canceled)
                | (Active, Expired)
            // From CANCELED
                | (Canceled, Active) // Cancellation reversed before period end
                | (Canceled, Expired)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Trialing => vec![Active, Canceled, Expired],
            Active => vec![Active, Canceled, Expired],
            Canceled => vec![Active, Expired],
            Expired => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;

    #[test]
    fn trialing_can_transition_to_active() {
        let status = SubscriptionStatus::Trialing;
        assert!(status.can_transition_to(&SubscriptionStatus::Active));

        let result = status.transition_to(SubscriptionStatus::Active);
        assert_eq!(result, Ok(SubscriptionStatus::Active));
    }

    #[test]
    fn active_can_renew_to_active() {
        let status = SubscriptionStatus::Active;
        let result = status.transition_to(SubscriptionStatus::Active);
        assert_eq!(result, Ok(SubscriptionStatus::Active));
    }

    #[test]
    fn active_can_transition_to_canceled() {
        let status = SubscriptionStatus::Active;
        let result = status.transition_to(SubscriptionStatus::Canceled);
        assert_eq!(result, Ok(SubscriptionStatus::Canceled));
    }

    #[test]
    fn canceled_can_reactivate_to_active() {
        let status = SubscriptionStatus::Canceled;
        let result = status.transition_to(SubscriptionStatus::Active);
        assert_eq!(result, Ok(SubscriptionStatus::Active));
    }

    #[test]
    fn canceled_can_expire() {
        let status = SubscriptionStatus::Canceled;
        let result = status.transition_to(SubscriptionStatus::Expired);
        assert_eq!(result, Ok(SubscriptionStatus::Expired));
    }

    #[test]
    fn expired_is_terminal() {
        let status = SubscriptionStatus::Expired;
        assert!(status.is_terminal());
        assert!(status.transition_to(SubscriptionStatus::Active).is_err());
    }

    #[test]
    fn is_live_for_active_and_trialing_only() {
        assert!(SubscriptionStatus::Active.is_live());
        assert!(SubscriptionStatus::Trialing.is_live());
        assert!(!SubscriptionStatus::Canceled.is_live());
        assert!(!SubscriptionStatus::Expired.is_live());
    }

    #[test]
    fn grace_period_requires_canceled_before_period_end() {
        let now = Timestamp::now();
        let end = now.add_days(10);
        assert!(SubscriptionStatus::Canceled.is_grace_period(Some(&end), &now));
        assert!(!SubscriptionStatus::Canceled.is_grace_period(Some(&now.minus_days(1)), &now));
        assert!(!SubscriptionStatus::Canceled.is_grace_period(None, &now));
        assert!(!SubscriptionStatus::Active.is_grace_period(Some(&end), &now));
    }

    #[test]
    fn valid_transitions_are_consistent_with_can_transition_to() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::Trialing,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Expired,
        ] {
            for valid_target in status.valid_transitions() {
                assert!(
                    status.can_transition_to(&valid_target),
                    "can_transition_to should return true for {:?} -> {:?}",
                    status,
                    valid_target
                );
            }
        }
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&SubscriptionStatus::Trialing).unwrap();
        assert_eq!(json, "\"trialing\"");
    }
}
