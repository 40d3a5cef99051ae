//! Subscription aggregate entity.
//!
//! A subscription record ties a user to an external billing subscription.
//! A user may accumulate several records over time (renewals, migrations,
//! resubscribes); only one is authoritative at a time, chosen by
//! [`select_authoritative`].
//!
//! # Design Decisions
//!
//! - **Multiple records per user**: records are never physically deleted,
//!   so selection must prefer live records over newer dead ones
//! - **Credits live on the record**: `credits_used` is reset when the
//!   billing period rolls over, not on a wall-clock schedule
//! - **Lifetime is a flag plus a plan**: conversion keeps the record's
//!   history intact and marks it non-expiring

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

use super::{PlanType, SubscriptionStatus};

/// Subscription aggregate.
///
/// # Invariants
///
/// - `id` is globally unique
/// - Status transitions follow state machine rules
/// - `0 <= credits_used <= MAX_CREDITS` (enforced by the store's
///   capped increment)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier for this record.
    pub id: SubscriptionId,

    /// User who owns this record.
    pub user_id: UserId,

    /// Subscription id at the billing provider.
    pub external_subscription_id: String,

    /// Customer id at the billing provider.
    pub external_customer_id: String,

    /// Current status in the billing lifecycle.
    pub status: SubscriptionStatus,

    /// Billing plan.
    pub plan: PlanType,

    /// True once the record was converted to (or purchased as) lifetime.
    pub is_lifetime: bool,

    /// Start of current billing period.
    pub current_period_start: Option<Timestamp>,

    /// End of current billing period. Credits reset here.
    pub current_period_end: Option<Timestamp>,

    /// When the trial ends, if the record started as a trial.
    pub trial_ends_at: Option<Timestamp>,

    /// End of the 12-month commitment for yearly plans.
    pub commitment_ends_at: Option<Timestamp>,

    /// When the user requested cancellation.
    pub canceled_at: Option<Timestamp>,

    /// When the record was converted to lifetime.
    pub lifetime_converted_at: Option<Timestamp>,

    /// Download credits consumed in the current billing period.
    pub credits_used: i32,

    /// When the record was created.
    pub created_at: Timestamp,

    /// When the record was last updated.
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Create a record from a completed checkout.
    ///
    /// Yearly plans carry a 12-month commitment from the moment of
    /// checkout; a present trial end puts the record in Trialing.
    #[allow(clippy::too_many_arguments)]
    pub fn from_checkout(
        id: SubscriptionId,
        user_id: UserId,
        external_subscription_id: String,
        external_customer_id: String,
        plan: PlanType,
        period_start: Option<Timestamp>,
        period_end: Option<Timestamp>,
        trial_ends_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Self {
        let status = if trial_ends_at.is_some() {
            SubscriptionStatus::Trialing
        } else {
            SubscriptionStatus::Active
        };
        let commitment_ends_at = match plan {
            PlanType::Yearly => Some(now.add_days(365)),
            _ => None,
        };
        Self {
            id,
            user_id,
            external_subscription_id,
            external_customer_id,
            status,
            plan,
            is_lifetime: plan.is_lifetime(),
            current_period_start: period_start,
            current_period_end: period_end,
            trial_ends_at,
            commitment_ends_at,
            canceled_at: None,
            lifetime_converted_at: None,
            credits_used: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Full access: premium catalog plus theme downloads.
    ///
    /// Lifetime records keep access regardless of status; trial users
    /// have access during the trial.
    pub fn has_full_access(&self) -> bool {
        self.is_lifetime || self.status.is_live()
    }

    /// True if the record is in its post-cancellation grace window.
    pub fn is_grace_period(&self, now: &Timestamp) -> bool {
        self.status
            .is_grace_period(self.current_period_end.as_ref(), now)
    }

    /// Cancel at period end. Access continues until the period closes.
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Canceled)?;
        self.canceled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Reverse a pending cancellation before the period ends.
    pub fn reverse_cancellation(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Active)?;
        self.canceled_at = None;
        self.updated_at = now;
        Ok(())
    }

    /// Mark the record active, ending a trial.
    pub fn activate(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Active)?;
        self.updated_at = now;
        Ok(())
    }

    /// Terminal expiry. A resubscribe creates a fresh record.
    pub fn expire(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Expired)?;
        self.updated_at = now;
        Ok(())
    }

    /// Roll the billing period forward after a renewal invoice.
    ///
    /// Resets the period credits and clears any stale cancellation mark.
    pub fn renew(
        &mut self,
        period_start: Timestamp,
        period_end: Timestamp,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Active)?;
        self.current_period_start = Some(period_start);
        self.current_period_end = Some(period_end);
        self.credits_used = 0;
        self.canceled_at = None;
        self.updated_at = now;
        Ok(())
    }

    /// Convert this record to the lifetime plan.
    ///
    /// Idempotent: converting an already-lifetime record is a no-op.
    pub fn convert_to_lifetime(&mut self, now: Timestamp) {
        if self.is_lifetime {
            return;
        }
        self.is_lifetime = true;
        self.plan = PlanType::Lifetime;
        self.lifetime_converted_at = Some(now);
        self.updated_at = now;
    }

    /// Transition to a new status using the state machine.
    fn transition_to(&mut self, target: SubscriptionStatus) -> Result<(), DomainError> {
        use crate::domain::foundation::StateMachine;

        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition subscription from {:?} to {:?}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}

/// Pick the authoritative record among all of a user's records.
///
/// Any record with a live status (active or trialing) wins over all
/// others irrespective of creation time; ties break by most recent
/// `created_at`. A newer expired migration artifact must never shadow
/// a still-active record.
pub fn select_authoritative(records: &[Subscription]) -> Option<&Subscription> {
    records.iter().max_by(|a, b| {
        a.status
            .is_live()
            .cmp(&b.status.is_live())
            .then(a.created_at.cmp(&b.created_at))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_subscription(status: SubscriptionStatus, created_at: Timestamp) -> Subscription {
        Subscription {
            id: SubscriptionId::new(),
            user_id: UserId::new("user-1").unwrap(),
            external_subscription_id: "sub_abc".to_string(),
            external_customer_id: "cus_abc".to_string(),
            status,
            plan: PlanType::Monthly,
            is_lifetime: false,
            current_period_start: Some(created_at),
            current_period_end: Some(created_at.add_days(30)),
            trial_ends_at: None,
            commitment_ends_at: None,
            canceled_at: None,
            lifetime_converted_at: None,
            credits_used: 0,
            created_at,
            updated_at: created_at,
        }
    }

    // Construction

    #[test]
    fn from_checkout_without_trial_starts_active() {
        let now = Timestamp::now();
        let sub = Subscription::from_checkout(
            SubscriptionId::new(),
            UserId::new("user-1").unwrap(),
            "sub_abc".to_string(),
            "cus_abc".to_string(),
            PlanType::Monthly,
            Some(now),
            Some(now.add_days(30)),
            None,
            now,
        );

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(!sub.is_lifetime);
        assert_eq!(sub.credits_used, 0);
        assert!(sub.commitment_ends_at.is_none());
    }

    #[test]
    fn from_checkout_with_trial_starts_trialing() {
        let now = Timestamp::now();
        let sub = Subscription::from_checkout(
            SubscriptionId::new(),
            UserId::new("user-1").unwrap(),
            "sub_abc".to_string(),
            "cus_abc".to_string(),
            PlanType::Monthly,
            Some(now),
            Some(now.add_days(30)),
            Some(now.add_days(7)),
            now,
        );

        assert_eq!(sub.status, SubscriptionStatus::Trialing);
    }

    #[test]
    fn from_checkout_yearly_sets_commitment() {
        let now = Timestamp::now();
        let sub = Subscription::from_checkout(
            SubscriptionId::new(),
            UserId::new("user-1").unwrap(),
            "sub_abc".to_string(),
            "cus_abc".to_string(),
            PlanType::Yearly,
            Some(now),
            Some(now.add_days(365)),
            None,
            now,
        );

        assert_eq!(sub.commitment_ends_at, Some(now.add_days(365)));
    }

    // Full access

    #[test]
    fn active_non_lifetime_has_full_access() {
        let sub = base_subscription(SubscriptionStatus::Active, Timestamp::now());
        assert!(sub.has_full_access());
    }

    #[test]
    fn trialing_has_full_access() {
        let sub = base_subscription(SubscriptionStatus::Trialing, Timestamp::now());
        assert!(sub.has_full_access());
    }

    #[test]
    fn canceled_lifetime_keeps_full_access() {
        let mut sub = base_subscription(SubscriptionStatus::Canceled, Timestamp::now());
        sub.is_lifetime = true;
        assert!(sub.has_full_access());
    }

    #[test]
    fn canceled_non_lifetime_has_no_full_access_even_before_period_end() {
        let now = Timestamp::now();
        let mut sub = base_subscription(SubscriptionStatus::Canceled, now);
        sub.current_period_end = Some(now.add_days(20));
        assert!(!sub.has_full_access());
        assert!(sub.is_grace_period(&now));
    }

    // Lifecycle

    #[test]
    fn active_can_cancel_then_reverse() {
        let now = Timestamp::now();
        let mut sub = base_subscription(SubscriptionStatus::Active, now);

        sub.cancel(now).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Canceled);
        assert!(sub.canceled_at.is_some());

        sub.reverse_cancellation(now).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(sub.canceled_at.is_none());
    }

    #[test]
    fn activate_ends_a_trial() {
        let now = Timestamp::now();
        let mut sub = base_subscription(SubscriptionStatus::Trialing, now);
        sub.trial_ends_at = Some(now.add_days(7));

        sub.activate(now).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        // The trial end stays as history on the record
        assert!(sub.trial_ends_at.is_some());
    }

    #[test]
    fn expired_record_rejects_further_transitions() {
        let now = Timestamp::now();
        let mut sub = base_subscription(SubscriptionStatus::Active, now);
        sub.expire(now).unwrap();

        let err = sub.cancel(now).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }

    #[test]
    fn renew_rolls_period_and_resets_credits() {
        let now = Timestamp::now();
        let mut sub = base_subscription(SubscriptionStatus::Active, now);
        sub.credits_used = 3;

        let new_start = now.add_days(30);
        let new_end = now.add_days(60);
        sub.renew(new_start, new_end, now).unwrap();

        assert_eq!(sub.credits_used, 0);
        assert_eq!(sub.current_period_start, Some(new_start));
        assert_eq!(sub.current_period_end, Some(new_end));
    }

    #[test]
    fn convert_to_lifetime_is_idempotent() {
        let now = Timestamp::now();
        let mut sub = base_subscription(SubscriptionStatus::Active, now);

        sub.convert_to_lifetime(now);
        assert!(sub.is_lifetime);
        assert_eq!(sub.plan, PlanType::Lifetime);
        let first_conversion = sub.lifetime_converted_at;

        sub.convert_to_lifetime(now.add_days(1));
        assert_eq!(sub.lifetime_converted_at, first_conversion);
    }

    // Selection rule

    #[test]
    fn select_prefers_active_over_newer_expired() {
        let old = Timestamp::now().minus_days(100);
        let new = Timestamp::now();
        let active = base_subscription(SubscriptionStatus::Active, old);
        let expired = base_subscription(SubscriptionStatus::Expired, new);

        let records = vec![expired, active.clone()];
        let picked = select_authoritative(&records).unwrap();
        assert_eq!(picked.id, active.id);
    }

    #[test]
    fn select_prefers_trialing_over_newer_canceled() {
        let trialing = base_subscription(SubscriptionStatus::Trialing, Timestamp::now().minus_days(5));
        let canceled = base_subscription(SubscriptionStatus::Canceled, Timestamp::now());

        let records = vec![canceled, trialing.clone()];
        let picked = select_authoritative(&records).unwrap();
        assert_eq!(picked.id, trialing.id);
    }

    #[test]
    fn select_breaks_ties_by_most_recent_created_at() {
        let older = base_subscription(SubscriptionStatus::Canceled, Timestamp::now().minus_days(10));
        let newer = base_subscription(SubscriptionStatus::Expired, Timestamp::now());

        let records = vec![older, newer.clone()];
        let picked = select_authoritative(&records).unwrap();
        assert_eq!(picked.id, newer.id);
    }

    #[test]
    fn select_returns_none_for_empty_slice() {
        assert!(select_authoritative(&[]).is_none());
    }
}
