//! Early-adopter program singleton.
//!
//! A bounded promotional pool: the first `max_slots` paying yearly
//! subscribers are converted to the lifetime plan. The pool is global
//! mutable state shared across all users, so claim/release must run as
//! atomic read-modify-write transactions in the backing store; this
//! module only holds the value object and the eligibility rule.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Program state. Exactly one instance exists.
///
/// # Invariants
///
/// - `0 <= used_slots <= max_slots`
/// - `is_active` flips false in the same transaction that makes
///   `used_slots == max_slots`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarlyAdopterProgram {
    pub is_active: bool,
    pub used_slots: i32,
    pub max_slots: i32,
    pub cutoff_date: Timestamp,
}

impl EarlyAdopterProgram {
    /// Eligibility for a new slot claim at `now`.
    pub fn is_eligible(&self, now: &Timestamp) -> bool {
        self.is_active && self.used_slots < self.max_slots && now.is_before(&self.cutoff_date)
    }

    /// Apply a slot claim to this value, returning whether it succeeded.
    ///
    /// Adapters wrap this in their store's transaction primitive so the
    /// re-read, validation, and write land atomically. Deactivation
    /// happens in the same mutation that fills the last slot.
    pub fn claim(&mut self, now: &Timestamp) -> bool {
        if !self.is_eligible(now) {
            return false;
        }
        self.used_slots += 1;
        if self.used_slots >= self.max_slots {
            self.is_active = false;
        }
        true
    }

    /// Apply a slot release (saga compensation), returning whether a
    /// slot was freed.
    pub fn release(&mut self, now: &Timestamp) -> bool {
        if self.used_slots == 0 {
            return false;
        }
        self.used_slots -= 1;
        if self.used_slots < self.max_slots && now.is_before(&self.cutoff_date) {
            self.is_active = true;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(used: i32, max: i32, active: bool) -> EarlyAdopterProgram {
        EarlyAdopterProgram {
            is_active: active,
            used_slots: used,
            max_slots: max,
            cutoff_date: Timestamp::now().add_days(30),
        }
    }

    #[test]
    fn eligible_when_active_with_room_before_cutoff() {
        let p = program(10, 60, true);
        assert!(p.is_eligible(&Timestamp::now()));
    }

    #[test]
    fn ineligible_after_cutoff() {
        let mut p = program(10, 60, true);
        p.cutoff_date = Timestamp::now().minus_days(1);
        assert!(!p.is_eligible(&Timestamp::now()));
    }

    #[test]
    fn ineligible_when_inactive() {
        let p = program(10, 60, false);
        assert!(!p.is_eligible(&Timestamp::now()));
    }

    #[test]
    fn claiming_last_slot_deactivates_in_same_mutation() {
        let now = Timestamp::now();
        let mut p = program(59, 60, true);

        assert!(p.claim(&now));
        assert_eq!(p.used_slots, 60);
        assert!(!p.is_active);
    }

    #[test]
    fn claim_on_full_pool_does_not_mutate() {
        let now = Timestamp::now();
        let mut p = program(60, 60, false);
        let before = p.clone();

        assert!(!p.claim(&now));
        assert_eq!(p, before);
    }

    #[test]
    fn release_reopens_pool_before_cutoff() {
        let now = Timestamp::now();
        let mut p = program(60, 60, false);

        assert!(p.release(&now));
        assert_eq!(p.used_slots, 59);
        assert!(p.is_active);
    }

    #[test]
    fn release_after_cutoff_does_not_reactivate() {
        let now = Timestamp::now();
        let mut p = program(60, 60, false);
        p.cutoff_date = now.minus_days(1);

        assert!(p.release(&now));
        assert_eq!(p.used_slots, 59);
        assert!(!p.is_active);
    }

    #[test]
    fn release_on_empty_pool_is_a_noop() {
        let now = Timestamp::now();
        let mut p = program(0, 60, true);
        assert!(!p.release(&now));
        assert_eq!(p.used_slots, 0);
    }

    #[test]
    fn slot_count_invariant_holds_under_any_sequence() {
        let now = Timestamp::now();
        let mut p = program(0, 5, true);

        for step in 0..50 {
            if step % 3 == 0 {
                p.release(&now);
            } else {
                p.claim(&now);
            }
            assert!(p.used_slots >= 0 && p.used_slots <= p.max_slots);
            assert_eq!(
                p.is_active,
                p.used_slots < p.max_slots && now.is_before(&p.cutoff_date)
            );
        }
    }
}
