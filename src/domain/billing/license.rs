//! License entitlement records.
//!
//! Licenses are flat entitlement documents keyed by a generated license
//! key. Subscription checkouts and single-theme purchases both create
//! one; the extension redeems the key to resolve its entitlement.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{LicenseKey, ThemeId, Timestamp, UserId};

/// Theme slots granted to every subscription license.
pub const SUBSCRIPTION_MAX_SLOTS: i32 = 3;

/// Kind of entitlement a license grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseKind {
    /// Backed by a subscription; access follows the subscription.
    Subscription,

    /// Single purchase; the unlocked themes never expire.
    Lifetime,
}

/// License entitlement document.
///
/// The store persists this verbatim. Slot churn (swapping
/// `active_slot_themes` within `max_slots`) is validated by callers
/// against `max_slots` and `permanently_unlocked`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseEntitlement {
    pub key: LicenseKey,
    pub user_id: UserId,
    pub active: bool,
    pub kind: LicenseKind,

    /// How many themes may be simultaneously active.
    pub max_slots: i32,

    /// Themes unlocked forever (single purchases).
    pub permanently_unlocked: Vec<ThemeId>,

    /// Themes currently occupying slots.
    pub active_slot_themes: Vec<ThemeId>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl LicenseEntitlement {
    /// License backing a subscription checkout.
    pub fn for_subscription(user_id: UserId, max_slots: i32, now: Timestamp) -> Self {
        Self {
            key: LicenseKey::generate(),
            user_id,
            active: true,
            kind: LicenseKind::Subscription,
            max_slots,
            permanently_unlocked: Vec::new(),
            active_slot_themes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// License for a single-theme lifetime purchase.
    pub fn for_theme_purchase(user_id: UserId, theme: ThemeId, now: Timestamp) -> Self {
        Self {
            key: LicenseKey::generate(),
            user_id,
            active: true,
            kind: LicenseKind::Lifetime,
            max_slots: 0,
            permanently_unlocked: vec![theme],
            active_slot_themes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Deactivate the license (subscription ended).
    pub fn deactivate(&mut self, now: Timestamp) {
        self.active = false;
        self.updated_at = now;
    }
}
