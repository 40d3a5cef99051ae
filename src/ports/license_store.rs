//! License store port.
//!
//! Flat entitlement records keyed by license key. Deliberately no
//! upsert: `update` refuses to write when the key is absent, so a typo
//! or stale key cannot silently fabricate a license.

use async_trait::async_trait;

use crate::domain::billing::LicenseEntitlement;
use crate::domain::foundation::{DomainError, LicenseKey, UserId};

/// Port for license entitlement persistence.
///
/// The store persists entitlement documents verbatim; slot-count
/// invariants on `active_slot_themes` are enforced by callers.
#[async_trait]
pub trait LicenseStore: Send + Sync {
    /// Initial write. Callers guarantee key uniqueness (keys are
    /// generated, never user-supplied).
    async fn create(&self, license: &LicenseEntitlement) -> Result<(), DomainError>;

    /// Full replace of an existing license.
    ///
    /// Returns `false` and performs no write if the key is absent.
    async fn update(
        &self,
        key: &LicenseKey,
        license: &LicenseEntitlement,
    ) -> Result<bool, DomainError>;

    /// Look up a license by key.
    async fn find(&self, key: &LicenseKey) -> Result<Option<LicenseEntitlement>, DomainError>;

    /// All licenses belonging to a user.
    async fn find_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<LicenseEntitlement>, DomainError>;
}
