//! Subscription store port (write side).
//!
//! Defines the contract for persisting and retrieving Subscription
//! records. A user may own several records; callers combine
//! `find_all_by_user_id` with the domain selector to pick the
//! authoritative one.
//!
//! # Design
//!
//! - **No physical deletes**: records transition to Expired instead
//! - **Atomic credit consumption**: the capped increment and the
//!   download-record append land in one transaction; a credit increment
//!   without a recorded download would make a future redownload
//!   indistinguishable from a fresh purchase

use async_trait::async_trait;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, SubscriptionId, ThemeId, Timestamp, UserId};

/// One download, appended when a credit is consumed. Existence of a
/// record for a (user, theme) pair grants redownload rights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRecord {
    pub user_id: UserId,
    pub subscription_id: SubscriptionId,
    pub theme_id: ThemeId,
    pub downloaded_at: Timestamp,
}

/// Outcome of the atomic capped credit increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditConsumption {
    /// Credit consumed and download recorded.
    Consumed,
    /// The cap was already reached; nothing was written.
    Exhausted,
}

/// Repository port for Subscription persistence.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if a record with the same external
    ///   subscription id already exists (webhook redelivery)
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Update an existing record in full.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the record doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Find a record by its ID.
    async fn find_by_id(&self, id: &SubscriptionId)
        -> Result<Option<Subscription>, DomainError>;

    /// Find a record by the provider's subscription id.
    async fn find_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// All records for a user, newest first. Callers apply
    /// [`crate::domain::billing::select_authoritative`].
    async fn find_all_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Convert a record to the lifetime plan.
    ///
    /// Returns `false` without writing if the record is absent. An
    /// already-lifetime record returns `true` (idempotent).
    async fn convert_to_lifetime(
        &self,
        id: &SubscriptionId,
        now: Timestamp,
    ) -> Result<bool, DomainError>;

    /// Roll the billing period forward (renewal): new period bounds,
    /// credits back to zero, status active.
    ///
    /// Returns `false` without writing if the record is absent.
    async fn reset_billing_period(
        &self,
        id: &SubscriptionId,
        period_start: Timestamp,
        period_end: Timestamp,
    ) -> Result<bool, DomainError>;

    /// Atomically increment `credits_used` if below `max_credits` and
    /// append `download` in the same transaction.
    ///
    /// The increment must be a transactional read-modify-write: a naive
    /// read-increment-write loses updates under concurrency, and the
    /// cap must hold under any interleaving.
    async fn consume_credit(
        &self,
        id: &SubscriptionId,
        max_credits: i32,
        download: &DownloadRecord,
    ) -> Result<CreditConsumption, DomainError>;
}
