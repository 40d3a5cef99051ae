//! Early-adopter slot pool port.
//!
//! The pool is one scarce global resource contended by concurrent
//! purchase completions. Implementations must use the store's native
//! atomic read-modify-write primitive for claim and release; in-process
//! locks are useless because handlers are stateless and may run on
//! multiple instances.

use async_trait::async_trait;

use crate::domain::billing::EarlyAdopterProgram;
use crate::domain::foundation::DomainError;

/// Port for the bounded promotional slot pool.
#[async_trait]
pub trait EarlyAdopterPool: Send + Sync {
    /// Read the current program state.
    async fn current(&self) -> Result<EarlyAdopterProgram, DomainError>;

    /// Non-transactional eligibility pre-check. The authoritative check
    /// happens again inside `claim_slot`.
    async fn is_eligible(&self) -> Result<bool, DomainError> {
        use crate::domain::foundation::Timestamp;
        Ok(self.current().await?.is_eligible(&Timestamp::now()))
    }

    /// Claim one slot inside a single atomic transaction: re-read the
    /// singleton, re-validate eligibility, increment `used_slots`, and
    /// deactivate in the same transaction if the pool fills. Returns
    /// `false` with no mutation when ineligible.
    async fn claim_slot(&self) -> Result<bool, DomainError>;

    /// Release one slot (saga compensation): atomic decrement, floored
    /// at zero; reactivates the pool if room opened before the cutoff.
    /// Returns `false` if no slot was held.
    async fn release_slot(&self) -> Result<bool, DomainError>;
}
