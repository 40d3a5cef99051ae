//! WebhookEventLedger port - idempotency guard for billing webhooks.
//!
//! The billing provider delivers events at least once: network timeouts,
//! 5xx responses, and lost acknowledgements all trigger redelivery of
//! the same event id. The ledger persists per-event processing state as
//! an explicit finite-state machine so that correctness survives process
//! restarts and horizontal scaling:
//!
//! ```text
//! absent -> in_progress -> completed
//!               |
//!               v
//!           abandoned  (retry-eligible, back to in_progress)
//! ```
//!
//! A crash between `begin_processing` and `complete_processing` would
//! strand the event in `in_progress` forever, so implementations reclaim
//! locks older than [`STALE_LOCK_TTL_SECS`].

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};

/// Age after which an `in_progress` lock may be reclaimed by a
/// redelivery (5 minutes).
pub const STALE_LOCK_TTL_SECS: u64 = 300;

/// Processing state of a ledger entry. Absence of an entry is the
/// implicit initial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEventState {
    /// A delivery holds the lock and is running handlers.
    InProgress,
    /// Handlers finished; side effects must never re-run.
    Completed,
    /// Handlers failed; the next delivery may retry.
    Abandoned,
}

impl WebhookEventState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEventState::InProgress => "in_progress",
            WebhookEventState::Completed => "completed",
            WebhookEventState::Abandoned => "abandoned",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "in_progress" => Ok(WebhookEventState::InProgress),
            "completed" => Ok(WebhookEventState::Completed),
            "abandoned" => Ok(WebhookEventState::Abandoned),
            other => Err(DomainError::validation(
                "state",
                format!("Unknown webhook event state: {}", other),
            )),
        }
    }
}

/// Ledger entry for one event id.
#[derive(Debug, Clone)]
pub struct WebhookEventRecord {
    /// Provider event ID (evt_xxx format); the idempotency key.
    pub event_id: String,

    /// Type of event, recorded on completion.
    pub event_type: Option<String>,

    /// Current processing state.
    pub state: WebhookEventState,

    /// When the current lock was taken.
    pub locked_at: Timestamp,

    /// When processing completed. Entries never leave `completed`.
    pub completed_at: Option<Timestamp>,
}

/// Outcome of attempting to acquire the processing lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    /// Lock acquired; this delivery runs the handlers.
    Acquired,
    /// The event already completed; side effects must not re-run.
    AlreadyProcessed,
    /// Another delivery holds a fresh lock; retry later.
    InProgress,
}

/// Port for the webhook idempotency ledger.
///
/// Implementations must make `begin_processing` atomic against
/// concurrent deliveries of the same event id (primary-key insert with
/// conflict detection, or equivalent): two concurrent calls for one id
/// yield exactly one `Acquired`.
#[async_trait]
pub trait WebhookEventLedger: Send + Sync {
    /// Attempt to acquire the processing lock for an event id.
    ///
    /// - No entry: create one in `in_progress`, return `Acquired`.
    /// - `completed`: return `AlreadyProcessed` with no mutation.
    /// - `abandoned`: re-acquire atomically, return `Acquired`.
    /// - `in_progress`: return `InProgress`, unless the lock is older
    ///   than [`STALE_LOCK_TTL_SECS`], in which case reclaim it
    ///   atomically and return `Acquired`.
    ///
    /// # Errors
    ///
    /// `DatabaseError` if the lock store is unavailable; the caller
    /// maps this to a server failure so the provider retries.
    async fn begin_processing(&self, event_id: &str) -> Result<BeginOutcome, DomainError>;

    /// Mark the event completed. Valid only from `in_progress`.
    async fn complete_processing(
        &self,
        event_id: &str,
        event_type: &str,
    ) -> Result<(), DomainError>;

    /// Release the lock after a handler failure, making the event
    /// retry-eligible. MUST be called on any handler error.
    async fn abandon_processing(&self, event_id: &str) -> Result<(), DomainError>;

    /// Look up the ledger entry for an event id.
    async fn find(&self, event_id: &str) -> Result<Option<WebhookEventRecord>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_roundtrips_through_strings() {
        for state in [
            WebhookEventState::InProgress,
            WebhookEventState::Completed,
            WebhookEventState::Abandoned,
        ] {
            assert_eq!(WebhookEventState::parse(state.as_str()).unwrap(), state);
        }
    }

    #[test]
    fn unknown_state_fails_to_parse() {
        assert!(WebhookEventState::parse("pending").is_err());
    }

    #[test]
    fn webhook_event_ledger_is_object_safe() {
        fn _accepts_dyn(_ledger: &dyn WebhookEventLedger) {}
    }
}
