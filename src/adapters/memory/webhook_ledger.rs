//! In-memory implementation of WebhookEventLedger for testing and
//! development.
//!
//! A single mutex over the entry map gives the same atomicity the
//! PostgreSQL adapter gets from its conditional statements.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{
    BeginOutcome, WebhookEventLedger, WebhookEventRecord, WebhookEventState, STALE_LOCK_TTL_SECS,
};

/// In-memory webhook ledger. Not suitable for multi-server deployments.
pub struct InMemoryWebhookLedger {
    entries: Mutex<HashMap<String, WebhookEventRecord>>,
    stale_ttl_secs: u64,
}

impl InMemoryWebhookLedger {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            stale_ttl_secs: STALE_LOCK_TTL_SECS,
        }
    }

    /// Override the stale-lock TTL (tests exercise reclaim without
    /// waiting five minutes).
    pub fn with_stale_ttl_secs(stale_ttl_secs: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            stale_ttl_secs,
        }
    }
}

impl Default for InMemoryWebhookLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebhookEventLedger for InMemoryWebhookLedger {
    async fn begin_processing(&self, event_id: &str) -> Result<BeginOutcome, DomainError> {
        let mut entries = self.entries.lock().unwrap();
        let now = Timestamp::now();

        match entries.get_mut(event_id) {
            None => {
                entries.insert(
                    event_id.to_string(),
                    WebhookEventRecord {
                        event_id: event_id.to_string(),
                        event_type: None,
                        state: WebhookEventState::InProgress,
                        locked_at: now,
                        completed_at: None,
                    },
                );
                Ok(BeginOutcome::Acquired)
            }
            Some(entry) => match entry.state {
                WebhookEventState::Completed => Ok(BeginOutcome::AlreadyProcessed),
                WebhookEventState::Abandoned => {
                    entry.state = WebhookEventState::InProgress;
                    entry.locked_at = now;
                    Ok(BeginOutcome::Acquired)
                }
                WebhookEventState::InProgress => {
                    let age = now.duration_since(&entry.locked_at);
                    if age.num_seconds() >= self.stale_ttl_secs as i64 {
                        entry.locked_at = now;
                        Ok(BeginOutcome::Acquired)
                    } else {
                        Ok(BeginOutcome::InProgress)
                    }
                }
            },
        }
    }

    async fn complete_processing(
        &self,
        event_id: &str,
        event_type: &str,
    ) -> Result<(), DomainError> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(event_id) {
            if entry.state == WebhookEventState::InProgress {
                entry.state = WebhookEventState::Completed;
                entry.event_type = Some(event_type.to_string());
                entry.completed_at = Some(Timestamp::now());
            }
        }
        Ok(())
    }

    async fn abandon_processing(&self, event_id: &str) -> Result<(), DomainError> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(event_id) {
            if entry.state == WebhookEventState::InProgress {
                entry.state = WebhookEventState::Abandoned;
            }
        }
        Ok(())
    }

    async fn find(&self, event_id: &str) -> Result<Option<WebhookEventRecord>, DomainError> {
        Ok(self.entries.lock().unwrap().get(event_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_begin_acquires_then_blocks() {
        let ledger = InMemoryWebhookLedger::new();
        assert_eq!(
            ledger.begin_processing("evt_1").await.unwrap(),
            BeginOutcome::Acquired
        );
        assert_eq!(
            ledger.begin_processing("evt_1").await.unwrap(),
            BeginOutcome::InProgress
        );
    }

    #[tokio::test]
    async fn completed_event_reports_already_processed() {
        let ledger = InMemoryWebhookLedger::new();
        ledger.begin_processing("evt_1").await.unwrap();
        ledger
            .complete_processing("evt_1", "invoice.paid")
            .await
            .unwrap();

        assert_eq!(
            ledger.begin_processing("evt_1").await.unwrap(),
            BeginOutcome::AlreadyProcessed
        );
        let record = ledger.find("evt_1").await.unwrap().unwrap();
        assert_eq!(record.event_type.as_deref(), Some("invoice.paid"));
        assert!(record.completed_at.is_some());
    }

    #[tokio::test]
    async fn abandoned_event_can_be_reacquired() {
        let ledger = InMemoryWebhookLedger::new();
        ledger.begin_processing("evt_1").await.unwrap();
        ledger.abandon_processing("evt_1").await.unwrap();

        assert_eq!(
            ledger.begin_processing("evt_1").await.unwrap(),
            BeginOutcome::Acquired
        );
    }

    #[tokio::test]
    async fn stale_lock_is_reclaimed() {
        let ledger = InMemoryWebhookLedger::with_stale_ttl_secs(0);
        ledger.begin_processing("evt_1").await.unwrap();

        assert_eq!(
            ledger.begin_processing("evt_1").await.unwrap(),
            BeginOutcome::Acquired
        );
    }
}
