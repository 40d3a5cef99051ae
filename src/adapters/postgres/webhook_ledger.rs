//! PostgreSQL implementation of WebhookEventLedger.
//!
//! The primary key on `event_id` makes lock acquisition race-free:
//! `INSERT ... ON CONFLICT DO NOTHING` admits exactly one of any number
//! of concurrent deliveries. Re-acquisition of abandoned or stale locks
//! uses compare-and-swap UPDATEs on the state column.

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{
    BeginOutcome, WebhookEventLedger, WebhookEventRecord, WebhookEventState, STALE_LOCK_TTL_SECS,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// PostgreSQL implementation of the WebhookEventLedger port.
pub struct PostgresWebhookLedger {
    pool: PgPool,
}

impl PostgresWebhookLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a ledger entry.
#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    event_id: String,
    event_type: Option<String>,
    state: String,
    locked_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<WebhookEventRow> for WebhookEventRecord {
    type Error = DomainError;

    fn try_from(row: WebhookEventRow) -> Result<Self, Self::Error> {
        Ok(WebhookEventRecord {
            event_id: row.event_id,
            event_type: row.event_type,
            state: WebhookEventState::parse(&row.state)?,
            locked_at: Timestamp::from_datetime(row.locked_at),
            completed_at: row.completed_at.map(Timestamp::from_datetime),
        })
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl WebhookEventLedger for PostgresWebhookLedger {
    async fn begin_processing(&self, event_id: &str) -> Result<BeginOutcome, DomainError> {
        let now = Utc::now();

        // Fast path: first delivery wins the primary-key insert
        let inserted = sqlx::query(
            r#"
            INSERT INTO webhook_events (event_id, state, locked_at)
            VALUES ($1, 'in_progress', $2)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to insert webhook event", e))?;

        if inserted.rows_affected() == 1 {
            return Ok(BeginOutcome::Acquired);
        }

        let row: WebhookEventRow = sqlx::query_as(
            r#"
            SELECT event_id, event_type, state, locked_at, completed_at
            FROM webhook_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to read webhook event", e))?;

        match WebhookEventState::parse(&row.state)? {
            WebhookEventState::Completed => Ok(BeginOutcome::AlreadyProcessed),
            WebhookEventState::Abandoned => {
                let reacquired = sqlx::query(
                    r#"
                    UPDATE webhook_events
                    SET state = 'in_progress', locked_at = $2
                    WHERE event_id = $1 AND state = 'abandoned'
                    "#,
                )
                .bind(event_id)
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(|e| db_error("Failed to re-acquire webhook lock", e))?;

                if reacquired.rows_affected() == 1 {
                    Ok(BeginOutcome::Acquired)
                } else {
                    // A concurrent delivery re-acquired first
                    Ok(BeginOutcome::InProgress)
                }
            }
            WebhookEventState::InProgress => {
                // A crash mid-processing would strand the lock forever;
                // reclaim it once it passes the TTL
                let stale_before = now - chrono::Duration::seconds(STALE_LOCK_TTL_SECS as i64);
                if row.locked_at > stale_before {
                    return Ok(BeginOutcome::InProgress);
                }

                let reclaimed = sqlx::query(
                    r#"
                    UPDATE webhook_events
                    SET locked_at = $2
                    WHERE event_id = $1 AND state = 'in_progress' AND locked_at <= $3
                    "#,
                )
                .bind(event_id)
                .bind(now)
                .bind(stale_before)
                .execute(&self.pool)
                .await
                .map_err(|e| db_error("Failed to reclaim stale webhook lock", e))?;

                if reclaimed.rows_affected() == 1 {
                    tracing::warn!(event_id, "reclaimed stale webhook lock");
                    Ok(BeginOutcome::Acquired)
                } else {
                    Ok(BeginOutcome::InProgress)
                }
            }
        }
    }

    async fn complete_processing(
        &self,
        event_id: &str,
        event_type: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_events
            SET state = 'completed', event_type = $2, completed_at = $3
            WHERE event_id = $1 AND state = 'in_progress'
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to complete webhook event", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Webhook event {} is not in progress", event_id),
            ));
        }
        Ok(())
    }

    async fn abandon_processing(&self, event_id: &str) -> Result<(), DomainError> {
        // CAS on in_progress: if another delivery reclaimed the lock in
        // the meantime, leave its state alone
        sqlx::query(
            r#"
            UPDATE webhook_events
            SET state = 'abandoned'
            WHERE event_id = $1 AND state = 'in_progress'
            "#,
        )
        .bind(event_id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to abandon webhook event", e))?;

        Ok(())
    }

    async fn find(&self, event_id: &str) -> Result<Option<WebhookEventRecord>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(
            r#"
            SELECT event_id, event_type, state, locked_at, completed_at
            FROM webhook_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find webhook event", e))?;

        row.map(WebhookEventRecord::try_from).transpose()
    }
}
