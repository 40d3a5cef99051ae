//! PostgreSQL implementation of EarlyAdopterPool.
//!
//! The program is one row; claim and release are single UPDATE
//! statements whose WHERE clause re-validates eligibility, so the
//! read-modify-write is atomic at the database without an explicit
//! transaction. Deactivation on the final slot happens in the same
//! statement.

use crate::domain::billing::EarlyAdopterProgram;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::EarlyAdopterPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// PostgreSQL implementation of the EarlyAdopterPool port.
pub struct PostgresEarlyAdopterPool {
    pool: PgPool,
}

impl PostgresEarlyAdopterPool {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProgramRow {
    is_active: bool,
    used_slots: i32,
    max_slots: i32,
    cutoff_date: DateTime<Utc>,
}

impl From<ProgramRow> for EarlyAdopterProgram {
    fn from(row: ProgramRow) -> Self {
        EarlyAdopterProgram {
            is_active: row.is_active,
            used_slots: row.used_slots,
            max_slots: row.max_slots,
            cutoff_date: Timestamp::from_datetime(row.cutoff_date),
        }
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl EarlyAdopterPool for PostgresEarlyAdopterPool {
    async fn current(&self) -> Result<EarlyAdopterProgram, DomainError> {
        let row: ProgramRow = sqlx::query_as(
            r#"
            SELECT is_active, used_slots, max_slots, cutoff_date
            FROM early_adopter_program
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to read early adopter program", e))?;

        Ok(row.into())
    }

    async fn claim_slot(&self) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE early_adopter_program
            SET used_slots = used_slots + 1,
                is_active = (used_slots + 1 < max_slots),
                updated_at = $1
            WHERE is_active AND used_slots < max_slots AND cutoff_date > $1
            "#,
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to claim early adopter slot", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_slot(&self) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE early_adopter_program
            SET used_slots = used_slots - 1,
                is_active = CASE WHEN cutoff_date > $1 THEN TRUE ELSE is_active END,
                updated_at = $1
            WHERE used_slots > 0
            "#,
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to release early adopter slot", e))?;

        Ok(result.rows_affected() == 1)
    }
}
