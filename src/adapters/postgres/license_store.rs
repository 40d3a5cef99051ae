//! PostgreSQL implementation of LicenseStore.
//!
//! Theme lists are stored as TEXT[] columns. `update` is a plain UPDATE
//! with no upsert path: zero rows affected means the key does not exist
//! and nothing was written.

use crate::domain::billing::{LicenseEntitlement, LicenseKind};
use crate::domain::foundation::{DomainError, ErrorCode, LicenseKey, ThemeId, Timestamp, UserId};
use crate::ports::LicenseStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// PostgreSQL implementation of the LicenseStore port.
pub struct PostgresLicenseStore {
    pool: PgPool,
}

impl PostgresLicenseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a license.
#[derive(Debug, sqlx::FromRow)]
struct LicenseRow {
    key: String,
    user_id: String,
    active: bool,
    kind: String,
    max_slots: i32,
    permanently_unlocked: Vec<String>,
    active_slot_themes: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LicenseRow> for LicenseEntitlement {
    type Error = DomainError;

    fn try_from(row: LicenseRow) -> Result<Self, Self::Error> {
        Ok(LicenseEntitlement {
            key: LicenseKey::new(row.key).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid license key: {}", e))
            })?,
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            active: row.active,
            kind: parse_kind(&row.kind)?,
            max_slots: row.max_slots,
            permanently_unlocked: parse_themes(row.permanently_unlocked)?,
            active_slot_themes: parse_themes(row.active_slot_themes)?,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_kind(s: &str) -> Result<LicenseKind, DomainError> {
    match s.to_lowercase().as_str() {
        "subscription" => Ok(LicenseKind::Subscription),
        "lifetime" => Ok(LicenseKind::Lifetime),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid license kind: {}", s),
        )),
    }
}

fn kind_to_string(kind: &LicenseKind) -> &'static str {
    match kind {
        LicenseKind::Subscription => "subscription",
        LicenseKind::Lifetime => "lifetime",
    }
}

fn parse_themes(values: Vec<String>) -> Result<Vec<ThemeId>, DomainError> {
    values
        .into_iter()
        .map(|v| {
            ThemeId::new(v).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid theme_id: {}", e))
            })
        })
        .collect()
}

fn themes_to_strings(themes: &[ThemeId]) -> Vec<String> {
    themes.iter().map(|t| t.as_str().to_string()).collect()
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl LicenseStore for PostgresLicenseStore {
    async fn create(&self, license: &LicenseEntitlement) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO licenses (
                key, user_id, active, kind, max_slots,
                permanently_unlocked, active_slot_themes, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(license.key.as_str())
        .bind(license.user_id.as_str())
        .bind(license.active)
        .bind(kind_to_string(&license.kind))
        .bind(license.max_slots)
        .bind(themes_to_strings(&license.permanently_unlocked))
        .bind(themes_to_strings(&license.active_slot_themes))
        .bind(*license.created_at.as_datetime())
        .bind(*license.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create license", e))?;

        Ok(())
    }

    async fn update(
        &self,
        key: &LicenseKey,
        license: &LicenseEntitlement,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE licenses SET
                active = $2,
                kind = $3,
                max_slots = $4,
                permanently_unlocked = $5,
                active_slot_themes = $6,
                updated_at = $7
            WHERE key = $1
            "#,
        )
        .bind(key.as_str())
        .bind(license.active)
        .bind(kind_to_string(&license.kind))
        .bind(license.max_slots)
        .bind(themes_to_strings(&license.permanently_unlocked))
        .bind(themes_to_strings(&license.active_slot_themes))
        .bind(*license.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update license", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn find(&self, key: &LicenseKey) -> Result<Option<LicenseEntitlement>, DomainError> {
        let row: Option<LicenseRow> = sqlx::query_as(
            r#"
            SELECT key, user_id, active, kind, max_slots,
                   permanently_unlocked, active_slot_themes, created_at, updated_at
            FROM licenses
            WHERE key = $1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find license", e))?;

        row.map(LicenseEntitlement::try_from).transpose()
    }

    async fn find_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<LicenseEntitlement>, DomainError> {
        let rows: Vec<LicenseRow> = sqlx::query_as(
            r#"
            SELECT key, user_id, active, kind, max_slots,
                   permanently_unlocked, active_slot_themes, created_at, updated_at
            FROM licenses
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list licenses", e))?;

        rows.into_iter().map(LicenseEntitlement::try_from).collect()
    }
}
