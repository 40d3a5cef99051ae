//! PostgreSQL implementation of SubscriptionStore and DownloadLog.
//!
//! The capped credit increment and the download-record append run in one
//! transaction; the `credits_used < max` predicate on the UPDATE is what
//! enforces the cap under concurrent downloads.

use crate::domain::billing::{PlanType, Subscription, SubscriptionStatus};
use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, ThemeId, Timestamp, UserId};
use crate::ports::{CreditConsumption, DownloadLog, DownloadRecord, SubscriptionStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the SubscriptionStore and DownloadLog ports.
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    external_subscription_id: String,
    external_customer_id: String,
    status: String,
    plan: String,
    is_lifetime: bool,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    trial_ends_at: Option<DateTime<Utc>>,
    commitment_ends_at: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
    lifetime_converted_at: Option<DateTime<Utc>>,
    credits_used: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            external_subscription_id: row.external_subscription_id,
            external_customer_id: row.external_customer_id,
            status: parse_status(&row.status)?,
            plan: parse_plan(&row.plan)?,
            is_lifetime: row.is_lifetime,
            current_period_start: row.current_period_start.map(Timestamp::from_datetime),
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            trial_ends_at: row.trial_ends_at.map(Timestamp::from_datetime),
            commitment_ends_at: row.commitment_ends_at.map(Timestamp::from_datetime),
            canceled_at: row.canceled_at.map(Timestamp::from_datetime),
            lifetime_converted_at: row.lifetime_converted_at.map(Timestamp::from_datetime),
            credits_used: row.credits_used,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// Database row representation of a download record.
#[derive(Debug, sqlx::FromRow)]
struct DownloadRow {
    user_id: String,
    subscription_id: Uuid,
    theme_id: String,
    downloaded_at: DateTime<Utc>,
}

impl TryFrom<DownloadRow> for DownloadRecord {
    type Error = DomainError;

    fn try_from(row: DownloadRow) -> Result<Self, Self::Error> {
        Ok(DownloadRecord {
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            subscription_id: SubscriptionId::from_uuid(row.subscription_id),
            theme_id: ThemeId::new(row.theme_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid theme_id: {}", e))
            })?,
            downloaded_at: Timestamp::from_datetime(row.downloaded_at),
        })
    }
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    match s.to_lowercase().as_str() {
        "active" => Ok(SubscriptionStatus::Active),
        "trialing" => Ok(SubscriptionStatus::Trialing),
        "canceled" => Ok(SubscriptionStatus::Canceled),
        "expired" => Ok(SubscriptionStatus::Expired),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid status value: {}", s),
        )),
    }
}

fn status_to_string(status: &SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::Active => "active",
        SubscriptionStatus::Trialing => "trialing",
        SubscriptionStatus::Canceled => "canceled",
        SubscriptionStatus::Expired => "expired",
    }
}

fn parse_plan(s: &str) -> Result<PlanType, DomainError> {
    match s.to_lowercase().as_str() {
        "monthly" => Ok(PlanType::Monthly),
        "yearly" => Ok(PlanType::Yearly),
        "lifetime" => Ok(PlanType::Lifetime),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid plan value: {}", s),
        )),
    }
}

fn plan_to_string(plan: &PlanType) -> &'static str {
    match plan {
        PlanType::Monthly => "monthly",
        PlanType::Yearly => "yearly",
        PlanType::Lifetime => "lifetime",
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, external_subscription_id, external_customer_id,
           status, plan, is_lifetime,
           current_period_start, current_period_end, trial_ends_at,
           commitment_ends_at, canceled_at, lifetime_converted_at,
           credits_used, created_at, updated_at
    FROM subscriptions
"#;

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, external_subscription_id, external_customer_id,
                status, plan, is_lifetime,
                current_period_start, current_period_end, trial_ends_at,
                commitment_ends_at, canceled_at, lifetime_converted_at,
                credits_used, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_str())
        .bind(&subscription.external_subscription_id)
        .bind(&subscription.external_customer_id)
        .bind(status_to_string(&subscription.status))
        .bind(plan_to_string(&subscription.plan))
        .bind(subscription.is_lifetime)
        .bind(subscription.current_period_start.map(|t| *t.as_datetime()))
        .bind(subscription.current_period_end.map(|t| *t.as_datetime()))
        .bind(subscription.trial_ends_at.map(|t| *t.as_datetime()))
        .bind(subscription.commitment_ends_at.map(|t| *t.as_datetime()))
        .bind(subscription.canceled_at.map(|t| *t.as_datetime()))
        .bind(subscription.lifetime_converted_at.map(|t| *t.as_datetime()))
        .bind(subscription.credits_used)
        .bind(*subscription.created_at.as_datetime())
        .bind(*subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("subscriptions_external_subscription_id_key") {
                    return DomainError::new(
                        ErrorCode::ValidationFailed,
                        "Subscription with this external id already exists",
                    );
                }
            }
            db_error("Failed to insert subscription", e)
        })?;

        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = $2,
                plan = $3,
                is_lifetime = $4,
                current_period_start = $5,
                current_period_end = $6,
                trial_ends_at = $7,
                commitment_ends_at = $8,
                canceled_at = $9,
                lifetime_converted_at = $10,
                credits_used = $11,
                updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(status_to_string(&subscription.status))
        .bind(plan_to_string(&subscription.plan))
        .bind(subscription.is_lifetime)
        .bind(subscription.current_period_start.map(|t| *t.as_datetime()))
        .bind(subscription.current_period_end.map(|t| *t.as_datetime()))
        .bind(subscription.trial_ends_at.map(|t| *t.as_datetime()))
        .bind(subscription.commitment_ends_at.map(|t| *t.as_datetime()))
        .bind(subscription.canceled_at.map(|t| *t.as_datetime()))
        .bind(subscription.lifetime_converted_at.map(|t| *t.as_datetime()))
        .bind(subscription.credits_used)
        .bind(*subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update subscription", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                "Subscription not found",
            ));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to find subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE external_subscription_id = $1",
            SELECT_COLUMNS
        ))
        .bind(external_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_all_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list subscriptions", e))?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn convert_to_lifetime(
        &self,
        id: &SubscriptionId,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        // Idempotent: an already-lifetime row matches but keeps its
        // original conversion timestamp
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                is_lifetime = TRUE,
                plan = 'lifetime',
                lifetime_converted_at = COALESCE(lifetime_converted_at, $2),
                updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(*now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to convert subscription to lifetime", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn reset_billing_period(
        &self,
        id: &SubscriptionId,
        period_start: Timestamp,
        period_end: Timestamp,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = 'active',
                current_period_start = $2,
                current_period_end = $3,
                credits_used = 0,
                canceled_at = NULL,
                updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(*period_start.as_datetime())
        .bind(*period_end.as_datetime())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to reset billing period", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn consume_credit(
        &self,
        id: &SubscriptionId,
        max_credits: i32,
        download: &DownloadRecord,
    ) -> Result<CreditConsumption, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        // The WHERE predicate is the cap: under concurrency only as many
        // UPDATEs match as there are credits left
        let incremented = sqlx::query(
            r#"
            UPDATE subscriptions
            SET credits_used = credits_used + 1, updated_at = $3
            WHERE id = $1 AND credits_used < $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(max_credits)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to increment credits", e))?;

        if incremented.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| db_error("Failed to roll back transaction", e))?;
            return Ok(CreditConsumption::Exhausted);
        }

        sqlx::query(
            r#"
            INSERT INTO downloads (user_id, subscription_id, theme_id, downloaded_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(download.user_id.as_str())
        .bind(download.subscription_id.as_uuid())
        .bind(download.theme_id.as_str())
        .bind(*download.downloaded_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to record download", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))?;

        Ok(CreditConsumption::Consumed)
    }
}

#[async_trait]
impl DownloadLog for PostgresSubscriptionStore {
    async fn has_downloaded(
        &self,
        user_id: &UserId,
        theme_id: &ThemeId,
    ) -> Result<bool, DomainError> {
        let exists: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT 1 FROM downloads
            WHERE user_id = $1 AND theme_id = $2
            LIMIT 1
            "#,
        )
        .bind(user_id.as_str())
        .bind(theme_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to check download history", e))?;

        Ok(exists.is_some())
    }

    async fn history(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<DownloadRecord>, DomainError> {
        let rows: Vec<DownloadRow> = sqlx::query_as(
            r#"
            SELECT user_id, subscription_id, theme_id, downloaded_at
            FROM downloads
            WHERE user_id = $1
            ORDER BY downloaded_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list downloads", e))?;

        rows.into_iter().map(DownloadRecord::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_status_conversion() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::Trialing,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Expired,
        ] {
            assert_eq!(parse_status(status_to_string(&status)).unwrap(), status);
        }
    }

    #[test]
    fn roundtrip_plan_conversion() {
        for plan in [PlanType::Monthly, PlanType::Yearly, PlanType::Lifetime] {
            assert_eq!(parse_plan(plan_to_string(&plan)).unwrap(), plan);
        }
    }

    #[test]
    fn parse_status_is_case_insensitive() {
        assert_eq!(parse_status("ACTIVE").unwrap(), SubscriptionStatus::Active);
        assert_eq!(
            parse_status("Trialing").unwrap(),
            SubscriptionStatus::Trialing
        );
    }

    #[test]
    fn parse_rejects_unknown_values() {
        assert!(parse_status("past_due").is_err());
        assert!(parse_plan("weekly").is_err());
        assert!(parse_status("").is_err());
    }
}
