//! GetCreditStatusHandler - Query handler for the credit position and
//! recent download history shown on the account page.

use std::sync::Arc;

use crate::domain::billing::{select_authoritative, CreditStatus};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::{DownloadLog, DownloadRecord, SubscriptionStore};

const HISTORY_LIMIT: u32 = 50;

/// Query for a user's credit position.
#[derive(Debug, Clone)]
pub struct GetCreditStatusQuery {
    pub user_id: UserId,
}

/// Credit position plus recent downloads.
#[derive(Debug, Clone)]
pub struct GetCreditStatusResult {
    /// Absent when the user has no subscription records.
    pub credits: Option<CreditStatus>,
    pub recent_downloads: Vec<DownloadRecord>,
}

/// Handler projecting the credit position. Read-only.
pub struct GetCreditStatusHandler {
    subscriptions: Arc<dyn SubscriptionStore>,
    downloads: Arc<dyn DownloadLog>,
}

impl GetCreditStatusHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionStore>, downloads: Arc<dyn DownloadLog>) -> Self {
        Self {
            subscriptions,
            downloads,
        }
    }

    pub async fn handle(
        &self,
        query: GetCreditStatusQuery,
    ) -> Result<GetCreditStatusResult, DomainError> {
        let records = self
            .subscriptions
            .find_all_by_user_id(&query.user_id)
            .await?;
        let credits = select_authoritative(&records)
            .map(|subscription| CreditStatus::of(subscription, &Timestamp::now()));
        let recent_downloads = self.downloads.history(&query.user_id, HISTORY_LIMIT).await?;

        Ok(GetCreditStatusResult {
            credits,
            recent_downloads,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{PlanType, Subscription, SubscriptionStatus, MAX_CREDITS};
    use crate::domain::foundation::{SubscriptionId, ThemeId};
    use crate::ports::CreditConsumption;
    use async_trait::async_trait;

    struct MockStore {
        subscriptions: Vec<Subscription>,
        downloads: Vec<DownloadRecord>,
    }

    #[async_trait]
    impl SubscriptionStore for MockStore {
        async fn insert(&self, _subscription: &Subscription) -> Result<(), DomainError> {
            Ok(())
        }

        async fn update(&self, _subscription: &Subscription) -> Result<(), DomainError> {
            Ok(())
        }

        async fn find_by_id(
            &self,
            id: &SubscriptionId,
        ) -> Result<Option<Subscription>, DomainError> {
            Ok(self.subscriptions.iter().find(|s| &s.id == id).cloned())
        }

        async fn find_by_external_id(
            &self,
            external_subscription_id: &str,
        ) -> Result<Option<Subscription>, DomainError> {
            Ok(self
                .subscriptions
                .iter()
                .find(|s| s.external_subscription_id == external_subscription_id)
                .cloned())
        }

        async fn find_all_by_user_id(
            &self,
            user_id: &UserId,
        ) -> Result<Vec<Subscription>, DomainError> {
            Ok(self
                .subscriptions
                .iter()
                .filter(|s| &s.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn convert_to_lifetime(
            &self,
            _id: &SubscriptionId,
            _now: Timestamp,
        ) -> Result<bool, DomainError> {
            Ok(false)
        }

        async fn reset_billing_period(
            &self,
            _id: &SubscriptionId,
            _period_start: Timestamp,
            _period_end: Timestamp,
        ) -> Result<bool, DomainError> {
            Ok(false)
        }

        async fn consume_credit(
            &self,
            _id: &SubscriptionId,
            _max_credits: i32,
            _download: &DownloadRecord,
        ) -> Result<CreditConsumption, DomainError> {
            Ok(CreditConsumption::Exhausted)
        }
    }

    #[async_trait]
    impl DownloadLog for MockStore {
        async fn has_downloaded(
            &self,
            user_id: &UserId,
            theme_id: &ThemeId,
        ) -> Result<bool, DomainError> {
            Ok(self
                .downloads
                .iter()
                .any(|d| &d.user_id == user_id && &d.theme_id == theme_id))
        }

        async fn history(
            &self,
            user_id: &UserId,
            limit: u32,
        ) -> Result<Vec<DownloadRecord>, DomainError> {
            Ok(self
                .downloads
                .iter()
                .filter(|d| &d.user_id == user_id)
                .take(limit as usize)
                .cloned()
                .collect())
        }
    }

    fn user_id() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn subscription(credits_used: i32) -> Subscription {
        let now = Timestamp::now();
        Subscription {
            id: SubscriptionId::new(),
            user_id: user_id(),
            external_subscription_id: "sub_abc".to_string(),
            external_customer_id: "cus_abc".to_string(),
            status: SubscriptionStatus::Active,
            plan: PlanType::Monthly,
            is_lifetime: false,
            current_period_start: Some(now.minus_days(10)),
            current_period_end: Some(now.add_days(20)),
            trial_ends_at: None,
            commitment_ends_at: None,
            canceled_at: None,
            lifetime_converted_at: None,
            credits_used,
            created_at: now.minus_days(10),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn reports_remaining_credits_and_history() {
        let sub = subscription(2);
        let store = Arc::new(MockStore {
            downloads: vec![DownloadRecord {
                user_id: user_id(),
                subscription_id: sub.id,
                theme_id: ThemeId::new("deep-ocean").unwrap(),
                downloaded_at: Timestamp::now().minus_days(1),
            }],
            subscriptions: vec![sub],
        });
        let handler = GetCreditStatusHandler::new(store.clone(), store);

        let result = handler
            .handle(GetCreditStatusQuery { user_id: user_id() })
            .await
            .unwrap();
        let credits = result.credits.unwrap();
        assert_eq!(credits.used, 2);
        assert_eq!(credits.remaining, MAX_CREDITS - 2);
        assert_eq!(result.recent_downloads.len(), 1);
    }

    #[tokio::test]
    async fn no_subscription_yields_no_credit_position() {
        let store = Arc::new(MockStore {
            subscriptions: vec![],
            downloads: vec![],
        });
        let handler = GetCreditStatusHandler::new(store.clone(), store);

        let result = handler
            .handle(GetCreditStatusQuery { user_id: user_id() })
            .await
            .unwrap();
        assert!(result.credits.is_none());
        assert!(result.recent_downloads.is_empty());
    }
}
