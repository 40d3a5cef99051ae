//! In-memory implementation of SubscriptionStore and DownloadLog for
//! testing and development.
//!
//! One mutex guards both the subscription records and the download log
//! so `consume_credit` stays atomic, matching the PostgreSQL adapter's
//! transaction.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{
    DomainError, ErrorCode, SubscriptionId, ThemeId, Timestamp, UserId,
};
use crate::ports::{CreditConsumption, DownloadLog, DownloadRecord, SubscriptionStore};

#[derive(Default)]
struct Inner {
    subscriptions: Vec<Subscription>,
    downloads: Vec<DownloadRecord>,
}

/// In-memory subscription and download store. Not suitable for
/// multi-server deployments.
pub struct InMemoryBillingStore {
    inner: Mutex<Inner>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }
}

impl Default for InMemoryBillingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionStore for InMemoryBillingStore {
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .subscriptions
            .iter()
            .any(|s| s.external_subscription_id == subscription.external_subscription_id)
        {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                "Duplicate external subscription id",
            ));
        }
        inner.subscriptions.push(subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut inner = self.inner.lock().unwrap();
        match inner
            .subscriptions
            .iter_mut()
            .find(|s| s.id == subscription.id)
        {
            Some(existing) => {
                *existing = subscription.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                "Subscription not found",
            )),
        }
    }

    async fn find_by_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.subscriptions.iter().find(|s| s.id == *id).cloned())
    }

    async fn find_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .subscriptions
            .iter()
            .find(|s| s.external_subscription_id == external_subscription_id)
            .cloned())
    }

    async fn find_all_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Subscription>, DomainError> {
        let inner = self.inner.lock().unwrap();
        let mut records: Vec<Subscription> = inner
            .subscriptions
            .iter()
            .filter(|s| s.user_id == *user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn convert_to_lifetime(
        &self,
        id: &SubscriptionId,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.subscriptions.iter_mut().find(|s| s.id == *id) {
            Some(sub) => {
                sub.convert_to_lifetime(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn reset_billing_period(
        &self,
        id: &SubscriptionId,
        period_start: Timestamp,
        period_end: Timestamp,
    ) -> Result<bool, DomainError> {
        use crate::domain::billing::SubscriptionStatus;

        let mut inner = self.inner.lock().unwrap();
        match inner.subscriptions.iter_mut().find(|s| s.id == *id) {
            Some(sub) => {
                sub.status = SubscriptionStatus::Active;
                sub.current_period_start = Some(period_start);
                sub.current_period_end = Some(period_end);
                sub.credits_used = 0;
                sub.canceled_at = None;
                sub.updated_at = Timestamp::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn consume_credit(
        &self,
        id: &SubscriptionId,
        max_credits: i32,
        download: &DownloadRecord,
    ) -> Result<CreditConsumption, DomainError> {
        let mut inner = self.inner.lock().unwrap();
        let consumed = match inner.subscriptions.iter_mut().find(|s| s.id == *id) {
            Some(sub) if sub.credits_used < max_credits => {
                sub.credits_used += 1;
                sub.updated_at = Timestamp::now();
                true
            }
            _ => false,
        };
        if !consumed {
            return Ok(CreditConsumption::Exhausted);
        }
        inner.downloads.push(download.clone());
        Ok(CreditConsumption::Consumed)
    }
}

#[async_trait]
impl DownloadLog for InMemoryBillingStore {
    async fn has_downloaded(
        &self,
        user_id: &UserId,
        theme_id: &ThemeId,
    ) -> Result<bool, DomainError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .downloads
            .iter()
            .any(|d| d.user_id == *user_id && d.theme_id == *theme_id))
    }

    async fn history(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<DownloadRecord>, DomainError> {
        let inner = self.inner.lock().unwrap();
        let mut records: Vec<DownloadRecord> = inner
            .downloads
            .iter()
            .filter(|d| d.user_id == *user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.downloaded_at.cmp(&a.downloaded_at));
        records.truncate(limit as usize);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::PlanType;
    use crate::domain::foundation::Timestamp;

    fn subscription(user: &str, external: &str) -> Subscription {
        Subscription::from_checkout(
            SubscriptionId::new(),
            UserId::new(user).unwrap(),
            external.to_string(),
            "cus_test".to_string(),
            PlanType::Monthly,
            None,
            None,
            None,
            Timestamp::now(),
        )
    }

    fn download(user: &str, sub: &SubscriptionId, theme: &str) -> DownloadRecord {
        DownloadRecord {
            user_id: UserId::new(user).unwrap(),
            subscription_id: sub.clone(),
            theme_id: ThemeId::new(theme).unwrap(),
            downloaded_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_external_id() {
        let store = InMemoryBillingStore::new();
        store.insert(&subscription("user-1", "sub_1")).await.unwrap();

        let err = store
            .insert(&subscription("user-2", "sub_1"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn consume_credit_stops_at_cap() {
        let store = InMemoryBillingStore::new();
        let sub = subscription("user-1", "sub_1");
        store.insert(&sub).await.unwrap();

        for i in 0..3 {
            let record = download("user-1", &sub.id, &format!("theme-{}", i));
            assert_eq!(
                store.consume_credit(&sub.id, 3, &record).await.unwrap(),
                CreditConsumption::Consumed
            );
        }
        let record = download("user-1", &sub.id, "theme-4");
        assert_eq!(
            store.consume_credit(&sub.id, 3, &record).await.unwrap(),
            CreditConsumption::Exhausted
        );
        assert_eq!(
            store
                .history(&UserId::new("user-1").unwrap(), 10)
                .await
                .unwrap()
                .len(),
            3
        );
    }

    #[tokio::test]
    async fn has_downloaded_tracks_consumed_credits() {
        let store = InMemoryBillingStore::new();
        let sub = subscription("user-1", "sub_1");
        store.insert(&sub).await.unwrap();
        let user = UserId::new("user-1").unwrap();
        let theme = ThemeId::new("midnight-aurora").unwrap();

        assert!(!store.has_downloaded(&user, &theme).await.unwrap());
        store
            .consume_credit(&sub.id, 3, &download("user-1", &sub.id, "midnight-aurora"))
            .await
            .unwrap();
        assert!(store.has_downloaded(&user, &theme).await.unwrap());
    }
}
