//! In-memory implementation of LicenseStore for testing and
//! development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::billing::LicenseEntitlement;
use crate::domain::foundation::{DomainError, LicenseKey, UserId};
use crate::ports::LicenseStore;

/// In-memory license store. Not suitable for multi-server deployments.
pub struct InMemoryLicenseStore {
    licenses: Mutex<HashMap<String, LicenseEntitlement>>,
}

impl InMemoryLicenseStore {
    pub fn new() -> Self {
        Self {
            licenses: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryLicenseStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LicenseStore for InMemoryLicenseStore {
    async fn create(&self, license: &LicenseEntitlement) -> Result<(), DomainError> {
        self.licenses
            .lock()
            .unwrap()
            .insert(license.key.as_str().to_string(), license.clone());
        Ok(())
    }

    async fn update(
        &self,
        key: &LicenseKey,
        license: &LicenseEntitlement,
    ) -> Result<bool, DomainError> {
        let mut licenses = self.licenses.lock().unwrap();
        match licenses.get_mut(key.as_str()) {
            Some(existing) => {
                *existing = license.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find(&self, key: &LicenseKey) -> Result<Option<LicenseEntitlement>, DomainError> {
        Ok(self.licenses.lock().unwrap().get(key.as_str()).cloned())
    }

    async fn find_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<LicenseEntitlement>, DomainError> {
        let licenses = self.licenses.lock().unwrap();
        let mut records: Vec<LicenseEntitlement> = licenses
            .values()
            .filter(|l| l.user_id == *user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::LicenseEntitlement;
    use crate::domain::foundation::Timestamp;

    #[tokio::test]
    async fn update_without_existing_key_writes_nothing() {
        let store = InMemoryLicenseStore::new();
        let user = UserId::new("user-1").unwrap();
        let license = LicenseEntitlement::for_subscription(user, 3, Timestamp::now());

        assert!(!store.update(&license.key, &license).await.unwrap());
        assert!(store.find(&license.key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_then_update_replaces_the_record() {
        let store = InMemoryLicenseStore::new();
        let user = UserId::new("user-1").unwrap();
        let mut license = LicenseEntitlement::for_subscription(user, 3, Timestamp::now());
        store.create(&license).await.unwrap();

        license.active = false;
        assert!(store.update(&license.key, &license).await.unwrap());
        let found = store.find(&license.key).await.unwrap().unwrap();
        assert!(!found.active);
    }
}
