//! In-memory implementation of UserDirectory for testing and
//! development.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{UserDirectory, UserRecord};

/// In-memory user directory. Not suitable for multi-server deployments.
pub struct InMemoryUserDirectory {
    users: Mutex<Vec<UserRecord>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, user: UserRecord) {
        self.users.lock().unwrap().push(user);
    }
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, DomainError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == *id)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DomainError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finds_users_by_id_and_email() {
        let directory = InMemoryUserDirectory::new();
        directory.add(UserRecord {
            id: UserId::new("user-1").unwrap(),
            email: "user@example.com".to_string(),
            internal: false,
        });

        let by_id = directory
            .find_by_id(&UserId::new("user-1").unwrap())
            .await
            .unwrap();
        assert!(by_id.is_some());

        let by_email = directory.find_by_email("user@example.com").await.unwrap();
        assert_eq!(by_email.unwrap().id.as_str(), "user-1");

        assert!(directory.find_by_email("other@example.com").await.unwrap().is_none());
    }
}
