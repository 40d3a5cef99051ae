//! User directory port.
//!
//! Minimal user lookup for entitlement resolution. The `internal` flag
//! replaces any hardcoded staff email list: internal users receive a
//! synthetic lifetime entitlement with no stored subscription.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};

/// Directory entry for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    /// Staff/internal account; grants a synthetic lifetime entitlement.
    pub internal: bool,
}

/// Port for user lookups.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find a user by id.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, DomainError>;

    /// Find a user by email (webhook payloads identify buyers by email
    /// when metadata is missing).
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_directory_is_object_safe() {
        fn _accepts_dyn(_dir: &dyn UserDirectory) {}
    }
}
