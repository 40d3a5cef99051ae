//! Download log port (read side).
//!
//! The append happens inside `SubscriptionStore::consume_credit`; this
//! port is the read side used for the redownload exemption and the
//! account download history.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ThemeId, UserId};
use crate::ports::subscription_store::DownloadRecord;

/// Read port over the append-only download log.
#[async_trait]
pub trait DownloadLog: Send + Sync {
    /// True if the user has ever downloaded the theme. Grants the
    /// redownload exemption.
    async fn has_downloaded(
        &self,
        user_id: &UserId,
        theme_id: &ThemeId,
    ) -> Result<bool, DomainError>;

    /// Download history for a user, newest first.
    async fn history(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<DownloadRecord>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_log_is_object_safe() {
        fn _accepts_dyn(_log: &dyn DownloadLog) {}
    }
}
