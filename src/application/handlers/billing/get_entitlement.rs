//! GetEntitlementHandler - Query handler for the extension status check.
//!
//! Read-only: selects the authoritative subscription record and projects
//! it through the domain resolver. Internal users short-circuit to a
//! synthetic lifetime entitlement.

use std::sync::Arc;

use crate::domain::billing::{resolve_entitlement, select_authoritative, EntitlementStatus};
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{SubscriptionStore, UserDirectory};

/// Query for a user's resolved entitlement.
#[derive(Debug, Clone)]
pub struct GetEntitlementQuery {
    pub user_id: UserId,
}

/// Handler resolving entitlements for the extension and the account page.
pub struct GetEntitlementHandler {
    subscriptions: Arc<dyn SubscriptionStore>,
    users: Arc<dyn UserDirectory>,
}

impl GetEntitlementHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionStore>, users: Arc<dyn UserDirectory>) -> Self {
        Self {
            subscriptions,
            users,
        }
    }

    pub async fn handle(&self, query: GetEntitlementQuery) -> Result<EntitlementStatus, DomainError> {
        if let Some(user) = self.users.find_by_id(&query.user_id).await? {
            if user.internal {
                return Ok(EntitlementStatus::internal());
            }
        }

        let records = self
            .subscriptions
            .find_all_by_user_id(&query.user_id)
            .await?;
        Ok(resolve_entitlement(select_authoritative(&records)))
    }
}
