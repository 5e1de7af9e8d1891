//! In-memory user subscription store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{BillingUser, SubscriptionSnapshot};
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::UserSubscriptionStore;

/// Users keyed by id, held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserSubscriptionStore {
    users: Arc<RwLock<HashMap<UserId, BillingUser>>>,
}

impl InMemoryUserSubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user.
    pub async fn insert(&self, user: BillingUser) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn get(&self, id: &UserId) -> Option<BillingUser> {
        self.users.read().await.get(id).cloned()
    }

    async fn find_where<F>(&self, predicate: F) -> Option<BillingUser>
    where
        F: Fn(&SubscriptionSnapshot) -> bool,
    {
        self.users
            .read()
            .await
            .values()
            .find(|user| predicate(&user.subscription))
            .cloned()
    }
}

#[async_trait]
impl UserSubscriptionStore for InMemoryUserSubscriptionStore {
    async fn find_by_stripe_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<BillingUser>, DomainError> {
        Ok(self
            .find_where(|s| s.stripe_customer_id.as_deref() == Some(customer_id))
            .await)
    }

    async fn find_by_stripe_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<BillingUser>, DomainError> {
        Ok(self
            .find_where(|s| s.stripe_subscription_id.as_deref() == Some(subscription_id))
            .await)
    }

    async fn update_subscription(
        &self,
        user_id: &UserId,
        snapshot: &SubscriptionSnapshot,
    ) -> Result<(), DomainError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(user_id).ok_or_else(|| {
            DomainError::new(ErrorCode::UserNotFound, format!("User {} not found", user_id))
        })?;
        user.subscription = snapshot.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(customer_id: &str, subscription_id: Option<&str>) -> BillingUser {
        let mut snapshot = SubscriptionSnapshot::for_customer(customer_id);
        snapshot.stripe_subscription_id = subscription_id.map(str::to_string);
        BillingUser::new(UserId::new(), "user@example.com", snapshot)
    }

    #[tokio::test]
    async fn finds_by_customer_and_subscription_id() {
        let store = InMemoryUserSubscriptionStore::new();
        let alice = user("cus_a", Some("sub_a"));
        store.insert(alice.clone()).await;
        store.insert(user("cus_b", None)).await;

        assert_eq!(
            store.find_by_stripe_customer_id("cus_a").await.unwrap(),
            Some(alice.clone())
        );
        assert_eq!(
            store.find_by_stripe_subscription_id("sub_a").await.unwrap(),
            Some(alice)
        );
        assert_eq!(store.find_by_stripe_customer_id("cus_x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_subscription_replaces_snapshot() {
        let store = InMemoryUserSubscriptionStore::new();
        let alice = user("cus_a", None);
        store.insert(alice.clone()).await;

        let mut snapshot = alice.subscription.clone();
        snapshot.subscription_status = Some("active".to_string());
        store.update_subscription(&alice.id, &snapshot).await.unwrap();

        assert_eq!(store.get(&alice.id).await.unwrap().subscription, snapshot);
    }

    #[tokio::test]
    async fn update_unknown_user_is_user_not_found() {
        let store = InMemoryUserSubscriptionStore::new();

        let err = store
            .update_subscription(&UserId::new(), &SubscriptionSnapshot::default())
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::UserNotFound);
    }
}
