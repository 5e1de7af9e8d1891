//! SubscriptionStateApplier - the only writer of users' subscription snapshots.

use std::sync::Arc;

use crate::domain::billing::{BillingUser, SubscriptionObject};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::UserSubscriptionStore;

/// Result of applying a subscription change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The user's snapshot was written.
    Applied { user_id: UserId },
    /// No local user is linked to the customer. Nothing was written.
    UserNotFound,
}

/// Applies verified Stripe subscription state to the local user record.
///
/// Writes are last-write-wins: an older event delivered after a newer one
/// overwrites it. Lookup misses are reported, not raised, because Stripe
/// can send events for a customer before the local link exists.
pub struct SubscriptionStateApplier {
    store: Arc<dyn UserSubscriptionStore>,
}

impl SubscriptionStateApplier {
    pub fn new(store: Arc<dyn UserSubscriptionStore>) -> Self {
        Self { store }
    }

    /// Mirrors a created or updated subscription onto its customer's user.
    pub async fn apply_update(
        &self,
        subscription: &SubscriptionObject,
    ) -> Result<ApplyOutcome, DomainError> {
        let Some(mut user) = self.find_customer(subscription).await? else {
            return Ok(ApplyOutcome::UserNotFound);
        };

        user.subscription.apply_update(subscription);
        self.store
            .update_subscription(&user.id, &user.subscription)
            .await?;

        tracing::debug!(
            user_id = %user.id,
            subscription_id = %subscription.id,
            status = %subscription.status,
            "Subscription snapshot updated"
        );
        Ok(ApplyOutcome::Applied { user_id: user.id })
    }

    /// Mirrors a deleted subscription onto its customer's user.
    pub async fn apply_cancellation(
        &self,
        subscription: &SubscriptionObject,
    ) -> Result<ApplyOutcome, DomainError> {
        let Some(mut user) = self.find_customer(subscription).await? else {
            return Ok(ApplyOutcome::UserNotFound);
        };

        user.subscription.apply_cancellation(subscription);
        self.store
            .update_subscription(&user.id, &user.subscription)
            .await?;

        tracing::debug!(
            user_id = %user.id,
            subscription_id = %subscription.id,
            "Subscription snapshot canceled"
        );
        Ok(ApplyOutcome::Applied { user_id: user.id })
    }

    /// Finds the user currently holding `subscription_id`.
    pub async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<BillingUser>, DomainError> {
        self.store
            .find_by_stripe_subscription_id(subscription_id)
            .await
    }

    /// Cancels the user's subscription locally after a failed payment.
    pub async fn mark_payment_failed(
        &self,
        user: &BillingUser,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let mut snapshot = user.subscription.clone();
        snapshot.mark_payment_failed(now);
        self.store.update_subscription(&user.id, &snapshot).await
    }

    async fn find_customer(
        &self,
        subscription: &SubscriptionObject,
    ) -> Result<Option<BillingUser>, DomainError> {
        let user = self
            .store
            .find_by_stripe_customer_id(&subscription.customer_id)
            .await?;

        if user.is_none() {
            tracing::warn!(
                customer_id = %subscription.customer_id,
                subscription_id = %subscription.id,
                "User not found for Stripe customer"
            );
        }
        Ok(user)
    }
}
