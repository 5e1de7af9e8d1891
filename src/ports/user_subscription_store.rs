//! UserSubscriptionStore port - lookup and update of the subscription
//! snapshot embedded in a user record.

use async_trait::async_trait;

use crate::domain::billing::{BillingUser, SubscriptionSnapshot};
use crate::domain::foundation::{DomainError, UserId};

/// Port for reading and writing users' subscription snapshots.
#[async_trait]
pub trait UserSubscriptionStore: Send + Sync {
    /// Finds the user linked to a Stripe customer.
    async fn find_by_stripe_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<BillingUser>, DomainError>;

    /// Finds the user holding a Stripe subscription.
    async fn find_by_stripe_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<BillingUser>, DomainError>;

    /// Overwrites the user's snapshot. Last write wins.
    ///
    /// Returns `ErrorCode::UserNotFound` if the user no longer exists.
    async fn update_subscription(
        &self,
        user_id: &UserId,
        snapshot: &SubscriptionSnapshot,
    ) -> Result<(), DomainError>;
}
