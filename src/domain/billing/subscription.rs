//! Locally owned view of a user's billing subscription.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

use super::event::{SubscriptionObject, STATUS_CANCELED};

/// The local system's cached view of a user's Stripe subscription.
///
/// Embedded in [`BillingUser`]. Every mutation replaces fields wholesale
/// (last write wins), so applying the same change twice is harmless.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    /// Mirrors Stripe's status enumeration as free text.
    pub subscription_status: Option<String>,
    pub subscription_end_date: Option<Timestamp>,
}

impl SubscriptionSnapshot {
    /// Creates a snapshot for a customer with no subscription yet.
    pub fn for_customer(customer_id: impl Into<String>) -> Self {
        Self {
            stripe_customer_id: Some(customer_id.into()),
            ..Default::default()
        }
    }

    /// Mirrors a created or updated subscription.
    pub fn apply_update(&mut self, subscription: &SubscriptionObject) {
        self.stripe_subscription_id = Some(subscription.id.clone());
        self.subscription_status = Some(subscription.status.clone());
        self.subscription_end_date = subscription.current_period_end;
    }

    /// Mirrors a deleted subscription.
    pub fn apply_cancellation(&mut self, subscription: &SubscriptionObject) {
        self.subscription_status = Some(subscription.status.clone());
        self.subscription_end_date = subscription.canceled_at;
    }

    /// Cancels locally after a failed invoice payment.
    pub fn mark_payment_failed(&mut self, now: Timestamp) {
        self.subscription_status = Some(STATUS_CANCELED.to_string());
        self.subscription_end_date = Some(now);
    }

    pub fn is_canceled(&self) -> bool {
        self.subscription_status.as_deref() == Some(STATUS_CANCELED)
    }
}

/// The slice of a user account the billing pipeline reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingUser {
    pub id: UserId,
    pub email: String,
    pub subscription: SubscriptionSnapshot,
}

impl BillingUser {
    pub fn new(id: UserId, email: impl Into<String>, subscription: SubscriptionSnapshot) -> Self {
        Self {
            id,
            email: email.into(),
            subscription,
        }
    }
}
