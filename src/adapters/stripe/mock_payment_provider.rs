//! Mock payment provider for testing.
//!
//! Provides a configurable mock implementation of `PaymentProvider` for unit
//! and integration tests. Supports:
//! - A fake subscription "database"
//! - Error injection per method
//! - Artificial latency for timeout tests
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::billing::{SubscriptionObject, STATUS_CANCELED};
use crate::domain::foundation::Timestamp;
use crate::ports::{CancelOptions, PaymentError, PaymentProvider};

/// Mock payment provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
/// mock.add_subscription(subscription);
/// mock.set_method_error("cancel_subscription", PaymentError::network("reset"));
///
/// let handler = HandlePaymentWebhookHandler::new(.., Arc::new(mock.clone()), ..);
/// assert_eq!(mock.call_count("cancel_subscription"), 1);
/// ```
#[derive(Default)]
pub struct MockPaymentProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Subscriptions known to the fake provider, by ID.
    subscriptions: HashMap<String, SubscriptionObject>,

    /// Specific errors by method name.
    method_errors: HashMap<String, PaymentError>,

    /// Delay applied before every call returns.
    delay: Option<Duration>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub subscription_id: String,
    pub options: Option<CancelOptions>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Add a subscription to the "database".
    pub fn add_subscription(&self, subscription: SubscriptionObject) {
        let id = subscription.id.clone();
        self.lock().subscriptions.insert(id, subscription);
    }

    /// Set an error for a specific method (`get_subscription`, `cancel_subscription`).
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.lock().method_errors.insert(method.to_string(), error);
    }

    /// Delay every call by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Inspection
    // ════════════════════════════════════════════════════════════════════════════

    pub fn subscription(&self, subscription_id: &str) -> Option<SubscriptionObject> {
        self.lock().subscriptions.get(subscription_id).cloned()
    }

    pub fn calls(&self) -> Vec<MethodCall> {
        self.lock().call_log.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.lock()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    // A poisoned lock only means another test thread panicked; keep going.
    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn enter(
        &self,
        method: &str,
        subscription_id: &str,
        options: Option<CancelOptions>,
    ) -> Result<(), PaymentError> {
        let delay = {
            let mut state = self.lock();
            state.call_log.push(MethodCall {
                method: method.to_string(),
                subscription_id: subscription_id.to_string(),
                options,
            });
            state.delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.lock().method_errors.get(method) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl Clone for MockPaymentProvider {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionObject>, PaymentError> {
        self.enter("get_subscription", subscription_id, None).await?;
        Ok(self.subscription(subscription_id))
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        options: CancelOptions,
    ) -> Result<SubscriptionObject, PaymentError> {
        self.enter("cancel_subscription", subscription_id, Some(options))
            .await?;

        let mut state = self.lock();
        let subscription = state
            .subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| PaymentError::not_found(subscription_id))?;

        if subscription.is_canceled() {
            return Err(PaymentError::already_canceled(subscription_id));
        }

        subscription.status = STATUS_CANCELED.to_string();
        subscription.canceled_at = Some(Timestamp::now());
        Ok(subscription.clone())
    }
}
