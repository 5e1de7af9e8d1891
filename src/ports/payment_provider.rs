//! Payment provider port for the billing system's subscription API.
//!
//! The webhook pipeline only needs two calls: re-fetch a subscription and
//! cancel one. Implementations receive their credentials at construction;
//! nothing here relies on process-wide provider state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::SubscriptionObject;
use crate::domain::foundation::{DomainError, ErrorCode};

/// Flags for an immediate cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelOptions {
    /// Bill outstanding usage on a final invoice right away.
    pub invoice_now: bool,
    /// Credit the unused part of the period.
    pub prorate: bool,
}

impl CancelOptions {
    /// Cancel without a final invoice and without proration credit.
    pub fn without_invoice_or_proration() -> Self {
        Self {
            invoice_now: false,
            prorate: false,
        }
    }
}

impl Default for CancelOptions {
    fn default() -> Self {
        Self::without_invoice_or_proration()
    }
}

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Get subscription by provider ID. `Ok(None)` if the provider has no such subscription.
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionObject>, PaymentError>;

    /// Cancel a subscription immediately.
    ///
    /// Cancelling an already-canceled subscription fails with
    /// `PaymentErrorCode::AlreadyCanceled`, which callers treat as success.
    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        options: CancelOptions,
    ) -> Result<SubscriptionObject, PaymentError>;
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Create with provider code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Create a not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    /// Create an already-canceled error.
    pub fn already_canceled(subscription_id: &str) -> Self {
        Self::new(
            PaymentErrorCode::AlreadyCanceled,
            format!("Subscription {} is already canceled", subscription_id),
        )
    }

    /// Create a provider-side error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }

    pub fn is_already_canceled(&self) -> bool {
        self.code == PaymentErrorCode::AlreadyCanceled
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let code = match err.code {
            PaymentErrorCode::NotFound => ErrorCode::NotFound,
            _ => ErrorCode::PaymentProviderError,
        };
        DomainError::new(code, err.to_string())
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Resource not found.
    NotFound,

    /// The subscription was already canceled.
    AlreadyCanceled,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Provider API error.
    ProviderError,

    /// Unknown error.
    Unknown,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::AlreadyCanceled => "already_canceled",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}
