//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` trait against the Stripe REST API.
//! Only the subscription reads and cancellations needed by the webhook
//! pipeline are supported.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key);
//! let adapter = StripePaymentAdapter::new(config);
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::billing::SubscriptionObject;
use crate::ports::{CancelOptions, PaymentError, PaymentErrorCode, PaymentProvider};

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Error code Stripe returns when a DELETE targets a subscription that is already canceled.
const ALREADY_CANCELED_CODE: &str = "resource_invalid";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn subscription_url(&self, subscription_id: &str) -> String {
        format!("{}/v1/subscriptions/{}", self.api_base_url, subscription_id)
    }
}

/// Stripe payment provider adapter.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripePaymentAdapter {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }
}

/// Stripe's error envelope: `{"error": {"type": .., "code": .., "message": ..}}`.
#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Splits a Stripe error body into its `code` and a message, falling back to the raw body.
fn parse_error_body(body: &str) -> (Option<String>, String) {
    match serde_json::from_str::<StripeErrorEnvelope>(body) {
        Ok(envelope) => {
            let message = envelope.error.message.unwrap_or_else(|| body.to_string());
            (envelope.error.code, message)
        }
        Err(_) => (None, body.to_string()),
    }
}

/// Maps a non-success Stripe response to a `PaymentError`.
fn error_from_response(
    status: reqwest::StatusCode,
    body: &str,
    subscription_id: &str,
) -> PaymentError {
    let (provider_code, message) = parse_error_body(body);

    let error = if status == reqwest::StatusCode::NOT_FOUND {
        PaymentError::not_found(subscription_id)
    } else if status == reqwest::StatusCode::UNAUTHORIZED {
        PaymentError::new(PaymentErrorCode::AuthenticationError, "Invalid Stripe API key")
    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        PaymentError::new(PaymentErrorCode::RateLimitExceeded, message)
    } else {
        PaymentError::provider(format!("Stripe API error: {}", message))
    };

    match provider_code {
        Some(code) => error.with_provider_code(code),
        None => error,
    }
}

/// Like `error_from_response`, but a 400 carrying Stripe's already-canceled code
/// becomes `AlreadyCanceled`.
fn cancel_error_from_response(
    status: reqwest::StatusCode,
    body: &str,
    subscription_id: &str,
) -> PaymentError {
    let error = error_from_response(status, body, subscription_id);
    if status == reqwest::StatusCode::BAD_REQUEST
        && error.provider_code.as_deref() == Some(ALREADY_CANCELED_CODE)
    {
        return PaymentError::already_canceled(subscription_id)
            .with_provider_code(ALREADY_CANCELED_CODE);
    }
    error
}

async fn parse_subscription(response: reqwest::Response) -> Result<SubscriptionObject, PaymentError> {
    response.json().await.map_err(|e| {
        PaymentError::new(
            PaymentErrorCode::ProviderError,
            format!("Failed to parse Stripe response: {}", e),
        )
    })
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionObject>, PaymentError> {
        let response = self
            .http_client
            .get(self.config.subscription_url(subscription_id))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_response(status, &body, subscription_id));
        }

        parse_subscription(response).await.map(Some)
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        options: CancelOptions,
    ) -> Result<SubscriptionObject, PaymentError> {
        let form = [
            ("invoice_now", options.invoice_now.to_string()),
            ("prorate", options.prorate.to_string()),
        ];

        let response = self
            .http_client
            .delete(self.config.subscription_url(subscription_id))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&form)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(cancel_error_from_response(status, &body, subscription_id));
        }

        let subscription = parse_subscription(response).await?;
        tracing::info!(
            subscription_id = %subscription.id,
            status = %subscription.status,
            "Subscription canceled at Stripe"
        );
        Ok(subscription)
    }
}
