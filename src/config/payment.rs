//! Payment configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe API key
    pub stripe_api_key: String,

    /// Stripe webhook signing secret.
    ///
    /// May be empty: the service still starts and every webhook is answered
    /// with 500 until it is configured.
    #[serde(default)]
    pub stripe_webhook_secret: String,

    /// Stripe API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Maximum age of a signed webhook, in seconds
    #[serde(default = "default_signature_tolerance")]
    pub signature_tolerance_secs: i64,

    /// How far ahead of the local clock a signature timestamp may be, in seconds
    #[serde(default = "default_clock_skew")]
    pub clock_skew_secs: i64,

    /// Deadline for each outbound Stripe or email call, in seconds
    #[serde(default = "default_outbound_timeout")]
    pub outbound_timeout_secs: u64,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    pub fn has_webhook_secret(&self) -> bool {
        !self.stripe_webhook_secret.trim().is_empty()
    }

    pub fn outbound_timeout(&self) -> Duration {
        Duration::from_secs(self.outbound_timeout_secs)
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_API_KEY"));
        }
        if !self.stripe_api_key.starts_with("sk_") && !self.stripe_api_key.starts_with("rk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if self.has_webhook_secret() && !self.stripe_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if !(1..=3600).contains(&self.signature_tolerance_secs) {
            return Err(ValidationError::InvalidSignatureTolerance);
        }
        if !(0..=3600).contains(&self.clock_skew_secs) {
            return Err(ValidationError::InvalidClockSkew);
        }
        if !(1..=60).contains(&self.outbound_timeout_secs) {
            return Err(ValidationError::InvalidOutboundTimeout);
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(ValidationError::InvalidApiBaseUrl("payment.api_base_url"));
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: String::new(),
            stripe_webhook_secret: String::new(),
            api_base_url: default_api_base_url(),
            signature_tolerance_secs: default_signature_tolerance(),
            clock_skew_secs: default_clock_skew(),
            outbound_timeout_secs: default_outbound_timeout(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_signature_tolerance() -> i64 {
    300
}

fn default_clock_skew() -> i64 {
    60
}

fn default_outbound_timeout() -> u64 {
    10
}
