//! Stripe webhook signature verification.
//!
//! Implements Stripe's documented scheme: the `Stripe-Signature` header
//! carries `t=<unix>,v1=<hex>`, the signed payload is `"{t}.{raw body}"`
//! and the MAC is HMAC-SHA256 keyed with the endpoint secret. Includes
//! timestamp validation to prevent replay attacks.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::event::Event;
use super::stripe_event::StripeEvent;
use super::webhook_errors::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Default maximum age for webhook events (5 minutes).
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Default allowance for signatures stamped ahead of the local clock (1 minute).
pub const DEFAULT_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed components from the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// v1 signatures (HMAC-SHA256). Several are sent while a secret rotates.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses a Stripe-Signature header string.
    ///
    /// Format: `t=<timestamp>,v1=<signature>[,v1=<signature>][,v0=<legacy>]`
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::ParseError` if the header format is invalid.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| WebhookError::ParseError("invalid header format".to_string()))?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        WebhookError::ParseError("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signatures.push(hex::decode(value).map_err(|_| {
                        WebhookError::ParseError("invalid v1 signature hex".to_string())
                    })?);
                }
                // v0 is Stripe's test-only legacy scheme; unknown keys are
                // ignored for forward compatibility.
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| WebhookError::ParseError("missing timestamp".to_string()))?;
        if v1_signatures.is_empty() {
            return Err(WebhookError::ParseError("missing v1 signature".to_string()));
        }

        Ok(SignatureHeader {
            timestamp,
            v1_signatures,
        })
    }
}

/// Verifier for Stripe webhook signatures.
///
/// Stateless apart from the replay window; the secret is passed per call so
/// a missing secret is reported per request instead of at construction.
#[derive(Debug, Clone)]
pub struct StripeWebhookVerifier {
    tolerance_secs: i64,
    clock_skew_secs: i64,
}

impl Default for StripeWebhookVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE_SECS)
    }
}

impl StripeWebhookVerifier {
    /// Creates a verifier accepting events up to `tolerance_secs` old.
    pub fn new(tolerance_secs: i64) -> Self {
        Self {
            tolerance_secs,
            clock_skew_secs: DEFAULT_CLOCK_SKEW_SECS,
        }
    }

    /// Accepts timestamps up to `clock_skew_secs` ahead of the local clock.
    pub fn with_clock_skew_secs(mut self, clock_skew_secs: i64) -> Self {
        self.clock_skew_secs = clock_skew_secs;
        self
    }

    /// Verifies the webhook signature and decodes the event.
    ///
    /// # Verification Steps
    ///
    /// 1. Reject an absent or empty signature header
    /// 2. Reject an unconfigured secret
    /// 3. Parse the signature header and validate its timestamp
    /// 4. Compare the expected HMAC against every v1 signature in constant time
    /// 5. Parse the JSON payload into a typed [`Event`]
    ///
    /// # Errors
    ///
    /// - `MissingSignature` - header absent or blank
    /// - `MissingSecret` - no signing secret configured
    /// - `InvalidSignature` - no v1 signature matched
    /// - `TimestampOutOfRange` / `InvalidTimestamp` - outside the replay window
    /// - `ParseError` - malformed header or JSON payload
    pub fn verify(
        &self,
        payload: &[u8],
        signature_header: &str,
        secret: &str,
    ) -> Result<Event, WebhookError> {
        if signature_header.trim().is_empty() {
            return Err(WebhookError::MissingSignature);
        }
        if secret.trim().is_empty() {
            return Err(WebhookError::MissingSecret);
        }

        let header = SignatureHeader::parse(signature_header)?;
        self.validate_timestamp(header.timestamp, chrono::Utc::now().timestamp())?;

        let expected = compute_signature(secret, header.timestamp, payload)?;
        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate));
        if !matched {
            return Err(WebhookError::InvalidSignature);
        }

        let raw: StripeEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        Ok(Event::from_stripe(raw))
    }

    /// Validates that the timestamp is within acceptable bounds of `now`.
    ///
    /// `timestamp` is unauthenticated header input, so the age saturates
    /// instead of overflowing.
    fn validate_timestamp(&self, timestamp: i64, now: i64) -> Result<(), WebhookError> {
        let age = now.saturating_sub(timestamp);

        if age > self.tolerance_secs {
            return Err(WebhookError::TimestampOutOfRange);
        }
        if age < self.clock_skew_secs.saturating_neg() {
            return Err(WebhookError::InvalidTimestamp);
        }

        Ok(())
    }
}

/// Computes the HMAC-SHA256 signature for the given timestamp and payload.
fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Builds a `Stripe-Signature` header value for `payload`, as Stripe would.
///
/// Used by test fixtures and local tooling that replays captured events.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

/// Performs constant-time comparison of two byte slices.
///
/// This prevents timing attacks that could leak information about the expected signature.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
