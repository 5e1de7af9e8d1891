//! Webhook error types for Stripe webhook handling.
//!
//! Covers the conditions that reject a webhook before it is acknowledged,
//! with HTTP status code mapping and retryability semantics. Failures after
//! the duplicate check are contained by the dispatcher and never show up here.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that reject or fail a webhook request.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The Stripe-Signature header was absent or empty.
    #[error("Missing Stripe signature")]
    MissingSignature,

    /// The webhook signing secret is not configured.
    #[error("Webhook configuration error: signing secret is not configured")]
    MissingSecret,

    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is older than the tolerance window.
    #[error("Invalid signature: timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid signature: timestamp in the future")]
    InvalidTimestamp,

    /// Failed to parse the signature header or the JSON payload.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The idempotency ledger could not be read.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Anything unexpected before the event was routed.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl WebhookError {
    /// Returns true if Stripe should retry delivering this webhook.
    ///
    /// Mirrors the status code: only 5xx responses are redelivered.
    pub fn is_retryable(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Maps the error to an appropriate HTTP status code.
    ///
    /// Status codes determine Stripe's retry behavior:
    /// - 4xx: rejected, the provider's own policy governs redelivery
    /// - 5xx: server fault, will retry
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingSignature
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_) => StatusCode::BAD_REQUEST,

            WebhookError::MissingSecret
            | WebhookError::Storage(_)
            | WebhookError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the caller.
    ///
    /// Server-side faults hide their detail; it is logged instead.
    pub fn public_message(&self) -> String {
        match self {
            WebhookError::MissingSecret => "Webhook configuration error".to_string(),
            WebhookError::Storage(_) | WebhookError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Error Display Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn missing_signature_mentions_signature() {
        let err = WebhookError::MissingSignature;
        assert_eq!(format!("{}", err), "Missing Stripe signature");
        assert!(err.public_message().contains("signature"));
    }

    #[test]
    fn invalid_signature_displays_correctly() {
        assert_eq!(format!("{}", WebhookError::InvalidSignature), "Invalid signature");
    }

    #[test]
    fn parse_error_displays_message() {
        let err = WebhookError::ParseError("invalid JSON".to_string());
        assert_eq!(format!("{}", err), "Parse error: invalid JSON");
    }

    #[test]
    fn missing_secret_display_says_not_configured() {
        let err = WebhookError::MissingSecret;
        assert!(err.to_string().contains("not configured"));
        assert_eq!(err.public_message(), "Webhook configuration error");
    }

    #[test]
    fn server_faults_hide_detail_from_caller() {
        let err = WebhookError::Storage("connection refused to 10.0.0.5".to_string());
        assert_eq!(err.public_message(), "Internal server error");

        let err = WebhookError::Internal("panic in handler".to_string());
        assert_eq!(err.public_message(), "Internal server error");
    }

    // ══════════════════════════════════════════════════════════════
    // Status Code Mapping Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn integrity_errors_return_400() {
        for err in [
            WebhookError::MissingSignature,
            WebhookError::InvalidSignature,
            WebhookError::TimestampOutOfRange,
            WebhookError::InvalidTimestamp,
            WebhookError::ParseError("bad".to_string()),
        ] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "{}", err);
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn configuration_and_faults_return_500() {
        for err in [
            WebhookError::MissingSecret,
            WebhookError::Storage("down".to_string()),
            WebhookError::Internal("boom".to_string()),
        ] {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR, "{}", err);
            assert!(err.is_retryable());
        }
    }
}
