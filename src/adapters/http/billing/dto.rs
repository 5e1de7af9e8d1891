//! Response bodies for the billing endpoints.

use serde::{Deserialize, Serialize};

/// Error body: `{"error": "<message>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Acknowledgement returned with every 200.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
    /// True when the event id was already in the ledger.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

impl WebhookAck {
    pub fn processed() -> Self {
        Self {
            received: true,
            duplicate: false,
        }
    }

    pub fn duplicate() -> Self {
        Self {
            received: true,
            duplicate: true,
        }
    }
}

/// Liveness check body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_response_serializes_as_error_field() {
        let body = serde_json::to_value(ErrorResponse::new("Missing Stripe signature")).unwrap();
        assert_eq!(body, json!({ "error": "Missing Stripe signature" }));
    }

    #[test]
    fn processed_ack_omits_duplicate_flag() {
        let body = serde_json::to_value(WebhookAck::processed()).unwrap();
        assert_eq!(body, json!({ "received": true }));
    }

    #[test]
    fn duplicate_ack_sets_flag() {
        let body = serde_json::to_value(WebhookAck::duplicate()).unwrap();
        assert_eq!(body, json!({ "received": true, "duplicate": true }));
    }
}
