//! Stripe webhook event envelope.
//!
//! Only the fields the pipeline needs are captured; the rest of Stripe's
//! event schema is ignored so new API versions keep deserializing.

use serde::{Deserialize, Serialize};

/// Raw Stripe webhook event as it arrives on the wire.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "customer.subscription.updated").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    #[serde(default)]
    pub created: i64,

    /// Object containing event-specific data.
    pub data: StripeEventData,

    /// Whether this is a live mode event (vs test mode).
    #[serde(default)]
    pub livemode: bool,

    /// API version used to render this event.
    #[serde(default)]
    pub api_version: Option<String>,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,
}

impl StripeEvent {
    /// Parse the event type into a known kind.
    pub fn kind(&self) -> EventKind {
        EventKind::from_type(&self.event_type)
    }
}

/// Event kinds the dispatcher routes on.
///
/// Anything Stripe adds later lands in `Unknown` with the raw type string kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionDeleted,
    InvoicePaymentSucceeded,
    InvoicePaymentFailed,
    Unknown(String),
}

impl EventKind {
    /// Parse event kind from the Stripe type string.
    pub fn from_type(s: &str) -> Self {
        match s {
            "customer.subscription.created" => Self::SubscriptionCreated,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Convert back to the Stripe type string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::SubscriptionCreated => "customer.subscription.created",
            Self::SubscriptionUpdated => "customer.subscription.updated",
            Self::SubscriptionDeleted => "customer.subscription.deleted",
            Self::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::Unknown(raw) => raw,
        }
    }

    /// The Stripe object type this kind normally carries, if any.
    pub fn expected_object(&self) -> Option<&'static str> {
        match self {
            Self::SubscriptionCreated | Self::SubscriptionUpdated | Self::SubscriptionDeleted => {
                Some("subscription")
            }
            Self::InvoicePaymentSucceeded | Self::InvoicePaymentFailed => Some("invoice"),
            Self::Unknown(_) => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder for creating signed-payload fixtures in tests.
#[cfg(test)]
pub struct StripeEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: serde_json::Value,
}

#[cfg(test)]
impl Default for StripeEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "customer.subscription.updated".to_string(),
            created: chrono::Utc::now().timestamp(),
            object: serde_json::json!({}),
        }
    }
}

#[cfg(test)]
impl StripeEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    /// Serializes the event to the JSON body Stripe would post.
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "id": self.id,
            "object": "event",
            "type": self.event_type,
            "created": self.created,
            "livemode": false,
            "api_version": "2023-10-16",
            "data": { "object": self.object },
        })
        .to_string()
    }
}
