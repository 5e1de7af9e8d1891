//! Typed webhook event and its payload variants.
//!
//! A verified Stripe envelope is turned into an [`Event`] whose payload is a
//! tagged variant, so routing is an exhaustive `match` rather than runtime
//! type inspection.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::foundation::Timestamp;

use super::stripe_event::{EventKind, StripeEvent};

/// Status string Stripe uses for a canceled subscription.
pub const STATUS_CANCELED: &str = "canceled";

/// A decoded, verified notification from the billing provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub kind: EventKind,
    pub created: Option<Timestamp>,
    pub livemode: bool,
    pub payload: EventPayload,
}

impl Event {
    /// Builds the typed event from a verified envelope.
    pub fn from_stripe(raw: StripeEvent) -> Self {
        let kind = raw.kind();
        let payload = EventPayload::decode(&kind, raw.data.object);

        Self {
            id: raw.id,
            kind,
            created: Timestamp::from_unix_secs(raw.created).filter(|_| raw.created > 0),
            livemode: raw.livemode,
            payload,
        }
    }
}

/// The object carried in `data.object`.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Subscription(SubscriptionObject),
    Invoice(InvoiceObject),
    /// Anything else, or an object that did not match its declared shape.
    Opaque(Value),
}

impl EventPayload {
    /// Decodes `data.object` using its `object` discriminator, falling back
    /// to the shape the event kind implies when the discriminator is absent.
    pub fn decode(kind: &EventKind, object: Value) -> Self {
        let discriminator = object
            .get("object")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .or_else(|| kind.expected_object().map(str::to_owned));

        match discriminator.as_deref() {
            Some("subscription") => match serde_json::from_value(object.clone()) {
                Ok(subscription) => Self::Subscription(subscription),
                Err(_) => Self::Opaque(object),
            },
            Some("invoice") => match serde_json::from_value(object.clone()) {
                Ok(invoice) => Self::Invoice(invoice),
                Err(_) => Self::Opaque(object),
            },
            _ => Self::Opaque(object),
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Subscription(_) => "subscription",
            Self::Invoice(_) => "invoice",
            Self::Opaque(_) => "opaque",
        }
    }
}

/// Stripe subscription, reduced to the fields the snapshot mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawSubscription")]
pub struct SubscriptionObject {
    pub id: String,
    pub customer_id: String,
    pub status: String,
    pub current_period_end: Option<Timestamp>,
    pub canceled_at: Option<Timestamp>,
}

impl SubscriptionObject {
    pub fn is_canceled(&self) -> bool {
        self.status == STATUS_CANCELED
    }
}

/// Stripe invoice, reduced to the subscription it bills.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawInvoice")]
pub struct InvoiceObject {
    pub id: String,
    pub subscription_id: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Wire shapes
// ════════════════════════════════════════════════════════════════════════════════

/// A Stripe field that is either an id or the expanded object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    fn into_id(self) -> String {
        match self {
            Expandable::Id(id) | Expandable::Object { id } => id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawList<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RawSubscriptionItem {
    #[serde(default)]
    current_period_end: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawSubscription {
    id: String,
    customer: Expandable,
    status: String,
    #[serde(default)]
    current_period_end: Option<i64>,
    #[serde(default)]
    canceled_at: Option<i64>,
    // Newer API versions moved the billing period onto the items.
    #[serde(default)]
    items: Option<RawList<RawSubscriptionItem>>,
}

impl From<RawSubscription> for SubscriptionObject {
    fn from(raw: RawSubscription) -> Self {
        let period_end = raw.current_period_end.or_else(|| {
            raw.items
                .as_ref()
                .and_then(|items| items.data.iter().find_map(|i| i.current_period_end))
        });

        Self {
            id: raw.id,
            customer_id: raw.customer.into_id(),
            status: raw.status,
            current_period_end: period_end.and_then(Timestamp::from_unix_secs),
            canceled_at: raw.canceled_at.and_then(Timestamp::from_unix_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSubscriptionDetails {
    #[serde(default)]
    subscription: Option<Expandable>,
}

#[derive(Debug, Deserialize)]
struct RawInvoiceParent {
    #[serde(default)]
    subscription_details: Option<RawSubscriptionDetails>,
}

#[derive(Debug, Deserialize)]
struct RawInvoice {
    id: String,
    #[serde(default)]
    subscription: Option<Expandable>,
    #[serde(default)]
    parent: Option<RawInvoiceParent>,
}

impl From<RawInvoice> for InvoiceObject {
    fn from(raw: RawInvoice) -> Self {
        let from_parent = raw
            .parent
            .and_then(|p| p.subscription_details)
            .and_then(|d| d.subscription);

        Self {
            id: raw.id,
            subscription_id: raw
                .subscription
                .or(from_parent)
                .map(Expandable::into_id)
                .filter(|id| !id.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(event_type: &str, object: Value) -> StripeEvent {
        serde_json::from_value(json!({
            "id": "evt_1",
            "type": event_type,
            "created": 1705276800,
            "livemode": false,
            "data": { "object": object },
        }))
        .unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Subscription payloads
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn subscription_payload_decodes() {
        let event = Event::from_stripe(envelope(
            "customer.subscription.created",
            json!({
                "id": "sub_1",
                "object": "subscription",
                "customer": "cus_1",
                "status": "active",
                "current_period_end": 1705276800,
                "canceled_at": null,
            }),
        ));

        assert_eq!(event.kind, EventKind::SubscriptionCreated);
        match event.payload {
            EventPayload::Subscription(sub) => {
                assert_eq!(sub.id, "sub_1");
                assert_eq!(sub.customer_id, "cus_1");
                assert_eq!(sub.status, "active");
                assert_eq!(sub.current_period_end.unwrap().as_unix_secs(), 1705276800);
                assert!(sub.canceled_at.is_none());
            }
            other => panic!("expected subscription, got {:?}", other),
        }
    }

    #[test]
    fn expanded_customer_object_yields_its_id() {
        let payload = EventPayload::decode(
            &EventKind::SubscriptionUpdated,
            json!({
                "id": "sub_1",
                "object": "subscription",
                "customer": { "id": "cus_expanded", "object": "customer", "email": "a@b.c" },
                "status": "trialing",
            }),
        );

        let EventPayload::Subscription(sub) = payload else {
            panic!("expected subscription");
        };
        assert_eq!(sub.customer_id, "cus_expanded");
        assert!(sub.current_period_end.is_none());
    }

    #[test]
    fn period_end_falls_back_to_subscription_items() {
        let payload = EventPayload::decode(
            &EventKind::SubscriptionUpdated,
            json!({
                "id": "sub_1",
                "object": "subscription",
                "customer": "cus_1",
                "status": "active",
                "items": { "object": "list", "data": [ { "current_period_end": 1800000000 } ] },
            }),
        );

        let EventPayload::Subscription(sub) = payload else {
            panic!("expected subscription");
        };
        assert_eq!(sub.current_period_end.unwrap().as_unix_secs(), 1800000000);
    }

    #[test]
    fn canceled_status_is_detected() {
        let sub = SubscriptionObject {
            id: "sub_1".into(),
            customer_id: "cus_1".into(),
            status: "canceled".into(),
            current_period_end: None,
            canceled_at: None,
        };
        assert!(sub.is_canceled());
    }

    // ══════════════════════════════════════════════════════════════
    // Invoice payloads
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn invoice_with_subscription_decodes() {
        let payload = EventPayload::decode(
            &EventKind::InvoicePaymentFailed,
            json!({ "id": "in_1", "object": "invoice", "subscription": "sub_9" }),
        );

        assert_eq!(
            payload,
            EventPayload::Invoice(InvoiceObject {
                id: "in_1".into(),
                subscription_id: Some("sub_9".into()),
            })
        );
    }

    #[test]
    fn invoice_without_subscription_has_none() {
        let payload = EventPayload::decode(
            &EventKind::InvoicePaymentSucceeded,
            json!({ "id": "in_1", "object": "invoice", "subscription": null }),
        );

        let EventPayload::Invoice(invoice) = payload else {
            panic!("expected invoice");
        };
        assert!(invoice.subscription_id.is_none());
    }

    #[test]
    fn invoice_subscription_read_from_parent_details() {
        let payload = EventPayload::decode(
            &EventKind::InvoicePaymentSucceeded,
            json!({
                "id": "in_1",
                "object": "invoice",
                "parent": { "subscription_details": { "subscription": "sub_new_api" } },
            }),
        );

        let EventPayload::Invoice(invoice) = payload else {
            panic!("expected invoice");
        };
        assert_eq!(invoice.subscription_id.as_deref(), Some("sub_new_api"));
    }

    // ══════════════════════════════════════════════════════════════
    // Opaque payloads
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn mismatched_object_becomes_opaque() {
        let payload = EventPayload::decode(
            &EventKind::SubscriptionUpdated,
            json!({ "id": "in_1", "object": "invoice" }),
        );
        assert_eq!(payload.label(), "invoice");

        let payload = EventPayload::decode(
            &EventKind::SubscriptionUpdated,
            json!({ "id": "cs_1", "object": "checkout.session" }),
        );
        assert!(matches!(payload, EventPayload::Opaque(_)));
    }

    #[test]
    fn malformed_subscription_becomes_opaque() {
        let payload = EventPayload::decode(
            &EventKind::SubscriptionUpdated,
            json!({ "object": "subscription", "status": "active" }),
        );
        assert!(matches!(payload, EventPayload::Opaque(_)));
    }

    #[test]
    fn unknown_kind_without_discriminator_is_opaque() {
        let event = Event::from_stripe(envelope("unknown.event.type", json!({ "foo": 1 })));
        assert!(event.kind.is_unknown());
        assert!(matches!(event.payload, EventPayload::Opaque(_)));
        assert!(event.created.is_some());
    }
}
