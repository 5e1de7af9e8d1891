//! Billing domain - Stripe webhook events and the local subscription snapshot.

mod event;
mod outcome;
mod stripe_event;
mod subscription;
mod webhook_errors;
mod webhook_verifier;

pub use event::{Event, EventPayload, InvoiceObject, SubscriptionObject, STATUS_CANCELED};
pub use outcome::{DispatchReport, EffectOutcome, EffectStep, SideEffect};
pub use stripe_event::{EventKind, StripeEvent, StripeEventData};
#[cfg(test)]
pub use stripe_event::StripeEventBuilder;
pub use subscription::{BillingUser, SubscriptionSnapshot};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{
    sign_payload, SignatureHeader, StripeWebhookVerifier, DEFAULT_CLOCK_SKEW_SECS,
    DEFAULT_TOLERANCE_SECS,
};
