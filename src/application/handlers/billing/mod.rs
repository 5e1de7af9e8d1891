//! Billing command handlers.

mod handle_payment_webhook;
mod subscription_applier;

pub use handle_payment_webhook::{
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, HandlePaymentWebhookResult,
    WebhookSettings, DEFAULT_OUTBOUND_TIMEOUT, PAYMENT_FAILED_SUBJECT,
};
pub use subscription_applier::{ApplyOutcome, SubscriptionStateApplier};
