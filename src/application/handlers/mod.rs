//! Application handlers.
//!
//! Command handlers that orchestrate domain operations through ports.

pub mod billing;

pub use billing::{
    ApplyOutcome, HandlePaymentWebhookCommand, HandlePaymentWebhookHandler,
    HandlePaymentWebhookResult, SubscriptionStateApplier, WebhookSettings,
};
