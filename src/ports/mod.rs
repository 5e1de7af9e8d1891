//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `ProcessedEventLedger` - Stripe webhook idempotency tracking
//! - `UserSubscriptionStore` - Subscription snapshot persistence
//! - `PaymentProvider` - Subscription fetch and cancellation at Stripe
//! - `Notifier` - Outbound email

mod notifier;
mod payment_provider;
mod processed_event_ledger;
mod user_subscription_store;

pub use notifier::{EmailMessage, NotificationError, Notifier};
pub use payment_provider::{CancelOptions, PaymentError, PaymentErrorCode, PaymentProvider};
pub use processed_event_ledger::{LedgerError, ProcessedEventLedger, ProcessedEventRecord};
pub use user_subscription_store::UserSubscriptionStore;
