//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresProcessedEventLedger` - Idempotency ledger for webhook events
//! - `PostgresUserSubscriptionStore` - Subscription columns on `users`

mod processed_event_ledger;
mod user_subscription_store;

pub use processed_event_ledger::PostgresProcessedEventLedger;
pub use user_subscription_store::PostgresUserSubscriptionStore;
