//! In-memory adapters for tests and local development.

mod in_memory_ledger;
mod in_memory_subscription_store;

pub use in_memory_ledger::InMemoryProcessedEventLedger;
pub use in_memory_subscription_store::InMemoryUserSubscriptionStore;
