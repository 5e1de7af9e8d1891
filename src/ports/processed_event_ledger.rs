//! ProcessedEventLedger port - durable record of handled webhook events.
//!
//! Stripe delivers at least once, so the same event id can arrive several
//! times. The ledger lets the dispatcher skip events it has already applied.
//!
//! ## Check-then-record gap
//!
//! `already_processed` runs when a request arrives and `record_processed`
//! runs after every side effect has finished. Two concurrent deliveries can
//! both pass the check. Implementations MUST back `record_processed` with a
//! uniqueness constraint so the second writer gets `DuplicateKey` instead of
//! silently succeeding.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{DomainError, Timestamp};

/// Persisted proof that an event id was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedEventRecord {
    pub event_id: String,
    pub processed_at: Timestamp,
}

/// Errors from writing a ledger entry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// A record for this event id already exists.
    #[error("Event {0} was already recorded as processed")]
    DuplicateKey(String),

    #[error("Ledger storage error: {0}")]
    Storage(String),
}

impl From<LedgerError> for DomainError {
    fn from(err: LedgerError) -> Self {
        DomainError::database(err.to_string())
    }
}

/// Port for the idempotency ledger.
#[async_trait]
pub trait ProcessedEventLedger: Send + Sync {
    /// Returns `true` if a record exists for `event_id`.
    async fn already_processed(&self, event_id: &str) -> Result<bool, DomainError>;

    /// Records `event_id` as fully processed at `processed_at`.
    ///
    /// Fails with `LedgerError::DuplicateKey` on a second call for the same id.
    async fn record_processed(
        &self,
        event_id: &str,
        processed_at: Timestamp,
    ) -> Result<(), LedgerError>;

    /// Looks up the record for `event_id`.
    async fn find(&self, event_id: &str) -> Result<Option<ProcessedEventRecord>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    #[test]
    fn duplicate_key_names_the_event() {
        let err = LedgerError::DuplicateKey("evt_1".to_string());
        assert_eq!(err.to_string(), "Event evt_1 was already recorded as processed");
    }

    #[test]
    fn ledger_error_converts_to_database_domain_error() {
        let err: DomainError = LedgerError::Storage("disk full".to_string()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(err.message.contains("disk full"));
    }
}
