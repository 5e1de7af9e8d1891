//! In-memory idempotency ledger.
//!
//! Useful for tests and local development. `record_processed` behaves like
//! the Postgres unique constraint: a second insert for the same id fails
//! with `DuplicateKey`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{LedgerError, ProcessedEventLedger, ProcessedEventRecord};

/// In-memory storage for processed event ids.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProcessedEventLedger {
    records: Arc<RwLock<HashMap<String, Timestamp>>>,
}

impl InMemoryProcessedEventLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded events.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ProcessedEventLedger for InMemoryProcessedEventLedger {
    async fn already_processed(&self, event_id: &str) -> Result<bool, DomainError> {
        Ok(self.records.read().await.contains_key(event_id))
    }

    async fn record_processed(
        &self,
        event_id: &str,
        processed_at: Timestamp,
    ) -> Result<(), LedgerError> {
        let mut records = self.records.write().await;
        if records.contains_key(event_id) {
            return Err(LedgerError::DuplicateKey(event_id.to_string()));
        }
        records.insert(event_id.to_string(), processed_at);
        Ok(())
    }

    async fn find(&self, event_id: &str) -> Result<Option<ProcessedEventRecord>, DomainError> {
        Ok(self
            .records
            .read()
            .await
            .get(event_id)
            .map(|processed_at| ProcessedEventRecord {
                event_id: event_id.to_string(),
                processed_at: *processed_at,
            }))
    }
}
