//! PostgreSQL implementation of ProcessedEventLedger.
//!
//! Backed by `processed_webhook_events`, whose primary key on `event_id`
//! turns a concurrent second insert into `LedgerError::DuplicateKey`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{LedgerError, ProcessedEventLedger, ProcessedEventRecord};

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

pub struct PostgresProcessedEventLedger {
    pool: PgPool,
}

impl PostgresProcessedEventLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProcessedEventRow {
    event_id: String,
    processed_at: DateTime<Utc>,
}

impl From<ProcessedEventRow> for ProcessedEventRecord {
    fn from(row: ProcessedEventRow) -> Self {
        Self {
            event_id: row.event_id,
            processed_at: Timestamp::from_datetime(row.processed_at),
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
                || db_err.constraint() == Some("processed_webhook_events_pkey")
        }
        _ => false,
    }
}

#[async_trait]
impl ProcessedEventLedger for PostgresProcessedEventLedger {
    async fn already_processed(&self, event_id: &str) -> Result<bool, DomainError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (SELECT 1 FROM processed_webhook_events WHERE event_id = $1)
            "#,
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to check processed event: {}", e))
        })?;

        Ok(exists)
    }

    async fn record_processed(
        &self,
        event_id: &str,
        processed_at: Timestamp,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO processed_webhook_events (event_id, processed_at)
            VALUES ($1, $2)
            "#,
        )
        .bind(event_id)
        .bind(processed_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                LedgerError::DuplicateKey(event_id.to_string())
            } else {
                LedgerError::Storage(format!("Failed to record processed event: {}", e))
            }
        })?;

        Ok(())
    }

    async fn find(&self, event_id: &str) -> Result<Option<ProcessedEventRecord>, DomainError> {
        let row: Option<ProcessedEventRow> = sqlx::query_as(
            r#"
            SELECT event_id, processed_at
            FROM processed_webhook_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to find processed event: {}", e))
        })?;

        Ok(row.map(ProcessedEventRecord::from))
    }
}
