//! PostgreSQL implementation of UserSubscriptionStore.
//!
//! Reads and writes the subscription columns of the `users` table. Other
//! user columns are owned elsewhere and never touched here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{BillingUser, SubscriptionSnapshot};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::UserSubscriptionStore;

pub struct PostgresUserSubscriptionStore {
    pool: PgPool,
}

impl PostgresUserSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, sql: &str, key: &str) -> Result<Option<BillingUser>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DomainError::database(format!("Failed to find user: {}", e))
            })?;

        Ok(row.map(BillingUser::from))
    }
}

/// Database row representation of a user's billing columns.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    stripe_customer_id: Option<String>,
    stripe_subscription_id: Option<String>,
    subscription_status: Option<String>,
    subscription_end_date: Option<DateTime<Utc>>,
}

impl From<UserRow> for BillingUser {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            email: row.email,
            subscription: SubscriptionSnapshot {
                stripe_customer_id: row.stripe_customer_id,
                stripe_subscription_id: row.stripe_subscription_id,
                subscription_status: row.subscription_status,
                subscription_end_date: row.subscription_end_date.map(Timestamp::from_datetime),
            },
        }
    }
}

// ORDER BY keeps the pick deterministic if two rows ever share an id.
const FIND_BY_CUSTOMER: &str = r#"
    SELECT id, email, stripe_customer_id, stripe_subscription_id,
           subscription_status, subscription_end_date
    FROM users
    WHERE stripe_customer_id = $1
    ORDER BY created_at
    LIMIT 1
"#;

const FIND_BY_SUBSCRIPTION: &str = r#"
    SELECT id, email, stripe_customer_id, stripe_subscription_id,
           subscription_status, subscription_end_date
    FROM users
    WHERE stripe_subscription_id = $1
    ORDER BY created_at
    LIMIT 1
"#;

#[async_trait]
impl UserSubscriptionStore for PostgresUserSubscriptionStore {
    async fn find_by_stripe_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<BillingUser>, DomainError> {
        self.find_one(FIND_BY_CUSTOMER, customer_id).await
    }

    async fn find_by_stripe_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<BillingUser>, DomainError> {
        self.find_one(FIND_BY_SUBSCRIPTION, subscription_id).await
    }

    async fn update_subscription(
        &self,
        user_id: &UserId,
        snapshot: &SubscriptionSnapshot,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                stripe_customer_id = $2,
                stripe_subscription_id = $3,
                subscription_status = $4,
                subscription_end_date = $5,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(&snapshot.stripe_customer_id)
        .bind(&snapshot.stripe_subscription_id)
        .bind(&snapshot.subscription_status)
        .bind(snapshot.subscription_end_date.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to update subscription: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::UserNotFound,
                format!("User {} not found", user_id),
            ));
        }

        Ok(())
    }
}
