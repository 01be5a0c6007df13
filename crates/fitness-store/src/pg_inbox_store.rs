//! `PostgreSQL` implementation of the `InboxStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use fitness_core::error::DomainError;
use fitness_core::inbox::{InboxRecord, InboxStatus, InboxStore};

use crate::db_error;

#[derive(sqlx::FromRow)]
struct InboxRow {
    id: i64,
    event_id: Uuid,
    consumer: String,
    event_type: String,
    status: String,
    created_at: DateTime<Utc>,
    claimed_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

impl TryFrom<InboxRow> for InboxRecord {
    type Error = DomainError;

    fn try_from(row: InboxRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            event_id: row.event_id,
            consumer: row.consumer,
            event_type: row.event_type,
            status: row.status.parse()?,
            created_at: row.created_at,
            claimed_at: row.claimed_at,
            processed_at: row.processed_at,
            error: row.error,
        })
    }
}

/// PostgreSQL-backed inbox ledger for one database.
#[derive(Debug, Clone)]
pub struct PgInboxStore {
    pool: PgPool,
}

impl PgInboxStore {
    /// Creates a new `PgInboxStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn finalize(
        &self,
        consumer: &str,
        event_id: Uuid,
        status: InboxStatus,
        error: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r"
            UPDATE inbox_messages
            SET status = $3, processed_at = $4, error = $5
            WHERE consumer = $1 AND event_id = $2
            ",
        )
        .bind(consumer)
        .bind(event_id)
        .bind(status.as_str())
        .bind(at)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!(
                "inbox row {consumer}/{event_id}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl InboxStore for PgInboxStore {
    async fn find(
        &self,
        consumer: &str,
        event_id: Uuid,
    ) -> Result<Option<InboxRecord>, DomainError> {
        let row: Option<InboxRow> = sqlx::query_as(
            r"
            SELECT id, event_id, consumer, event_type, status,
                   created_at, claimed_at, processed_at, error
            FROM inbox_messages
            WHERE consumer = $1 AND event_id = $2
            ",
        )
        .bind(consumer)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(InboxRecord::try_from).transpose()
    }

    async fn try_begin(
        &self,
        consumer: &str,
        event_id: Uuid,
        event_type: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r"
            INSERT INTO inbox_messages
                (event_id, consumer, event_type, status, created_at, claimed_at)
            VALUES ($1, $2, $3, 'processing', $4, $4)
            ON CONFLICT (consumer, event_id) DO NOTHING
            ",
        )
        .bind(event_id)
        .bind(consumer)
        .bind(event_type)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn reclaim(
        &self,
        consumer: &str,
        event_id: Uuid,
        stale_before: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r"
            UPDATE inbox_messages
            SET status = 'processing', claimed_at = $4
            WHERE consumer = $1 AND event_id = $2
              AND (status = 'failed' OR (status = 'processing' AND claimed_at < $3))
            ",
        )
        .bind(consumer)
        .bind(event_id)
        .bind(stale_before)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn complete(
        &self,
        consumer: &str,
        event_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.finalize(consumer, event_id, InboxStatus::Completed, None, at)
            .await
    }

    async fn fail(
        &self,
        consumer: &str,
        event_id: Uuid,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.finalize(consumer, event_id, InboxStatus::Failed, Some(error), at)
            .await
    }
}
