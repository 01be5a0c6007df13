//! `PostgreSQL` implementation of the outbox store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use fitness_core::error::DomainError;
use fitness_core::outbox::{
    NewOutboxRecord, OutboxAppend, OutboxRecord, OutboxStore, truncate_error,
};

use crate::db_error;

const SELECT_COLUMNS: &str = "id, event_id, event_type, payload, created_at, is_processed, \
     processed_at, retry_count, last_error, correlation_id, trace_id";

#[derive(sqlx::FromRow)]
struct OutboxRow {
    id: i64,
    event_id: Uuid,
    event_type: String,
    payload: String,
    created_at: DateTime<Utc>,
    is_processed: bool,
    processed_at: Option<DateTime<Utc>>,
    retry_count: i32,
    last_error: Option<String>,
    correlation_id: Option<String>,
    trace_id: Option<String>,
}

impl From<OutboxRow> for OutboxRecord {
    fn from(row: OutboxRow) -> Self {
        Self {
            id: row.id,
            event_id: row.event_id,
            event_type: row.event_type,
            payload: row.payload,
            created_at: row.created_at,
            is_processed: row.is_processed,
            processed_at: row.processed_at,
            retry_count: row.retry_count,
            last_error: row.last_error,
            correlation_id: row.correlation_id,
            trace_id: row.trace_id,
        }
    }
}

/// PostgreSQL-backed outbox for one database.
#[derive(Debug, Clone)]
pub struct PgOutboxStore {
    pool: PgPool,
}

impl PgOutboxStore {
    /// Creates a new `PgOutboxStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutboxAppend for PgOutboxStore {
    type Transaction = Transaction<'static, Postgres>;

    async fn append(
        &self,
        tx: &mut Self::Transaction,
        record: &NewOutboxRecord,
    ) -> Result<i64, DomainError> {
        let id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO outbox_messages
                (event_id, event_type, payload, created_at, correlation_id, trace_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(record.event_id)
        .bind(&record.event_type)
        .bind(&record.payload)
        .bind(record.created_at)
        .bind(record.correlation_id.as_deref())
        .bind(record.trace_id.as_deref())
        .fetch_one(&mut **tx)
        .await
        .map_err(db_error)?;

        debug!(outbox_id = id, event_type = %record.event_type, "outbox record appended");
        Ok(id)
    }
}

#[async_trait]
impl OutboxStore for PgOutboxStore {
    async fn poll_unprocessed(
        &self,
        batch_size: u32,
        max_retry_count: i32,
    ) -> Result<Vec<OutboxRecord>, DomainError> {
        let rows: Vec<OutboxRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM outbox_messages \
             WHERE is_processed = FALSE AND retry_count < $1 \
             ORDER BY created_at, id \
             LIMIT $2"
        ))
        .bind(max_retry_count)
        .bind(i64::from(batch_size))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(OutboxRecord::from).collect())
    }

    async fn mark_processed(&self, id: i64, at: DateTime<Utc>) -> Result<(), DomainError> {
        sqlx::query(
            r"
            UPDATE outbox_messages
            SET is_processed = TRUE, processed_at = $2, last_error = NULL
            WHERE id = $1 AND is_processed = FALSE
            ",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: i64,
        error: &str,
        poison: bool,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r"
            UPDATE outbox_messages
            SET retry_count = retry_count + 1,
                last_error = $2,
                is_processed = $3,
                processed_at = CASE WHEN $3 THEN $4 ELSE processed_at END
            WHERE id = $1 AND is_processed = FALSE
            ",
        )
        .bind(id)
        .bind(truncate_error(error))
        .bind(poison)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn list_poisoned(&self, limit: u32) -> Result<Vec<OutboxRecord>, DomainError> {
        let rows: Vec<OutboxRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM outbox_messages \
             WHERE is_processed = TRUE AND last_error IS NOT NULL \
             ORDER BY processed_at DESC, id DESC \
             LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(OutboxRecord::from).collect())
    }
}
