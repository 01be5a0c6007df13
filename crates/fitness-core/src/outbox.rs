//! Outbox record model and store abstractions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::DomainError;
use crate::event::IntegrationEvent;

/// Maximum number of characters of `last_error` kept in storage.
pub const MAX_ERROR_LEN: usize = 1000;

/// A persisted outbox row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxRecord {
    /// Backend-native identifier assigned at insert.
    pub id: i64,
    /// Stable identity of the logical event.
    pub event_id: Uuid,
    /// Discriminator resolved by the event registry.
    pub event_type: String,
    /// JSON text of the event.
    pub payload: String,
    /// Insert time, used for FIFO ordering within a backend.
    pub created_at: DateTime<Utc>,
    /// Terminal flag: all handlers succeeded, or the record was poisoned.
    pub is_processed: bool,
    /// When the record reached its terminal state.
    pub processed_at: Option<DateTime<Utc>>,
    /// Number of failed dispatch attempts.
    pub retry_count: i32,
    /// Most recent failure, truncated to [`MAX_ERROR_LEN`] characters.
    pub last_error: Option<String>,
    /// Correlation ID for tracing.
    pub correlation_id: Option<String>,
    /// Trace ID for tracing.
    pub trace_id: Option<String>,
}

impl OutboxRecord {
    /// Returns true when the record was marked processed because it failed.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.is_processed && self.last_error.is_some()
    }
}

/// An outbox row about to be appended inside a business transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOutboxRecord {
    /// Stable identity of the logical event.
    pub event_id: Uuid,
    /// Discriminator resolved by the event registry.
    pub event_type: String,
    /// JSON text of the event.
    pub payload: String,
    /// Insert time.
    pub created_at: DateTime<Utc>,
    /// Correlation ID for tracing.
    pub correlation_id: Option<String>,
    /// Trace ID for tracing.
    pub trace_id: Option<String>,
}

impl NewOutboxRecord {
    /// Builds a record announcing `event`, with a fresh event ID.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the event cannot be serialized.
    pub fn from_event<E: IntegrationEvent>(
        event: &E,
        correlation_id: Option<String>,
        trace_id: Option<String>,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        let payload = serde_json::to_string(event).map_err(|e| {
            DomainError::Infrastructure(format!("event serialization failed: {e}"))
        })?;
        Ok(Self {
            event_id: Uuid::new_v4(),
            event_type: E::EVENT_TYPE.to_owned(),
            payload,
            created_at: clock.now(),
            correlation_id,
            trace_id,
        })
    }
}

/// Truncates an error message to at most [`MAX_ERROR_LEN`] characters.
#[must_use]
pub fn truncate_error(message: &str) -> String {
    match message.char_indices().nth(MAX_ERROR_LEN) {
        Some((end, _)) => message[..end].to_owned(),
        None => message.to_owned(),
    }
}

/// Writer side of an outbox: appends records within the caller's transaction.
///
/// Implementations never commit. The record exists if and only if the
/// caller's transaction commits.
#[async_trait]
pub trait OutboxAppend: Send + Sync {
    /// The backend's native transaction type.
    type Transaction: Send;

    /// Appends `record` inside `tx`, returning the backend-assigned ID.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the insert fails.
    async fn append(
        &self,
        tx: &mut Self::Transaction,
        record: &NewOutboxRecord,
    ) -> Result<i64, DomainError>;
}

/// Processor side of an outbox: polling and retry bookkeeping.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Returns up to `batch_size` unprocessed records with
    /// `retry_count < max_retry_count`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the query fails.
    async fn poll_unprocessed(
        &self,
        batch_size: u32,
        max_retry_count: i32,
    ) -> Result<Vec<OutboxRecord>, DomainError>;

    /// Marks a record processed and clears any error left by an earlier
    /// attempt. No-op if it already is processed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the update fails.
    async fn mark_processed(&self, id: i64, at: DateTime<Utc>) -> Result<(), DomainError>;

    /// Records a failed attempt: increments `retry_count` and stores the
    /// truncated error. When `poison` is set the record also becomes
    /// processed. No-op if the record is already processed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the update fails.
    async fn mark_failed(
        &self,
        id: i64,
        error: &str,
        poison: bool,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    /// Returns up to `limit` poisoned records, most recently poisoned first.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the query fails.
    async fn list_poisoned(&self, limit: u32) -> Result<Vec<OutboxRecord>, DomainError>;
}
