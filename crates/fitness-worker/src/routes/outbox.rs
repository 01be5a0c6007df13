//! Operator endpoints over the outbox stores.

use axum::extract::{Path, Query, State};
use axum::{Json, Router, routing::get};
use chrono::{DateTime, Utc};
use fitness_core::error::DomainError;
use fitness_core::outbox::OutboxRecord;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 500;

/// Query string of GET /{backend}/poisoned.
#[derive(Debug, Deserialize)]
pub struct PoisonedQuery {
    /// Maximum records returned; defaults to 50, capped at 500.
    pub limit: Option<u32>,
}

/// A poisoned record as shown to operators.
#[derive(Debug, Serialize)]
pub struct PoisonedRecordResponse {
    /// Store-assigned record ID.
    pub id: i64,
    /// Logical event identity.
    pub event_id: Uuid,
    /// Event discriminator.
    pub event_type: String,
    /// Retained JSON payload, available for manual replay.
    pub payload: String,
    /// When the record was appended.
    pub created_at: DateTime<Utc>,
    /// When the record was poisoned.
    pub processed_at: Option<DateTime<Utc>>,
    /// Failed attempts.
    pub retry_count: i32,
    /// Error of the last attempt.
    pub last_error: Option<String>,
    /// Correlation ID of the originating request.
    pub correlation_id: Option<String>,
    /// Trace ID of the originating request.
    pub trace_id: Option<String>,
}

impl From<OutboxRecord> for PoisonedRecordResponse {
    fn from(record: OutboxRecord) -> Self {
        Self {
            id: record.id,
            event_id: record.event_id,
            event_type: record.event_type,
            payload: record.payload,
            created_at: record.created_at,
            processed_at: record.processed_at,
            retry_count: record.retry_count,
            last_error: record.last_error,
            correlation_id: record.correlation_id,
            trace_id: record.trace_id,
        }
    }
}

/// Response body of GET /{backend}/poisoned.
#[derive(Debug, Serialize)]
pub struct PoisonedResponse {
    /// Backend the records were read from.
    pub backend: String,
    /// Poisoned records, newest first.
    pub records: Vec<PoisonedRecordResponse>,
}

/// GET /{backend}/poisoned
#[instrument(skip(state, query))]
async fn list_poisoned(
    State(state): State<AppState>,
    Path(backend): Path<String>,
    Query(query): Query<PoisonedQuery>,
) -> Result<Json<PoisonedResponse>, ApiError> {
    let store = state
        .outbox(&backend)
        .ok_or_else(|| DomainError::NotFound(format!("outbox backend {backend}")))?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let records = store.list_poisoned(limit).await?;
    info!(count = records.len(), "listed poisoned outbox records");

    Ok(Json(PoisonedResponse {
        backend,
        records: records.into_iter().map(Into::into).collect(),
    }))
}

/// Returns the outbox router.
pub fn router() -> Router<AppState> {
    Router::new().route("/{backend}/poisoned", get(list_poisoned))
}
