//! Inbox ledger model and store abstraction.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;

/// Processing state of one consumer for one logical event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxStatus {
    /// A handler run has been claimed and not yet finalized.
    Processing,
    /// The side effect was applied. Permanent skip signal.
    Completed,
    /// The last run failed; the next delivery re-runs the handler.
    Failed,
}

impl InboxStatus {
    /// Returns the persisted representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for InboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InboxStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(DomainError::Infrastructure(format!(
                "unknown inbox status: {other}"
            ))),
        }
    }
}

/// A ledger row, unique per `(consumer, event_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxRecord {
    /// Backend-native identifier.
    pub id: i64,
    /// The logical event.
    pub event_id: Uuid,
    /// The consuming handler.
    pub consumer: String,
    /// The event discriminator.
    pub event_type: String,
    /// Current state.
    pub status: InboxStatus,
    /// When the row was first inserted.
    pub created_at: DateTime<Utc>,
    /// When the current `processing` claim was taken.
    pub claimed_at: DateTime<Utc>,
    /// When the row was last finalized.
    pub processed_at: Option<DateTime<Utc>>,
    /// Error of the last failed run.
    pub error: Option<String>,
}

/// Per-consumer idempotency ledger.
#[async_trait]
pub trait InboxStore: Send + Sync {
    /// Looks up the ledger row for `(consumer, event_id)`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the query fails.
    async fn find(
        &self,
        consumer: &str,
        event_id: Uuid,
    ) -> Result<Option<InboxRecord>, DomainError>;

    /// Inserts a `processing` row. Returns `false` if a row for
    /// `(consumer, event_id)` already exists.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` for any failure other than the
    /// uniqueness violation.
    async fn try_begin(
        &self,
        consumer: &str,
        event_id: Uuid,
        event_type: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError>;

    /// Moves a `failed` row, or a `processing` row claimed before
    /// `stale_before`, back to `processing`. Returns `false` if no row
    /// qualified.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the update fails.
    async fn reclaim(
        &self,
        consumer: &str,
        event_id: Uuid,
        stale_before: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError>;

    /// Marks the row `completed`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the update fails.
    async fn complete(
        &self,
        consumer: &str,
        event_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    /// Marks the row `failed` with `error`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the update fails.
    async fn fail(
        &self,
        consumer: &str,
        event_id: Uuid,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError>;
}
