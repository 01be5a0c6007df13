//! In-memory inbox ledger.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fitness_core::error::DomainError;
use fitness_core::inbox::{InboxRecord, InboxStatus, InboxStore};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Ledger {
    next_id: i64,
    rows: HashMap<(String, Uuid), InboxRecord>,
}

/// An inbox store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryInboxStore {
    ledger: Mutex<Ledger>,
}

impl InMemoryInboxStore {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the row for `(consumer, event_id)` without going through the
    /// async trait.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn row(&self, consumer: &str, event_id: Uuid) -> Option<InboxRecord> {
        self.ledger
            .lock()
            .unwrap()
            .rows
            .get(&(consumer.to_owned(), event_id))
            .cloned()
    }

    /// Returns the number of ledger rows.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn len(&self) -> usize {
        self.ledger.lock().unwrap().rows.len()
    }

    /// Returns true when the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl InboxStore for InMemoryInboxStore {
    async fn find(
        &self,
        consumer: &str,
        event_id: Uuid,
    ) -> Result<Option<InboxRecord>, DomainError> {
        Ok(self.row(consumer, event_id))
    }

    async fn try_begin(
        &self,
        consumer: &str,
        event_id: Uuid,
        event_type: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let mut ledger = self.ledger.lock().unwrap();
        let key = (consumer.to_owned(), event_id);
        if ledger.rows.contains_key(&key) {
            return Ok(false);
        }
        ledger.next_id += 1;
        let id = ledger.next_id;
        ledger.rows.insert(
            key,
            InboxRecord {
                id,
                event_id,
                consumer: consumer.to_owned(),
                event_type: event_type.to_owned(),
                status: InboxStatus::Processing,
                created_at: at,
                claimed_at: at,
                processed_at: None,
                error: None,
            },
        );
        Ok(true)
    }

    async fn reclaim(
        &self,
        consumer: &str,
        event_id: Uuid,
        stale_before: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let mut ledger = self.ledger.lock().unwrap();
        let Some(row) = ledger.rows.get_mut(&(consumer.to_owned(), event_id)) else {
            return Ok(false);
        };
        let reclaimable = match row.status {
            InboxStatus::Failed => true,
            InboxStatus::Processing => row.claimed_at < stale_before,
            InboxStatus::Completed => false,
        };
        if reclaimable {
            row.status = InboxStatus::Processing;
            row.claimed_at = at;
        }
        Ok(reclaimable)
    }

    async fn complete(
        &self,
        consumer: &str,
        event_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut ledger = self.ledger.lock().unwrap();
        let row = ledger
            .rows
            .get_mut(&(consumer.to_owned(), event_id))
            .ok_or_else(|| DomainError::NotFound(format!("inbox row {consumer}/{event_id}")))?;
        row.status = InboxStatus::Completed;
        row.processed_at = Some(at);
        row.error = None;
        Ok(())
    }

    async fn fail(
        &self,
        consumer: &str,
        event_id: Uuid,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut ledger = self.ledger.lock().unwrap();
        let row = ledger
            .rows
            .get_mut(&(consumer.to_owned(), event_id))
            .ok_or_else(|| DomainError::NotFound(format!("inbox row {consumer}/{event_id}")))?;
        row.status = InboxStatus::Failed;
        row.processed_at = Some(at);
        row.error = Some(error.to_owned());
        Ok(())
    }
}
