//! In-memory outbox backend and failure double.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fitness_core::error::DomainError;
use fitness_core::outbox::{
    NewOutboxRecord, OutboxAppend, OutboxRecord, OutboxStore, truncate_error,
};

/// Staging area for records appended inside an in-memory "transaction".
///
/// Nothing becomes visible to pollers until [`InMemoryOutboxStore::commit`].
/// Dropping the transaction discards the staged records.
#[derive(Debug, Default)]
pub struct MemoryTransaction {
    staged: Vec<OutboxRecord>,
}

/// An outbox store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryOutboxStore {
    next_id: AtomicI64,
    records: Mutex<Vec<OutboxRecord>>,
}

impl InMemoryOutboxStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a transaction.
    #[must_use]
    pub fn begin(&self) -> MemoryTransaction {
        MemoryTransaction::default()
    }

    /// Makes every record staged in `tx` visible.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn commit(&self, tx: MemoryTransaction) {
        self.records.lock().unwrap().extend(tx.staged);
    }

    /// Appends and commits a single record, returning its ID.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn insert(&self, record: &NewOutboxRecord) -> i64 {
        let mut tx = self.begin();
        let id = self.stage(&mut tx, record);
        self.commit(tx);
        id
    }

    /// Returns a snapshot of every committed record, in insert order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn records(&self) -> Vec<OutboxRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Returns the committed record with `id`.
    pub fn get(&self, id: i64) -> Option<OutboxRecord> {
        self.records().into_iter().find(|r| r.id == id)
    }

    fn stage(&self, tx: &mut MemoryTransaction, record: &NewOutboxRecord) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        tx.staged.push(OutboxRecord {
            id,
            event_id: record.event_id,
            event_type: record.event_type.clone(),
            payload: record.payload.clone(),
            created_at: record.created_at,
            is_processed: false,
            processed_at: None,
            retry_count: 0,
            last_error: None,
            correlation_id: record.correlation_id.clone(),
            trace_id: record.trace_id.clone(),
        });
        id
    }
}

#[async_trait]
impl OutboxAppend for InMemoryOutboxStore {
    type Transaction = MemoryTransaction;

    async fn append(
        &self,
        tx: &mut MemoryTransaction,
        record: &NewOutboxRecord,
    ) -> Result<i64, DomainError> {
        Ok(self.stage(tx, record))
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    async fn poll_unprocessed(
        &self,
        batch_size: u32,
        max_retry_count: i32,
    ) -> Result<Vec<OutboxRecord>, DomainError> {
        let mut due: Vec<OutboxRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !r.is_processed && r.retry_count < max_retry_count)
            .cloned()
            .collect();
        due.sort_by_key(|r| (r.created_at, r.id));
        due.truncate(batch_size as usize);
        Ok(due)
    }

    async fn mark_processed(&self, id: i64, at: DateTime<Utc>) -> Result<(), DomainError> {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|r| r.id == id && !r.is_processed) {
            record.is_processed = true;
            record.processed_at = Some(at);
            record.last_error = None;
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: i64,
        error: &str,
        poison: bool,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|r| r.id == id && !r.is_processed) {
            record.retry_count += 1;
            record.last_error = Some(truncate_error(error));
            if poison {
                record.is_processed = true;
                record.processed_at = Some(at);
            }
        }
        Ok(())
    }

    async fn list_poisoned(&self, limit: u32) -> Result<Vec<OutboxRecord>, DomainError> {
        let mut poisoned: Vec<OutboxRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.is_poisoned())
            .cloned()
            .collect();
        poisoned.sort_by(|a, b| b.processed_at.cmp(&a.processed_at).then(b.id.cmp(&a.id)));
        poisoned.truncate(limit as usize);
        Ok(poisoned)
    }
}

/// An outbox store whose every operation fails with an infrastructure error.
#[derive(Debug)]
pub struct FailingOutboxStore;

#[async_trait]
impl OutboxStore for FailingOutboxStore {
    async fn poll_unprocessed(
        &self,
        _batch_size: u32,
        _max_retry_count: i32,
    ) -> Result<Vec<OutboxRecord>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn mark_processed(&self, _id: i64, _at: DateTime<Utc>) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn mark_failed(
        &self,
        _id: i64,
        _error: &str,
        _poison: bool,
        _at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn list_poisoned(&self, _limit: u32) -> Result<Vec<OutboxRecord>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
