//! Per-backend outbox processor.

use std::sync::Arc;

use fitness_core::clock::Clock;
use fitness_core::error::DomainError;
use fitness_core::outbox::{OutboxRecord, OutboxStore};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info_span, trace, warn};

use crate::config::ProcessorConfig;
use crate::dispatcher::Dispatcher;

/// Counts of what one cycle did to one backend.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Records returned by the poll.
    pub polled: usize,
    /// Records whose handlers all succeeded.
    pub processed: usize,
    /// Records that failed and stay eligible for another attempt.
    pub retried: usize,
    /// Records that failed terminally and were marked processed.
    pub poisoned: usize,
    /// Records left untouched because another attempt holds an inbox claim.
    /// Their retry count does not advance.
    pub deferred: usize,
    /// Records whose outcome could not be written back to the store. They
    /// are polled again next cycle.
    pub bookkeeping_failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Processed,
    Retried,
    Poisoned,
    Deferred,
}

impl CycleReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Processed => self.processed += 1,
            Outcome::Retried => self.retried += 1,
            Outcome::Poisoned => self.poisoned += 1,
            Outcome::Deferred => self.deferred += 1,
        }
    }
}

/// Polls one outbox store and owns its retry and poison bookkeeping.
///
/// One instance per physical backend. Instances share nothing except the
/// dispatcher, so a slow or failing backend never holds up another.
pub struct OutboxProcessor {
    backend: String,
    store: Arc<dyn OutboxStore>,
    dispatcher: Arc<Dispatcher>,
    clock: Arc<dyn Clock>,
    config: ProcessorConfig,
}

impl std::fmt::Debug for OutboxProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboxProcessor")
            .field("backend", &self.backend)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OutboxProcessor {
    /// Creates a processor for the backend named `backend`.
    #[must_use]
    pub fn new(
        backend: impl Into<String>,
        store: Arc<dyn OutboxStore>,
        dispatcher: Arc<Dispatcher>,
        clock: Arc<dyn Clock>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            backend: backend.into(),
            store,
            dispatcher,
            clock,
            config,
        }
    }

    /// The backend label used in logs.
    #[must_use]
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Polls one batch and dispatches each record in FIFO order.
    ///
    /// A record whose outcome cannot be written back is counted in
    /// `bookkeeping_failed` and the cycle moves on to the next record.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the store cannot be polled.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleReport, DomainError> {
        let records = self
            .store
            .poll_unprocessed(self.config.batch_size, self.config.max_retry_count)
            .await?;

        let mut report = CycleReport {
            polled: records.len(),
            ..CycleReport::default()
        };
        if records.is_empty() {
            trace!(backend = %self.backend, "no pending outbox records");
            return Ok(report);
        }

        for record in &records {
            let span = info_span!(
                "dispatch",
                backend = %self.backend,
                outbox_id = record.id,
                event_id = %record.event_id,
                event_type = %record.event_type,
                correlation_id = ?record.correlation_id,
                trace_id = ?record.trace_id,
            );
            match self.process_record(record, cancel).instrument(span.clone()).await {
                Ok(outcome) => report.record(outcome),
                Err(err) => {
                    error!(
                        parent: &span,
                        alert = true,
                        error = %err,
                        "could not record outbox outcome; record will be dispatched again"
                    );
                    report.bookkeeping_failed += 1;
                }
            }
        }

        debug!(
            backend = %self.backend,
            polled = report.polled,
            processed = report.processed,
            retried = report.retried,
            poisoned = report.poisoned,
            deferred = report.deferred,
            bookkeeping_failed = report.bookkeeping_failed,
            "outbox cycle finished"
        );
        Ok(report)
    }

    async fn process_record(
        &self,
        record: &OutboxRecord,
        cancel: &CancellationToken,
    ) -> Result<Outcome, DomainError> {
        let err = match self.dispatcher.dispatch(record, cancel).await {
            Ok(handlers) => {
                self.store.mark_processed(record.id, self.clock.now()).await?;
                debug!(handlers, "outbox record processed");
                return Ok(Outcome::Processed);
            }
            Err(err) => err,
        };

        if err.is_in_flight() {
            debug!(error = %err, "inbox claim still held, deferring without using a retry");
            return Ok(Outcome::Deferred);
        }

        let attempts = record.retry_count + 1;
        let permanent = err.is_permanent() && !self.config.retry_permanent_failures;
        let poison = permanent || attempts >= self.config.max_retry_count;

        self.store
            .mark_failed(record.id, &err.to_string(), poison, self.clock.now())
            .await?;

        if permanent {
            error!(
                alert = true,
                retry_count = attempts,
                error = %err,
                "outbox record cannot be decoded and was poisoned; check for event type skew between deployments"
            );
        } else if poison {
            error!(
                alert = true,
                retry_count = attempts,
                error = %err,
                "outbox record exhausted its retries and was poisoned"
            );
        } else {
            warn!(retry_count = attempts, error = %err, "dispatch failed, will retry");
        }

        Ok(if poison {
            Outcome::Poisoned
        } else {
            Outcome::Retried
        })
    }
}
