//! The single background task that drives every backend processor.

use std::time::Duration;

use fitness_core::error::DomainError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::processor::{CycleReport, OutboxProcessor};

/// Runs each backend's processor in turn on a fixed interval.
///
/// Cancellation is checked between cycles only; a cycle that has started
/// runs to completion.
#[derive(Debug)]
pub struct OutboxWorker {
    processors: Vec<OutboxProcessor>,
    poll_interval: Duration,
}

impl OutboxWorker {
    /// Creates a worker over one processor per backend.
    #[must_use]
    pub fn new(processors: Vec<OutboxProcessor>, poll_interval: Duration) -> Self {
        Self {
            processors,
            poll_interval,
        }
    }

    /// Runs one cycle on every backend. A failure on one backend is logged
    /// and does not stop the others.
    pub async fn run_once(
        &self,
        cancel: &CancellationToken,
    ) -> Vec<(String, Result<CycleReport, DomainError>)> {
        let mut results = Vec::with_capacity(self.processors.len());
        for processor in &self.processors {
            let result = processor.run_cycle(cancel).await;
            if let Err(err) = &result {
                error!(backend = processor.backend(), error = %err, "outbox cycle failed");
            }
            results.push((processor.backend().to_owned(), result));
        }
        results
    }

    /// Loops until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            backends = self.processors.len(),
            poll_interval_ms = u64::try_from(self.poll_interval.as_millis()).unwrap_or(u64::MAX),
            "outbox worker started"
        );

        while !cancel.is_cancelled() {
            self.run_once(&cancel).await;

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!("outbox worker stopped");
    }
}
