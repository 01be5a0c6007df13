//! Test handlers — `EventHandler` fakes that record or fail on demand.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fitness_core::error::DomainError;
use fitness_core::event::{EventContext, IntegrationEvent};
use fitness_core::handler::EventHandler;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Shared, ordered log of `"consumer:event_id"` entries across handlers.
pub type CallLog = Arc<Mutex<Vec<String>>>;

fn log_call(log: Option<&CallLog>, consumer: &str, event_id: Uuid) {
    if let Some(log) = log {
        log.lock().unwrap().push(format!("{consumer}:{event_id}"));
    }
}

/// A handler that records every invocation and upserts the decoded event
/// into an in-memory projection keyed by event ID.
#[derive(Debug)]
pub struct RecordingHandler {
    consumer: String,
    calls: Mutex<Vec<Uuid>>,
    projection: Mutex<HashMap<Uuid, serde_json::Value>>,
    log: Option<CallLog>,
}

impl RecordingHandler {
    /// Creates a recording handler for `consumer`.
    #[must_use]
    pub fn new(consumer: &str) -> Self {
        Self {
            consumer: consumer.to_owned(),
            calls: Mutex::new(Vec::new()),
            projection: Mutex::new(HashMap::new()),
            log: None,
        }
    }

    /// Creates a recording handler that also appends to a shared call log.
    #[must_use]
    pub fn with_log(consumer: &str, log: CallLog) -> Self {
        Self {
            log: Some(log),
            ..Self::new(consumer)
        }
    }

    /// Returns the event IDs of every invocation, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<Uuid> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns the number of invocations.
    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    /// Returns the number of distinct events applied to the projection.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn projection_len(&self) -> usize {
        self.projection.lock().unwrap().len()
    }

    /// Returns the projected payload for `event_id`, if applied.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn projected(&self, event_id: Uuid) -> Option<serde_json::Value> {
        self.projection.lock().unwrap().get(&event_id).cloned()
    }
}

#[async_trait]
impl<E: IntegrationEvent> EventHandler<E> for RecordingHandler {
    fn consumer(&self) -> &str {
        &self.consumer
    }

    async fn handle(
        &self,
        event: &E,
        ctx: &EventContext,
        _cancel: &CancellationToken,
    ) -> Result<(), DomainError> {
        log_call(self.log.as_ref(), &self.consumer, ctx.event_id);
        self.calls.lock().unwrap().push(ctx.event_id);
        let value = serde_json::to_value(event)
            .map_err(|e| DomainError::Infrastructure(e.to_string()))?;
        self.projection.lock().unwrap().insert(ctx.event_id, value);
        Ok(())
    }
}

/// A handler that fails a configured number of times, or forever.
#[derive(Debug)]
pub struct FailingHandler {
    consumer: String,
    remaining_failures: Mutex<Option<u32>>,
    calls: Mutex<u32>,
    log: Option<CallLog>,
}

impl FailingHandler {
    /// Creates a handler that fails on every invocation.
    #[must_use]
    pub fn always(consumer: &str) -> Self {
        Self {
            consumer: consumer.to_owned(),
            remaining_failures: Mutex::new(None),
            calls: Mutex::new(0),
            log: None,
        }
    }

    /// Creates a handler that fails the first `failures` invocations and
    /// succeeds afterwards.
    #[must_use]
    pub fn times(consumer: &str, failures: u32) -> Self {
        Self {
            remaining_failures: Mutex::new(Some(failures)),
            ..Self::always(consumer)
        }
    }

    /// Attaches a shared call log.
    #[must_use]
    pub fn logged(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Returns the number of invocations.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl<E: IntegrationEvent> EventHandler<E> for FailingHandler {
    fn consumer(&self) -> &str {
        &self.consumer
    }

    async fn handle(
        &self,
        _event: &E,
        ctx: &EventContext,
        _cancel: &CancellationToken,
    ) -> Result<(), DomainError> {
        log_call(self.log.as_ref(), &self.consumer, ctx.event_id);
        *self.calls.lock().unwrap() += 1;

        let mut remaining = self.remaining_failures.lock().unwrap();
        match remaining.as_mut() {
            None => Err(DomainError::Infrastructure(format!(
                "{} is unavailable",
                self.consumer
            ))),
            Some(0) => Ok(()),
            Some(n) => {
                *n -= 1;
                Err(DomainError::Infrastructure(format!(
                    "{} is unavailable",
                    self.consumer
                )))
            }
        }
    }
}
