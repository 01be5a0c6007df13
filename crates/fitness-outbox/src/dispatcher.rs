//! Resolves an outbox record to its typed event and runs its handlers.

use std::sync::Arc;

use fitness_core::event::EventContext;
use fitness_core::outbox::OutboxRecord;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::DispatchError;
use crate::registry::EventRegistry;

/// Dispatches records through an [`EventRegistry`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<EventRegistry>,
}

impl Dispatcher {
    /// Creates a dispatcher over a frozen registry.
    #[must_use]
    pub fn new(registry: Arc<EventRegistry>) -> Self {
        Self { registry }
    }

    /// Decodes `record` and invokes every registered handler in registration
    /// order, one at a time. Returns the number of handlers invoked.
    ///
    /// The first failing handler ends the attempt. A retried record runs all
    /// of its handlers again, including those that succeeded before.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::UnknownEventType` or `DispatchError::Decode`
    /// when the record cannot be resolved, and `DispatchError::Handler` when
    /// a handler fails.
    pub async fn dispatch(
        &self,
        record: &OutboxRecord,
        cancel: &CancellationToken,
    ) -> Result<usize, DispatchError> {
        let registration = self
            .registry
            .get(&record.event_type)
            .ok_or_else(|| DispatchError::UnknownEventType(record.event_type.clone()))?;

        let event = registration
            .decode(&record.payload)
            .map_err(|e| DispatchError::Decode {
                event_type: record.event_type.clone(),
                reason: e.to_string(),
            })?;

        let ctx = EventContext {
            event_id: record.event_id,
            event_type: record.event_type.clone(),
            created_at: record.created_at,
            correlation_id: record.correlation_id.clone(),
            trace_id: record.trace_id.clone(),
        };

        for handler in registration.handlers() {
            debug!(consumer = handler.consumer(), "invoking handler");
            handler
                .handle(&*event, &ctx, cancel)
                .await
                .map_err(|source| DispatchError::Handler {
                    consumer: handler.consumer().to_owned(),
                    source,
                })?;
        }

        Ok(registration.handlers().len())
    }
}
