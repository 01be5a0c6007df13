//! Event type registry.
//!
//! A static table from discriminator to decoder and ordered handler list,
//! assembled once at startup by an explicit composition step and then shared
//! read-only with the dispatcher.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use fitness_core::clock::Clock;
use fitness_core::error::DomainError;
use fitness_core::event::{EventContext, IntegrationEvent};
use fitness_core::handler::EventHandler;
use fitness_core::inbox::InboxStore;
use tokio_util::sync::CancellationToken;

use crate::config::InboxGuardConfig;
use crate::error::RegistryError;
use crate::inbox_guard::IdempotentHandler;

/// A decoded event whose concrete type is known only to its registration.
pub(crate) type DecodedEvent = Box<dyn Any + Send + Sync>;

type Decoder = fn(&str) -> Result<DecodedEvent, serde_json::Error>;

fn decode<E: IntegrationEvent>(payload: &str) -> Result<DecodedEvent, serde_json::Error> {
    Ok(Box::new(serde_json::from_str::<E>(payload)?))
}

/// A handler with its event type erased.
#[async_trait]
pub(crate) trait ErasedHandler: Send + Sync {
    fn consumer(&self) -> &str;

    async fn handle(
        &self,
        event: &(dyn Any + Send + Sync),
        ctx: &EventContext,
        cancel: &CancellationToken,
    ) -> Result<(), DomainError>;
}

struct TypedHandler<E, H> {
    handler: H,
    _event: PhantomData<fn() -> E>,
}

#[async_trait]
impl<E, H> ErasedHandler for TypedHandler<E, H>
where
    E: IntegrationEvent,
    H: EventHandler<E>,
{
    fn consumer(&self) -> &str {
        self.handler.consumer()
    }

    async fn handle(
        &self,
        event: &(dyn Any + Send + Sync),
        ctx: &EventContext,
        cancel: &CancellationToken,
    ) -> Result<(), DomainError> {
        let event = event.downcast_ref::<E>().ok_or_else(|| {
            DomainError::Infrastructure(format!(
                "decoded event is not a {}",
                type_name::<E>()
            ))
        })?;
        self.handler.handle(event, ctx, cancel).await
    }
}

/// Decoder and subscribers for one discriminator.
pub(crate) struct Registration {
    type_id: TypeId,
    type_name: &'static str,
    decoder: Decoder,
    handlers: Vec<Arc<dyn ErasedHandler>>,
}

impl Registration {
    fn of<E: IntegrationEvent>() -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            type_name: type_name::<E>(),
            decoder: decode::<E>,
            handlers: Vec::new(),
        }
    }

    pub(crate) fn decode(&self, payload: &str) -> Result<DecodedEvent, serde_json::Error> {
        (self.decoder)(payload)
    }

    pub(crate) fn handlers(&self) -> &[Arc<dyn ErasedHandler>] {
        &self.handlers
    }

    fn consumers(&self) -> Vec<String> {
        self.handlers
            .iter()
            .map(|h| h.consumer().to_owned())
            .collect()
    }
}

/// Immutable mapping from event type to decoder and handlers.
pub struct EventRegistry {
    entries: HashMap<&'static str, Registration>,
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (event_type, registration) in &self.entries {
            map.entry(event_type, &registration.consumers());
        }
        map.finish()
    }
}

impl EventRegistry {
    /// Starts an empty registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub(crate) fn get(&self, event_type: &str) -> Option<&Registration> {
        self.entries.get(event_type)
    }

    /// Returns true when `event_type` can be dispatched.
    #[must_use]
    pub fn contains(&self, event_type: &str) -> bool {
        self.entries.contains_key(event_type)
    }

    /// Returns every registered discriminator, sorted.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        let mut types: Vec<&'static str> = self.entries.keys().copied().collect();
        types.sort_unstable();
        types
    }

    /// Returns the consumers subscribed to `event_type`, in invocation order.
    #[must_use]
    pub fn consumers(&self, event_type: &str) -> Vec<String> {
        self.entries
            .get(event_type)
            .map(Registration::consumers)
            .unwrap_or_default()
    }
}

/// Collects registrations from each module before the registry is frozen.
#[derive(Default)]
pub struct RegistryBuilder {
    entries: HashMap<&'static str, Registration>,
    conflicts: Vec<RegistryError>,
}

impl RegistryBuilder {
    /// Declares `E` dispatchable, even with no subscribers.
    #[must_use]
    pub fn event<E: IntegrationEvent>(mut self) -> Self {
        self.entry::<E>();
        self
    }

    /// Subscribes `handler` to `E`. Handlers of one event type run in the
    /// order they were added.
    #[must_use]
    pub fn handler<E, H>(mut self, handler: H) -> Self
    where
        E: IntegrationEvent,
        H: EventHandler<E> + 'static,
    {
        if let Some(registration) = self.entry::<E>() {
            registration.handlers.push(Arc::new(TypedHandler {
                handler,
                _event: PhantomData,
            }));
        }
        self
    }

    /// Subscribes `handler` to `E` behind an [`IdempotentHandler`] that
    /// records its runs in `inbox`.
    #[must_use]
    pub fn idempotent_handler<E, H>(
        self,
        handler: H,
        inbox: Arc<dyn InboxStore>,
        clock: Arc<dyn Clock>,
        config: InboxGuardConfig,
    ) -> Self
    where
        E: IntegrationEvent,
        H: EventHandler<E> + 'static,
    {
        self.handler::<E, _>(IdempotentHandler::new(handler, inbox, clock, config))
    }

    /// Freezes the registry.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::ConflictingEventType` if two Rust types
    /// declared the same discriminator.
    pub fn build(mut self) -> Result<EventRegistry, RegistryError> {
        if !self.conflicts.is_empty() {
            return Err(self.conflicts.remove(0));
        }
        Ok(EventRegistry {
            entries: self.entries,
        })
    }

    fn entry<E: IntegrationEvent>(&mut self) -> Option<&mut Registration> {
        let registration = self
            .entries
            .entry(E::EVENT_TYPE)
            .or_insert_with(Registration::of::<E>);
        if registration.type_id != TypeId::of::<E>() {
            self.conflicts.push(RegistryError::ConflictingEventType {
                event_type: E::EVENT_TYPE,
                first: registration.type_name,
                second: type_name::<E>(),
            });
            return None;
        }
        Some(registration)
    }
}
