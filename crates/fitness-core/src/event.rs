//! Integration event abstractions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// An event that crosses module boundaries through the outbox.
///
/// `EVENT_TYPE` is the stable discriminator persisted with every outbox
/// record. It must never change once records carrying it exist.
pub trait IntegrationEvent:
    Serialize + DeserializeOwned + std::fmt::Debug + Send + Sync + 'static
{
    /// Stable string discriminator used by the event registry.
    const EVENT_TYPE: &'static str;
}

/// Delivery metadata handed to handlers alongside the decoded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContext {
    /// Stable identity of the logical event.
    pub event_id: Uuid,
    /// The event discriminator.
    pub event_type: String,
    /// When the outbox record was written.
    pub created_at: DateTime<Utc>,
    /// Correlation ID carried from the originating request, if any.
    pub correlation_id: Option<String>,
    /// Trace ID carried from the originating request, if any.
    pub trace_id: Option<String>,
}
