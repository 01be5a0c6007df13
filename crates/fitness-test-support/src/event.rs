//! Integration events used only by tests.

use fitness_core::event::IntegrationEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A minimal event carrying a subject and a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestEvent {
    /// The entity the event is about.
    pub subject_id: Uuid,
    /// Arbitrary payload value.
    pub value: String,
}

impl IntegrationEvent for TestEvent {
    const EVENT_TYPE: &'static str = "test.event";
}

/// A second event type, for registries with more than one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherTestEvent {
    /// Arbitrary counter.
    pub count: u32,
}

impl IntegrationEvent for OtherTestEvent {
    const EVENT_TYPE: &'static str = "test.other_event";
}
