//! Shared test doubles and in-memory backends for the fitness platform.

mod clock;
mod event;
mod handler;
mod inbox;
mod outbox;

pub use clock::{FixedClock, ManualClock};
pub use event::{OtherTestEvent, TestEvent};
pub use handler::{CallLog, FailingHandler, RecordingHandler};
pub use inbox::InMemoryInboxStore;
pub use outbox::{FailingOutboxStore, InMemoryOutboxStore, MemoryTransaction};
