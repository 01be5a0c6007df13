//! Fitness Outbox — the event-propagation engine.
//!
//! A state change committed in one module's datastore appends an outbox
//! record in the same local transaction. The [`processor::OutboxProcessor`]
//! later polls that store, the [`dispatcher::Dispatcher`] decodes each record
//! through the [`registry::EventRegistry`] and runs every registered handler,
//! and [`inbox_guard::IdempotentHandler`] keeps consumer side effects from
//! being applied twice.
//!
//! Delivery is at-least-once. Only one processor instance may poll a given
//! store at a time: polling does not claim rows, so two instances would both
//! dispatch the same record.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod inbox_guard;
pub mod processor;
pub mod registry;
pub mod worker;
