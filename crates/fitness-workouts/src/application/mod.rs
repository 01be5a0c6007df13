//! Application layer: integration event handlers.

pub mod event_handlers;
