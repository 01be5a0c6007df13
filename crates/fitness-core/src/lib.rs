//! Fitness Core — shared event-propagation abstractions.
//!
//! This crate defines the record shapes, store traits and handler contract
//! that every module and every storage backend depend on. It contains no
//! infrastructure code.

pub mod clock;
pub mod error;
pub mod event;
pub mod handler;
pub mod inbox;
pub mod outbox;
