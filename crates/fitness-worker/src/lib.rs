//! Fitness worker — library root.
//!
//! Exposes configuration, composition and routing so integration tests can
//! build the same application the binary runs.

pub mod composition;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
