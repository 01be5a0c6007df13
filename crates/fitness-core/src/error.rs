//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level error type shared by stores and handlers.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced entity was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// Another attempt still holds the inbox claim for this consumer and event.
    #[error("event {event_id} is already being processed by consumer {consumer}")]
    InFlight {
        /// The consumer holding the claim.
        consumer: String,
        /// The logical event being processed.
        event_id: Uuid,
    },

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
