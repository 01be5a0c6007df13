//! Engine error types.

use fitness_core::error::DomainError;
use thiserror::Error;

/// Why a record could not be dispatched.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No registry entry for the record's discriminator.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// The payload does not decode into the registered event type.
    #[error("cannot decode {event_type} payload: {reason}")]
    Decode {
        /// The record's discriminator.
        event_type: String,
        /// Decoder error message.
        reason: String,
    },

    /// A handler returned an error.
    #[error("handler {consumer} failed: {source}")]
    Handler {
        /// The failing consumer.
        consumer: String,
        /// The handler's error.
        #[source]
        source: DomainError,
    },
}

impl DispatchError {
    /// Returns true when retrying the record can never succeed.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::UnknownEventType(_) | Self::Decode { .. })
    }

    /// Returns true when a handler declined to run because another attempt
    /// still holds its inbox claim.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Handler {
                source: DomainError::InFlight { .. },
                ..
            }
        )
    }
}

/// Errors raised while assembling the event registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Two Rust types declared the same discriminator.
    #[error("event type {event_type} is claimed by both {first} and {second}")]
    ConflictingEventType {
        /// The contested discriminator.
        event_type: &'static str,
        /// The type registered first.
        first: &'static str,
        /// The type registered second.
        second: &'static str,
    },
}

/// Invalid engine configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A configuration value is out of range.
    #[error("invalid outbox configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_failures_are_permanent() {
        assert!(DispatchError::UnknownEventType("x".into()).is_permanent());
        assert!(
            DispatchError::Decode {
                event_type: "x".into(),
                reason: "eof".into(),
            }
            .is_permanent()
        );
    }

    #[test]
    fn test_handler_failures_are_retryable() {
        let err = DispatchError::Handler {
            consumer: "workouts.user_profiles".into(),
            source: DomainError::Infrastructure("timeout".into()),
        };
        assert!(!err.is_permanent());
        assert!(!err.is_in_flight());
    }

    #[test]
    fn test_held_inbox_claim_is_in_flight() {
        let err = DispatchError::Handler {
            consumer: "workouts.user_profiles".into(),
            source: DomainError::InFlight {
                consumer: "workouts.user_profiles".into(),
                event_id: uuid::Uuid::new_v4(),
            },
        };
        assert!(err.is_in_flight());
        assert!(!err.is_permanent());
    }
}
