//! Engine configuration.

use std::time::Duration;

use chrono::TimeDelta;

use crate::error::ConfigError;

/// Settings shared by every backend processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Delay between polling cycles.
    pub poll_interval: Duration,
    /// Maximum records dispatched per backend per cycle.
    pub batch_size: u32,
    /// Failed attempts after which a record is poisoned.
    pub max_retry_count: i32,
    /// Retry undecodable records like handler failures instead of
    /// poisoning them on the first attempt.
    pub retry_permanent_failures: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 50,
            max_retry_count: 3,
            retry_permanent_failures: false,
        }
    }
}

impl ProcessorConfig {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `batch_size` or `max_retry_count`
    /// is not positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be positive".into()));
        }
        if self.max_retry_count <= 0 {
            return Err(ConfigError::Invalid(
                "max_retry_count must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Settings for [`crate::inbox_guard::IdempotentHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboxGuardConfig {
    /// Age after which a `processing` claim is considered abandoned and may
    /// be reclaimed. Zero reclaims any claim taken before the current attempt.
    pub processing_lease: TimeDelta,
}

impl Default for InboxGuardConfig {
    fn default() -> Self {
        Self {
            processing_lease: TimeDelta::zero(),
        }
    }
}
