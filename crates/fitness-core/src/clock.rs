//! Time source for outbox and inbox timestamps.

use chrono::{DateTime, Utc};

/// Supplies `created_at`, `processed_at` and inbox claim times, and the
/// reference point for inbox lease expiry.
pub trait Clock: Send + Sync {
    /// The current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time, used by the worker process.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
