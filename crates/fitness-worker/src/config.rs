//! Process configuration read from the environment.

use std::time::Duration;

use chrono::TimeDelta;
use fitness_outbox::config::{InboxGuardConfig, ProcessorConfig};

use crate::error::AppError;

/// Everything the worker process needs at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Connection string of the users datastore.
    pub users_database_url: String,
    /// Connection string of the workouts datastore.
    pub workouts_database_url: String,
    /// Bind address of the HTTP surface.
    pub host: String,
    /// Bind port of the HTTP surface.
    pub port: u16,
    /// Settings shared by every outbox processor.
    pub processor: ProcessorConfig,
    /// Settings of the inbox guard wrapped around every handler.
    pub inbox: InboxGuardConfig,
}

impl WorkerConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| {
                AppError::Config(format!("{key} environment variable must be set"))
            })
        };

        let processor = ProcessorConfig {
            poll_interval: Duration::from_millis(parse_or(
                &lookup,
                "OUTBOX_POLL_INTERVAL_MS",
                5000,
            )?),
            batch_size: parse_or(&lookup, "OUTBOX_BATCH_SIZE", 50)?,
            max_retry_count: parse_or(&lookup, "OUTBOX_MAX_RETRY_COUNT", 3)?,
            retry_permanent_failures: parse_or(&lookup, "OUTBOX_RETRY_PERMANENT_FAILURES", false)?,
        };
        processor.validate()?;

        let lease_secs: i64 = parse_or(&lookup, "INBOX_PROCESSING_LEASE_SECS", 0)?;
        let processing_lease = TimeDelta::try_seconds(lease_secs)
            .filter(|lease| *lease >= TimeDelta::zero())
            .ok_or_else(|| {
                AppError::Config(format!(
                    "INBOX_PROCESSING_LEASE_SECS must be a non-negative number of seconds, got {lease_secs}"
                ))
            })?;

        Ok(Self {
            users_database_url: required("USERS_DATABASE_URL")?,
            workouts_database_url: required("WORKOUTS_DATABASE_URL")?,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            processor,
            inbox: InboxGuardConfig { processing_lease },
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid ({raw:?}): {e}"))),
    }
}
