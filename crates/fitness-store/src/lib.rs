//! PostgreSQL backend for the outbox and inbox.
//!
//! Each physical database gets its own store instances. Tables are created by
//! the migrations in the workspace `migrations/` directory.

pub mod pg_inbox_store;
pub mod pg_outbox_store;

use fitness_core::error::DomainError;

pub(crate) fn db_error(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("database error: {err}"))
}
