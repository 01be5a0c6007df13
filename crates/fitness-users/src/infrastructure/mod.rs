//! Users persistence.

pub mod pg_profile_repository;
