//! Infrastructure adapters for the Workouts module.

pub mod pg_user_profile_projection;
