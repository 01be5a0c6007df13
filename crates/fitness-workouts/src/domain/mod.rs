//! Workouts domain types.

pub mod user_profile;
