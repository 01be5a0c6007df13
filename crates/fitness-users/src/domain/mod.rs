//! Users domain types.

pub mod commands;
pub mod events;
pub mod profile;
