//! Fitness platform — Users module.
//!
//! Owns user profiles. Every profile change commits together with a
//! `users.profile_updated` outbox record so other modules can follow it.

pub mod application;
pub mod domain;
pub mod infrastructure;
