//! Fitness platform — Workouts module.
//!
//! Keeps a read-optimized copy of user profiles next to workout data,
//! fed by `users.profile_updated` integration events.

pub mod application;
pub mod domain;
pub mod infrastructure;

use std::sync::Arc;

use fitness_core::clock::Clock;
use fitness_core::inbox::InboxStore;
use fitness_outbox::config::InboxGuardConfig;
use fitness_outbox::registry::RegistryBuilder;
use fitness_users::domain::events::ProfileUpdated;

use crate::application::event_handlers::UserProfileProjectionHandler;
use crate::domain::user_profile::UserProfileProjectionRepository;

/// Contributes this module's event handlers to `builder`.
///
/// Every handler runs behind the inbox guard, recording its runs in `inbox`,
/// which must live in the same datastore as `projection`.
#[must_use]
pub fn register(
    builder: RegistryBuilder,
    projection: Arc<dyn UserProfileProjectionRepository>,
    inbox: Arc<dyn InboxStore>,
    clock: Arc<dyn Clock>,
    config: InboxGuardConfig,
) -> RegistryBuilder {
    let handler = UserProfileProjectionHandler::new(projection);
    builder.idempotent_handler::<ProfileUpdated, _>(handler, inbox, clock, config)
}
