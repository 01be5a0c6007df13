//! Integration events published by the Users module.

use fitness_core::event::IntegrationEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emitted whenever a user's profile fields change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdated {
    /// The user whose profile changed.
    pub user_id: Uuid,
    /// New display name.
    pub display_name: String,
    /// New contact email.
    pub email: String,
}

impl IntegrationEvent for ProfileUpdated {
    const EVENT_TYPE: &'static str = "users.profile_updated";
}
