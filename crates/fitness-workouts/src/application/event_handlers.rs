//! Handlers for integration events consumed by the Workouts module.

use std::sync::Arc;

use async_trait::async_trait;
use fitness_core::error::DomainError;
use fitness_core::event::EventContext;
use fitness_core::handler::EventHandler;
use fitness_users::domain::events::ProfileUpdated;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::user_profile::{UserProfileProjectionRepository, UserProfileView};

/// Inbox consumer name of [`UserProfileProjectionHandler`].
pub const USER_PROFILE_PROJECTION: &str = "workouts.user_profiles";

/// Mirrors `users.profile_updated` into the workout-side profile view.
pub struct UserProfileProjectionHandler {
    projection: Arc<dyn UserProfileProjectionRepository>,
}

impl UserProfileProjectionHandler {
    /// Creates the handler over `projection`.
    #[must_use]
    pub fn new(projection: Arc<dyn UserProfileProjectionRepository>) -> Self {
        Self { projection }
    }
}

#[async_trait]
impl EventHandler<ProfileUpdated> for UserProfileProjectionHandler {
    fn consumer(&self) -> &str {
        USER_PROFILE_PROJECTION
    }

    async fn handle(
        &self,
        event: &ProfileUpdated,
        ctx: &EventContext,
        _cancel: &CancellationToken,
    ) -> Result<(), DomainError> {
        let view = UserProfileView {
            user_id: event.user_id,
            display_name: event.display_name.clone(),
            updated_at: ctx.created_at,
        };

        if self.projection.upsert(&view).await? {
            info!(user_id = %event.user_id, "user profile projection updated");
        } else {
            debug!(user_id = %event.user_id, "newer user profile already projected");
        }
        Ok(())
    }
}
