//! The Workouts module's view of a user.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fitness_core::error::DomainError;
use uuid::Uuid;

/// Denormalized profile fields that workout screens display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfileView {
    /// User identifier.
    pub user_id: Uuid,
    /// Display name as last published by the Users module.
    pub display_name: String,
    /// Creation time of the event this view was built from.
    pub updated_at: DateTime<Utc>,
}

/// Storage for [`UserProfileView`] rows.
#[async_trait]
pub trait UserProfileProjectionRepository: Send + Sync {
    /// Inserts `view`, or replaces the stored row if it is not newer than
    /// `view.updated_at`. Returns false when a newer row was kept.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the write fails.
    async fn upsert(&self, view: &UserProfileView) -> Result<bool, DomainError>;

    /// Loads the view for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the read fails.
    async fn find(&self, user_id: Uuid) -> Result<Option<UserProfileView>, DomainError>;
}
