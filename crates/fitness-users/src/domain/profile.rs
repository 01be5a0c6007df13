//! The user profile entity and its persistence seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fitness_core::error::DomainError;
use uuid::Uuid;

use super::commands::UpdateProfile;
use super::events::ProfileUpdated;

/// A user's profile as stored by the Users module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// User identifier.
    pub user_id: Uuid,
    /// Display name shown across modules.
    pub display_name: String,
    /// Contact email.
    pub email: String,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Builds the updated profile described by `command`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank display name or an
    /// email without `@`.
    pub fn from_command(command: &UpdateProfile, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let display_name = command.display_name.trim();
        if display_name.is_empty() {
            return Err(DomainError::Validation("display name must not be blank".into()));
        }
        if !command.email.contains('@') {
            return Err(DomainError::Validation(format!(
                "invalid email address: {}",
                command.email
            )));
        }
        Ok(Self {
            user_id: command.user_id,
            display_name: display_name.to_owned(),
            email: command.email.clone(),
            updated_at: now,
        })
    }

    /// The integration event announcing this profile state.
    #[must_use]
    pub fn updated_event(&self) -> ProfileUpdated {
        ProfileUpdated {
            user_id: self.user_id,
            display_name: self.display_name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Transactional profile persistence.
///
/// The transaction type is shared with the outbox so that a profile write and
/// its outbox record commit together.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// The datastore's native transaction type.
    type Transaction: Send;

    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the datastore is unreachable.
    async fn begin(&self) -> Result<Self::Transaction, DomainError>;

    /// Inserts or replaces `profile` inside `tx`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the write fails.
    async fn save(
        &self,
        tx: &mut Self::Transaction,
        profile: &UserProfile,
    ) -> Result<(), DomainError>;

    /// Commits `tx`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the commit fails.
    async fn commit(&self, tx: Self::Transaction) -> Result<(), DomainError>;
}
