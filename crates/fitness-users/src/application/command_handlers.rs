//! Command handlers for the Users module.
//!
//! Each handler commits the state change and its outbox record in a single
//! local transaction.

use fitness_core::clock::Clock;
use fitness_core::error::DomainError;
use fitness_core::outbox::{NewOutboxRecord, OutboxAppend};
use tracing::info;

use crate::domain::commands::UpdateProfile;
use crate::domain::profile::{ProfileRepository, UserProfile};

/// Handles the `UpdateProfile` command: saves the profile and appends a
/// `users.profile_updated` outbox record in the same transaction.
///
/// Returns the outbox record that was committed.
///
/// # Errors
///
/// Returns `DomainError::Validation` for invalid input, and
/// `DomainError::Infrastructure` if any step of the transaction fails. In
/// both cases neither the profile nor the outbox record is persisted.
pub async fn handle_update_profile<R, O>(
    command: &UpdateProfile,
    clock: &dyn Clock,
    profiles: &R,
    outbox: &O,
) -> Result<NewOutboxRecord, DomainError>
where
    R: ProfileRepository,
    O: OutboxAppend<Transaction = R::Transaction>,
{
    let profile = UserProfile::from_command(command, clock.now())?;
    let record = NewOutboxRecord::from_event(
        &profile.updated_event(),
        Some(command.correlation_id.to_string()),
        command.trace_id.clone(),
        clock,
    )?;

    let mut tx = profiles.begin().await?;
    profiles.save(&mut tx, &profile).await?;
    outbox.append(&mut tx, &record).await?;
    profiles.commit(tx).await?;

    info!(
        user_id = %profile.user_id,
        event_id = %record.event_id,
        correlation_id = %command.correlation_id,
        "profile updated"
    );
    Ok(record)
}
