//! Commands for the Users module.

use uuid::Uuid;

/// Command to change a user's profile.
#[derive(Debug, Clone)]
pub struct UpdateProfile {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Trace ID of the originating request, if any.
    pub trace_id: Option<String>,
    /// The user being updated.
    pub user_id: Uuid,
    /// New display name.
    pub display_name: String,
    /// New contact email.
    pub email: String,
}
