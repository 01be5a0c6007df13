//! `PostgreSQL` implementation of `UserProfileProjectionRepository`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fitness_core::error::DomainError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::user_profile::{UserProfileProjectionRepository, UserProfileView};

fn db_error(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("database error: {err}"))
}

/// Profile projection stored in the workouts database.
#[derive(Debug, Clone)]
pub struct PgUserProfileProjection {
    pool: PgPool,
}

impl PgUserProfileProjection {
    /// Creates a new `PgUserProfileProjection`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ViewRow {
    user_id: Uuid,
    display_name: String,
    updated_at: DateTime<Utc>,
}

#[async_trait]
impl UserProfileProjectionRepository for PgUserProfileProjection {
    async fn upsert(&self, view: &UserProfileView) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r"
            INSERT INTO workout_user_profiles (user_id, display_name, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET display_name = EXCLUDED.display_name,
                updated_at = EXCLUDED.updated_at
            WHERE workout_user_profiles.updated_at <= EXCLUDED.updated_at
            ",
        )
        .bind(view.user_id)
        .bind(&view.display_name)
        .bind(view.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn find(&self, user_id: Uuid) -> Result<Option<UserProfileView>, DomainError> {
        let row: Option<ViewRow> = sqlx::query_as(
            "SELECT user_id, display_name, updated_at FROM workout_user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| UserProfileView {
            user_id: r.user_id,
            display_name: r.display_name,
            updated_at: r.updated_at,
        }))
    }
}
