//! `PostgreSQL` implementation of `ProfileRepository`.

use async_trait::async_trait;
use fitness_core::error::DomainError;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::profile::{ProfileRepository, UserProfile};

fn db_error(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("database error: {err}"))
}

/// PostgreSQL-backed profile storage in the users database.
#[derive(Debug, Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    /// Creates a new `PgProfileRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    type Transaction = Transaction<'static, Postgres>;

    async fn begin(&self) -> Result<Self::Transaction, DomainError> {
        self.pool.begin().await.map_err(db_error)
    }

    async fn save(
        &self,
        tx: &mut Self::Transaction,
        profile: &UserProfile,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r"
            INSERT INTO user_profiles (user_id, display_name, email, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET display_name = EXCLUDED.display_name,
                email = EXCLUDED.email,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(profile.user_id)
        .bind(&profile.display_name)
        .bind(&profile.email)
        .bind(profile.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn commit(&self, tx: Self::Transaction) -> Result<(), DomainError> {
        tx.commit().await.map_err(db_error)
    }
}
