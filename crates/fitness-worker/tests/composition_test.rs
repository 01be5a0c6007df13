//! The composed worker drains the users outbox into the workouts projection.

mod common;

use fitness_core::outbox::OutboxStore;
use fitness_store::pg_outbox_store::PgOutboxStore;
use fitness_users::application::command_handlers::handle_update_profile;
use fitness_users::domain::commands::UpdateProfile;
use fitness_users::infrastructure::pg_profile_repository::PgProfileRepository;
use fitness_worker::composition::{USERS_BACKEND, WORKOUTS_BACKEND};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[sqlx::test(migrations = "../../migrations")]
async fn test_run_once_propagates_profile_update(pool: PgPool) {
    // Arrange
    let composition = common::compose(&pool);
    let clock = common::fixed_clock();
    let outbox = PgOutboxStore::new(pool.clone());
    let user_id = Uuid::new_v4();
    let command = UpdateProfile {
        correlation_id: Uuid::new_v4(),
        trace_id: Some("trace-1".to_string()),
        user_id,
        display_name: "Grace".to_string(),
        email: "grace@example.com".to_string(),
    };
    handle_update_profile(
        &command,
        clock.as_ref(),
        &PgProfileRepository::new(pool.clone()),
        &outbox,
    )
    .await
    .unwrap();

    // Act
    let results = composition.worker.run_once(&CancellationToken::new()).await;

    // Assert
    let backends: Vec<&str> = results.iter().map(|(b, _)| b.as_str()).collect();
    assert_eq!(backends, vec![USERS_BACKEND, WORKOUTS_BACKEND]);
    assert!(results.iter().all(|(_, r)| r.is_ok()));

    let display_name: String =
        sqlx::query_scalar("SELECT display_name FROM workout_user_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(display_name, "Grace");
    assert!(outbox.poll_unprocessed(10, 3).await.unwrap().is_empty());
}
