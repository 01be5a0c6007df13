//! Integration tests for `PgInboxStore`.

use chrono::{DateTime, Duration, DurationRound, Utc};
use fitness_core::inbox::{InboxStatus, InboxStore};
use fitness_store::pg_inbox_store::PgInboxStore;
use sqlx::PgPool;
use uuid::Uuid;

const CONSUMER: &str = "workouts.user_profiles";

fn now() -> DateTime<Utc> {
    Utc::now().duration_trunc(Duration::seconds(1)).unwrap()
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_find_returns_none_for_unknown_event(pool: PgPool) {
    let store = PgInboxStore::new(pool);

    let row = store.find(CONSUMER, Uuid::new_v4()).await.unwrap();

    assert!(row.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_try_begin_inserts_processing_row(pool: PgPool) {
    let store = PgInboxStore::new(pool);
    let event_id = Uuid::new_v4();
    let at = now();

    let inserted = store
        .try_begin(CONSUMER, event_id, "users.profile_updated", at)
        .await
        .unwrap();

    assert!(inserted);
    let row = store.find(CONSUMER, event_id).await.unwrap().unwrap();
    assert_eq!(row.status, InboxStatus::Processing);
    assert_eq!(row.event_type, "users.profile_updated");
    assert_eq!(row.created_at, at);
    assert_eq!(row.claimed_at, at);
    assert!(row.processed_at.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_second_begin_for_same_consumer_and_event_is_rejected(pool: PgPool) {
    let store = PgInboxStore::new(pool);
    let event_id = Uuid::new_v4();

    assert!(store.try_begin(CONSUMER, event_id, "t", now()).await.unwrap());
    assert!(!store.try_begin(CONSUMER, event_id, "t", now()).await.unwrap());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_other_consumer_gets_its_own_row(pool: PgPool) {
    let store = PgInboxStore::new(pool);
    let event_id = Uuid::new_v4();

    assert!(store.try_begin(CONSUMER, event_id, "t", now()).await.unwrap());
    assert!(store.try_begin("routines.owner_names", event_id, "t", now()).await.unwrap());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_complete_and_fail_finalize_the_row(pool: PgPool) {
    let store = PgInboxStore::new(pool);
    let done = Uuid::new_v4();
    let broken = Uuid::new_v4();
    store.try_begin(CONSUMER, done, "t", now()).await.unwrap();
    store.try_begin(CONSUMER, broken, "t", now()).await.unwrap();

    store.complete(CONSUMER, done, now()).await.unwrap();
    store.fail(CONSUMER, broken, "timeout", now()).await.unwrap();

    let done_row = store.find(CONSUMER, done).await.unwrap().unwrap();
    assert_eq!(done_row.status, InboxStatus::Completed);
    assert!(done_row.processed_at.is_some());
    let broken_row = store.find(CONSUMER, broken).await.unwrap().unwrap();
    assert_eq!(broken_row.status, InboxStatus::Failed);
    assert_eq!(broken_row.error.as_deref(), Some("timeout"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_complete_without_row_is_not_found(pool: PgPool) {
    let store = PgInboxStore::new(pool);

    let result = store.complete(CONSUMER, Uuid::new_v4(), now()).await;

    assert!(result.is_err());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_reclaim_rules(pool: PgPool) {
    let store = PgInboxStore::new(pool);
    let t0 = now();
    let failed = Uuid::new_v4();
    let fresh = Uuid::new_v4();
    let stale = Uuid::new_v4();
    let completed = Uuid::new_v4();
    for id in [failed, fresh, stale, completed] {
        store.try_begin(CONSUMER, id, "t", t0).await.unwrap();
    }
    store.fail(CONSUMER, failed, "boom", t0).await.unwrap();
    store.complete(CONSUMER, completed, t0).await.unwrap();
    let later = t0 + Duration::minutes(10);

    // A failed row is always reclaimable.
    assert!(store.reclaim(CONSUMER, failed, t0, later).await.unwrap());
    // A processing row claimed at t0 is not stale relative to t0.
    assert!(!store.reclaim(CONSUMER, fresh, t0, later).await.unwrap());
    // ...but is once the cutoff passes its claim time.
    assert!(
        store
            .reclaim(CONSUMER, stale, t0 + Duration::seconds(1), later)
            .await
            .unwrap()
    );
    // Completed rows are never reclaimed.
    assert!(!store.reclaim(CONSUMER, completed, later, later).await.unwrap());

    let reclaimed = store.find(CONSUMER, stale).await.unwrap().unwrap();
    assert_eq!(reclaimed.status, InboxStatus::Processing);
    assert_eq!(reclaimed.claimed_at, later);
    assert_eq!(reclaimed.created_at, t0);
}
