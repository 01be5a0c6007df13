//! Integration tests for `PgOutboxStore`.

use chrono::{DateTime, Duration, DurationRound, Utc};
use fitness_core::outbox::{MAX_ERROR_LEN, NewOutboxRecord, OutboxAppend, OutboxStore};
use fitness_store::pg_outbox_store::PgOutboxStore;
use sqlx::PgPool;
use uuid::Uuid;

/// Postgres keeps microseconds; truncate so round-trips compare equal.
fn now() -> DateTime<Utc> {
    Utc::now().duration_trunc(Duration::seconds(1)).unwrap()
}

/// Helper to build a `NewOutboxRecord` with sensible defaults.
fn make_record(created_at: DateTime<Utc>) -> NewOutboxRecord {
    NewOutboxRecord {
        event_id: Uuid::new_v4(),
        event_type: "users.profile_updated".to_string(),
        payload: r#"{"user_id":"00000000-0000-0000-0000-000000000000"}"#.to_string(),
        created_at,
        correlation_id: Some("corr-1".to_string()),
        trace_id: None,
    }
}

async fn insert(store: &PgOutboxStore, pool: &PgPool, record: &NewOutboxRecord) -> i64 {
    let mut tx = pool.begin().await.unwrap();
    let id = store.append(&mut tx, record).await.unwrap();
    tx.commit().await.unwrap();
    id
}

// --- append ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_appended_record_is_visible_after_commit(pool: PgPool) {
    let store = PgOutboxStore::new(pool.clone());
    let record = make_record(now());

    let id = insert(&store, &pool, &record).await;

    let polled = store.poll_unprocessed(10, 3).await.unwrap();
    assert_eq!(polled.len(), 1);
    let stored = &polled[0];
    assert_eq!(stored.id, id);
    assert_eq!(stored.event_id, record.event_id);
    assert_eq!(stored.event_type, record.event_type);
    assert_eq!(stored.payload, record.payload);
    assert_eq!(stored.created_at, record.created_at);
    assert_eq!(stored.correlation_id.as_deref(), Some("corr-1"));
    assert!(!stored.is_processed);
    assert_eq!(stored.retry_count, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_rolled_back_append_leaves_no_record(pool: PgPool) {
    let store = PgOutboxStore::new(pool.clone());

    let mut tx = pool.begin().await.unwrap();
    store.append(&mut tx, &make_record(now())).await.unwrap();
    tx.rollback().await.unwrap();

    assert!(store.poll_unprocessed(10, 3).await.unwrap().is_empty());
}

// --- polling ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_poll_returns_oldest_first(pool: PgPool) {
    let store = PgOutboxStore::new(pool.clone());
    let t0 = now();
    let third = insert(&store, &pool, &make_record(t0 + Duration::seconds(3))).await;
    let first = insert(&store, &pool, &make_record(t0 + Duration::seconds(1))).await;
    let second = insert(&store, &pool, &make_record(t0 + Duration::seconds(2))).await;

    let polled = store.poll_unprocessed(3, 3).await.unwrap();

    let ids: Vec<i64> = polled.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![first, second, third]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_poll_respects_batch_size(pool: PgPool) {
    let store = PgOutboxStore::new(pool.clone());
    for _ in 0..3 {
        insert(&store, &pool, &make_record(now())).await;
    }

    let polled = store.poll_unprocessed(2, 3).await.unwrap();

    assert_eq!(polled.len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_poll_skips_records_at_max_retry_count(pool: PgPool) {
    let store = PgOutboxStore::new(pool.clone());
    let id = insert(&store, &pool, &make_record(now())).await;
    store.mark_failed(id, "boom", false, now()).await.unwrap();

    assert_eq!(store.poll_unprocessed(10, 2).await.unwrap().len(), 1);
    assert!(store.poll_unprocessed(10, 1).await.unwrap().is_empty());
}

// --- bookkeeping ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_mark_processed_removes_record_from_poll(pool: PgPool) {
    let store = PgOutboxStore::new(pool.clone());
    let id = insert(&store, &pool, &make_record(now())).await;

    store.mark_processed(id, now()).await.unwrap();

    assert!(store.poll_unprocessed(10, 3).await.unwrap().is_empty());
    assert!(store.list_poisoned(10).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_mark_failed_with_poison_retains_error(pool: PgPool) {
    let store = PgOutboxStore::new(pool.clone());
    let id = insert(&store, &pool, &make_record(now())).await;
    let at = now();

    store.mark_failed(id, "projection down", true, at).await.unwrap();

    assert!(store.poll_unprocessed(10, 3).await.unwrap().is_empty());
    let poisoned = store.list_poisoned(10).await.unwrap();
    assert_eq!(poisoned.len(), 1);
    assert_eq!(poisoned[0].id, id);
    assert_eq!(poisoned[0].retry_count, 1);
    assert_eq!(poisoned[0].processed_at, Some(at));
    assert_eq!(poisoned[0].last_error.as_deref(), Some("projection down"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_mark_failed_truncates_long_errors(pool: PgPool) {
    let store = PgOutboxStore::new(pool.clone());
    let id = insert(&store, &pool, &make_record(now())).await;

    store
        .mark_failed(id, &"e".repeat(MAX_ERROR_LEN * 2), false, now())
        .await
        .unwrap();

    let polled = store.poll_unprocessed(10, 3).await.unwrap();
    assert_eq!(
        polled[0].last_error.as_ref().unwrap().chars().count(),
        MAX_ERROR_LEN
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_processed_record_is_immutable(pool: PgPool) {
    let store = PgOutboxStore::new(pool.clone());
    let id = insert(&store, &pool, &make_record(now())).await;
    store.mark_failed(id, "first", true, now()).await.unwrap();

    store.mark_failed(id, "second", true, now()).await.unwrap();
    store.mark_processed(id, now()).await.unwrap();

    let poisoned = store.list_poisoned(10).await.unwrap();
    assert_eq!(poisoned[0].retry_count, 1);
    assert_eq!(poisoned[0].last_error.as_deref(), Some("first"));
}
