//! Shared test helpers for worker integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::TimeZone;
use fitness_core::clock::Clock;
use fitness_outbox::config::{InboxGuardConfig, ProcessorConfig};
use fitness_test_support::FixedClock;
use fitness_worker::composition::{self, Composition, Pools};
use fitness_worker::routes;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

/// Fixed timestamp used across all integration tests.
pub fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Composes the engine with both backends on the test database.
pub fn compose(pool: &PgPool) -> Composition {
    let pools = Pools {
        users: pool.clone(),
        workouts: pool.clone(),
    };
    composition::compose(
        &pools,
        fixed_clock(),
        &ProcessorConfig::default(),
        InboxGuardConfig::default(),
    )
    .unwrap()
}

/// Build the full app router. Uses the same route structure as `main.rs`.
pub fn build_test_app(pool: &PgPool) -> Router {
    routes::router(compose(pool).state)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
