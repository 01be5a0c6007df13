//! HTTP routes of the worker process.

pub mod health;
pub mod outbox;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the full router served by the worker.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/api/v1/outbox", outbox::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
