//! Liveness endpoint of the worker process.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

/// Liveness report, including the backends being drained.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: String,
    /// Crate version of the running binary.
    pub version: String,
    /// Backends the worker is draining.
    pub backends: Vec<String>,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backends: state.backends().into_iter().map(str::to_owned).collect(),
    })
}

/// Routes `/health`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
