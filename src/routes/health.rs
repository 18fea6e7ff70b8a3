// src/routes/health.rs
//! Liveness endpoints for the alert listener.
//!
//! - `GET /` answers with a constant plain-text body
//! - `GET /health` answers with a small JSON status object
//!
//! Neither touches the worker or any collaborator.

use axum::{routing::get, Json, Router};
use serde::Serialize;

pub const LIVENESS_BODY: &str = "Listener is running";

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn liveness() -> &'static str {
    LIVENESS_BODY
}

/// Handle `GET /health`.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Create a subrouter containing the liveness routes.
///
/// Generic over the application state so it merges cleanly with the gateway
/// router whatever the state type is.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(liveness))
        .route("/health", get(health))
}
