//! Route gateway: merges every endpoint subrouter and attaches shared state.

use axum::Router;

use crate::worker::WorkerHandle;
use crate::Config;

mod feed;
mod health;

// ---

pub fn router(worker: WorkerHandle, config: Config) -> Router {
    // ---
    Router::new()
        .merge(feed::router())
        .merge(health::router())
        .with_state((worker, config))
}
