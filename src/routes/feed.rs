//! Change-feed delivery endpoint.
//!
//! `POST /feed` takes one batch of document changes, picks the readings to
//! evaluate according to `FEED_MODE` and hands each to the alert worker. The
//! response only confirms queueing; evaluation and dispatch happen afterwards.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::feed::{self, FeedBatch};
use crate::worker::WorkerHandle;
use crate::Config;

// ---

#[derive(Debug, Serialize)]
struct Accepted {
    accepted: usize,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub fn router() -> Router<(WorkerHandle, Config)> {
    // ---
    Router::new().route("/feed", post(handler))
}

async fn handler(
    State((worker, config)): State<(WorkerHandle, Config)>,
    Json(batch): Json<FeedBatch>,
) -> impl IntoResponse {
    // ---
    debug!(changes = batch.changes.len(), "POST /feed");

    let readings = feed::select_readings(&batch, config.feed_mode);
    let accepted = readings.len();

    for reading in readings {
        if let Err(e) = worker.submit(reading).await {
            error!("Failed to queue reading: {}", e);
            let body = ErrorBody {
                error: e.to_string(),
            };
            return (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response();
        }
    }

    info!(accepted, mode = ?config.feed_mode, "Readings queued");
    (StatusCode::ACCEPTED, Json(Accepted { accepted })).into_response()
}
