//! `pondwatch`: water-quality alert evaluation and push dispatch.
//!
//! A reading flows `risk` → `thresholds` → `alert`, and only when it raised
//! violations does `pipeline` query the `directory` and hand the payload to the
//! `dispatcher`, which batches and retries over a `transport`. The `worker`
//! runs pipelines for readings the `feed` endpoint accepts.

pub mod alert;
pub mod config;
pub mod directory;
pub mod dispatcher;
pub mod feed;
pub mod models;
pub mod pipeline;
pub mod retry;
pub mod risk;
pub mod routes;
pub mod thresholds;
pub mod transport;
pub mod worker;

pub use config::Config;

// Re-exported so sibling modules depend on the crate root rather than on
// `models` directly.
pub use models::{
    AlertPayload, BatchReport, BatchStatus, DeliveryOutcome, RawSensorReading, RecipientAddress,
    SensorReading,
};
