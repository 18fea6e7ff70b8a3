//! Bounded worker that runs the pipeline for submitted readings.
//!
//! Readings go through a bounded channel; the worker loop runs at most
//! `concurrency` pipeline runs at once. Every run is tracked in a `JoinSet`
//! so its error or panic gets logged. When every `WorkerHandle` is dropped the
//! loop stops taking work, waits for in-flight runs and exits.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::pipeline::{Pipeline, PipelineOutcome};
use crate::SensorReading;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    // ---
    pub concurrency: usize,
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            queue_capacity: 256,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Alert worker has stopped")]
    Stopped,
}

/// Cloneable submission side of the worker queue.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<SensorReading>,
}

impl WorkerHandle {
    // ---
    /// Queue a reading, waiting for capacity if the queue is full.
    pub async fn submit(&self, reading: SensorReading) -> Result<(), SubmitError> {
        self.tx.send(reading).await.map_err(|_| SubmitError::Stopped)
    }
}

pub struct AlertWorker;

impl AlertWorker {
    // ---
    pub fn spawn(pipeline: Arc<Pipeline>, config: WorkerConfig) -> (WorkerHandle, JoinHandle<()>) {
        // ---
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let task = tokio::spawn(run(pipeline, rx, config.concurrency.max(1)));
        (WorkerHandle { tx }, task)
    }
}

async fn run(pipeline: Arc<Pipeline>, mut rx: mpsc::Receiver<SensorReading>, concurrency: usize) {
    // ---
    let permits = Arc::new(Semaphore::new(concurrency));
    let mut runs = JoinSet::new();

    info!(concurrency, "Alert worker started");

    loop {
        tokio::select! {
            Some(reading) = rx.recv() => {
                let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                    break;
                };
                let pipeline = Arc::clone(&pipeline);
                let span = info_span!(
                    "pipeline_run",
                    run_id = %Uuid::new_v4(),
                    site = %reading.site_id
                );
                runs.spawn(
                    async move {
                        let _permit = permit;
                        process_one(&pipeline, &reading).await;
                    }
                    .instrument(span),
                );
            }
            Some(joined) = runs.join_next(), if !runs.is_empty() => {
                log_join(joined);
            }
            else => break,
        }
    }

    while let Some(joined) = runs.join_next().await {
        log_join(joined);
    }

    info!("Alert worker stopped");
}

async fn process_one(pipeline: &Pipeline, reading: &SensorReading) {
    // ---
    match pipeline.process(reading).await {
        Ok(PipelineOutcome::Dispatched(outcome)) => {
            debug!(
                succeeded = outcome.succeeded,
                failed = outcome.failed,
                "Pipeline run finished"
            );
        }
        Ok(outcome) => debug!(?outcome, "Pipeline run finished"),
        Err(e) => {
            error!(error = ?e, "Pipeline run failed");
        }
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        warn!(error = %e, "Pipeline run aborted");
    }
}
