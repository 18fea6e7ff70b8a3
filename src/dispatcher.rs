//! Notification dispatch: batching plus per-batch retry.
//!
//! Addresses are split into fixed-size batches and sent in input order. Each
//! batch gets its own retry budget. A batch whose every attempt fails is
//! recorded as `Exhausted` and dispatch moves on; nothing is raised to the
//! caller. A call that returns a report counts as a success even when some
//! addresses in it failed.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::retry::RetryPolicy;
use crate::transport::PushTransport;
use crate::{AlertPayload, BatchReport, BatchStatus, DeliveryOutcome, RecipientAddress};

/// Largest multicast the push gateway accepts per call.
pub const DEFAULT_BATCH_SIZE: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    // ---
    pub batch_size: usize,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub retry_jitter: Duration,
    pub call_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_attempts: 3,
            retry_delay: Duration::from_secs(3),
            retry_jitter: Duration::ZERO,
            call_timeout: Duration::from_secs(10),
        }
    }
}

impl DispatchConfig {
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: self.retry_delay,
            jitter: self.retry_jitter,
            attempt_timeout: Some(self.call_timeout),
        }
    }
}

pub struct Dispatcher {
    transport: Arc<dyn PushTransport>,
    batch_size: usize,
    retry: RetryPolicy,
}

impl Dispatcher {
    // ---
    pub fn new(transport: Arc<dyn PushTransport>, config: DispatchConfig) -> Self {
        Self {
            transport,
            batch_size: config.batch_size.max(1),
            retry: config.retry_policy(),
        }
    }

    /// Deliver `payload` to every address.
    pub async fn dispatch(
        &self,
        addresses: &[RecipientAddress],
        payload: &AlertPayload,
    ) -> DeliveryOutcome {
        // ---
        let mut outcome = DeliveryOutcome::empty();
        if addresses.is_empty() {
            debug!("No addresses, skipping dispatch");
            return outcome;
        }

        for (index, batch) in addresses.chunks(self.batch_size).enumerate() {
            outcome.record(self.send_batch(index, batch, payload).await);
        }

        if outcome.is_total_failure() {
            error!(
                batches = outcome.batches.len(),
                recipients = addresses.len(),
                "Every batch exhausted its retries; alert not delivered"
            );
        } else {
            info!(
                succeeded = outcome.succeeded,
                failed = outcome.failed,
                batches = outcome.batches.len(),
                exhausted = outcome.exhausted_batches(),
                "Notifications sent: {}/{}",
                outcome.succeeded,
                addresses.len()
            );
        }

        outcome
    }

    async fn send_batch(
        &self,
        index: usize,
        batch: &[RecipientAddress],
        payload: &AlertPayload,
    ) -> BatchReport {
        // ---
        let size = batch.len();
        let result = self
            .retry
            .run(|attempt| {
                debug!(batch = index, size, attempt, "Sending batch");
                self.transport.send(batch, payload)
            })
            .await;

        match result {
            Ok(done) => {
                let succeeded = done.value.success_count.min(size);
                BatchReport {
                    index,
                    size,
                    attempts: done.attempts,
                    status: BatchStatus::Succeeded,
                    succeeded,
                    failed: size - succeeded,
                }
            }
            Err(exhausted) => {
                warn!(
                    batch = index,
                    size,
                    attempts = exhausted.attempts,
                    error = %exhausted.last_error,
                    "Batch exhausted"
                );
                BatchReport {
                    index,
                    size,
                    attempts: exhausted.attempts,
                    status: BatchStatus::Exhausted,
                    succeeded: 0,
                    failed: size,
                }
            }
        }
    }
}
