//! Per-reading alert pipeline: estimate, evaluate, look up, dispatch.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::directory::RecipientDirectory;
use crate::dispatcher::Dispatcher;
use crate::{alert, risk, thresholds, DeliveryOutcome, RecipientAddress, SensorReading};

/// What happened to one reading.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// Every metric in range. Nothing was looked up or sent.
    NoAlert,
    /// Alert-worthy, but the directory had no usable tokens.
    NoRecipients,
    Dispatched(DeliveryOutcome),
}

/// Holds the collaborator handles shared by all runs. Runs keep no state here.
pub struct Pipeline {
    directory: Arc<dyn RecipientDirectory>,
    dispatcher: Dispatcher,
}

impl Pipeline {
    // ---
    pub fn new(directory: Arc<dyn RecipientDirectory>, dispatcher: Dispatcher) -> Self {
        Self {
            directory,
            dispatcher,
        }
    }

    /// Run one reading through the pipeline.
    ///
    /// Only a failed directory lookup is returned as an error; delivery failures
    /// are reported inside the `DeliveryOutcome`.
    pub async fn process(&self, reading: &SensorReading) -> Result<PipelineOutcome> {
        // ---
        let score = risk::estimate(reading);
        let violations = thresholds::evaluate(reading, score);

        let Some(payload) = alert::build_payload(reading, score, &violations) else {
            debug!(site = %reading.site_id, risk = score, "Values within range, no alert");
            return Ok(PipelineOutcome::NoAlert);
        };

        info!(
            site = %reading.site_id,
            risk = score,
            violations = violations.len(),
            "Alert raised: {}",
            payload.body
        );

        let addresses: Vec<RecipientAddress> = self
            .directory
            .recipients()
            .await
            .context("Failed to load recipients")?;

        if addresses.is_empty() {
            info!(site = %reading.site_id, "No registered recipients, alert not sent");
            return Ok(PipelineOutcome::NoRecipients);
        }

        let outcome = self.dispatcher.dispatch(&addresses, &payload).await;
        Ok(PipelineOutcome::Dispatched(outcome))
    }
}
