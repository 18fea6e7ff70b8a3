//! Data models for the alert pipeline.
//!
//! `RawSensorReading` is the wire shape delivered by the change feed; every
//! field may be missing. `to_reading()` turns it into the immutable
//! `SensorReading` the evaluators work on.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Site id used when a document carries none.
pub const UNKNOWN_SITE: &str = "unknown-site";

// ---

/// Metric values as they arrive from the feed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSensorValues {
    // ---
    pub ph: Option<f64>,
    pub temperature: Option<f64>,
    pub dissolved_oxygen: Option<f64>,
    pub dissolved_solids: Option<f64>,
    pub turbidity: Option<f64>,
}

/// Raw sensor document from the change feed
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSensorReading {
    // ---
    pub site_id: Option<String>,
    pub sensor_values: Option<RawSensorValues>,
    pub observed_at: Option<DateTime<Utc>>,
}

/// A single reading from one pond or tank.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    // ---
    pub site_id: String,
    pub ph: f64,
    /// °C
    pub temperature: f64,
    /// mg/L
    pub dissolved_oxygen: f64,
    /// ppm
    pub dissolved_solids: f64,
    /// NTU
    pub turbidity: f64,
    pub observed_at: Option<DateTime<Utc>>,
}

impl RawSensorReading {
    // ---
    /// Missing metrics read as `0.0`, so an empty document still gets evaluated.
    pub fn to_reading(&self) -> SensorReading {
        // ---
        let values = self.sensor_values.clone().unwrap_or_default();
        let site_id = self
            .site_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_SITE)
            .to_string();

        SensorReading {
            site_id,
            ph: values.ph.unwrap_or(0.0),
            temperature: values.temperature.unwrap_or(0.0),
            dissolved_oxygen: values.dissolved_oxygen.unwrap_or(0.0),
            dissolved_solids: values.dissolved_solids.unwrap_or(0.0),
            turbidity: values.turbidity.unwrap_or(0.0),
            observed_at: self.observed_at,
        }
    }
}

// ---

/// Notification sent to every recipient of an alert.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertPayload {
    // ---
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

/// Opaque push token for one recipient. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecipientAddress(String);

impl RecipientAddress {
    // ---
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(Self(token.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecipientAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---

/// Terminal state of one batch within a dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Succeeded,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    // ---
    pub index: usize,
    pub size: usize,
    pub attempts: u32,
    pub status: BatchStatus,
    pub succeeded: usize,
    pub failed: usize,
}

/// Result of one `dispatch` call. Observability only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryOutcome {
    // ---
    pub succeeded: usize,
    pub failed: usize,
    pub batches: Vec<BatchReport>,
}

impl DeliveryOutcome {
    // ---
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn record(&mut self, report: BatchReport) {
        self.succeeded += report.succeeded;
        self.failed += report.failed;
        self.batches.push(report);
    }

    pub fn exhausted_batches(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| b.status == BatchStatus::Exhausted)
            .count()
    }

    /// True when at least one batch ran and none of them got through.
    pub fn is_total_failure(&self) -> bool {
        !self.batches.is_empty() && self.exhausted_batches() == self.batches.len()
    }
}
