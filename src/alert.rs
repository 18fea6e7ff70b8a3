//! Builds the push payload for an alert-worthy reading.

use std::collections::BTreeMap;

use crate::thresholds::Violation;
use crate::{AlertPayload, SensorReading};

const BODY_SEPARATOR: &str = " | ";

// ---

/// Returns `None` when there is nothing to report.
pub fn build_payload(
    reading: &SensorReading,
    risk: f64,
    violations: &[Violation],
) -> Option<AlertPayload> {
    // ---
    if violations.is_empty() {
        return None;
    }

    let body = violations
        .iter()
        .map(|v| v.message.as_str())
        .collect::<Vec<_>>()
        .join(BODY_SEPARATOR);

    let data = BTreeMap::from([
        ("siteId".to_string(), reading.site_id.clone()),
        ("ph".to_string(), reading.ph.to_string()),
        ("temperature".to_string(), reading.temperature.to_string()),
        (
            "dissolvedOxygen".to_string(),
            reading.dissolved_oxygen.to_string(),
        ),
        (
            "dissolvedSolids".to_string(),
            reading.dissolved_solids.to_string(),
        ),
        ("turbidity".to_string(), reading.turbidity.to_string()),
        ("riskScore".to_string(), format!("{risk:.3}")),
    ]);

    Some(AlertPayload {
        title: format!("⚠️ Alert at {}", reading.site_id),
        body,
        data,
    })
}
