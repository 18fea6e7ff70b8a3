//! Threshold rules that decide whether a reading raises an alert.
//!
//! Rules run in a fixed order (oxygen, pH, temperature, dissolved solids,
//! turbidity, risk score) and the order carries through to the notification
//! body. Every bound is exclusive: a value sitting exactly on a bound is safe.

use std::fmt;

use crate::SensorReading;

pub const OXYGEN_RANGE: (f64, f64) = (5.0, 8.0);
pub const PH_RANGE: (f64, f64) = (6.5, 7.5);
pub const TEMPERATURE_RANGE: (f64, f64) = (20.0, 25.0);
pub const SOLIDS_MAX: f64 = 400.0;
pub const TURBIDITY_MAX: f64 = 400.0;
pub const RISK_MAX: f64 = 0.02;

/// Which rule produced a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Oxygen,
    Ph,
    Temperature,
    DissolvedSolids,
    Turbidity,
    RiskScore,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    // ---
    pub rule: Rule,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

fn outside((low, high): (f64, f64), value: f64) -> bool {
    value < low || value > high
}

// ---

/// Evaluate every rule against `reading` and its risk score.
///
/// An empty result means no alert.
pub fn evaluate(reading: &SensorReading, risk: f64) -> Vec<Violation> {
    // ---
    let mut violations = Vec::new();
    let mut push = |rule, message: String| violations.push(Violation { rule, message });

    if outside(OXYGEN_RANGE, reading.dissolved_oxygen) {
        push(
            Rule::Oxygen,
            format!("Oxygen out of range: {} mg/L", reading.dissolved_oxygen),
        );
    }
    if outside(PH_RANGE, reading.ph) {
        push(Rule::Ph, format!("pH out of range: {}", reading.ph));
    }
    if outside(TEMPERATURE_RANGE, reading.temperature) {
        push(
            Rule::Temperature,
            format!("Temperature out of range: {} °C", reading.temperature),
        );
    }
    if reading.dissolved_solids > SOLIDS_MAX {
        push(
            Rule::DissolvedSolids,
            format!("Dissolved solids too high: {} ppm", reading.dissolved_solids),
        );
    }
    if reading.turbidity > TURBIDITY_MAX {
        push(
            Rule::Turbidity,
            format!("Turbidity too high: {} NTU", reading.turbidity),
        );
    }
    if risk > RISK_MAX {
        push(Rule::RiskScore, format!("Elevated risk score: {risk:.3}"));
    }

    violations
}
