//! Risk estimation from a single reading.
//!
//! Starts from a fixed baseline and adds one penalty per metric once it
//! leaves its dead band. Penalties are one-sided and independent; the sum is
//! clamped to `[0.0, 1.0]`.

use crate::SensorReading;

pub const BASELINE: f64 = 0.01;

const PH_LIMIT: f64 = 7.5;
const PH_WEIGHT: f64 = 0.005;

const TEMPERATURE_LIMIT: f64 = 25.0;
const TEMPERATURE_WEIGHT: f64 = 0.003;

const OXYGEN_LIMIT: f64 = 5.0;
const OXYGEN_WEIGHT: f64 = 0.005;

const SOLIDS_LIMIT: f64 = 300.0;
const SOLIDS_WEIGHT: f64 = 0.002;
/// Solids penalty is counted per 100 ppm.
const SOLIDS_SCALE: f64 = 100.0;

const TURBIDITY_LIMIT: f64 = 10.0;
const TURBIDITY_WEIGHT: f64 = 0.001;

// ---

/// Estimate the risk score of a reading. Pure and deterministic.
pub fn estimate(reading: &SensorReading) -> f64 {
    // ---
    let mut score = BASELINE;

    if reading.ph > PH_LIMIT {
        score += PH_WEIGHT * (reading.ph - PH_LIMIT);
    }
    if reading.temperature > TEMPERATURE_LIMIT {
        score += TEMPERATURE_WEIGHT * (reading.temperature - TEMPERATURE_LIMIT);
    }
    if reading.dissolved_oxygen < OXYGEN_LIMIT {
        score += OXYGEN_WEIGHT * (OXYGEN_LIMIT - reading.dissolved_oxygen);
    }
    if reading.dissolved_solids > SOLIDS_LIMIT {
        score += SOLIDS_WEIGHT * ((reading.dissolved_solids - SOLIDS_LIMIT) / SOLIDS_SCALE);
    }
    if reading.turbidity > TURBIDITY_LIMIT {
        score += TURBIDITY_WEIGHT * (reading.turbidity - TURBIDITY_LIMIT);
    }

    score.clamp(0.0, 1.0)
}
