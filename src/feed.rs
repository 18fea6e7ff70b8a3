//! Change-feed events and reading selection.
//!
//! The feed delivers batches of document changes. Only `added` documents are
//! evaluated; in `LatestOnly` mode a batch collapses to its most recent
//! reading by `observedAt`.

use std::str::FromStr;

use anyhow::{anyhow, Error};
use serde::Deserialize;

use crate::{RawSensorReading, SensorReading};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeEvent {
    // ---
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub doc: RawSensorReading,
}

/// One delivery from the change feed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedBatch {
    #[serde(default)]
    pub changes: Vec<ChangeEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedMode {
    #[default]
    All,
    LatestOnly,
}

impl FromStr for FeedMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(FeedMode::All),
            "latest" | "latest_only" => Ok(FeedMode::LatestOnly),
            other => Err(anyhow!("unknown feed mode '{}' (expected 'all' or 'latest')", other)),
        }
    }
}

// ---

/// Readings from `batch` that should go through the pipeline, in input order.
pub fn select_readings(batch: &FeedBatch, mode: FeedMode) -> Vec<SensorReading> {
    // ---
    let added = batch
        .changes
        .iter()
        .filter(|c| c.kind == ChangeKind::Added)
        .map(|c| c.doc.to_reading());

    match mode {
        FeedMode::All => added.collect(),
        // `max_by_key` keeps the last of equal keys, and `None` sorts first.
        FeedMode::LatestOnly => added.max_by_key(|r| r.observed_at).into_iter().collect(),
    }
}
