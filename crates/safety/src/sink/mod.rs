//! Listener sinks that persist delivered safety data snapshots.
//!
//! One row schema, [`SnapshotRow`], written by:
//! - **NDJSON stream**: newline-delimited JSON to any `Write` impl

pub mod json_stream;

use crate::data::{SafetyCenterData, SeverityLevel};
use serde::Serialize;

/// One row per delivered snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotRow<'a> {
    pub listener: &'a str,
    /// Sequence number of this row for the listener, starting at 0.
    pub seq: usize,
    pub highest_severity: SeverityLevel,
    pub data: &'a SafetyCenterData,
}
