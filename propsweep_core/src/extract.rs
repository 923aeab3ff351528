//! Record extraction from simulator output.
//!
//! Two inputs are read back after every run:
//! - the captured stdout, where lines starting with `;` carry a payload field
//! - the JSON trace, an array of events whose `content` object may name a
//!   block (`block-id`) and carry `transmission-timestamp` / `timestamp`
//!
//! Every timestamp seen for a block is an observation; the spread between
//! the earliest and latest observation is the block's propagation time.

use crate::error::SweepError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Trace keys (fixed by the simulator's output format).
const CONTENT_KEY: &str = "content";
const ENTITY_KEY: &str = "block-id";
const TIMESTAMP_KEYS: [&str; 2] = ["transmission-timestamp", "timestamp"];

/// Propagation timing of one block in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationRecord {
    /// Block identifier as it appears in the trace
    pub entity: String,

    /// Earliest observed timestamp
    pub min: f64,

    /// Latest observed timestamp
    pub max: f64,

    /// `max - min`
    pub latency: f64,
}

impl PropagationRecord {
    /// Reduces a non-empty observation list to a record.
    fn from_observations(entity: String, observations: &[f64]) -> Option<Self> {
        let min = observations.iter().copied().reduce(f64::min)?;
        let max = observations.iter().copied().reduce(f64::max)?;
        Some(Self {
            entity,
            min,
            max,
            latency: max - min,
        })
    }
}

/// Projects the payload field out of every `;`-prefixed log line.
///
/// `;1200;block` yields `1200`; lines without the prefix are dropped.
pub fn filter_markers(log: &str) -> Vec<String> {
    log.lines()
        .filter(|line| line.starts_with(';'))
        .filter_map(|line| line.split(';').nth(1))
        .map(str::to_string)
        .collect()
}

/// Reads a trace file and extracts its propagation records.
pub fn extract(trace_path: &Path) -> Result<Vec<PropagationRecord>, SweepError> {
    let text = fs::read_to_string(trace_path)
        .map_err(|e| SweepError::trace(format!("{}: {}", trace_path.display(), e)))?;
    extract_from_str(&text)
        .map_err(|e| match e {
            SweepError::TraceError(msg) => SweepError::trace(format!("{}: {}", trace_path.display(), msg)),
            other => other,
        })
}

/// Extracts propagation records from trace text.
///
/// Records come out in order of each block's first appearance. A block
/// with a single observation is kept with latency 0.
pub fn extract_from_str(text: &str) -> Result<Vec<PropagationRecord>, SweepError> {
    let json: Value = serde_json::from_str(text).map_err(|e| SweepError::trace(e.to_string()))?;
    let entries = json
        .as_array()
        .ok_or_else(|| SweepError::trace("trace is not a JSON array"))?;

    let mut order: Vec<(String, Vec<f64>)> = Vec::new();
    // Keyed by (is string, text): id 7 and id "7" are different blocks.
    let mut index: HashMap<(bool, String), usize> = HashMap::new();

    for entry in entries {
        let Some(content) = entry.get(CONTENT_KEY).and_then(Value::as_object) else {
            continue;
        };
        let key = match content.get(ENTITY_KEY) {
            None | Some(Value::Null) => continue,
            Some(Value::String(id)) => (true, id.clone()),
            Some(other) => (false, other.to_string()),
        };

        let slot = *index.entry(key).or_insert_with_key(|(_, entity)| {
            order.push((entity.clone(), Vec::new()));
            order.len() - 1
        });
        let observations = &mut order[slot].1;
        for key in TIMESTAMP_KEYS {
            if let Some(ts) = content.get(key).and_then(Value::as_f64) {
                observations.push(ts);
            }
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|(entity, observations)| PropagationRecord::from_observations(entity, &observations))
        .collect())
}
