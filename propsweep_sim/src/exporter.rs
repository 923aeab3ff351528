//! JSON exporter for run artifacts.
//!
//! Writes the files a sweep leaves next to the simulator output:
//! - `status.json` per repetition
//! - `propagation.json` per successful repetition
//! - `summary.json` per configuration

use propsweep_core::{ConfigurationAggregate, PropagationRecord, ReportRow, RunStatisticSet};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-repetition status file name.
pub const STATUS_FILE: &str = "status.json";

/// Per-repetition propagation file name.
pub const PROPAGATION_FILE: &str = "propagation.json";

/// Per-repetition filtered marker lines.
pub const MARKERS_FILE: &str = "markers.txt";

/// Per-configuration summary file name.
pub const SUMMARY_FILE: &str = "summary.json";

/// Final state of one repetition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RepetitionStatus {
    /// Records were extracted and summarized
    Succeeded {
        records: usize,
        stats: RunStatisticSet,
    },
    
    /// Repetition was dropped from aggregation
    Failed {
        reason: String,
    },
}

impl RepetitionStatus {
    /// Returns the run statistics of a successful repetition.
    pub fn stats(&self) -> Option<&RunStatisticSet> {
        match self {
            RepetitionStatus::Succeeded { stats, .. } => Some(stats),
            RepetitionStatus::Failed { .. } => None,
        }
    }
}

/// Contents of `propagation.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagationExport {
    /// Configuration label
    pub label: String,
    
    /// 1-based repetition index
    pub repetition: usize,
    
    /// Number of marker lines found in the log
    pub marker_lines: usize,
    
    /// Run statistics
    pub stats: RunStatisticSet,
    
    /// Every extracted record
    pub records: Vec<PropagationRecord>,
}

/// One repetition's line in `summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepetitionEntry {
    pub repetition: usize,
    #[serde(flatten)]
    pub status: RepetitionStatus,
}

/// Contents of `summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationSummary {
    /// Configuration label
    pub label: String,
    
    /// Every repetition in index order
    pub repetitions: Vec<RepetitionEntry>,
    
    /// Configuration aggregate (absent when every repetition failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<ConfigurationAggregate>,
}

/// A tuple that produced no report row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedTuple {
    pub label: String,
    pub reason: String,
}

/// Machine-readable sweep summary (`--json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSummary {
    pub run_dir: String,
    pub report: String,
    pub sheet: String,
    pub rows: Vec<ReportRow>,
    pub failed_repetitions: usize,
    pub skipped: Vec<SkippedTuple>,
}

/// Writes `value` as pretty JSON.
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, json).await
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_status_json_shape() {
        let failed = RepetitionStatus::Failed { reason: "exit 1".into() };
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json, serde_json::json!({"state": "failed", "reason": "exit 1"}));
        
        let entry = RepetitionEntry { repetition: 3, status: failed };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["repetition"], 3);
        assert_eq!(json["state"], "failed");
    }
    
    #[tokio::test]
    async fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STATUS_FILE);
        let status = RepetitionStatus::Succeeded {
            records: 2,
            stats: RunStatisticSet { min: 1.0, max: 2.0, mean: 1.5, median: 1.5 },
        };
        
        write_json(&path, &status).await.unwrap();
        
        let back: RepetitionStatus = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, status);
        assert_eq!(back.stats().unwrap().median, 1.5);
    }
}
