//! Propagation Statistics
//! ======================
//!
//! Two levels of reduction:
//! - **Run level**: [`summarize`] turns one repetition's propagation records
//!   into min / max / mean / median latency
//! - **Configuration level**: [`reduce`] combines the per-run summaries of
//!   one tuple as min of mins, max of maxes, mean of means and median of
//!   medians
//!
//! The configuration level deliberately works on summaries, not on pooled
//! latencies; published result tables are built this way and must stay
//! comparable.

use crate::error::SweepError;
use crate::extract::PropagationRecord;
use crate::params::ParameterTuple;
use serde::{Deserialize, Serialize};

/// Min / max / mean / median of a set of latencies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunStatisticSet {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl RunStatisticSet {
    /// Summarizes `values`, or returns None when there are none.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };

        Some(Self {
            min: sorted[0],
            max: sorted[n - 1],
            mean,
            median,
        })
    }
}

/// Configuration-level statistic for one tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationAggregate {
    /// Tuple the repetitions were run for
    pub tuple: ParameterTuple,

    /// Reduced statistics
    pub stats: RunStatisticSet,

    /// Repetitions that contributed
    pub successful: usize,

    /// Repetitions that were dropped
    pub failed: usize,
}

// =============================================================================
// RUN LEVEL
// =============================================================================

/// Summarizes the latencies of one repetition.
pub fn summarize(records: &[PropagationRecord]) -> Result<RunStatisticSet, SweepError> {
    let latencies: Vec<f64> = records.iter().map(|r| r.latency).collect();
    RunStatisticSet::from_values(&latencies)
        .ok_or_else(|| SweepError::EmptyResultError("no propagation records".to_string()))
}

// =============================================================================
// CONFIGURATION LEVEL
// =============================================================================

/// Reduces per-run summaries into the configuration aggregate.
///
/// `failed` is carried through for reporting only.
pub fn reduce(
    tuple: &ParameterTuple,
    sets: &[RunStatisticSet],
    failed: usize,
) -> Result<ConfigurationAggregate, SweepError> {
    if sets.is_empty() {
        return Err(SweepError::InsufficientDataError(tuple.label()));
    }

    let min = sets.iter().map(|s| s.min).fold(f64::INFINITY, f64::min);
    let max = sets.iter().map(|s| s.max).fold(f64::NEG_INFINITY, f64::max);
    let mean = sets.iter().map(|s| s.mean).sum::<f64>() / sets.len() as f64;

    let medians: Vec<f64> = sets.iter().map(|s| s.median).collect();
    let median = RunStatisticSet::from_values(&medians)
        .map(|s| s.median)
        .ok_or_else(|| SweepError::InsufficientDataError(tuple.label()))?;

    Ok(ConfigurationAggregate {
        tuple: *tuple,
        stats: RunStatisticSet { min, max, mean, median },
        successful: sets.len(),
        failed,
    })
}
