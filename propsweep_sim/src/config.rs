//! Sweep configuration.
//!
//! Defaults reproduce the reference sweep (500 nodes, internal forward
//! 7/6/5/4, roots 2/3/4, both methods, 100 repetitions on 10 workers).
//! A JSON file may override any subset of fields; CLI flags are applied on
//! top by the binary.

use propsweep_core::{DegreeLimits, ParameterGrid, SweepError};
use propsweep_env::ProcessSimulator;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What to do when every repetition of a tuple fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsufficientPolicy {
    /// Stop the sweep; nothing is flushed
    #[default]
    Abort,

    /// Record the tuple as skipped and continue
    Skip,
}

/// How to stage and launch the external simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorSpec {
    /// Directory or .zip staged into each workspace
    pub distribution: Option<PathBuf>,

    /// Program path (relative paths resolve against the workspace)
    pub program: PathBuf,

    /// Arguments; `{config}` and `{workspace}` are substituted
    pub args: Vec<String>,

    /// Trace location relative to the workspace
    pub trace: PathBuf,
}

impl Default for SimulatorSpec {
    fn default() -> Self {
        Self {
            distribution: Some(PathBuf::from("simulator/build/distributions/simulator.zip")),
            program: PathBuf::from("simulator/bin/runSimBlock"),
            args: Vec::new(),
            trace: PathBuf::from("simulator/output/output.json"),
        }
    }
}

impl SimulatorSpec {
    /// Builds the process-backed simulator.
    pub fn build(&self, timeout: Option<Duration>) -> ProcessSimulator {
        let simulator = ProcessSimulator::new(&self.program)
            .with_args(self.args.clone())
            .with_trace(&self.trace)
            .with_timeout(timeout);
        match &self.distribution {
            Some(distribution) => simulator.with_distribution(distribution),
            None => simulator,
        }
    }
}

/// Configuration for a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Parameter space
    pub grid: ParameterGrid,

    /// Degree constants written into every configuration
    pub degrees: DegreeLimits,

    /// Repetitions per tuple
    pub loop_count: usize,

    /// Repetitions running at once
    pub concurrency: usize,

    /// Block size column of the report
    pub block_size: u32,

    /// Per-invocation limit in seconds (None = wait forever)
    pub timeout_secs: Option<u64>,

    /// Policy for tuples whose repetitions all fail
    pub on_insufficient: InsufficientPolicy,

    /// Root of the result tree
    pub output_root: PathBuf,

    /// External simulator
    pub simulator: SimulatorSpec,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            grid: ParameterGrid::default(),
            degrees: DegreeLimits::default(),
            loop_count: 100,
            concurrency: 10,
            block_size: 200,
            timeout_secs: None,
            on_insufficient: InsufficientPolicy::Abort,
            output_root: PathBuf::from("result"),
            simulator: SimulatorSpec::default(),
        }
    }
}

impl SweepConfig {
    /// Loads a configuration file; missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, SweepError> {
        let label = path.display().to_string();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SweepError::configuration(label.clone(), e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| SweepError::configuration(label, e.to_string()))
    }

    /// Rejects settings that cannot run.
    pub fn validate(&self) -> Result<(), SweepError> {
        if self.loop_count == 0 {
            return Err(SweepError::configuration("sweep", "loop_count must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(SweepError::configuration("sweep", "concurrency must be at least 1"));
        }
        if self.grid.is_empty() {
            return Err(SweepError::configuration("sweep", "parameter grid is empty"));
        }
        if let Some(label) = self.grid.duplicate_label() {
            return Err(SweepError::configuration(label, "parameter grid lists this tuple more than once"));
        }
        Ok(())
    }

    /// Per-invocation timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SweepConfig::default();
        assert_eq!(config.loop_count, 100);
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.block_size, 200);
        assert_eq!(config.on_insufficient, InsufficientPolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.json");
        std::fs::write(&path, r#"{
            "loop_count": 5,
            "on_insufficient": "skip",
            "grid": { "internal_forwards": [4], "root_counts": [2.0, 3.0] },
            "simulator": { "program": "bin/sim", "args": ["--config", "{config}"] }
        }"#).unwrap();

        let config = SweepConfig::load(&path).unwrap();

        assert_eq!(config.loop_count, 5);
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.on_insufficient, InsufficientPolicy::Skip);
        assert_eq!(config.grid.internal_forwards, vec![4]);
        assert_eq!(config.grid.populations, vec![500]);
        assert_eq!(config.simulator.program, PathBuf::from("bin/sim"));
        assert_eq!(config.simulator.trace, PathBuf::from("simulator/output/output.json"));
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.json");
        std::fs::write(&path, "{ loop_count: }").unwrap();

        assert!(matches!(SweepConfig::load(&path), Err(SweepError::ConfigurationError { .. })));
    }

    #[test]
    fn test_validate() {
        let config = SweepConfig { concurrency: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = SweepConfig { loop_count: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_repeated_tuples() {
        let mut config = SweepConfig::default();
        config.grid.root_counts = vec![2.0, 2.0];

        match config.validate() {
            Err(SweepError::ConfigurationError { label, .. }) => assert_eq!(label, "n500_vs7_2root"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_timeout() {
        let config = SweepConfig { timeout_secs: Some(90), ..Default::default() };
        assert_eq!(config.timeout(), Some(Duration::from_secs(90)));
        assert_eq!(SweepConfig::default().timeout(), None);
    }
}
