//! Scripted simulator implementing Simulator for dry runs and tests.

use async_trait::async_trait;
use propsweep_env::{EnvError, ExitReport, RunWorkspace, Simulator};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const TRACE: &str = "simulator/output/output.json";

/// Interval between two generated blocks (ms of simulated time).
const BLOCK_INTERVAL_MS: u64 = 600_000;

/// Failure injected by a [`ScriptedSimulator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedFailure {
    /// Every repetition succeeds
    None,

    /// Every repetition exits with this code
    ExitCode(i32),

    /// Every repetition exits 0 without writing a trace
    MissingTrace,

    /// Repetitions whose index is a multiple of n exit 1
    EveryNth(usize),

    /// Every repetition writes a trace with no block events
    EmptyTrace,

    /// Every repetition exits 0 without writing its stdout log
    MissingLog,
}

/// Simulator backed by a seeded RNG.
///
/// Emits a plausible log and trace without running anything external:
/// - the rendered configuration is read back for the node count
/// - each block gets a creation event and one arrival per reached node
/// - output is a pure function of (seed, label, repetition)
#[derive(Debug, Clone)]
pub struct ScriptedSimulator {
    /// Master seed
    seed: u64,

    /// Blocks per run
    blocks: usize,

    /// Injected failure
    failure: ScriptedFailure,
}

impl ScriptedSimulator {
    /// Creates a scripted simulator with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            blocks: 10,
            failure: ScriptedFailure::None,
        }
    }

    /// Sets the number of blocks per run.
    pub fn with_blocks(mut self, blocks: usize) -> Self {
        self.blocks = blocks;
        self
    }

    /// Sets the injected failure.
    pub fn with_failure(mut self, failure: ScriptedFailure) -> Self {
        self.failure = failure;
        self
    }

    fn run_seed(&self, workspace: &RunWorkspace) -> u64 {
        // FNV-1a keeps the label hash stable across builds.
        let label_hash = workspace
            .label()
            .bytes()
            .fold(0xcbf29ce484222325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100000001b3));
        self.seed
            .wrapping_mul(0x9e3779b97f4a7c15)
            ^ label_hash
            ^ (workspace.repetition() as u64).wrapping_mul(0x517cc1b727220a95)
    }

    /// Generates the (log, trace) pair for one run.
    pub fn generate(&self, workspace: &RunWorkspace, nodes: u32) -> (String, Value) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.run_seed(workspace));
        let mut log = String::from("Simulation started\n");
        let mut events = Vec::new();

        for node in 0..nodes.min(5) {
            events.push(json!({"kind": "add-node", "content": {"node-id": node, "region-id": node % 6}}));
        }

        let reached = nodes.clamp(1, 50);
        for block in 0..self.blocks {
            let created = block as u64 * BLOCK_INTERVAL_MS + rng.gen_range(0..1_000);
            events.push(json!({
                "kind": "add-block",
                "content": {"block-id": block, "timestamp": created}
            }));

            let mut last = created;
            for _ in 1..reached {
                let arrival = created + rng.gen_range(80..4_000);
                last = last.max(arrival);
                events.push(json!({
                    "kind": "flow-block",
                    "content": {"block-id": block, "transmission-timestamp": arrival}
                }));
            }
            log.push_str(&format!(";{};{}\n", last - created, block));
        }

        log.push_str("Simulation finished\n");
        (log, Value::Array(events))
    }
}

/// Reads `NUM_OF_NODES` back out of a rendered configuration.
fn configured_nodes(source: &str) -> Option<u32> {
    source
        .lines()
        .find(|line| line.contains("NUM_OF_NODES"))
        .and_then(|line| line.split('=').nth(1))
        .and_then(|value| value.trim().trim_end_matches(';').trim().parse().ok())
}

#[async_trait]
impl Simulator for ScriptedSimulator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stage(&self, workspace: &RunWorkspace) -> Result<(), EnvError> {
        tokio::fs::create_dir_all(workspace.join("simulator/output")).await?;
        Ok(())
    }

    async fn invoke(&self, workspace: &RunWorkspace, config_path: &Path) -> Result<ExitReport, EnvError> {
        let start = Instant::now();
        let source = tokio::fs::read_to_string(config_path).await?;
        let nodes = configured_nodes(&source).unwrap_or(50);

        let exit_code = match self.failure {
            ScriptedFailure::ExitCode(code) => code,
            ScriptedFailure::EveryNth(n) if n > 0 && workspace.repetition() % n == 0 => 1,
            _ => 0,
        };

        let (log, trace) = match self.failure {
            ScriptedFailure::EmptyTrace => (String::from("Simulation finished\n"), Value::Array(Vec::new())),
            _ => self.generate(workspace, nodes),
        };
        if self.failure != ScriptedFailure::MissingLog {
            tokio::fs::write(workspace.log_path(), log).await?;
        }

        if exit_code == 0 && self.failure != ScriptedFailure::MissingTrace {
            tokio::fs::write(self.trace_path(workspace), trace.to_string()).await?;
        }

        Ok(ExitReport::new(Some(exit_code), start.elapsed().max(Duration::from_micros(1))))
    }

    fn trace_path(&self, workspace: &RunWorkspace) -> PathBuf {
        workspace.join(TRACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propsweep_core::{extract_from_str, filter_markers};
    use proptest::prelude::*;

    #[test]
    fn test_configured_nodes() {
        let source = "public class X {\n    public static final int NUM_OF_NODES = 500;\n}\n";
        assert_eq!(configured_nodes(source), Some(500));
        assert_eq!(configured_nodes("nothing here"), None);
    }

    #[test]
    fn test_generated_trace_is_extractable() {
        let sim = ScriptedSimulator::new(42).with_blocks(4);
        let ws = RunWorkspace::new("/unused", "n500_vs4_2root", 1);

        let (log, trace) = sim.generate(&ws, 500);
        let records = extract_from_str(&trace.to_string()).unwrap();

        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.latency > 0.0));
        assert_eq!(filter_markers(&log).len(), 4);
    }

    #[test]
    fn test_repetitions_differ() {
        let sim = ScriptedSimulator::new(42);
        let first = sim.generate(&RunWorkspace::new("/a", "n500_vs4_2root", 1), 100).1;
        let second = sim.generate(&RunWorkspace::new("/a", "n500_vs4_2root", 2), 100).1;
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_missing_trace_failure() {
        let dir = tempfile::tempdir().unwrap();
        let ws = RunWorkspace::new(dir.path(), "n500_vs4_2root", 1);
        let config = ws.join("cfg.java");
        std::fs::write(&config, "NUM_OF_NODES = 10;").unwrap();
        let sim = ScriptedSimulator::new(1).with_failure(ScriptedFailure::MissingTrace);

        sim.stage(&ws).await.unwrap();
        let exit = sim.invoke(&ws, &config).await.unwrap();

        assert!(exit.success);
        assert!(!sim.trace_path(&ws).exists());
        assert!(ws.log_path().exists());
    }

    #[tokio::test]
    async fn test_every_nth_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("cfg.java");
        std::fs::write(&config, "NUM_OF_NODES = 10;").unwrap();
        let sim = ScriptedSimulator::new(1).with_failure(ScriptedFailure::EveryNth(2));

        for (repetition, expect_success) in [(1, true), (2, false), (3, true)] {
            let ws = RunWorkspace::new(dir.path().join(repetition.to_string()), "label", repetition);
            std::fs::create_dir_all(ws.path()).unwrap();
            sim.stage(&ws).await.unwrap();
            let exit = sim.invoke(&ws, &config).await.unwrap();
            assert_eq!(exit.success, expect_success);
        }
    }

    proptest! {
        #[test]
        fn prop_same_seed_same_trace(seed in any::<u64>(), repetition in 1usize..100) {
            let ws = RunWorkspace::new("/w", "n500_vs6_3root", repetition);
            let a = ScriptedSimulator::new(seed).with_blocks(3).generate(&ws, 20);
            let b = ScriptedSimulator::new(seed).with_blocks(3).generate(&ws, 20);
            prop_assert_eq!(a, b);
        }
    }
}
