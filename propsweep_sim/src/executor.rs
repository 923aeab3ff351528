//! Repetition executor.
//!
//! One call runs one repetition in its own workspace: write the rendered
//! configuration, stage the simulator, invoke it, then read back the log
//! and trace from the same workspace handle.

use crate::exporter::{
    write_json, PropagationExport, RepetitionStatus, MARKERS_FILE, PROPAGATION_FILE, STATUS_FILE,
};
use propsweep_core::{extract, filter_markers, summarize, RunConfiguration, SweepError, CONFIG_FILE_NAME};
use propsweep_env::{EnvError, ExitReport, RunWorkspace, Simulator};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a finished simulator invocation left behind.
#[derive(Debug, Clone)]
pub struct RawRunOutput {
    /// Workspace the simulator ran in
    pub workspace: RunWorkspace,

    /// Payload fields of the `;` marker lines
    pub markers: Vec<String>,

    /// Location of the JSON trace (known to exist)
    pub trace_path: PathBuf,

    /// Exit status of the invocation
    pub exit: ExitReport,
}

/// Final result of one repetition.
#[derive(Debug, Clone)]
pub struct RepetitionOutcome {
    pub workspace: RunWorkspace,
    pub status: RepetitionStatus,
}

impl RepetitionOutcome {
    /// Outcome for a repetition whose task never reported back.
    pub fn lost(workspace: RunWorkspace, reason: impl Into<String>) -> Self {
        Self {
            workspace,
            status: RepetitionStatus::Failed { reason: reason.into() },
        }
    }

    /// 1-based repetition index.
    pub fn repetition(&self) -> usize {
        self.workspace.repetition()
    }
}

fn invocation_error(workspace: &RunWorkspace, e: EnvError) -> SweepError {
    SweepError::invocation(format!("{}: {}", workspace, e))
}

/// Runs repetitions against a shared simulator.
#[derive(Clone)]
pub struct RunExecutor {
    simulator: Arc<dyn Simulator>,
}

impl RunExecutor {
    /// Creates an executor for `simulator`.
    pub fn new(simulator: Arc<dyn Simulator>) -> Self {
        Self { simulator }
    }

    /// Name of the underlying simulator.
    pub fn simulator_name(&self) -> &str {
        self.simulator.name()
    }

    /// Invokes the simulator once in `workspace`.
    pub async fn execute(
        &self,
        config: &RunConfiguration,
        workspace: &RunWorkspace,
    ) -> Result<RawRunOutput, SweepError> {
        tokio::fs::create_dir_all(workspace.path())
            .await
            .map_err(|e| invocation_error(workspace, e.into()))?;
        let config_path = workspace.join(CONFIG_FILE_NAME);
        tokio::fs::write(&config_path, config.source())
            .await
            .map_err(|e| invocation_error(workspace, e.into()))?;

        self.simulator
            .stage(workspace)
            .await
            .map_err(|e| invocation_error(workspace, e))?;

        let exit = self
            .simulator
            .invoke(workspace, &config_path)
            .await
            .map_err(|e| invocation_error(workspace, e))?;

        if !exit.success {
            let code = exit
                .code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(SweepError::invocation(format!(
                "{}: {} exited with status {}",
                workspace,
                self.simulator.name(),
                code
            )));
        }

        let log = tokio::fs::read(workspace.log_path()).await.map_err(|e| {
            SweepError::invocation(format!("{}: log {} unreadable: {}", workspace, workspace.log_path().display(), e))
        })?;
        let markers = filter_markers(&String::from_utf8_lossy(&log));
        let mut marker_text = markers.join("\n");
        if !marker_text.is_empty() {
            marker_text.push('\n');
        }
        tokio::fs::write(workspace.join(MARKERS_FILE), marker_text)
            .await
            .map_err(|e| invocation_error(workspace, e.into()))?;

        let trace_path = self.simulator.trace_path(workspace);
        if !tokio::fs::try_exists(&trace_path).await.unwrap_or(false) {
            return Err(SweepError::invocation(format!(
                "{}: trace {} was not produced",
                workspace,
                trace_path.display()
            )));
        }

        debug!(
            "{} finished in {:.2}s ({} marker lines)",
            workspace,
            exit.elapsed.as_secs_f64(),
            markers.len()
        );

        Ok(RawRunOutput {
            workspace: workspace.clone(),
            markers,
            trace_path,
            exit,
        })
    }

    /// Runs one repetition end to end and records its status.
    ///
    /// Never fails: every error becomes a `Failed` status.
    pub async fn run_repetition(&self, config: RunConfiguration, workspace: RunWorkspace) -> RepetitionOutcome {
        let status = match self.process(&config, &workspace).await {
            Ok((records, stats)) => RepetitionStatus::Succeeded { records, stats },
            Err(e) => {
                warn!("Repetition {} failed: {}", workspace, e);
                RepetitionStatus::Failed { reason: e.to_string() }
            }
        };

        if tokio::fs::try_exists(workspace.path()).await.unwrap_or(false) {
            if let Err(e) = write_json(&workspace.join(STATUS_FILE), &status).await {
                warn!("Could not write status for {}: {}", workspace, e);
            }
        }

        RepetitionOutcome { workspace, status }
    }

    async fn process(
        &self,
        config: &RunConfiguration,
        workspace: &RunWorkspace,
    ) -> Result<(usize, propsweep_core::RunStatisticSet), SweepError> {
        let output = self.execute(config, workspace).await?;

        let trace_path = output.trace_path.clone();
        let records = tokio::task::spawn_blocking(move || extract(&trace_path))
            .await
            .map_err(|e| SweepError::trace(format!("extraction task failed: {}", e)))??;
        let stats = summarize(&records)
            .map_err(|_| SweepError::EmptyResultError(format!("{}: trace has no block events", workspace)))?;

        let export = PropagationExport {
            label: workspace.label().to_string(),
            repetition: workspace.repetition(),
            marker_lines: output.markers.len(),
            stats,
            records,
        };
        write_json(&workspace.join(PROPAGATION_FILE), &export).await?;

        Ok((export.records.len(), stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{ScriptedFailure, ScriptedSimulator};
    use propsweep_core::{ConfigurationTemplater, ParameterTuple};

    fn setup(failure: ScriptedFailure) -> (tempfile::TempDir, RunExecutor, RunConfiguration) {
        let dir = tempfile::tempdir().unwrap();
        let sim = ScriptedSimulator::new(7).with_blocks(3).with_failure(failure);
        let executor = RunExecutor::new(Arc::new(sim));
        let config = ConfigurationTemplater::default()
            .render(&ParameterTuple::proposed(500, 4, 2.0))
            .unwrap();
        (dir, executor, config)
    }

    #[tokio::test]
    async fn test_execute_returns_same_workspace() {
        let (dir, executor, config) = setup(ScriptedFailure::None);
        let ws = RunWorkspace::new(dir.path().join("n500_vs4_2root/1"), "n500_vs4_2root", 1);

        let output = executor.execute(&config, &ws).await.unwrap();

        assert_eq!(output.workspace, ws);
        assert_eq!(output.markers.len(), 3);
        assert!(output.trace_path.starts_with(ws.path()));
        assert!(ws.join(propsweep_core::CONFIG_FILE_NAME).exists());
        assert!(ws.join(MARKERS_FILE).exists());
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_invocation_error() {
        let (dir, executor, config) = setup(ScriptedFailure::ExitCode(3));
        let ws = RunWorkspace::new(dir.path().join("1"), "n500_vs4_2root", 1);

        let err = executor.execute(&config, &ws).await.unwrap_err();

        assert!(matches!(err, SweepError::SimulatorInvocationError(_)));
        assert!(err.to_string().contains("status 3"));
    }

    #[tokio::test]
    async fn test_missing_trace_is_invocation_error() {
        let (dir, executor, config) = setup(ScriptedFailure::MissingTrace);
        let ws = RunWorkspace::new(dir.path().join("1"), "n500_vs4_2root", 1);

        let err = executor.execute(&config, &ws).await.unwrap_err();

        assert!(err.to_string().contains("was not produced"));
    }

    #[tokio::test]
    async fn test_run_repetition_writes_artifacts() {
        let (dir, executor, config) = setup(ScriptedFailure::None);
        let ws = RunWorkspace::new(dir.path().join("2"), "n500_vs4_2root", 2);

        let outcome = executor.run_repetition(config, ws.clone()).await;

        assert_eq!(outcome.repetition(), 2);
        assert!(outcome.status.stats().is_some());
        assert!(ws.join(STATUS_FILE).exists());
        assert!(ws.join(PROPAGATION_FILE).exists());

        let export: PropagationExport =
            serde_json::from_str(&std::fs::read_to_string(ws.join(PROPAGATION_FILE)).unwrap()).unwrap();
        assert_eq!(export.records.len(), 3);
        assert_eq!(export.marker_lines, 3);
    }

    #[tokio::test]
    async fn test_empty_trace_fails_repetition() {
        let (dir, executor, config) = setup(ScriptedFailure::EmptyTrace);
        let ws = RunWorkspace::new(dir.path().join("1"), "n500_vs4_2root", 1);

        let outcome = executor.run_repetition(config, ws.clone()).await;

        match outcome.status {
            RepetitionStatus::Failed { reason } => assert!(reason.contains("Empty result")),
            other => panic!("unexpected status: {other:?}"),
        }
        let status: RepetitionStatus =
            serde_json::from_str(&std::fs::read_to_string(ws.join(STATUS_FILE)).unwrap()).unwrap();
        assert!(status.stats().is_none());
        assert!(!ws.join(PROPAGATION_FILE).exists());
    }

    #[tokio::test]
    async fn test_missing_log_fails_repetition() {
        let (dir, executor, config) = setup(ScriptedFailure::MissingLog);
        let ws = RunWorkspace::new(dir.path().join("1"), "n500_vs4_2root", 1);

        let err = executor.execute(&config, &ws).await.unwrap_err();

        assert!(matches!(err, SweepError::SimulatorInvocationError(_)));
        assert!(err.to_string().contains("raw.log"));
        assert!(!ws.join(MARKERS_FILE).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_simulator_under_relative_output_root() {
        use propsweep_env::ProcessSimulator;
        use std::os::unix::fs::PermissionsExt;

        let cwd = std::env::current_dir().unwrap();
        let dir = tempfile::tempdir_in(&cwd).unwrap();
        let relative_root = dir.path().strip_prefix(&cwd).unwrap().to_path_buf();

        // Distribution: simulator/bin/run.sh, checks its configuration and
        // leaves a marker line plus a two-observation trace behind.
        let dist = relative_root.join("dist/simulator");
        std::fs::create_dir_all(dist.join("bin")).unwrap();
        let script = dist.join("bin/run.sh");
        std::fs::write(&script, concat!(
            "#!/bin/sh\n",
            "grep -q NUM_OF_NODES \"$1\" || exit 7\n",
            "grep -q NUM_OF_NODES \"$PROPSWEEP_CONFIG\" || exit 8\n",
            "mkdir -p simulator/output\n",
            "echo ';40;b1'\n",
            "echo '[{\"content\":{\"block-id\":\"b1\",\"timestamp\":100}},",
            "{\"content\":{\"block-id\":\"b1\",\"transmission-timestamp\":140}}]' > simulator/output/output.json\n",
        )).unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).unwrap();

        let sim = ProcessSimulator::new("simulator/bin/run.sh")
            .with_distribution(&dist)
            .with_args(vec!["{config}".into()]);
        let executor = RunExecutor::new(Arc::new(sim));
        let config = ConfigurationTemplater::default()
            .render(&ParameterTuple::proposed(500, 4, 2.0))
            .unwrap();
        let ws = RunWorkspace::new(
            relative_root.join("result/20240309/143015_abc/n500_vs4_2root/1"),
            "n500_vs4_2root",
            1,
        );
        assert!(ws.path().is_relative());

        let outcome = executor.run_repetition(config, ws.clone()).await;

        match &outcome.status {
            RepetitionStatus::Succeeded { records, stats } => {
                assert_eq!(*records, 1);
                assert_eq!(stats.median, 40.0);
            }
            other => panic!("unexpected status: {other:?}"),
        }
        assert_eq!(std::fs::read_to_string(ws.join(MARKERS_FILE)).unwrap(), "40\n");
    }
}
