//! Production implementation of Simulator using tokio child processes.

use crate::staging::stage_distribution;
use crate::{EnvError, ExitReport, RunWorkspace, Simulator};
use async_trait::async_trait;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Environment variable carrying the rendered configuration path.
pub const CONFIG_ENV: &str = "PROPSWEEP_CONFIG";

/// Default location of the JSON trace inside a staged distribution.
const DEFAULT_TRACE: &str = "simulator/output/output.json";

/// Simulator backed by a pre-built executable.
///
/// This is the "real" implementation: the distribution is staged into each
/// workspace and the program runs with the workspace as its working
/// directory, so concurrent repetitions never write to the same files.
#[derive(Debug, Clone)]
pub struct ProcessSimulator {
    /// Directory or .zip copied into every workspace (None = nothing to stage)
    distribution: Option<PathBuf>,

    /// Program to run; relative paths resolve against the workspace
    program: PathBuf,

    /// Arguments; `{config}` and `{workspace}` are substituted
    args: Vec<String>,

    /// Trace location relative to the workspace
    trace: PathBuf,

    /// Per-invocation limit (None = wait forever)
    timeout: Option<Duration>,
}

impl ProcessSimulator {
    /// Creates a simulator running `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            distribution: None,
            program: program.into(),
            args: Vec::new(),
            trace: PathBuf::from(DEFAULT_TRACE),
            timeout: None,
        }
    }

    /// Sets the distribution staged into each workspace.
    pub fn with_distribution(mut self, distribution: impl Into<PathBuf>) -> Self {
        self.distribution = Some(distribution.into());
        self
    }

    /// Sets the argument template.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Sets the trace location relative to the workspace.
    pub fn with_trace(mut self, trace: impl Into<PathBuf>) -> Self {
        self.trace = trace.into();
        self
    }

    /// Sets the per-invocation timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn resolve_program(&self, dir: &Path) -> PathBuf {
        // Bare names ("java", "sh") are looked up on PATH.
        if self.program.is_absolute() || self.program.components().count() == 1 {
            self.program.clone()
        } else {
            dir.join(&self.program)
        }
    }

    fn expand_args(&self, dir: &Path, config_path: &Path) -> Vec<String> {
        let config = config_path.display().to_string();
        let dir = dir.display().to_string();
        self.args
            .iter()
            .map(|arg| arg.replace("{config}", &config).replace("{workspace}", &dir))
            .collect()
    }
}

/// Anchors a relative path at the current directory.
///
/// The child runs inside the workspace, so every path handed to it must
/// not depend on the parent's working directory.
pub fn absolute_path(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[async_trait]
impl Simulator for ProcessSimulator {
    fn name(&self) -> &str {
        "process"
    }

    async fn stage(&self, workspace: &RunWorkspace) -> Result<(), EnvError> {
        let Some(distribution) = self.distribution.clone() else {
            return Ok(());
        };
        let dest = workspace.path().to_path_buf();
        tokio::task::spawn_blocking(move || stage_distribution(&distribution, &dest))
            .await
            .map_err(|e| EnvError::staging(format!("staging task failed: {}", e)))?
    }

    async fn invoke(&self, workspace: &RunWorkspace, config_path: &Path) -> Result<ExitReport, EnvError> {
        let dir = absolute_path(workspace.path())?;
        let config_path = absolute_path(config_path)?;
        let program = self.resolve_program(&dir);
        let stdout = File::create(workspace.log_path())?;
        let stderr = File::create(workspace.stderr_path())?;

        let mut command = Command::new(&program);
        command
            .args(self.expand_args(&dir, &config_path))
            .current_dir(&dir)
            .env(CONFIG_ENV, &config_path)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true);

        let start = Instant::now();
        let mut child = command
            .spawn()
            .map_err(|e| EnvError::launch(program.display(), e))?;
        debug!("{}: launched {}", workspace, program.display());

        let status = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!("{}: no exit after {:?}, killing simulator", workspace, limit);
                    let _ = child.kill().await;
                    return Err(EnvError::Timeout(limit.as_millis() as u64));
                }
            },
            None => child.wait().await?,
        };

        Ok(ExitReport::new(status.code(), start.elapsed()))
    }

    fn trace_path(&self, workspace: &RunWorkspace) -> PathBuf {
        workspace.join(&self.trace)
    }
}
