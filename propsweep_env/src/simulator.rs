//! Core simulator trait used by the sweep harness.

use crate::{EnvError, RunWorkspace};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How a simulator invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    /// Process exit code (None when terminated by a signal)
    pub code: Option<i32>,
    
    /// Whether the process reported success
    pub success: bool,
    
    /// Wall-clock time spent in the invocation
    pub elapsed: Duration,
}

impl ExitReport {
    /// Creates a report for a finished invocation.
    pub fn new(code: Option<i32>, elapsed: Duration) -> Self {
        Self {
            code,
            success: code == Some(0),
            elapsed,
        }
    }
}

/// The interface to the external network simulator.
///
/// The harness only relies on the simulator's declared output contract:
/// stdout captured to [`RunWorkspace::log_path`], and a JSON trace at
/// [`Simulator::trace_path`] once the invocation succeeds.
///
/// # Implementations
///
/// - **Production**: `ProcessSimulator` - copies the distribution and
///   launches a child process
/// - **Rehearsal**: `ScriptedSimulator` - deterministic synthetic output
#[async_trait]
pub trait Simulator: Send + Sync + 'static {
    /// Human readable name (for logging).
    fn name(&self) -> &str;
    
    /// Materializes the simulator distribution inside the workspace.
    ///
    /// Called once per repetition, after the workspace directory exists.
    async fn stage(&self, workspace: &RunWorkspace) -> Result<(), EnvError>;
    
    /// Runs the simulator against the rendered configuration at `config_path`.
    ///
    /// Implementations must write the simulator's stdout to
    /// `workspace.log_path()`. A non-zero exit is *not* an error here;
    /// it is reported through [`ExitReport::success`].
    async fn invoke(&self, workspace: &RunWorkspace, config_path: &Path) -> Result<ExitReport, EnvError>;
    
    /// Location of the structured trace a successful run leaves behind.
    fn trace_path(&self, workspace: &RunWorkspace) -> PathBuf;
}
