//! Error types for the propsweep environment abstraction.

use thiserror::Error;

/// Errors that can occur while staging or invoking a simulator.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Copying or extracting the simulator distribution failed
    #[error("Staging error: {0}")]
    StagingError(String),
    
    /// The simulator process could not be spawned
    #[error("Launch error: {0}")]
    LaunchError(String),
    
    /// The simulator did not exit within the configured limit
    #[error("Timeout after {0}ms")]
    Timeout(u64),
    
    /// Filesystem failure inside the workspace
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl EnvError {
    /// Creates a staging error.
    pub fn staging(msg: impl Into<String>) -> Self {
        Self::StagingError(msg.into())
    }
    
    /// Creates a launch error for the given program.
    pub fn launch(program: impl std::fmt::Display, cause: impl std::fmt::Display) -> Self {
        Self::LaunchError(format!("{}: {}", program, cause))
    }
}
