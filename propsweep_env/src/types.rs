//! Common types for the propsweep environment abstraction.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File name of the captured simulator stdout inside a workspace.
pub(crate) const LOG_FILE: &str = "raw.log";

/// File name of the captured simulator stderr inside a workspace.
pub(crate) const STDERR_FILE: &str = "stderr.log";

/// Short identifier of one sweep invocation.
///
/// The first 10 hex characters of a UUID v4: unique enough to tell sweeps
/// started in the same second apart, short enough for a directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Creates a new random RunId.
    pub fn new() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(simple[..10].to_string())
    }
    
    /// Returns the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Isolated directory owned by one repetition.
///
/// The handle is returned to the caller after execution, so results are
/// always read back from the exact directory the simulator wrote to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunWorkspace {
    /// Directory of this repetition
    root: PathBuf,
    
    /// Configuration label the repetition belongs to
    label: String,
    
    /// 1-based repetition index within the configuration
    repetition: usize,
}

impl RunWorkspace {
    /// Creates a workspace handle. The directory is not created here.
    pub fn new(root: impl Into<PathBuf>, label: impl Into<String>, repetition: usize) -> Self {
        Self {
            root: root.into(),
            label: label.into(),
            repetition,
        }
    }
    
    /// Returns the workspace directory.
    pub fn path(&self) -> &Path {
        &self.root
    }
    
    /// Returns the configuration label.
    pub fn label(&self) -> &str {
        &self.label
    }
    
    /// Returns the 1-based repetition index.
    pub fn repetition(&self) -> usize {
        self.repetition
    }
    
    /// Resolves a path relative to the workspace.
    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }
    
    /// Path of the captured stdout log.
    pub fn log_path(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }
    
    /// Path of the captured stderr log.
    pub fn stderr_path(&self) -> PathBuf {
        self.root.join(STDERR_FILE)
    }
}

impl std::fmt::Display for RunWorkspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.label, self.repetition)
    }
}
