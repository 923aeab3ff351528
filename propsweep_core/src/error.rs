//! Error taxonomy of a sweep.
//!
//! Variants fall into three scopes:
//! - **repetition**: invocation, trace and empty-result failures drop one
//!   repetition and the sweep carries on
//! - **configuration**: configuration and insufficient-data failures end
//!   one tuple's row
//! - **sweep**: report-write and I/O failures end the whole sweep

use thiserror::Error;

/// Errors raised while running a sweep.
#[derive(Debug, Error)]
pub enum SweepError {
    /// Parameter combination cannot be rendered
    #[error("Configuration error for {label}: {reason}")]
    ConfigurationError { label: String, reason: String },
    
    /// Simulator failed, timed out or left no trace behind
    #[error("Simulator invocation error: {0}")]
    SimulatorInvocationError(String),
    
    /// Trace could not be read or is not a JSON array
    #[error("Trace error: {0}")]
    TraceError(String),
    
    /// Run produced zero propagation records
    #[error("Empty result: {0}")]
    EmptyResultError(String),
    
    /// Every repetition of a configuration failed
    #[error("Insufficient data: every repetition failed for {0}")]
    InsufficientDataError(String),
    
    /// Report artifact could not be persisted
    #[error("Report write error: {0}")]
    ReportWriteError(String),
    
    /// Filesystem failure outside a repetition
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SweepError {
    /// Creates a configuration error for the given tuple label.
    pub fn configuration(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigurationError {
            label: label.into(),
            reason: reason.into(),
        }
    }
    
    /// Creates an invocation error.
    pub fn invocation(msg: impl Into<String>) -> Self {
        Self::SimulatorInvocationError(msg.into())
    }
    
    /// Creates a trace error.
    pub fn trace(msg: impl Into<String>) -> Self {
        Self::TraceError(msg.into())
    }
    
    /// Creates a report write error.
    pub fn report_write(msg: impl std::fmt::Display) -> Self {
        Self::ReportWriteError(msg.to_string())
    }
    
    /// Returns true if the error only invalidates a single repetition.
    pub fn is_repetition_failure(&self) -> bool {
        matches!(
            self,
            SweepError::SimulatorInvocationError(_)
                | SweepError::TraceError(_)
                | SweepError::EmptyResultError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_repetition_scope() {
        assert!(SweepError::invocation("exit 1").is_repetition_failure());
        assert!(SweepError::trace("not an array").is_repetition_failure());
        assert!(SweepError::EmptyResultError("ws".into()).is_repetition_failure());
        assert!(!SweepError::InsufficientDataError("n500".into()).is_repetition_failure());
        assert!(!SweepError::report_write("disk full").is_repetition_failure());
    }
    
    #[test]
    fn test_configuration_message_names_tuple() {
        let err = SweepError::configuration("n500_vs9_2root", "internal forward 9 exceeds outbound degree 8");
        assert_eq!(
            err.to_string(),
            "Configuration error for n500_vs9_2root: internal forward 9 exceeds outbound degree 8"
        );
    }
}
