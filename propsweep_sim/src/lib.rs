//! propsweep Sweep Harness
//!
//! Runs a block propagation simulator across a parameter grid and turns
//! its traces into a report:
//!
//! ```text
//!  ParameterGrid ──► ConfigurationTemplater ──► RunExecutor (× loop_count, bounded)
//!                                                   │
//!                                                   ▼
//!  ReportAccumulator ◄── reduce ◄── summarize ◄── extract
//! ```
//!
//! The simulator sits behind [`propsweep_env::Simulator`]: production sweeps
//! use `ProcessSimulator`, rehearsals and tests use [`ScriptedSimulator`].
//!
//! # Usage
//!
//! ```ignore
//! use propsweep_sim::{RunExecutor, SweepConfig, SweepLayout, SweepOrchestrator};
//! use std::sync::Arc;
//!
//! let config = SweepConfig::default();
//! let simulator = config.simulator.build(config.timeout());
//! let sweep = SweepOrchestrator::new(config.clone(), RunExecutor::new(Arc::new(simulator)));
//! let outcome = sweep.run(&SweepLayout::new(&config.output_root)?).await?;
//! ```

mod config;
mod executor;
pub mod exporter;
mod orchestrator;
mod scripted;

pub use config::{InsufficientPolicy, SimulatorSpec, SweepConfig};
pub use executor::{RawRunOutput, RepetitionOutcome, RunExecutor};
pub use exporter::{SkippedTuple, SweepSummary};
pub use orchestrator::{SweepLayout, SweepOrchestrator, SweepOutcome, REPORT_FILE};
pub use scripted::{ScriptedFailure, ScriptedSimulator};
