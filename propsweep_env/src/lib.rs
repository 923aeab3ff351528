//! propsweep Environment Abstraction Layer
//!
//! This crate isolates everything the sweep needs from the outside world
//! behind the [`Simulator`] trait, so that the orchestration logic runs
//! unchanged against either:
//! - **Production**: [`ProcessSimulator`] - stages a simulator distribution
//!   and launches it as a tokio child process
//! - **Rehearsal/Test**: a scripted implementation that writes synthetic
//!   output (see `propsweep_sim::ScriptedSimulator`)
//!
//! # Workspace Isolation
//!
//! Every repetition owns a [`RunWorkspace`]: a unique directory that is
//! created before invocation, written by exactly one simulator process and
//! read back during extraction. No two repetitions share one.
//!
//! # Example
//!
//! ```ignore
//! use propsweep_env::{ProcessSimulator, RunWorkspace, Simulator};
//!
//! let sim = ProcessSimulator::new("simulator/bin/runSimBlock")
//!     .with_distribution("dist/simulator.zip");
//! let ws = RunWorkspace::new("result/run/n500_vs4_2root/1", "n500_vs4_2root", 1);
//! sim.stage(&ws).await?;
//! let exit = sim.invoke(&ws, &ws.join("ProposalConfiguration.java")).await?;
//! ```

mod error;
mod process;
mod simulator;
mod staging;
mod types;

pub use error::EnvError;
pub use process::{absolute_path, ProcessSimulator, CONFIG_ENV};
pub use simulator::{ExitReport, Simulator};
pub use staging::stage_distribution;
pub use types::{RunId, RunWorkspace};
