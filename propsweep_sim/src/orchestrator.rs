//! Sweep orchestrator - drives the grid through the executor.
//!
//! Tuples run one after another in grid order. Inside a tuple, every
//! repetition is a tokio task gated by a semaphore of `concurrency`
//! permits; all of them are awaited before the tuple is reduced.

use crate::config::{InsufficientPolicy, SweepConfig};
use crate::executor::{RepetitionOutcome, RunExecutor};
use crate::exporter::{write_json, ConfigurationSummary, RepetitionEntry, SkippedTuple, SUMMARY_FILE};
use chrono::{Local, NaiveDateTime};
use propsweep_core::{
    reduce, ConfigurationAggregate, ConfigurationTemplater, ParameterTuple, ReportAccumulator, ReportRow,
    RunConfiguration, SweepError,
};
use propsweep_env::{absolute_path, RunId, RunWorkspace};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Report file name inside the dated result directory.
pub const REPORT_FILE: &str = "result_summary.json";

/// Where one sweep writes its output.
#[derive(Debug, Clone)]
pub struct SweepLayout {
    /// `<root>/<date>/<time>_<run-id>`
    pub run_dir: PathBuf,

    /// `<root>/<date>/result_summary.json`
    pub report_path: PathBuf,

    /// Sheet the rows of this sweep go to (`%H%M%S` of the start time)
    pub sheet_label: String,

    pub run_id: RunId,
}

impl SweepLayout {
    /// Layout for a sweep starting now.
    ///
    /// A relative `output_root` is anchored at the current directory, so
    /// workspace paths stay valid inside a child running in the workspace.
    pub fn new(output_root: &Path) -> std::io::Result<Self> {
        let root = absolute_path(output_root)?;
        Ok(Self::at(&root, Local::now().naive_local(), RunId::new()))
    }

    /// Layout for a sweep started at `started`.
    pub fn at(output_root: &Path, started: NaiveDateTime, run_id: RunId) -> Self {
        let date_dir = output_root.join(started.format("%Y%m%d").to_string());
        let sheet_label = started.format("%H%M%S").to_string();
        Self {
            run_dir: date_dir.join(format!("{}_{}", sheet_label, run_id)),
            report_path: date_dir.join(REPORT_FILE),
            sheet_label,
            run_id,
        }
    }

    /// Directory holding every repetition of a tuple.
    pub fn configuration_dir(&self, tuple: &ParameterTuple) -> PathBuf {
        self.run_dir.join(tuple.label())
    }

    /// Workspace of one repetition.
    pub fn workspace(&self, tuple: &ParameterTuple, repetition: usize) -> RunWorkspace {
        RunWorkspace::new(
            self.configuration_dir(tuple).join(repetition.to_string()),
            tuple.label(),
            repetition,
        )
    }
}

/// Everything a finished sweep produced.
#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    /// Report rows in grid order
    pub rows: Vec<ReportRow>,

    /// Aggregates behind the rows
    pub aggregates: Vec<ConfigurationAggregate>,

    /// Tuples that produced no row
    pub skipped: Vec<SkippedTuple>,

    /// Repetitions dropped across all tuples
    pub failed_repetitions: usize,
}

impl SweepOutcome {
    /// Returns true if every tuple produced a row.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Runs a whole sweep.
pub struct SweepOrchestrator {
    config: SweepConfig,
    executor: RunExecutor,
    templater: ConfigurationTemplater,
}

impl SweepOrchestrator {
    /// Creates an orchestrator for `config` using `executor`.
    pub fn new(config: SweepConfig, executor: RunExecutor) -> Self {
        let templater = ConfigurationTemplater::new(config.degrees);
        Self {
            config,
            executor,
            templater,
        }
    }

    /// Returns the sweep configuration.
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Runs every tuple of the grid and flushes the report.
    ///
    /// Under [`InsufficientPolicy::Abort`] the first tuple without a single
    /// successful repetition ends the sweep with `InsufficientDataError`
    /// and no report is written.
    pub async fn run(&self, layout: &SweepLayout) -> Result<SweepOutcome, SweepError> {
        tokio::fs::create_dir_all(&layout.run_dir).await?;

        let tuples = self.config.grid.tuples();
        info!(
            "Sweep {}: {} tuples x {} repetitions ({} at once, simulator: {})",
            layout.run_id,
            tuples.len(),
            self.config.loop_count,
            self.config.concurrency,
            self.executor.simulator_name()
        );

        let mut report = ReportAccumulator::new();
        let mut outcome = SweepOutcome::default();

        for tuple in tuples {
            let label = tuple.label();

            let config = match self.templater.render(&tuple) {
                Ok(config) => config,
                Err(e) => {
                    error!("Skipping {}: {}", label, e);
                    outcome.skipped.push(SkippedTuple { label, reason: e.to_string() });
                    continue;
                }
            };

            let config_dir = layout.configuration_dir(&tuple);
            tokio::fs::create_dir_all(&config_dir).await?;

            let repetitions = self.run_configuration(&config, layout).await;
            let sets: Vec<_> = repetitions.iter().filter_map(|r| r.status.stats().copied()).collect();
            let failed = repetitions.len() - sets.len();
            outcome.failed_repetitions += failed;

            let aggregate = reduce(&tuple, &sets, failed);

            let summary = ConfigurationSummary {
                label: label.clone(),
                repetitions: repetitions
                    .into_iter()
                    .map(|r| RepetitionEntry { repetition: r.repetition(), status: r.status })
                    .collect(),
                aggregate: aggregate.as_ref().ok().cloned(),
            };
            write_json(&config_dir.join(SUMMARY_FILE), &summary).await?;

            match aggregate {
                Ok(aggregate) => {
                    let row = ReportRow::from_aggregate(&aggregate, self.config.block_size);
                    info!(
                        "{}: {}/{} repetitions ok, median {:.1}, mean {:.1}",
                        label,
                        aggregate.successful,
                        aggregate.successful + aggregate.failed,
                        aggregate.stats.median,
                        aggregate.stats.mean
                    );
                    report.append(row.clone(), &layout.sheet_label);
                    outcome.rows.push(row);
                    outcome.aggregates.push(aggregate);
                }
                Err(e) => match self.config.on_insufficient {
                    InsufficientPolicy::Abort => {
                        error!("Aborting sweep: {}", e);
                        return Err(e);
                    }
                    InsufficientPolicy::Skip => {
                        error!("Skipping {}: {}", label, e);
                        outcome.skipped.push(SkippedTuple { label, reason: e.to_string() });
                    }
                },
            }
        }

        report.flush(&layout.report_path)?;
        info!(
            "Wrote {} rows to sheet {} of {}",
            outcome.rows.len(),
            layout.sheet_label,
            layout.report_path.display()
        );

        Ok(outcome)
    }

    /// Runs every repetition of one tuple and waits for all of them.
    ///
    /// Outcomes come back sorted by repetition index. A task that panics
    /// is reported as a failed repetition.
    async fn run_configuration(&self, config: &RunConfiguration, layout: &SweepLayout) -> Vec<RepetitionOutcome> {
        let permits = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks = JoinSet::new();
        let mut pending = BTreeMap::new();

        for repetition in 1..=self.config.loop_count {
            let workspace = layout.workspace(config.tuple(), repetition);
            pending.insert(repetition, workspace.clone());

            let executor = self.executor.clone();
            let config = config.clone();
            let permits = permits.clone();
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                executor.run_repetition(config, workspace).await
            });
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    debug!("{} done", outcome.workspace);
                    pending.remove(&outcome.repetition());
                    outcomes.push(outcome);
                }
                Err(e) => warn!("Repetition task for {} did not finish: {}", config.tuple().label(), e),
            }
        }

        outcomes.extend(
            pending
                .into_values()
                .map(|workspace| RepetitionOutcome::lost(workspace, "repetition task panicked")),
        );
        outcomes.sort_by_key(RepetitionOutcome::repetition);
        outcomes
    }
}
