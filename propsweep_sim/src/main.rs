//! propsweep CLI
//!
//! Run a block propagation parameter sweep and write the report sheet.

use clap::Parser;
use propsweep_core::SweepError;
use propsweep_env::Simulator;
use propsweep_sim::{
    InsufficientPolicy, RunExecutor, ScriptedSimulator, SweepConfig, SweepLayout, SweepOrchestrator, SweepSummary,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "propsweep")]
#[command(about = "Block propagation parameter sweep")]
struct Args {
    /// JSON sweep configuration (missing fields keep their defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Repetitions per parameter tuple
    #[arg(short = 'n', long)]
    loop_count: Option<usize>,

    /// Repetitions running at once
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Per-invocation timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Root of the result tree
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip tuples whose repetitions all fail instead of aborting
    #[arg(long)]
    skip_failed: bool,

    /// Use the scripted simulator instead of launching the real one
    #[arg(long)]
    dry_run: bool,

    /// Seed for the scripted simulator
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Print the parameter grid and exit
    #[arg(long)]
    list: bool,

    /// JSON summary on stdout
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn sweep_config(&self) -> Result<SweepConfig, SweepError> {
        let mut config = match &self.config {
            Some(path) => SweepConfig::load(path)?,
            None => SweepConfig::default(),
        };

        if let Some(loop_count) = self.loop_count {
            config.loop_count = loop_count;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = Some(timeout);
        }
        if let Some(output) = &self.output {
            config.output_root = output.clone();
        }
        if self.skip_failed {
            config.on_insufficient = InsufficientPolicy::Skip;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match args.sweep_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    if args.list {
        for (index, tuple) in config.grid.tuples().iter().enumerate() {
            println!("{:>3}  {:<24} {}", index + 1, tuple.label(), tuple.method_label());
        }
        return;
    }

    let simulator: Arc<dyn Simulator> = if args.dry_run {
        Arc::new(ScriptedSimulator::new(args.seed))
    } else {
        Arc::new(config.simulator.build(config.timeout()))
    };

    info!("propsweep v{}", env!("CARGO_PKG_VERSION"));
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let layout = match SweepLayout::new(&config.output_root) {
        Ok(layout) => layout,
        Err(e) => {
            error!("Cannot resolve {}: {}", config.output_root.display(), e);
            std::process::exit(2);
        }
    };
    let block_size = config.block_size;
    let sweep = SweepOrchestrator::new(config, RunExecutor::new(simulator));

    let outcome = match sweep.run(&layout).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Sweep failed: {}", e);
            std::process::exit(1);
        }
    };

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        "{} rows (block size {}), {} failed repetitions, {} skipped tuples",
        outcome.rows.len(),
        block_size,
        outcome.failed_repetitions,
        outcome.skipped.len()
    );
    for skipped in &outcome.skipped {
        error!("✗ {} produced no row: {}", skipped.label, skipped.reason);
    }

    if args.json {
        let summary = SweepSummary {
            run_dir: layout.run_dir.display().to_string(),
            report: layout.report_path.display().to_string(),
            sheet: layout.sheet_label.clone(),
            rows: outcome.rows.clone(),
            failed_repetitions: outcome.failed_repetitions,
            skipped: outcome.skipped.clone(),
        };
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Could not serialize summary: {}", e),
        }
    }

    if !outcome.is_complete() {
        std::process::exit(1);
    }
}
