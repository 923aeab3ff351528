//! propsweep Core - Block Propagation Sweep Analysis
//!
//! Pure, I/O-light building blocks of a simulator parameter sweep:
//! 1. **Grid**: enumerate parameter tuples in a fixed, reproducible order
//! 2. **Templating**: render one configuration artifact per tuple
//! 3. **Extraction**: turn a JSON event trace into per-block propagation records
//! 4. **Statistics**: per-run summaries and the per-configuration reduction
//! 5. **Report**: accumulate one row per configuration, flush as a named sheet

pub mod error;
pub mod extract;
pub mod params;
pub mod report;
pub mod stats;
pub mod template;

// Re-export key types for convenience
pub use error::SweepError;
pub use extract::{extract, extract_from_str, filter_markers, PropagationRecord};
pub use params::{ParameterGrid, ParameterTuple};
pub use report::{sheet_csv_path, ReportAccumulator, ReportRow, Workbook, REPORT_HEADER};
pub use stats::{reduce, summarize, ConfigurationAggregate, RunStatisticSet};
pub use template::{ConfigurationTemplater, DegreeLimits, RunConfiguration, CONFIG_FILE_NAME};
