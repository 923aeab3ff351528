//! Sweep report accumulation and persistence.
//!
//! Rows are held in memory for the whole sweep and written once, at the end,
//! as a named sheet of a workbook file. The workbook is pretty-printed JSON:
//!
//! ```text
//! { "sheets": { "143015": [ ["method", "inbound", ...], ["proposed(2-root)", "vs4", ...] ] } }
//! ```
//!
//! Flushing a sheet that already exists replaces it; other sheets are kept.
//! Every flushed sheet is mirrored as a CSV file beside the workbook.

use crate::error::SweepError;
use crate::stats::ConfigurationAggregate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Column header written as the first row of every sheet.
pub const REPORT_HEADER: [&str; 9] = [
    "method", "inbound", "outbound", "nodes", "block_size", "min", "max", "mean", "median",
];

/// One configuration's line in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub method: String,
    pub inbound: String,
    pub outbound: String,
    pub nodes: u32,
    pub block_size: u32,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl ReportRow {
    /// Builds the row for an aggregate.
    pub fn from_aggregate(aggregate: &ConfigurationAggregate, block_size: u32) -> Self {
        let tuple = &aggregate.tuple;
        Self {
            method: tuple.method_label(),
            inbound: tuple.ratio_label(),
            outbound: tuple.ratio_label(),
            nodes: tuple.population,
            block_size,
            min: aggregate.stats.min,
            max: aggregate.stats.max,
            mean: aggregate.stats.mean,
            median: aggregate.stats.median,
        }
    }

    /// Row as workbook cells, in [`REPORT_HEADER`] order.
    pub fn cells(&self) -> Vec<Value> {
        vec![
            json!(self.method),
            json!(self.inbound),
            json!(self.outbound),
            json!(self.nodes),
            json!(self.block_size),
            json!(self.min),
            json!(self.max),
            json!(self.mean),
            json!(self.median),
        ]
    }
}

/// Persisted workbook: named sheets of cell rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: BTreeMap<String, Vec<Vec<Value>>>,
}

impl Workbook {
    /// Loads a workbook from disk.
    pub fn load(path: &Path) -> Result<Self, SweepError> {
        let text = fs::read_to_string(path)
            .map_err(|e| SweepError::report_write(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| SweepError::report_write(format!("{} is not a workbook: {}", path.display(), e)))
    }

    /// Writes the workbook via a temporary sibling and an atomic rename.
    pub fn save(&self, path: &Path) -> Result<(), SweepError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SweepError::report_write(e))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| SweepError::report_write(e))?;

        let tmp = temp_sibling(path);
        let written = fs::write(&tmp, json).and_then(|_| fs::rename(&tmp, path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(SweepError::report_write(format!("{}: {}", path.display(), e)));
        }
        Ok(())
    }

    /// Returns the rows of a sheet (header included).
    pub fn sheet(&self, label: &str) -> Option<&Vec<Vec<Value>>> {
        self.sheets.get(label)
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// In-memory report of one sweep.
#[derive(Debug, Clone, Default)]
pub struct ReportAccumulator {
    sheets: BTreeMap<String, Vec<ReportRow>>,
}

impl ReportAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row to the named sheet.
    pub fn append(&mut self, row: ReportRow, sheet_label: &str) {
        self.sheets.entry(sheet_label.to_string()).or_default().push(row);
    }

    /// Rows accumulated for a sheet, in append order.
    pub fn rows(&self, sheet_label: &str) -> &[ReportRow] {
        self.sheets.get(sheet_label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total rows across all sheets.
    pub fn len(&self) -> usize {
        self.sheets.values().map(Vec::len).sum()
    }

    /// Returns true if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes every accumulated sheet into the workbook at `target`.
    ///
    /// Each flushed sheet is also written as `<stem>_<label>.csv` next to
    /// the workbook. Consumes the accumulator: on failure the in-memory rows
    /// are gone and the existing workbook is untouched.
    pub fn flush(self, target: &Path) -> Result<(), SweepError> {
        let mut workbook = if target.exists() {
            Workbook::load(target)?
        } else {
            Workbook::default()
        };

        let mut flushed = Vec::with_capacity(self.sheets.len());
        for (label, rows) in self.sheets {
            let mut table: Vec<Vec<Value>> = Vec::with_capacity(rows.len() + 1);
            table.push(REPORT_HEADER.iter().map(|h| json!(h)).collect());
            table.extend(rows.iter().map(ReportRow::cells));
            debug!("Writing sheet {} ({} rows) to {}", label, rows.len(), target.display());
            workbook.sheets.insert(label.clone(), table);
            flushed.push(label);
        }

        workbook.save(target)?;

        for label in flushed {
            if let Some(table) = workbook.sheet(&label) {
                write_sheet_csv(&sheet_csv_path(target, &label), table)?;
            }
        }
        Ok(())
    }
}

/// CSV copy of a sheet: `<workbook stem>_<label>.csv` beside the workbook.
pub fn sheet_csv_path(target: &Path, label: &str) -> PathBuf {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    target.with_file_name(format!("{}_{}.csv", stem, label))
}

fn write_sheet_csv(path: &Path, table: &[Vec<Value>]) -> Result<(), SweepError> {
    let tmp = temp_sibling(path);
    let written = write_csv_rows(&tmp, table)
        .map_err(|e| e.to_string())
        .and_then(|_| fs::rename(&tmp, path).map_err(|e| e.to_string()));

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(SweepError::report_write(format!("{}: {}", path.display(), e)));
    }
    Ok(())
}

fn write_csv_rows(path: &Path, table: &[Vec<Value>]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in table {
        wtr.write_record(row.iter().map(cell_text))?;
    }
    wtr.flush()?;
    Ok(())
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
