//! Export decoded results to CSV and a JSON run summary.
//!
//! The CSV has one row per sample and one named column per value, so it
//! opens directly in spreadsheets. The JSON summary records what was run and
//! with which options.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::Matrix;
use crate::error::LiteError;

/// Named columns built block by block.
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    pub headers: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Add one column per matrix column using `names`.
    pub fn push_block(&mut self, names: &[String], block: &Matrix) -> Result<(), LiteError> {
        if names.len() != block.ncols() {
            return Err(LiteError::shape(
                "export block",
                format!("{} columns", names.len()),
                format!("{} columns", block.ncols()),
            ));
        }
        for (name, col) in names.iter().zip(block.column_iter()) {
            self.push_column(name, col.iter().copied().collect())?;
        }
        Ok(())
    }

    /// Add a block whose columns are `{prefix}_{i}` (1-based).
    pub fn push_series(&mut self, prefix: &str, block: &Matrix) -> Result<(), LiteError> {
        let names: Vec<String> = (1..=block.ncols()).map(|i| format!("{prefix}_{i}")).collect();
        self.push_block(&names, block)
    }

    pub fn push_column(&mut self, name: &str, values: Vec<f64>) -> Result<(), LiteError> {
        if !self.columns.is_empty() && values.len() != self.n_rows() {
            return Err(LiteError::shape(
                name,
                format!("{} rows", self.n_rows()),
                format!("{} rows", values.len()),
            ));
        }
        self.headers.push(name.to_string());
        self.columns.push(values);
        Ok(())
    }
}

/// Write a table as CSV with a leading `sample` index column.
pub fn write_results_csv(path: &Path, table: &ResultTable) -> Result<(), LiteError> {
    let file = File::create(path).map_err(|e| LiteError::io(path, e))?;
    let mut out = BufWriter::new(file);

    let mut header = String::from("sample");
    for h in &table.headers {
        header.push(',');
        header.push_str(h);
    }
    writeln!(out, "{header}").map_err(|e| LiteError::io(path, e))?;

    for row in 0..table.n_rows() {
        let mut line = row.to_string();
        for col in &table.columns {
            line.push_str(&format!(",{:.6}", col[row]));
        }
        writeln!(out, "{line}").map_err(|e| LiteError::io(path, e))?;
    }
    out.flush().map_err(|e| LiteError::io(path, e))
}

/// Summary statistics of one parameter over successfully fitted samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamStats {
    pub name: String,
    pub n: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Block widths as resolved for the result file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutSummary {
    pub error_codes: usize,
    pub residual: usize,
    pub iauc: usize,
    pub params: usize,
    pub modelled: usize,
    pub signal_derived: usize,
}

/// Everything worth keeping about one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub tool: String,
    pub family: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub input: String,
    pub command: Vec<String>,
    pub options: serde_json::Value,
    pub n_samples: usize,
    pub n_failed: usize,
    pub layout: LayoutSummary,
    pub zeroed_rows: Vec<usize>,
    pub params: Vec<ParamStats>,
}

pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<(), LiteError> {
    let file = File::create(path).map_err(|e| LiteError::io(path, e))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, summary).map_err(|e| LiteError::io(path, std::io::Error::other(e)))?;
    out.flush().map_err(|e| LiteError::io(path, e))
}
