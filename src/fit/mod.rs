//! Orchestration of one lite engine call.
//!
//! Responsibilities:
//!
//! - validate and build the request (per family, no I/O)
//! - short-circuit dry runs with the assembled command
//! - own the scratch directories for the whole call
//! - encode, invoke, read and split the result

pub mod batch;
pub mod dce;
pub mod dwi;
pub mod t1;


pub use batch::*;
pub use dce::*;
pub use dwi::*;
pub use t1::*;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::data::SanitizeReport;
use crate::decode::{Blocks, ColumnLayout, ResolvedLayout};
use crate::domain::{Matrix, RunSettings};
use crate::engine::invoke::{self, LogSink};
use crate::engine::CommandLine;
use crate::error::LiteError;
use crate::io::export::ResultTable;
use crate::io::scratch::{Scratch, WirePaths};
use crate::io::wire;

/// Result of a fit call: decoded output, or the command a dry run would run.
#[derive(Debug, Clone)]
pub enum FitOutcome<T> {
    Fitted(T),
    DryRun(CommandLine),
}

impl<T> FitOutcome<T> {
    pub fn fitted(self) -> Option<T> {
        match self {
            FitOutcome::Fitted(out) => Some(out),
            FitOutcome::DryRun(_) => None,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, FitOutcome::DryRun(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FitOutcome<U> {
        match self {
            FitOutcome::Fitted(out) => FitOutcome::Fitted(f(out)),
            FitOutcome::DryRun(cmd) => FitOutcome::DryRun(cmd),
        }
    }
}

/// Fitted parameters with their column names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamBlock {
    pub names: Vec<String>,
    #[serde(skip)]
    pub values: Matrix,
}

impl ParamBlock {
    /// One parameter across all samples.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.names.iter().position(|n| n == name)?;
        Some(self.values.column(idx).iter().copied().collect())
    }
}

/// What happened during a call, independent of family.
#[derive(Debug, Clone)]
pub struct CallReport {
    pub command: CommandLine,
    pub layout: ResolvedLayout,
    /// Samples zeroed before encoding.
    pub sanitized: SanitizeReport,
    /// Result file, when it lives in a caller directory and survives the call.
    pub kept_result: Option<PathBuf>,
}

/// Common view of a decoded fit, used by reporting and exports.
pub trait FittedOutput {
    /// `dce`, `dwi` or `t1`.
    fn family(&self) -> &'static str;
    fn model_name(&self) -> &str;
    fn params(&self) -> &ParamBlock;
    fn error_codes(&self) -> &Matrix;
    fn report(&self) -> &CallReport;
    /// Options exactly as passed to the engine.
    fn options_json(&self) -> Result<serde_json::Value, LiteError>;
    /// Every decoded block as named per-sample columns.
    fn table(&self) -> Result<ResultTable, LiteError>;
}

/// Serialise effective options for the JSON summary.
pub(crate) fn options_to_json<T: Serialize>(what: &'static str, options: &T) -> Result<serde_json::Value, LiteError> {
    serde_json::to_value(options).map_err(|source| LiteError::Serialize { what, source })
}

/// Column names of the error-code block.
pub(crate) fn error_code_names() -> [String; 2] {
    ["error_1".to_string(), "error_2".to_string()]
}

/// A request that passed validation and is ready to be encoded.
pub(crate) trait Prepared {
    /// Name the engine prefixes the result file with.
    fn result_prefix(&self) -> &str;
    fn run_settings(&self) -> &RunSettings;
    fn n_samples(&self) -> usize;
    fn layout(&self) -> ColumnLayout;
    fn sanitized(&self) -> &SanitizeReport;
    fn command(&self, exe: &Path, paths: &WirePaths) -> CommandLine;
    /// Write the input matrix and any auxiliary files.
    fn write_inputs(&self, paths: &WirePaths) -> Result<(), LiteError>;
}

/// Decoded blocks plus the call report.
pub(crate) struct Decoded {
    pub blocks: Blocks,
    pub report: CallReport,
}

pub(crate) fn execute<P: Prepared>(
    exe: &Path,
    prepared: &P,
    sink: &mut dyn LogSink,
) -> Result<FitOutcome<Decoded>, LiteError> {
    let run = prepared.run_settings();
    if run.dry_run {
        let cmd = prepared.command(exe, &WirePaths::dry_run(run));
        tracing::info!("dry run: {cmd}");
        return Ok(FitOutcome::DryRun(cmd));
    }

    let scratch = Scratch::acquire(run)?;
    let result = encode_run_decode(exe, prepared, &scratch.paths(), sink);
    scratch.release();
    result.map(FitOutcome::Fitted)
}

fn encode_run_decode<P: Prepared>(
    exe: &Path,
    prepared: &P,
    paths: &WirePaths,
    sink: &mut dyn LogSink,
) -> Result<Decoded, LiteError> {
    let run = prepared.run_settings();
    prepared.write_inputs(paths)?;

    let command = prepared.command(exe, paths);
    invoke::run(&command, run.working_dir.as_deref(), sink)?;

    let path = paths.result_file(prepared.result_prefix(), &run.output_name);
    let result = wire::read_matrix(&path)?;
    if result.nrows() != prepared.n_samples() {
        return Err(LiteError::decode(
            &path,
            format!(
                "expected {} rows (one per sample), found {}",
                prepared.n_samples(),
                result.nrows()
            ),
        ));
    }

    let layout = prepared.layout().resolve(result.ncols(), &path)?;
    let blocks = layout.split(&result)?;
    tracing::debug!(
        "decoded {}x{} result: {} parameter column(s)",
        result.nrows(),
        result.ncols(),
        layout.params
    );

    Ok(Decoded {
        blocks,
        report: CallReport {
            command,
            layout,
            sanitized: prepared.sanitized().clone(),
            kept_result: run.output_dir.as_ref().map(|_| path),
        },
    })
}

/// First column of a block as a vector.
pub(crate) fn first_column(block: &Matrix) -> Vec<f64> {
    if block.ncols() == 0 {
        return Vec::new();
    }
    block.column(0).iter().copied().collect()
}

/// `Some(block)` when the block has columns.
pub(crate) fn non_empty(block: Matrix) -> Option<Matrix> {
    (block.ncols() > 0).then_some(block)
}

/// Reject an explicitly empty list option.
pub(crate) fn reject_empty<T>(name: &str, values: Option<&[T]>) -> Result<(), LiteError> {
    match values {
        Some([]) => Err(LiteError::validation(format!("{name} must not be empty"))),
        _ => Ok(()),
    }
}
