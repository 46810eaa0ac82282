//! Baseline T1 mapping through `madym_T1_lite`.

use std::path::{Path, PathBuf};

use crate::data::{SampleMatrix, SampleMatrixBuilder, SanitizeReport};
use crate::decode::ColumnLayout;
use crate::domain::{Matrix, RunSettings, T1Method, T1Options, T1Request};
use crate::engine::command::t1_command;
use crate::engine::{CommandLine, EngineLocation, LogSink, Tool};
use crate::error::LiteError;
use crate::fit::{
    CallReport, FitOutcome, FittedOutput, ParamBlock, Prepared, error_code_names, execute, options_to_json,
};
use crate::io::export::ResultTable;
use crate::io::scratch::WirePaths;
use crate::io::wire::{self, INPUT_DATA_FILE};
use crate::models::{column_names, t1_param_names};

/// Decoded T1 fit.
#[derive(Debug, Clone)]
pub struct T1Output {
    pub params: ParamBlock,
    pub error_codes: Matrix,
    pub options: T1Options,
    pub report: CallReport,
}

impl T1Output {
    pub fn t1(&self) -> Option<Vec<f64>> {
        self.params.column("T1")
    }

    pub fn m0(&self) -> Option<Vec<f64>> {
        self.params.column("M0")
    }
}

impl FittedOutput for T1Output {
    fn family(&self) -> &'static str {
        "t1"
    }

    fn model_name(&self) -> &str {
        self.options.method.engine_name()
    }

    fn params(&self) -> &ParamBlock {
        &self.params
    }

    fn error_codes(&self) -> &Matrix {
        &self.error_codes
    }

    fn report(&self) -> &CallReport {
        &self.report
    }

    fn options_json(&self) -> Result<serde_json::Value, LiteError> {
        options_to_json("T1 options", &self.options)
    }

    fn table(&self) -> Result<ResultTable, LiteError> {
        let mut table = ResultTable::new();
        table.push_block(&error_code_names(), &self.error_codes)?;
        table.push_block(&self.params.names, &self.params.values)?;
        Ok(table)
    }
}

#[derive(Debug, Clone)]
pub struct T1Fitter {
    exe: PathBuf,
}

impl T1Fitter {
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self { exe: exe.into() }
    }

    pub fn from_location(location: &EngineLocation) -> Self {
        Self::new(location.tool_path(Tool::T1Lite))
    }

    pub fn exe(&self) -> &Path {
        &self.exe
    }

    pub fn fit(&self, req: &T1Request, sink: &mut dyn LogSink) -> Result<FitOutcome<T1Output>, LiteError> {
        let prepared = prepare(req)?;
        let outcome = execute(&self.exe, &prepared, sink)?;

        Ok(outcome.map(|decoded| {
            let blocks = decoded.blocks;
            T1Output {
                params: ParamBlock {
                    names: column_names(Some(t1_param_names(req.options.method)), blocks.params.ncols()),
                    values: blocks.params,
                },
                error_codes: blocks.error_codes,
                options: prepared.options.clone(),
                report: decoded.report,
            }
        }))
    }

    pub fn command(&self, req: &T1Request) -> Result<CommandLine, LiteError> {
        let prepared = prepare(req)?;
        Ok(prepared.command(&self.exe, &WirePaths::dry_run(&req.run)))
    }
}

#[derive(Debug)]
struct PreparedT1<'a> {
    input: SampleMatrix,
    options: T1Options,
    run: &'a RunSettings,
}

impl Prepared for PreparedT1<'_> {
    fn result_prefix(&self) -> &str {
        self.options.method.engine_name()
    }

    fn run_settings(&self) -> &RunSettings {
        self.run
    }

    fn n_samples(&self) -> usize {
        self.input.n_samples
    }

    fn layout(&self) -> ColumnLayout {
        ColumnLayout::t1()
    }

    fn sanitized(&self) -> &SanitizeReport {
        &self.input.sanitized
    }

    fn command(&self, exe: &Path, paths: &WirePaths) -> CommandLine {
        t1_command(exe, &self.options, self.input.primary_width, self.run, paths)
    }

    fn write_inputs(&self, paths: &WirePaths) -> Result<(), LiteError> {
        wire::write_matrix(&paths.input_file(INPUT_DATA_FILE), &self.input.matrix)
    }
}

fn prepare(req: &T1Request) -> Result<PreparedT1<'_>, LiteError> {
    let mut options = req.options.clone();
    // The engine refuses to start without TR for either method.
    if options.tr.is_none() {
        return Err(LiteError::validation(format!(
            "TR is required for {} T1 mapping",
            options.method.engine_name()
        )));
    }

    let mut builder = SampleMatrixBuilder::new(req.signals.clone())?
        .prepend_rows("scanner params", &req.scanner_params)?;
    match &req.b1 {
        Some(b1) => {
            builder = builder.append_column("B1", b1)?;
            options.b1_correction = true;
        }
        None if options.b1_correction => {
            return Err(LiteError::validation("B1 correction requested but no B1 values supplied"));
        }
        None => {}
    }

    Ok(PreparedT1 {
        input: builder.build(req.run.non_finite)?,
        options,
        run: &req.run,
    })
}
