//! Diffusion-weighted fitting through `madym_DWI_lite`.

use std::path::{Path, PathBuf};

use crate::data::{SampleMatrix, SampleMatrixBuilder, SanitizeReport};
use crate::decode::ColumnLayout;
use crate::domain::{DwiOptions, DwiRequest, Matrix, RunSettings};
use crate::engine::command::dwi_command;
use crate::engine::{CommandLine, EngineLocation, LogSink, Tool};
use crate::error::LiteError;
use crate::fit::{
    CallReport, FitOutcome, FittedOutput, ParamBlock,
    Prepared, error_code_names, execute, options_to_json, first_column, reject_empty,
};
use crate::io::export::ResultTable;
use crate::io::scratch::WirePaths;
use crate::io::wire::{self, INPUT_DATA_FILE};
use crate::models::{column_names, dwi_param_names};

/// Decoded diffusion fit.
#[derive(Debug, Clone)]
pub struct DwiOutput {
    pub params: ParamBlock,
    pub residual: Vec<f64>,
    pub error_codes: Matrix,
    pub options: DwiOptions,
    pub report: CallReport,
}

impl FittedOutput for DwiOutput {
    fn family(&self) -> &'static str {
        "dwi"
    }

    fn model_name(&self) -> &str {
        self.options.model.engine_name()
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
        options_to_json("DWI options", &self.options)
    }

    fn table(&self) -> Result<ResultTable, LiteError> {
        let mut table = ResultTable::new();
        table.push_block(&error_code_names(), &self.error_codes)?;
        table.push_column("residual", self.residual.clone())?;
        table.push_block(&self.params.names, &self.params.values)?;
        Ok(table)
    }
}

#[derive(Debug, Clone)]
pub struct DwiFitter {
    exe: PathBuf,
}

impl DwiFitter {
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self { exe: exe.into() }
    }

    pub fn from_location(location: &EngineLocation) -> Self {
        Self::new(location.tool_path(Tool::DwiLite))
    }

    pub fn exe(&self) -> &Path {
        &self.exe
    }

    pub fn fit(&self, req: &DwiRequest, sink: &mut dyn LogSink) -> Result<FitOutcome<DwiOutput>, LiteError> {
        let prepared = prepare(req)?;
        let outcome = execute(&self.exe, &prepared, sink)?;

        Ok(outcome.map(|decoded| {
            let blocks = decoded.blocks;
            DwiOutput {
                params: ParamBlock {
                    names: column_names(Some(dwi_param_names(req.options.model)), blocks.params.ncols()),
                    values: blocks.params,
                },
                residual: first_column(&blocks.residual),
                error_codes: blocks.error_codes,
                options: req.options.clone(),
                report: decoded.report,
            }
        }))
    }

    pub fn command(&self, req: &DwiRequest) -> Result<CommandLine, LiteError> {
        let prepared = prepare(req)?;
        Ok(prepared.command(&self.exe, &WirePaths::dry_run(&req.run)))
    }
}

#[derive(Debug)]
struct PreparedDwi<'a> {
    input: SampleMatrix,
    options: &'a DwiOptions,
    run: &'a RunSettings,
}

impl Prepared for PreparedDwi<'_> {
    fn result_prefix(&self) -> &str {
        self.options.model.engine_name()
    }

    fn run_settings(&self) -> &RunSettings {
        self.run
    }

    fn n_samples(&self) -> usize {
        self.input.n_samples
    }

    fn layout(&self) -> ColumnLayout {
        ColumnLayout::dwi()
    }

    fn sanitized(&self) -> &SanitizeReport {
        &self.input.sanitized
    }

    fn command(&self, exe: &Path, paths: &WirePaths) -> CommandLine {
        dwi_command(exe, self.options, self.input.primary_width, self.run, paths)
    }

    fn write_inputs(&self, paths: &WirePaths) -> Result<(), LiteError> {
        wire::write_matrix(&paths.input_file(INPUT_DATA_FILE), &self.input.matrix)
    }
}

fn prepare(req: &DwiRequest) -> Result<PreparedDwi<'_>, LiteError> {
    reject_empty("B-value thresholds", req.options.bvals_thresh.as_deref())?;

    // B-values precede the signals on each row.
    let input = SampleMatrixBuilder::new(req.signals.clone())?
        .prepend_rows("B-values", &req.b_values)?
        .build(req.run.non_finite)?;

    Ok(PreparedDwi {
        input,
        options: &req.options,
        run: &req.run,
    })
}
