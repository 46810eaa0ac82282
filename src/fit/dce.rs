//! Tracer-kinetic time-series fitting through `madym_DCE_lite`.

use std::path::{Path, PathBuf};

use crate::data::{SampleMatrix, SampleMatrixBuilder, SanitizeReport, broadcast_rows, zero_non_finite};
use crate::decode::ColumnLayout;
use crate::domain::{DceOptions, DceRequest, Matrix, RunSettings, SampleRows};
use crate::engine::command::{DceInputs, InitParamsArg, dce_command};
use crate::engine::{CommandLine, EngineLocation, LogSink, Tool};
use crate::error::LiteError;
use crate::fit::{
    CallReport, FitOutcome, FittedOutput, ParamBlock, Prepared,
    error_code_names, execute, options_to_json, first_column, non_empty, reject_empty,
};
use crate::io::export::ResultTable;
use crate::io::scratch::WirePaths;
use crate::io::wire::{self, DYN_NOISE_FILE, DYN_TIMES_FILE, INIT_PARAMS_FILE, INPUT_DATA_FILE};
use crate::models::{column_names, dce_param_names};

/// Decoded time-series fit.
#[derive(Debug, Clone)]
pub struct DceOutput {
    pub params: ParamBlock,
    /// Model fit residual per sample.
    pub residual: Vec<f64>,
    /// Samples × (IAUC times [+ peak]).
    pub iauc: Matrix,
    /// Samples × 2.
    pub error_codes: Matrix,
    /// Modelled concentration series, when requested.
    pub ct_mod: Option<Matrix>,
    /// Signal-derived concentration series, when requested.
    pub ct_sig: Option<Matrix>,
    /// Options as passed to the engine.
    pub options: DceOptions,
    pub report: CallReport,
}

impl FittedOutput for DceOutput {
    fn family(&self) -> &'static str {
        "dce"
    }

    fn model_name(&self) -> &str {
        &self.options.model
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
        options_to_json("DCE options", &self.options)
    }

    fn table(&self) -> Result<ResultTable, LiteError> {
        let mut table = ResultTable::new();
        table.push_block(&error_code_names(), &self.error_codes)?;
        table.push_column("residual", self.residual.clone())?;
        table.push_series("iauc", &self.iauc)?;
        table.push_block(&self.params.names, &self.params.values)?;
        if let Some(ct_mod) = &self.ct_mod {
            table.push_series("ct_mod", ct_mod)?;
        }
        if let Some(ct_sig) = &self.ct_sig {
            table.push_series("ct_sig", ct_sig)?;
        }
        Ok(table)
    }
}

/// Runs time-series requests against one `madym_DCE_lite` executable.
#[derive(Debug, Clone)]
pub struct DceFitter {
    exe: PathBuf,
}

impl DceFitter {
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self { exe: exe.into() }
    }

    pub fn from_location(location: &EngineLocation) -> Self {
        Self::new(location.tool_path(Tool::DceLite))
    }

    pub fn exe(&self) -> &Path {
        &self.exe
    }

    /// Validate, encode, run and decode one request.
    pub fn fit(&self, req: &DceRequest, sink: &mut dyn LogSink) -> Result<FitOutcome<DceOutput>, LiteError> {
        let prepared = prepare(req)?;
        let outcome = execute(&self.exe, &prepared, sink)?;

        Ok(outcome.map(|decoded| {
            let blocks = decoded.blocks;
            let names = column_names(dce_param_names(&prepared.options.model), blocks.params.ncols());
            DceOutput {
                params: ParamBlock {
                    names,
                    values: blocks.params,
                },
                residual: first_column(&blocks.residual),
                iauc: blocks.iauc,
                error_codes: blocks.error_codes,
                ct_mod: non_empty(blocks.modelled),
                ct_sig: non_empty(blocks.signal_derived),
                options: prepared.options.clone(),
                report: decoded.report,
            }
        }))
    }

    /// The command a request would run, without touching the filesystem.
    pub fn command(&self, req: &DceRequest) -> Result<CommandLine, LiteError> {
        let prepared = prepare(req)?;
        Ok(prepared.command(&self.exe, &WirePaths::dry_run(&prepared.run)))
    }
}

#[derive(Debug)]
struct PreparedDce {
    input: SampleMatrix,
    options: DceOptions,
    inputs: DceInputs,
    dyn_times: Option<Vec<f64>>,
    dyn_noise: Option<Vec<f64>>,
    init_file: Option<Matrix>,
    run: RunSettings,
}

impl Prepared for PreparedDce {
    fn result_prefix(&self) -> &str {
        &self.options.model
    }

    fn run_settings(&self) -> &RunSettings {
        &self.run
    }

    fn n_samples(&self) -> usize {
        self.input.n_samples
    }

    fn layout(&self) -> ColumnLayout {
        ColumnLayout::dce(&self.options, self.inputs.n_dyns)
    }

    fn sanitized(&self) -> &SanitizeReport {
        &self.input.sanitized
    }

    fn command(&self, exe: &Path, paths: &WirePaths) -> CommandLine {
        dce_command(exe, &self.options, &self.inputs, &self.run, paths)
    }

    fn write_inputs(&self, paths: &WirePaths) -> Result<(), LiteError> {
        wire::write_matrix(&paths.input_file(INPUT_DATA_FILE), &self.input.matrix)?;
        if let Some(times) = &self.dyn_times {
            wire::write_vector(&paths.input_file(DYN_TIMES_FILE), times)?;
        }
        if let Some(noise) = &self.dyn_noise {
            wire::write_vector(&paths.input_file(DYN_NOISE_FILE), noise)?;
        }
        if let Some(init) = &self.init_file {
            wire::write_matrix(&paths.input_file(INIT_PARAMS_FILE), init)?;
        }
        Ok(())
    }
}

fn prepare(req: &DceRequest) -> Result<PreparedDce, LiteError> {
    let mut options = req.options.clone();
    if options.model.trim().is_empty() {
        return Err(LiteError::validation("model name must not be empty"));
    }
    validate_option_lists(&options)?;

    let mut builder = SampleMatrixBuilder::new(req.data.clone())?;
    let n_samples = builder.n_samples();
    let n_dyns = builder.primary_width();

    if options.converts_signal() {
        let t1 = req
            .t1
            .as_ref()
            .ok_or_else(|| LiteError::validation("T1 values are required to convert signal to concentration"))?;
        if options.tr.is_none() || options.fa.is_none() {
            return Err(LiteError::validation(
                "TR and FA are required to convert signal to concentration",
            ));
        }
        builder = builder.append_column("T1", t1)?;

        if options.needs_m0() {
            let m0 = req
                .m0
                .as_ref()
                .ok_or_else(|| LiteError::validation("M0 values are required when the M0 ratio method is off"))?;
            builder = builder.append_column("M0", m0)?;
        } else if req.m0.is_some() {
            tracing::debug!("M0 supplied but the ratio method is in use; ignoring it");
        }
    } else if req.t1.is_some() || req.m0.is_some() {
        tracing::debug!("input is concentration; ignoring T1/M0");
    }

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

    if req.dyn_times.is_none() && options.aif_name.is_none() {
        return Err(LiteError::validation(
            "dynamic times are required unless an AIF file is given",
        ));
    }
    check_series_len("dynamic times", req.dyn_times.as_deref(), n_dyns)?;
    check_series_len("dynamic noise", req.dyn_noise.as_deref(), n_dyns)?;

    let (init_arg, init_file) = match &req.init_params {
        None => (None, None),
        Some(rows) => init_params(rows, n_samples, &options)?,
    };

    let input = builder.build(req.run.non_finite)?;

    Ok(PreparedDce {
        input,
        inputs: DceInputs {
            n_dyns,
            dyn_times: req.dyn_times.is_some(),
            dyn_noise: req.dyn_noise.is_some(),
            init_params: init_arg,
        },
        options,
        dyn_times: req.dyn_times.clone(),
        dyn_noise: req.dyn_noise.clone(),
        init_file,
        run: req.run.clone(),
    })
}

/// One shared row goes inline; per-sample rows go to a file.
fn init_params(
    rows: &SampleRows,
    n_samples: usize,
    options: &DceOptions,
) -> Result<(Option<InitParamsArg>, Option<Matrix>), LiteError> {
    let width = dce_param_names(&options.model).map(<[&str]>::len);
    if let Some(n) = width.filter(|&n| rows.width() != n) {
        return Err(LiteError::shape(
            "initial parameters",
            format!("{n} values for {}", options.model),
            format!("{} values", rows.width()),
        ));
    }

    match rows {
        SampleRows::Shared(values) => Ok((Some(InitParamsArg::Inline(values.clone())), None)),
        SampleRows::PerSample(m) if m.nrows() == 1 => {
            Ok((Some(InitParamsArg::Inline(m.row(0).iter().copied().collect())), None))
        }
        SampleRows::PerSample(_) => {
            let mut per_sample = broadcast_rows("initial parameters", rows, n_samples, None)?;
            let zeroed = zero_non_finite(&mut per_sample);
            if zeroed > 0 {
                tracing::warn!("{zeroed} non-finite initial parameter value(s) set to zero");
            }
            Ok((Some(InitParamsArg::File), Some(per_sample)))
        }
    }
}

fn check_series_len(name: &str, values: Option<&[f64]>, n_dyns: usize) -> Result<(), LiteError> {
    match values {
        Some(v) if v.len() != n_dyns => Err(LiteError::shape(
            name,
            format!("{n_dyns} values (one per time point)"),
            format!("{} values", v.len()),
        )),
        _ => Ok(()),
    }
}

fn validate_option_lists(opts: &DceOptions) -> Result<(), LiteError> {
    reject_empty("IAUC times", opts.iauc_times.as_deref())?;
    reject_empty("fixed params", opts.fixed_params.as_deref())?;
    reject_empty("relative limit params", opts.relative_limit_params.as_deref())?;
    reject_empty("repeat values", opts.repeat_values.as_deref())?;

    paired("fixed", opts.fixed_params.as_deref(), opts.fixed_values.as_deref())?;
    paired(
        "relative limit",
        opts.relative_limit_params.as_deref(),
        opts.relative_limit_values.as_deref(),
    )?;
    match (opts.repeat_param, &opts.repeat_values) {
        (None, Some(_)) => {
            return Err(LiteError::validation("repeat values given without a repeat param"));
        }
        (Some(_), None) => {
            return Err(LiteError::validation("repeat param given without repeat values"));
        }
        _ => {}
    }

    let Some(names) = dce_param_names(&opts.model) else {
        tracing::debug!("model {} not in catalogue; parameter checks skipped", opts.model);
        return Ok(());
    };
    let n = names.len();

    let indices = opts
        .fixed_params
        .iter()
        .flatten()
        .chain(opts.relative_limit_params.iter().flatten())
        .chain(opts.repeat_param.iter());
    for &idx in indices {
        if idx == 0 || idx > n {
            return Err(LiteError::validation(format!(
                "parameter index {idx} out of range 1..={n} for {}",
                opts.model
            )));
        }
    }
    for (name, bounds) in [("lower bounds", &opts.lower_bounds), ("upper bounds", &opts.upper_bounds)] {
        if let Some(b) = bounds.as_ref().filter(|b| b.len() != n) {
            return Err(LiteError::shape(
                name,
                format!("{n} values for {}", opts.model),
                format!("{} values", b.len()),
            ));
        }
    }
    Ok(())
}

/// Values need their index list, and both lists must be the same length.
fn paired(name: &str, params: Option<&[usize]>, values: Option<&[f64]>) -> Result<(), LiteError> {
    match (params, values) {
        (None, Some(_)) => Err(LiteError::validation(format!(
            "{name} values given without {name} params"
        ))),
        (Some(p), Some(v)) if p.len() != v.len() => Err(LiteError::shape(
            format!("{name} values"),
            format!("{} values (one per {name} param)", p.len()),
            format!("{} values", v.len()),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SampleColumn;

    fn request(n: usize, n_dyns: usize) -> DceRequest {
        let mut req = DceRequest::new("ETM", Matrix::from_element(n, n_dyns, 0.5));
        req.dyn_times = Some((0..n_dyns).map(|t| t as f64 * 0.1).collect());
        req.options.input_ct = Some(true);
        req
    }

    #[test]
    fn unset_ct_flag_is_treated_as_signal_input() {
        let mut req = DceRequest::new("ETM", Matrix::from_element(2, 5, 100.0));
        req.dyn_times = Some((0..5).map(|t| t as f64 * 0.1).collect());
        assert!(matches!(prepare(&req), Err(LiteError::Validation(_))));

        req.t1 = Some(SampleColumn::Shared(1000.0));
        req.options.tr = Some(4.0);
        req.options.fa = Some(20.0);
        let prepared = prepare(&req).unwrap();
        assert_eq!(prepared.input.matrix.shape(), (2, 6));
        assert_eq!(prepared.input.matrix[(1, 5)], 1000.0);

        let cmd = DceFitter::new("dce").command(&req).unwrap();
        assert_eq!(cmd.value_of("-n"), Some("5"));
        assert_eq!(cmd.value_of("--Ct"), Some("0"));
        assert_eq!(cmd.value_of("--TR"), Some("4.000"));
        assert_eq!(cmd.value_of("--FA"), Some("20.000"));
    }

    #[test]
    fn signal_input_appends_t1_then_m0() {
        let mut req = request(2, 4);
        req.options.input_ct = Some(false);
        req.options.tr = Some(4.0);
        req.options.fa = Some(20.0);
        req.options.m0_ratio = Some(false);
        req.t1 = Some(SampleColumn::Shared(1000.0));
        req.m0 = Some(SampleColumn::PerSample(vec![5.0, 6.0]));
        req.b1 = Some(SampleColumn::Shared(0.9));

        let prepared = prepare(&req).unwrap();
        let m = &prepared.input.matrix;
        assert_eq!(m.shape(), (2, 7));
        assert_eq!(m.row(1).iter().skip(4).copied().collect::<Vec<_>>(), vec![1000.0, 6.0, 0.9]);
        assert!(prepared.options.b1_correction);
        assert_eq!(prepared.inputs.n_dyns, 4);
    }

    #[test]
    fn ratio_method_skips_m0_column() {
        let mut req = request(1, 3);
        req.options.input_ct = Some(false);
        req.options.tr = Some(4.0);
        req.options.fa = Some(20.0);
        req.t1 = Some(SampleColumn::Shared(1000.0));
        req.m0 = Some(SampleColumn::Shared(1.0));
        assert_eq!(prepare(&req).unwrap().input.matrix.ncols(), 4);
    }

    #[test]
    fn signal_input_requires_t1_tr_fa() {
        let mut req = request(1, 3);
        req.options.input_ct = Some(false);
        assert!(prepare(&req).is_err());

        req.t1 = Some(SampleColumn::Shared(1000.0));
        req.options.tr = Some(4.0);
        assert!(matches!(prepare(&req), Err(e) if e.to_string().contains("TR and FA")));
    }

    #[test]
    fn dyn_times_checked_against_series_length() {
        let mut req = request(2, 5);
        req.dyn_times = Some(vec![0.0, 1.0]);
        assert!(matches!(prepare(&req), Err(LiteError::Shape { .. })));

        req.dyn_times = None;
        assert!(prepare(&req).is_err());
        req.options.aif_name = Some(PathBuf::from("aif.txt"));
        assert!(prepare(&req).is_ok());
    }

    #[test]
    fn empty_iauc_list_is_rejected() {
        let mut req = request(1, 3);
        req.options.iauc_times = Some(vec![]);
        assert!(prepare(&req).is_err());
    }

    #[test]
    fn paired_lists_must_match() {
        let mut req = request(1, 3);
        req.options.fixed_values = Some(vec![0.1]);
        assert!(prepare(&req).is_err());

        req.options.fixed_params = Some(vec![3, 4]);
        assert!(prepare(&req).is_err());

        req.options.fixed_values = Some(vec![0.1, 0.0]);
        assert!(prepare(&req).is_ok());
    }

    #[test]
    fn catalogue_checks_indices_and_bounds() {
        let mut req = request(1, 3);
        req.options.fixed_params = Some(vec![5]);
        assert!(prepare(&req).is_err());

        let mut req = request(1, 3);
        req.options.lower_bounds = Some(vec![0.0; 3]);
        assert!(prepare(&req).is_err());

        // unknown models pass through unchecked
        let mut req = request(1, 3);
        req.options.model = "MY_NEW_MODEL".into();
        req.options.fixed_params = Some(vec![9]);
        assert!(prepare(&req).is_ok());
    }

    #[test]
    fn per_sample_init_params_go_to_file() {
        let mut req = request(3, 4);
        let mut init = Matrix::from_element(3, 4, 0.1);
        init[(1, 2)] = f64::NAN;
        req.init_params = Some(SampleRows::PerSample(init));
        let prepared = prepare(&req).unwrap();
        assert_eq!(prepared.inputs.init_params, Some(InitParamsArg::File));
        let file = prepared.init_file.unwrap();
        assert_eq!(file[(1, 2)], 0.0);
        assert_eq!(file[(1, 1)], 0.1);

        let mut req = request(3, 4);
        req.init_params = Some(SampleRows::Shared(vec![0.2, 0.2, 0.1, 0.0]));
        let prepared = prepare(&req).unwrap();
        assert!(matches!(prepared.inputs.init_params, Some(InitParamsArg::Inline(_))));
        assert!(prepared.init_file.is_none());
    }

    #[test]
    fn b1_flag_without_values_is_rejected() {
        let mut req = request(1, 3);
        req.options.b1_correction = true;
        assert!(prepare(&req).is_err());
    }

    #[test]
    fn dry_run_command_uses_placeholder_paths() {
        let mut req = request(2, 3);
        req.run.dry_run = true;
        let fitter = DceFitter::new("/opt/madym/madym_DCE_lite");
        let cmd = fitter.command(&req).unwrap();
        assert_eq!(cmd.value_of("-n"), Some("3"));
        assert!(cmd.value_of("--data").unwrap().contains("mlite-in-dry-run"));

        let mut sink = |_: &str| {};
        let outcome = fitter.fit(&req, &mut sink).unwrap();
        match outcome {
            FitOutcome::DryRun(dry) => assert_eq!(dry, cmd),
            FitOutcome::Fitted(_) => panic!("dry run must not fit"),
        }
    }
}
