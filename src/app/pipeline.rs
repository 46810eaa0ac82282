//! Shared "fit pipeline" logic used by every fitting subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load inputs -> build requests -> run (one or many) -> exports
//!
//! The subcommand handlers can then focus on presentation.

use std::path::{Path, PathBuf};

use crate::cli::{CommonArgs, DceArgs, DwiArgs, NumberSource, T1Args, export_path_for};
use crate::domain::{DceRequest, DwiRequest, Matrix, RunSettings, T1Request};
use crate::engine::{EngineLocation, LogSink, Tool, TracingSink};
use crate::error::LiteError;
use crate::fit::{FitOutcome, FittedOutput, fit_all};
use crate::io::{read_matrix, write_results_csv, write_summary_json};

/// One input file and the request built from it.
#[derive(Debug, Clone)]
pub struct InputJob<R> {
    pub input: PathBuf,
    pub request: R,
}

/// Pick the executable: an explicit path wins over a root directory, which
/// wins over `MADYM_ROOT`.
pub fn resolve_engine(exe: Option<&Path>, root: Option<&Path>, tool: Tool) -> PathBuf {
    match (exe, root) {
        (Some(exe), _) => exe.to_path_buf(),
        (None, Some(root)) => EngineLocation::new(root).tool_path(tool),
        (None, None) => EngineLocation::from_env().tool_path(tool),
    }
}

/// Run settings for one input.
///
/// With several inputs a caller output directory gets one subdirectory per
/// input so result files never collide.
pub fn run_settings(common: &CommonArgs, input: &Path) -> RunSettings {
    let output_dir = common.output_dir.as_ref().map(|dir| {
        if common.data.len() > 1 {
            dir.join(input_stem(input))
        } else {
            dir.clone()
        }
    });
    RunSettings {
        output_dir,
        output_name: common.output_name.clone(),
        working_dir: common.working_dir.clone(),
        scratch_root: common.scratch_root.clone(),
        dry_run: common.dry_run,
        quiet: common.quiet,
        non_finite: common.non_finite,
    }
}

/// Read every `--data` file and build one request per file.
pub fn build_jobs<R>(
    common: &CommonArgs,
    build: impl Fn(Matrix, RunSettings) -> Result<R, LiteError>,
) -> Result<Vec<InputJob<R>>, LiteError> {
    common
        .data
        .iter()
        .map(|input| {
            let data = read_matrix(input)?;
            tracing::debug!("{}: {} x {} input", input.display(), data.nrows(), data.ncols());
            let request = build(data, run_settings(common, input))?;
            Ok(InputJob {
                input: input.clone(),
                request,
            })
        })
        .collect()
}

pub fn dce_request(args: &DceArgs, data: Matrix, run: RunSettings) -> Result<DceRequest, LiteError> {
    let mut req = DceRequest::new(args.model.clone(), data);
    req.dyn_times = args.dyn_times.as_ref().map(NumberSource::values).transpose()?;
    req.dyn_noise = args.dyn_noise.as_ref().map(NumberSource::values).transpose()?;
    req.t1 = args.t1.as_ref().map(NumberSource::column).transpose()?;
    req.m0 = args.m0.as_ref().map(NumberSource::column).transpose()?;
    req.b1 = args.b1.as_ref().map(NumberSource::column).transpose()?;
    req.init_params = args.init_params.as_ref().map(NumberSource::rows).transpose()?;

    let opts = &mut req.options;
    opts.input_ct = args.input_ct;
    opts.tr = args.tr;
    opts.fa = args.fa;
    opts.r1_const = args.r1;
    opts.m0_ratio = args.m0_ratio;
    opts.dose = args.dose;
    opts.hct = args.hct;
    opts.injection_image = args.inj;
    opts.first_image = args.first;
    opts.last_image = args.last;
    opts.aif_name = args.aif.clone();
    opts.pif_name = args.pif.clone();
    opts.output_ct_sig = args.ct_sig;
    opts.output_ct_mod = args.ct_mod;
    opts.no_optimise = args.no_opt;
    opts.test_enhancement = args.test_enh;
    opts.iauc_times = args.iauc.clone();
    opts.iauc_at_peak = args.iauc_peak;
    opts.fixed_params = args.fixed_params.clone();
    opts.fixed_values = args.fixed_values.clone();
    opts.lower_bounds = args.lower_bounds.clone();
    opts.upper_bounds = args.upper_bounds.clone();
    opts.relative_limit_params = args.relative_limit_params.clone();
    opts.relative_limit_values = args.relative_limit_values.clone();
    opts.repeat_param = args.repeat_param;
    opts.repeat_values = args.repeat_values.clone();
    opts.max_iter = args.max_iter;
    opts.opt_type = args.opt_type.clone();

    req.run = run;
    Ok(req)
}

pub fn dwi_request(args: &DwiArgs, data: Matrix, run: RunSettings) -> Result<DwiRequest, LiteError> {
    let mut req = DwiRequest::new(args.model, data, args.b_values.rows()?);
    req.options.bvals_thresh = args.bvals_thresh.clone();
    req.run = run;
    Ok(req)
}

pub fn t1_request(args: &T1Args, data: Matrix, run: RunSettings) -> Result<T1Request, LiteError> {
    let mut req = T1Request::new(args.method, data, args.scanner_params.rows()?);
    req.b1 = args.b1.as_ref().map(NumberSource::column).transpose()?;
    req.options.tr = args.tr;
    req.options.noise_thresh = args.noise_thresh;
    req.run = run;
    Ok(req)
}

/// Run every job. A single job streams engine output untagged; several jobs
/// run in parallel with per-input labels.
pub fn run_jobs<R, O, F>(jobs: &[InputJob<R>], fit: F) -> Vec<Result<FitOutcome<O>, LiteError>>
where
    R: Sync,
    O: Send,
    F: Fn(&R, &mut dyn LogSink) -> Result<FitOutcome<O>, LiteError> + Sync,
{
    if let [job] = jobs {
        let mut sink = TracingSink;
        return vec![fit(&job.request, &mut sink)];
    }
    let labelled: Vec<(String, &R)> = jobs
        .iter()
        .map(|job| (input_stem(&job.input), &job.request))
        .collect();
    fit_all(&labelled, |req, sink| fit(*req, sink))
}

/// Write the optional CSV table and JSON summary for one fitted input.
pub fn write_exports(output: &dyn FittedOutput, input: &Path, common: &CommonArgs) -> Result<(), LiteError> {
    let n_inputs = common.data.len();
    if let Some(base) = &common.export {
        let path = export_path_for(base, input, n_inputs);
        write_results_csv(&path, &output.table()?)?;
        tracing::info!("wrote results to {}", path.display());
    }
    if let Some(base) = &common.summary {
        let path = export_path_for(base, input, n_inputs);
        let summary = crate::report::run_summary(output, &input.display().to_string())?;
        write_summary_json(&path, &summary)?;
        tracing::info!("wrote summary to {}", path.display());
    }
    Ok(())
}

fn input_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string())
}
