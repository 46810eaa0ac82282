//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - locates the engine tool for the chosen family
//! - builds and runs one request per input file
//! - prints summaries and writes optional exports

use std::path::Path;

use clap::Parser;

use crate::cli::{Cli, Command, CommonArgs, SynthArgs, SynthModel, ToolArg, VersionArgs};
use crate::data::{NoiseSpec, dwi_samples, t1_samples};
use crate::domain::{DwiModel, T1Method};
use crate::engine::{Tool, engine_version};
use crate::error::LiteError;
use crate::fit::{DceFitter, DwiFitter, FitOutcome, FittedOutput, T1Fitter};
use crate::io::{write_matrix, write_vector};
use crate::report::{format_dry_run, format_fit_summary};

pub mod pipeline;

use pipeline::InputJob;

/// Entry point for the `mlite` binary.
pub fn run() -> Result<(), LiteError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let engine = cli.engine.as_deref();
    let root = cli.engine_root.as_deref();

    match cli.command {
        Command::Dce(args) => {
            let fitter = DceFitter::new(pipeline::resolve_engine(engine, root, Tool::DceLite));
            let jobs = pipeline::build_jobs(&args.common, |data, run| pipeline::dce_request(&args, data, run))?;
            report_outcomes(&args.common, &jobs, pipeline::run_jobs(&jobs, |req, sink| fitter.fit(req, sink)))
        }
        Command::Dwi(args) => {
            let fitter = DwiFitter::new(pipeline::resolve_engine(engine, root, Tool::DwiLite));
            let jobs = pipeline::build_jobs(&args.common, |data, run| pipeline::dwi_request(&args, data, run))?;
            report_outcomes(&args.common, &jobs, pipeline::run_jobs(&jobs, |req, sink| fitter.fit(req, sink)))
        }
        Command::T1(args) => {
            let fitter = T1Fitter::new(pipeline::resolve_engine(engine, root, Tool::T1Lite));
            let jobs = pipeline::build_jobs(&args.common, |data, run| pipeline::t1_request(&args, data, run))?;
            report_outcomes(&args.common, &jobs, pipeline::run_jobs(&jobs, |req, sink| fitter.fit(req, sink)))
        }
        Command::Synth(args) => handle_synth(&args),
        Command::Version(args) => handle_version(&args, engine, root),
    }
}

/// Print each outcome and write its exports; the first failure becomes the
/// process error once every input has been reported.
fn report_outcomes<R, O: FittedOutput>(
    common: &CommonArgs,
    jobs: &[InputJob<R>],
    outcomes: Vec<Result<FitOutcome<O>, LiteError>>,
) -> Result<(), LiteError> {
    let n_total = outcomes.len();
    let mut first_error = None;
    let mut n_failed = 0;

    for (job, outcome) in jobs.iter().zip(outcomes) {
        let input = job.input.display().to_string();
        let result = outcome.and_then(|outcome| match outcome {
            FitOutcome::DryRun(cmd) => {
                println!("{}", format_dry_run(&cmd));
                Ok(())
            }
            FitOutcome::Fitted(output) => {
                println!("{}", format_fit_summary(&output, &input));
                pipeline::write_exports(&output, &job.input, common)
            }
        });
        if let Err(e) = result {
            n_failed += 1;
            if n_total > 1 {
                tracing::error!("{input}: {e}");
            }
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => {
            if n_total > 1 {
                tracing::error!("{n_failed} of {n_total} inputs failed");
            }
            Err(e)
        }
        None => Ok(()),
    }
}

fn handle_synth(args: &SynthArgs) -> Result<(), LiteError> {
    let noise = NoiseSpec {
        kind: args.noise,
        sigma: args.sigma,
        seed: args.seed,
    };
    let set = match args.model {
        SynthModel::Adc => dwi_samples(DwiModel::Adc, &args.acquisition, &args.truth, args.samples, noise)?,
        SynthModel::Ivim => dwi_samples(DwiModel::Ivim, &args.acquisition, &args.truth, args.samples, noise)?,
        SynthModel::Vfa => t1_samples(T1Method::Vfa, &args.acquisition, &args.truth, args.tr, args.samples, noise)?,
        SynthModel::Ir => t1_samples(T1Method::Ir, &args.acquisition, &args.truth, args.tr, args.samples, noise)?,
    };

    write_matrix(&args.out, &set.signals)?;
    if let Some(path) = &args.acquisition_out {
        write_vector(path, &set.acquisition)?;
    }
    println!(
        "Wrote {} samples x {} acquisitions to {}",
        set.signals.nrows(),
        set.signals.ncols(),
        args.out.display()
    );
    Ok(())
}

fn handle_version(args: &VersionArgs, engine: Option<&Path>, root: Option<&Path>) -> Result<(), LiteError> {
    let tool = match args.tool {
        ToolArg::Dce => Tool::DceLite,
        ToolArg::Dwi => Tool::DwiLite,
        ToolArg::T1 => Tool::T1Lite,
    };
    let exe = pipeline::resolve_engine(engine, root, tool);
    let version = engine_version(&exe)?;
    println!("{}: {version}", exe.display());
    Ok(())
}
