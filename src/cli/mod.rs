//! Command-line parsing for the `mlite` engine wrapper.
//!
//! The goal of this module is to keep **argument parsing** separate from
//! request building and engine orchestration.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::data::NoiseKind;
use crate::domain::{DwiModel, Matrix, NonFinitePolicy, SampleColumn, SampleRows, T1Method};
use crate::error::LiteError;
use crate::io::wire::read_matrix;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "mlite", version, about = "Batch wrappers for the madym lite fitting tools")]
pub struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: tracing::Level,

    /// Engine executable to run (overrides the tool found under the engine root).
    #[arg(long, global = true, value_name = "EXE")]
    pub engine: Option<PathBuf>,

    /// Directory holding the madym tools (overrides MADYM_ROOT).
    #[arg(long = "engine-root", global = true, value_name = "DIR")]
    pub engine_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a tracer-kinetic model to DCE time series.
    Dce(DceArgs),
    /// Fit a diffusion model to DWI signals.
    Dwi(DwiArgs),
    /// Map baseline T1 from VFA or IR signals.
    T1(T1Args),
    /// Write synthetic DWI or T1 signals with known ground truth.
    Synth(SynthArgs),
    /// Print the version reported by an engine tool.
    Version(VersionArgs),
}

/// Options shared by every fitting command.
#[derive(Debug, Args, Clone)]
pub struct CommonArgs {
    /// Input matrix files (one sample per row). Several files run in parallel.
    #[arg(long, required = true, num_args = 1.., value_name = "FILE")]
    pub data: Vec<PathBuf>,

    /// Keep engine output here instead of a temporary directory.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Base name of the engine result file.
    #[arg(long, default_value = crate::domain::DEFAULT_OUTPUT_NAME)]
    pub output_name: String,

    /// Working directory for the engine process.
    #[arg(long, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Parent directory for temporary input/output directories.
    #[arg(long, value_name = "DIR")]
    pub scratch_root: Option<PathBuf>,

    /// Print the engine command without writing files or running it.
    #[arg(long)]
    pub dry_run: bool,

    /// Engine quiet flag (0/1).
    #[arg(long, value_parser = parse_flag)]
    pub quiet: Option<bool>,

    /// What to do with samples containing NaN or infinite values.
    #[arg(long, value_enum, default_value_t = NonFinitePolicy::Zero)]
    pub non_finite: NonFinitePolicy,

    /// Export per-sample results to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export a JSON run summary.
    #[arg(long, value_name = "JSON")]
    pub summary: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct DceArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Tracer-kinetic model (ETM, DIETM, 2CXM, ...).
    #[arg(short = 'm', long)]
    pub model: String,

    /// Dynamic times in minutes (inline list or file).
    #[arg(long, value_name = "LIST|FILE")]
    pub dyn_times: Option<NumberSource>,

    /// Temporal noise per time point (inline list or file).
    #[arg(long, value_name = "LIST|FILE")]
    pub dyn_noise: Option<NumberSource>,

    /// Input is concentration (1) or signal (0, the engine default).
    #[arg(long, value_parser = parse_flag)]
    pub input_ct: Option<bool>,

    /// Baseline T1 (value, per-sample list, or file).
    #[arg(long, value_name = "VALUE|LIST|FILE")]
    pub t1: Option<NumberSource>,

    /// Baseline M0 (value, per-sample list, or file).
    #[arg(long, value_name = "VALUE|LIST|FILE")]
    pub m0: Option<NumberSource>,

    /// B1 correction factors (value, per-sample list, or file).
    #[arg(long, value_name = "VALUE|LIST|FILE")]
    pub b1: Option<NumberSource>,

    #[arg(long)]
    pub tr: Option<f64>,

    #[arg(long)]
    pub fa: Option<f64>,

    #[arg(long)]
    pub r1: Option<f64>,

    /// Use the M0 ratio method (0/1).
    #[arg(long, value_parser = parse_flag)]
    pub m0_ratio: Option<bool>,

    #[arg(long)]
    pub dose: Option<f64>,

    #[arg(long)]
    pub hct: Option<f64>,

    /// Injection image index.
    #[arg(long)]
    pub inj: Option<usize>,

    #[arg(long)]
    pub first: Option<usize>,

    #[arg(long)]
    pub last: Option<usize>,

    /// Precomputed AIF file.
    #[arg(long)]
    pub aif: Option<PathBuf>,

    /// Precomputed PIF file.
    #[arg(long)]
    pub pif: Option<PathBuf>,

    /// Output signal-derived concentration series (0/1).
    #[arg(long, value_parser = parse_flag)]
    pub ct_sig: Option<bool>,

    /// Output modelled concentration series (0/1).
    #[arg(long, value_parser = parse_flag)]
    pub ct_mod: Option<bool>,

    #[arg(long, value_parser = parse_flag)]
    pub no_opt: Option<bool>,

    #[arg(long, value_parser = parse_flag)]
    pub test_enh: Option<bool>,

    /// IAUC times (s), comma separated.
    #[arg(long, value_delimiter = ',')]
    pub iauc: Option<Vec<f64>>,

    #[arg(long, value_parser = parse_flag)]
    pub iauc_peak: Option<bool>,

    /// Initial parameters: one shared list, or a file with one row per sample.
    #[arg(long, value_name = "LIST|FILE")]
    pub init_params: Option<NumberSource>,

    /// 1-based indices of fixed parameters.
    #[arg(long, value_delimiter = ',')]
    pub fixed_params: Option<Vec<usize>>,

    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub fixed_values: Option<Vec<f64>>,

    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub lower_bounds: Option<Vec<f64>>,

    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub upper_bounds: Option<Vec<f64>>,

    #[arg(long, value_delimiter = ',')]
    pub relative_limit_params: Option<Vec<usize>>,

    #[arg(long, value_delimiter = ',')]
    pub relative_limit_values: Option<Vec<f64>>,

    #[arg(long)]
    pub repeat_param: Option<usize>,

    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub repeat_values: Option<Vec<f64>>,

    #[arg(long)]
    pub max_iter: Option<usize>,

    #[arg(long)]
    pub opt_type: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct DwiArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[arg(short = 'm', long, value_enum)]
    pub model: DwiModel,

    /// B-values: one shared list, or a file with one row per sample.
    #[arg(long, value_name = "LIST|FILE")]
    pub b_values: NumberSource,

    /// B-value thresholds for IVIM initialisation, comma separated.
    #[arg(long, value_delimiter = ',')]
    pub bvals_thresh: Option<Vec<f64>>,
}

#[derive(Debug, Args, Clone)]
pub struct T1Args {
    #[command(flatten)]
    pub common: CommonArgs,

    #[arg(long, value_enum, default_value_t = T1Method::Vfa)]
    pub method: T1Method,

    /// Flip angles (VFA) or inversion times (IR): shared list or per-sample file.
    #[arg(long, value_name = "LIST|FILE")]
    pub scanner_params: NumberSource,

    /// Repetition time in ms (required).
    #[arg(long)]
    pub tr: Option<f64>,

    /// Upper T1 noise threshold.
    #[arg(long)]
    pub noise_thresh: Option<f64>,

    /// B1 correction factors (value, per-sample list, or file).
    #[arg(long, value_name = "VALUE|LIST|FILE")]
    pub b1: Option<NumberSource>,
}

/// Which synthetic signal model to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SynthModel {
    Adc,
    Ivim,
    Vfa,
    Ir,
}

#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    #[arg(long, value_enum)]
    pub model: SynthModel,

    /// B-values, flip angles or inversion times, comma separated.
    #[arg(long, value_delimiter = ',', required = true)]
    pub acquisition: Vec<f64>,

    /// Ground-truth parameters in catalogue order (e.g. S0,ADC).
    #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
    pub truth: Vec<f64>,

    /// Number of samples.
    #[arg(short = 'n', long, default_value_t = 100)]
    pub samples: usize,

    /// Noise standard deviation (0 = noiseless).
    #[arg(long, default_value_t = 0.0)]
    pub sigma: f64,

    #[arg(long, value_enum, default_value_t = NoiseKind::Rician)]
    pub noise: NoiseKind,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Repetition time in ms (VFA only).
    #[arg(long)]
    pub tr: Option<f64>,

    /// Signals output file.
    #[arg(long, value_name = "FILE")]
    pub out: PathBuf,

    /// Also write the acquisition values (one per line) here.
    #[arg(long, value_name = "FILE")]
    pub acquisition_out: Option<PathBuf>,
}

/// Which lite tool to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ToolArg {
    Dce,
    Dwi,
    T1,
}

#[derive(Debug, Args, Clone)]
pub struct VersionArgs {
    #[arg(long, value_enum, default_value_t = ToolArg::Dce)]
    pub tool: ToolArg,
}

/// Numbers given inline (`1000` or `0,20,40`) or as a path to a wire-format file.
#[derive(Debug, Clone, PartialEq)]
pub enum NumberSource {
    Inline(Vec<f64>),
    File(PathBuf),
}

impl FromStr for NumberSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty value".to_string());
        }
        let parsed: Result<Vec<f64>, _> = s.split(',').map(|p| p.trim().parse::<f64>()).collect();
        match parsed {
            Ok(values) => Ok(NumberSource::Inline(values)),
            Err(_) => Ok(NumberSource::File(PathBuf::from(s))),
        }
    }
}

impl NumberSource {
    /// Load as a matrix; inline values form a single row.
    pub fn load(&self) -> Result<Matrix, LiteError> {
        match self {
            NumberSource::Inline(values) => Ok(crate::math::row_vector(values)),
            NumberSource::File(path) => read_matrix(path),
        }
    }

    /// Flat list of values (a file may hold one value per line or per column).
    pub fn values(&self) -> Result<Vec<f64>, LiteError> {
        let m = self.load()?;
        if m.nrows() > 1 && m.ncols() > 1 {
            return Err(LiteError::shape(
                self.label(),
                "a single row or column",
                format!("{}x{} matrix", m.nrows(), m.ncols()),
            ));
        }
        Ok(m.iter().copied().collect())
    }

    /// Per-sample scalar column.
    pub fn column(&self) -> Result<SampleColumn, LiteError> {
        self.values().map(SampleColumn::from_values)
    }

    /// A shared row, or per-sample rows when a file holds a full matrix.
    pub fn rows(&self) -> Result<SampleRows, LiteError> {
        let m = self.load()?;
        if m.nrows() > 1 && m.ncols() > 1 {
            Ok(SampleRows::PerSample(m))
        } else {
            Ok(SampleRows::Shared(m.iter().copied().collect()))
        }
    }

    fn label(&self) -> String {
        match self {
            NumberSource::Inline(_) => "inline values".to_string(),
            NumberSource::File(path) => path.display().to_string(),
        }
    }
}

/// Parse an engine boolean: `0/1`, `true/false`, `yes/no`, `on/off`.
pub fn parse_flag(s: &str) -> Result<bool, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("expected 0/1 or true/false, got '{other}'")),
    }
}

/// Derive a per-input export path when several inputs share one export option.
pub fn export_path_for(base: &Path, input: &Path, n_inputs: usize) -> PathBuf {
    if n_inputs <= 1 {
        return base.to_path_buf();
    }
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("export");
    let input_stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("input");
    let name = match base.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_{input_stem}.{ext}"),
        None => format!("{stem}_{input_stem}"),
    };
    base.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_source_parses_inline_or_path() {
        assert_eq!("1000".parse::<NumberSource>().unwrap(), NumberSource::Inline(vec![1000.0]));
        assert_eq!(
            "0, 20,40".parse::<NumberSource>().unwrap(),
            NumberSource::Inline(vec![0.0, 20.0, 40.0])
        );
        assert_eq!(
            "data/t1.dat".parse::<NumberSource>().unwrap(),
            NumberSource::File(PathBuf::from("data/t1.dat"))
        );
    }

    #[test]
    fn inline_rows_are_shared() {
        let src = NumberSource::Inline(vec![0.0, 500.0]);
        assert_eq!(src.rows().unwrap(), SampleRows::Shared(vec![0.0, 500.0]));
        assert_eq!(NumberSource::Inline(vec![1.0]).column().unwrap(), SampleColumn::Shared(1.0));
    }

    #[test]
    fn file_matrix_is_per_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bvals.dat");
        std::fs::write(&path, "0 500\n0 600\n0 700\n").unwrap();
        let src = NumberSource::File(path.clone());
        assert!(matches!(src.rows().unwrap(), SampleRows::PerSample(m) if m.shape() == (3, 2)));
        assert!(src.values().is_err());

        std::fs::write(&path, "1000\n1100\n").unwrap();
        assert_eq!(src.column().unwrap(), SampleColumn::PerSample(vec![1000.0, 1100.0]));
    }

    #[test]
    fn flags_accept_engine_style_booleans() {
        assert_eq!(parse_flag("1"), Ok(true));
        assert_eq!(parse_flag("False"), Ok(false));
        assert!(parse_flag("maybe").is_err());
    }

    #[test]
    fn export_paths_get_input_suffix_for_batches() {
        let base = Path::new("out/results.csv");
        assert_eq!(export_path_for(base, Path::new("a.dat"), 1), PathBuf::from("out/results.csv"));
        assert_eq!(
            export_path_for(base, Path::new("in/voxels_01.dat"), 3),
            PathBuf::from("out/results_voxels_01.csv")
        );
    }

    #[test]
    fn cli_parses_dwi_command() {
        let cli = Cli::try_parse_from([
            "mlite",
            "dwi",
            "--data",
            "signals.dat",
            "--model",
            "ivim",
            "--b-values",
            "0,20,40",
            "--bvals-thresh",
            "40,60",
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Command::Dwi(args) => {
                assert_eq!(args.model, DwiModel::Ivim);
                assert!(args.common.dry_run);
                assert_eq!(args.bvals_thresh, Some(vec![40.0, 60.0]));
                assert_eq!(args.common.output_name, "madym_analysis.dat");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_keeps_unset_tristate_flags_unset() {
        let cli = Cli::try_parse_from([
            "mlite", "dce", "--data", "ct.dat", "-m", "ETM", "--dyn-times", "times.dat", "--ct-mod", "1",
        ])
        .unwrap();
        match cli.command {
            Command::Dce(args) => {
                assert_eq!(args.ct_mod, Some(true));
                assert_eq!(args.ct_sig, None);
                assert_eq!(args.iauc, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
