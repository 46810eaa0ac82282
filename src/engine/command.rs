//! Command Assembler.
//!
//! Pure functions from a family's effective options to the engine's ordered
//! token list. Flags are opt-in: an unset option produces no tokens and the
//! engine applies its own default. Output is deterministic for a given input,
//! so dry runs and tests can compare token lists directly.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::domain::{DceOptions, DwiOptions, RunSettings, T1Options};
use crate::io::scratch::WirePaths;
use crate::io::wire::{DYN_NOISE_FILE, DYN_TIMES_FILE, INIT_PARAMS_FILE, INPUT_DATA_FILE};

/// Decimals for acquisition scalars (TR, FA, r1, dose, hct).
const SCALAR_PREC: usize = 3;
/// Decimals for IAUC times.
const IAUC_PREC: usize = 2;
/// Decimals for parameter values (initial, fixed, bounds, limits, repeats, thresholds).
const PARAM_PREC: usize = 4;

/// Executable plus arguments, never joined into a shell string for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Full token list, executable first.
    pub fn tokens(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.args.len() + 1);
        out.push(self.program.display().to_string());
        out.extend(self.args.iter().cloned());
        out
    }

    /// Value following `flag`, if the flag is present.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        let pos = self.args.iter().position(|a| a == flag)?;
        self.args.get(pos + 1).map(String::as_str)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args.iter().map(OsStr::new));
        cmd
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens().join(" "))
    }
}

/// How initial parameters reach the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum InitParamsArg {
    /// One row shared by every sample, passed inline.
    Inline(Vec<f64>),
    /// One row per sample, written to `input_params.dat`.
    File,
}

/// File-borne inputs of a time-series call, decided by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct DceInputs {
    pub n_dyns: usize,
    pub dyn_times: bool,
    pub dyn_noise: bool,
    pub init_params: Option<InitParamsArg>,
}

#[derive(Debug, Default)]
struct Args(Vec<String>);

impl Args {
    fn pair(&mut self, flag: &str, value: impl fmt::Display) -> &mut Self {
        self.0.push(flag.to_string());
        self.0.push(value.to_string());
        self
    }

    fn bool(&mut self, flag: &str, value: Option<bool>) -> &mut Self {
        if let Some(v) = value {
            self.pair(flag, u8::from(v));
        }
        self
    }

    fn float(&mut self, flag: &str, value: Option<f64>, prec: usize) -> &mut Self {
        if let Some(v) = value {
            self.pair(flag, format!("{v:.prec$}"));
        }
        self
    }

    fn int(&mut self, flag: &str, value: Option<usize>) -> &mut Self {
        if let Some(v) = value {
            self.pair(flag, v);
        }
        self
    }

    fn floats(&mut self, flag: &str, values: Option<&[f64]>, prec: usize) -> &mut Self {
        if let Some(vs) = values {
            self.pair(flag, join(vs.iter().map(|v| format!("{v:.prec$}"))));
        }
        self
    }

    fn ints(&mut self, flag: &str, values: Option<&[usize]>) -> &mut Self {
        if let Some(vs) = values {
            self.pair(flag, join(vs.iter().map(usize::to_string)));
        }
        self
    }

    fn path(&mut self, flag: &str, value: Option<&Path>) -> &mut Self {
        if let Some(p) = value {
            self.pair(flag, p.display());
        }
        self
    }

    fn text(&mut self, flag: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            self.pair(flag, v);
        }
        self
    }
}

fn join(parts: impl Iterator<Item = String>) -> String {
    parts.collect::<Vec<_>>().join(",")
}

/// Prefix common to every lite tool after the model selector.
fn data_and_output(args: &mut Args, n_flag: &str, n: usize, run: &RunSettings, paths: &WirePaths) {
    args.pair("--data", paths.input_file(INPUT_DATA_FILE).display())
        .pair(n_flag, n)
        .pair("-o", paths.output_dir.display())
        .pair("-O", &run.output_name);
}

/// `madym_DCE_lite` command.
///
/// `opts` are the effective options: `b1_correction` must already reflect
/// whether a B1 column was appended to the input matrix.
pub fn dce_command(
    exe: &Path,
    opts: &DceOptions,
    inputs: &DceInputs,
    run: &RunSettings,
    paths: &WirePaths,
) -> CommandLine {
    let mut a = Args::default();
    a.pair("-m", &opts.model);
    data_and_output(&mut a, "-n", inputs.n_dyns, run, paths);

    // Always explicit: the input layout depends on it.
    a.pair("--Ct", u8::from(!opts.converts_signal()));
    if opts.converts_signal() {
        a.float("--TR", opts.tr, SCALAR_PREC)
            .float("--FA", opts.fa, SCALAR_PREC)
            .float("--r1", opts.r1_const, SCALAR_PREC)
            .bool("--M0_ratio", opts.m0_ratio);
    }

    a.float("--dose", opts.dose, SCALAR_PREC)
        .float("--hct", opts.hct, SCALAR_PREC)
        .int("--inj", opts.injection_image)
        .int("--first", opts.first_image)
        .int("--last", opts.last_image)
        .bool("--Ct_sig", opts.output_ct_sig)
        .bool("--Ct_mod", opts.output_ct_mod)
        .bool("--no_opt", opts.no_optimise)
        .bool("--test_enh", opts.test_enhancement)
        .path("--aif", opts.aif_name.as_deref())
        .path("--pif", opts.pif_name.as_deref());

    if inputs.dyn_times {
        a.pair("-t", paths.input_file(DYN_TIMES_FILE).display());
    }
    if inputs.dyn_noise {
        a.pair("--dyn_noise", 1)
            .pair("--dyn_noise_file", paths.input_file(DYN_NOISE_FILE).display());
    }

    a.floats("--iauc", opts.iauc_times.as_deref(), IAUC_PREC)
        .bool("--iauc_peak", opts.iauc_at_peak);

    match &inputs.init_params {
        Some(InitParamsArg::Inline(values)) => {
            a.floats("--init_params", Some(values.as_slice()), PARAM_PREC);
        }
        Some(InitParamsArg::File) => {
            a.pair("--init_params_file", paths.input_file(INIT_PARAMS_FILE).display());
        }
        None => {}
    }

    a.ints("--fixed_params", opts.fixed_params.as_deref());
    if opts.fixed_params.is_some() {
        a.floats("--fixed_values", opts.fixed_values.as_deref(), PARAM_PREC);
    }
    a.floats("--lower_bounds", opts.lower_bounds.as_deref(), PARAM_PREC)
        .floats("--upper_bounds", opts.upper_bounds.as_deref(), PARAM_PREC)
        .ints("--relative_limit_params", opts.relative_limit_params.as_deref());
    if opts.relative_limit_params.is_some() {
        a.floats("--relative_limit_values", opts.relative_limit_values.as_deref(), PARAM_PREC);
    }
    a.int("--repeat_param", opts.repeat_param);
    if opts.repeat_param.is_some() {
        a.floats("--repeat_values", opts.repeat_values.as_deref(), PARAM_PREC);
    }

    a.int("--max_iter", opts.max_iter)
        .text("--opt_type", opts.opt_type.as_deref());
    if opts.b1_correction {
        a.pair("--B1_correction", 1);
    }
    a.bool("--quiet", run.quiet);

    CommandLine {
        program: exe.to_path_buf(),
        args: a.0,
    }
}

/// `madym_DWI_lite` command.
pub fn dwi_command(
    exe: &Path,
    opts: &DwiOptions,
    n_signals: usize,
    run: &RunSettings,
    paths: &WirePaths,
) -> CommandLine {
    let mut a = Args::default();
    a.pair("--DWI_model", opts.model.engine_name());
    data_and_output(&mut a, "--n_DWI", n_signals, run, paths);
    a.floats("--Bvals_thresh", opts.bvals_thresh.as_deref(), PARAM_PREC)
        .bool("--quiet", run.quiet);

    CommandLine {
        program: exe.to_path_buf(),
        args: a.0,
    }
}

/// `madym_T1_lite` command.
pub fn t1_command(
    exe: &Path,
    opts: &T1Options,
    n_inputs: usize,
    run: &RunSettings,
    paths: &WirePaths,
) -> CommandLine {
    let mut a = Args::default();
    a.pair("-T", opts.method.engine_name());
    data_and_output(&mut a, "--n_T1", n_inputs, run, paths);
    a.float("--TR", opts.tr, PARAM_PREC)
        .float("--T1_noise", opts.noise_thresh, PARAM_PREC);
    if opts.b1_correction {
        a.pair("--B1_correction", 1);
    }
    a.bool("--quiet", run.quiet);

    CommandLine {
        program: exe.to_path_buf(),
        args: a.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DwiModel, T1Method};
    use proptest::prelude::*;

    fn paths() -> WirePaths {
        WirePaths {
            input_dir: PathBuf::from("/tmp/in"),
            output_dir: PathBuf::from("/tmp/out"),
        }
    }

    fn plain_inputs(n_dyns: usize) -> DceInputs {
        DceInputs {
            n_dyns,
            dyn_times: true,
            dyn_noise: false,
            init_params: None,
        }
    }

    #[test]
    fn minimal_dce_command_has_only_mandatory_tokens() {
        let mut opts = DceOptions::new("ETM");
        opts.input_ct = Some(true);
        let cmd = dce_command(
            Path::new("/opt/madym_DCE_lite"),
            &opts,
            &plain_inputs(20),
            &RunSettings::default(),
            &paths(),
        );
        assert_eq!(
            cmd.tokens(),
            vec![
                "/opt/madym_DCE_lite",
                "-m",
                "ETM",
                "--data",
                "/tmp/in/input_data.dat",
                "-n",
                "20",
                "-o",
                "/tmp/out",
                "-O",
                "madym_analysis.dat",
                "--Ct",
                "1",
                "-t",
                "/tmp/in/dyn_times.dat",
            ]
        );
    }

    #[test]
    fn unset_ct_flag_is_passed_as_signal_input() {
        let mut opts = DceOptions::new("ETM");
        opts.tr = Some(4.0);
        opts.fa = Some(20.0);
        let cmd = dce_command(Path::new("dce"), &opts, &plain_inputs(5), &RunSettings::default(), &paths());
        assert_eq!(cmd.value_of("--Ct"), Some("0"));
        assert_eq!(cmd.value_of("--TR"), Some("4.000"));
        assert_eq!(cmd.value_of("--FA"), Some("20.000"));
        assert!(!cmd.has_flag("--M0_ratio"));
    }

    #[test]
    fn signal_flags_follow_ct_flag() {
        let mut opts = DceOptions::new("2CXM");
        opts.input_ct = Some(false);
        opts.tr = Some(3.5);
        opts.fa = Some(20.0);
        opts.m0_ratio = Some(false);
        let cmd = dce_command(Path::new("dce"), &opts, &plain_inputs(5), &RunSettings::default(), &paths());

        assert_eq!(cmd.value_of("--Ct"), Some("0"));
        assert_eq!(cmd.value_of("--TR"), Some("3.500"));
        assert_eq!(cmd.value_of("--FA"), Some("20.000"));
        assert_eq!(cmd.value_of("--M0_ratio"), Some("0"));
        assert!(!cmd.has_flag("--r1"));
        let args = &cmd.args;
        let ct = args.iter().position(|a| a == "--Ct").unwrap();
        let tr = args.iter().position(|a| a == "--TR").unwrap();
        assert!(ct < tr);
    }

    #[test]
    fn concentration_input_drops_signal_flags() {
        let mut opts = DceOptions::new("ETM");
        opts.input_ct = Some(true);
        opts.tr = Some(3.5);
        let cmd = dce_command(Path::new("dce"), &opts, &plain_inputs(5), &RunSettings::default(), &paths());
        assert_eq!(cmd.value_of("--Ct"), Some("1"));
        assert!(!cmd.has_flag("--TR"));
    }

    #[test]
    fn lists_are_comma_joined_with_fixed_precision() {
        let mut opts = DceOptions::new("ETM");
        opts.iauc_times = Some(vec![60.0, 90.0, 120.0]);
        opts.fixed_params = Some(vec![3, 4]);
        opts.fixed_values = Some(vec![0.0, 0.025]);
        opts.repeat_values = Some(vec![1.0]);
        let inputs = DceInputs {
            init_params: Some(InitParamsArg::Inline(vec![0.2, 0.2, 0.1, 0.0])),
            ..plain_inputs(5)
        };
        let cmd = dce_command(Path::new("dce"), &opts, &inputs, &RunSettings::default(), &paths());
        assert_eq!(cmd.value_of("--iauc"), Some("60.00,90.00,120.00"));
        assert_eq!(cmd.value_of("--init_params"), Some("0.2000,0.2000,0.1000,0.0000"));
        assert_eq!(cmd.value_of("--fixed_params"), Some("3,4"));
        assert_eq!(cmd.value_of("--fixed_values"), Some("0.0000,0.0250"));
        // repeat values without a repeat param are not passed
        assert!(!cmd.has_flag("--repeat_values"));
    }

    #[test]
    fn file_inputs_point_into_input_dir() {
        let mut opts = DceOptions::new("ETM");
        opts.b1_correction = true;
        let inputs = DceInputs {
            n_dyns: 5,
            dyn_times: false,
            dyn_noise: true,
            init_params: Some(InitParamsArg::File),
        };
        let run = RunSettings {
            quiet: Some(true),
            ..RunSettings::default()
        };
        let cmd = dce_command(Path::new("dce"), &opts, &inputs, &run, &paths());
        assert!(!cmd.has_flag("-t"));
        assert_eq!(cmd.value_of("--dyn_noise"), Some("1"));
        assert_eq!(cmd.value_of("--dyn_noise_file"), Some("/tmp/in/dyn_noise.dat"));
        assert_eq!(cmd.value_of("--init_params_file"), Some("/tmp/in/input_params.dat"));
        assert_eq!(cmd.value_of("--B1_correction"), Some("1"));
        assert_eq!(cmd.args[cmd.args.len() - 2..], ["--quiet".to_string(), "1".to_string()]);
    }

    #[test]
    fn dwi_and_t1_commands() {
        let dwi = dwi_command(
            Path::new("dwi"),
            &DwiOptions {
                model: DwiModel::Ivim,
                bvals_thresh: Some(vec![40.0, 60.0]),
            },
            9,
            &RunSettings::default(),
            &paths(),
        );
        assert_eq!(dwi.args[..2], ["--DWI_model".to_string(), "IVIM".to_string()]);
        assert_eq!(dwi.value_of("--n_DWI"), Some("9"));
        assert_eq!(dwi.value_of("--Bvals_thresh"), Some("40.0000,60.0000"));

        let t1 = t1_command(
            Path::new("t1"),
            &T1Options {
                method: T1Method::Vfa,
                tr: Some(3.5),
                noise_thresh: None,
                b1_correction: false,
            },
            3,
            &RunSettings::default(),
            &paths(),
        );
        assert_eq!(t1.value_of("-T"), Some("VFA"));
        assert_eq!(t1.value_of("--n_T1"), Some("3"));
        assert_eq!(t1.value_of("--TR"), Some("3.5000"));
        assert!(!t1.has_flag("--T1_noise"));
        assert!(!t1.has_flag("--B1_correction"));
    }

    fn arb_options() -> impl Strategy<Value = DceOptions> {
        (
            proptest::option::of(any::<bool>()),
            proptest::option::of(0.5f64..10.0),
            proptest::option::of(any::<bool>()),
            proptest::option::of(any::<bool>()),
            proptest::option::of(proptest::collection::vec(0.0f64..300.0, 1..5)),
            proptest::option::of(proptest::collection::vec(1usize..5, 1..3)),
            proptest::option::of(1usize..500),
        )
            .prop_map(|(ct, tr, sig, m0, iauc, fixed, iter)| DceOptions {
                input_ct: ct,
                tr,
                output_ct_sig: sig,
                m0_ratio: m0,
                iauc_times: iauc,
                fixed_params: fixed,
                max_iter: iter,
                ..DceOptions::new("ETM")
            })
    }

    proptest! {
        #[test]
        fn assembly_is_deterministic(opts in arb_options(), n_dyns in 1usize..100, quiet in proptest::option::of(any::<bool>())) {
            let run = RunSettings { quiet, ..RunSettings::default() };
            let inputs = plain_inputs(n_dyns);
            let a = dce_command(Path::new("dce"), &opts, &inputs, &run, &paths());
            let b = dce_command(Path::new("dce"), &opts.clone(), &inputs.clone(), &run.clone(), &paths());
            prop_assert_eq!(a.tokens(), b.tokens());
            prop_assert_eq!(a.to_string(), b.to_string());
            // every flag is followed by a value
            prop_assert_eq!(a.args.len() % 2, 0);
        }
    }
}
