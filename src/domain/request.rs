//! Per-family request types.
//!
//! Each family splits its request into:
//!
//! - numeric inputs (primary matrix + auxiliary arrays)
//! - an options struct mirroring the engine's flags
//! - shared `RunSettings`
//!
//! Every engine flag with an engine-side default is an `Option`: `None` means
//! "do not pass the flag", which is distinct from an explicit `Some(false)`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::types::{DwiModel, Matrix, RunSettings, SampleColumn, SampleRows, T1Method};

/// Engine default for `--Ct`: input series are raw signal.
pub const ENGINE_DEFAULT_INPUT_CT: bool = false;

/// Options for `madym_DCE_lite` (tracer-kinetic time-series fitting).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DceOptions {
    /// Model name in capitals, e.g. `ETM`, `2CXM`.
    pub model: String,

    /// Input series are concentrations (`true`) or raw signal (`false`).
    /// Unset means the engine default (signal).
    pub input_ct: Option<bool>,
    /// TR of the dynamic series (ms); required for signal input.
    pub tr: Option<f64>,
    /// Flip angle of the dynamic series (degrees); required for signal input.
    pub fa: Option<f64>,
    /// Relaxivity constant.
    pub r1_const: Option<f64>,
    /// Scale signal by the ratio method instead of a supplied M0.
    pub m0_ratio: Option<bool>,
    /// Set when a B1 column is appended to the input matrix.
    #[serde(default)]
    pub b1_correction: bool,

    pub dose: Option<f64>,
    pub hct: Option<f64>,
    pub injection_image: Option<usize>,
    pub first_image: Option<usize>,
    pub last_image: Option<usize>,

    /// Precomputed AIF file; a population AIF is used when unset.
    pub aif_name: Option<PathBuf>,
    /// Precomputed PIF file.
    pub pif_name: Option<PathBuf>,

    /// Request signal-derived concentration series in the output.
    pub output_ct_sig: Option<bool>,
    /// Request modelled concentration series in the output.
    pub output_ct_mod: Option<bool>,
    pub no_optimise: Option<bool>,
    pub test_enhancement: Option<bool>,

    /// Times (s, post injection) at which IAUC is computed.
    pub iauc_times: Option<Vec<f64>>,
    pub iauc_at_peak: Option<bool>,

    /// 1-based indices of parameters fixed at their initial values.
    pub fixed_params: Option<Vec<usize>>,
    pub fixed_values: Option<Vec<f64>>,
    pub lower_bounds: Option<Vec<f64>>,
    pub upper_bounds: Option<Vec<f64>>,
    pub relative_limit_params: Option<Vec<usize>>,
    pub relative_limit_values: Option<Vec<f64>>,
    /// 1-based index of the parameter swept over `repeat_values`.
    pub repeat_param: Option<usize>,
    pub repeat_values: Option<Vec<f64>>,

    pub max_iter: Option<usize>,
    pub opt_type: Option<String>,
}

impl DceOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// True when the primary input is raw signal that the engine must convert.
    pub fn converts_signal(&self) -> bool {
        !self.input_ct.unwrap_or(ENGINE_DEFAULT_INPUT_CT)
    }

    /// True when an M0 column is expected after the T1 column.
    ///
    /// The engine's ratio method is on by default, so only an explicit
    /// `Some(false)` asks for M0.
    pub fn needs_m0(&self) -> bool {
        self.converts_signal() && self.m0_ratio == Some(false)
    }
}

/// A time-series fitting request.
#[derive(Debug, Clone, PartialEq)]
pub struct DceRequest {
    /// Samples × time points (signal or concentration).
    pub data: Matrix,
    /// Time of each dynamic (minutes); required with a population AIF.
    pub dyn_times: Option<Vec<f64>>,
    /// Baseline T1 (ms), required for signal input.
    pub t1: Option<SampleColumn>,
    /// Baseline M0, required for signal input without the ratio method.
    pub m0: Option<SampleColumn>,
    /// Flip-angle correction factor per sample.
    pub b1: Option<SampleColumn>,
    /// Temporal noise per time point.
    pub dyn_noise: Option<Vec<f64>>,
    /// Initial parameters: one shared row (inline) or one row per sample (file).
    pub init_params: Option<SampleRows>,
    pub options: DceOptions,
    pub run: RunSettings,
}

impl DceRequest {
    pub fn new(model: impl Into<String>, data: Matrix) -> Self {
        Self {
            data,
            dyn_times: None,
            t1: None,
            m0: None,
            b1: None,
            dyn_noise: None,
            init_params: None,
            options: DceOptions::new(model),
            run: RunSettings::default(),
        }
    }
}

/// Options for `madym_DWI_lite`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DwiOptions {
    pub model: DwiModel,
    /// B-value thresholds separating low/high sets for IVIM initialisation.
    pub bvals_thresh: Option<Vec<f64>>,
}

/// A diffusion-weighted fitting request.
#[derive(Debug, Clone, PartialEq)]
pub struct DwiRequest {
    /// Samples × B-values.
    pub signals: Matrix,
    pub b_values: SampleRows,
    pub options: DwiOptions,
    pub run: RunSettings,
}

impl DwiRequest {
    pub fn new(model: DwiModel, signals: Matrix, b_values: impl Into<SampleRows>) -> Self {
        Self {
            signals,
            b_values: b_values.into(),
            options: DwiOptions {
                model,
                bvals_thresh: None,
            },
            run: RunSettings::default(),
        }
    }
}

/// Options for `madym_T1_lite`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct T1Options {
    pub method: T1Method,
    /// Repetition time (ms); the engine requires it for every method.
    pub tr: Option<f64>,
    /// Upper T1 noise threshold.
    pub noise_thresh: Option<f64>,
    /// Set when a B1 column is appended to the input matrix.
    #[serde(default)]
    pub b1_correction: bool,
}

/// A relaxation-time fitting request.
#[derive(Debug, Clone, PartialEq)]
pub struct T1Request {
    /// Samples × inputs (one signal per flip angle / inversion time).
    pub signals: Matrix,
    /// Flip angles (VFA) or inversion times (IR).
    pub scanner_params: SampleRows,
    pub b1: Option<SampleColumn>,
    pub options: T1Options,
    pub run: RunSettings,
}

impl T1Request {
    pub fn new(method: T1Method, signals: Matrix, scanner_params: impl Into<SampleRows>) -> Self {
        Self {
            signals,
            scanner_params: scanner_params.into(),
            b1: None,
            options: T1Options {
                method,
                tr: None,
                noise_thresh: None,
                b1_correction: false,
            },
            run: RunSettings::default(),
        }
    }
}
