//! Shared domain types.
//!
//! These are the "vocabulary" of the lite protocol: numeric matrices with
//! samples as rows, auxiliary inputs that are either shared by every sample or
//! supplied per sample, and the run-level settings common to all families.

use std::path::PathBuf;

use clap::ValueEnum;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Dense numeric table, one row per sample.
pub type Matrix = DMatrix<f64>;

/// Default base name of the engine's result file.
pub const DEFAULT_OUTPUT_NAME: &str = "madym_analysis.dat";

/// A per-sample scalar (one extra input column).
///
/// `Shared` is broadcast to every sample; `PerSample` must hold exactly one
/// value per sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleColumn {
    Shared(f64),
    PerSample(Vec<f64>),
}

impl SampleColumn {
    /// Interpret a flat list: a single value is shared, anything else is per sample.
    pub fn from_values(values: Vec<f64>) -> Self {
        if values.len() == 1 {
            SampleColumn::Shared(values[0])
        } else {
            SampleColumn::PerSample(values)
        }
    }
}

impl From<f64> for SampleColumn {
    fn from(value: f64) -> Self {
        SampleColumn::Shared(value)
    }
}

impl From<Vec<f64>> for SampleColumn {
    fn from(values: Vec<f64>) -> Self {
        SampleColumn::from_values(values)
    }
}

/// A per-sample row of values (e.g. B-values, flip angles, initial parameters).
///
/// `Shared` is one row used for every sample; `PerSample` is an N-row matrix.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleRows {
    Shared(Vec<f64>),
    PerSample(Matrix),
}

impl SampleRows {
    /// Number of values per sample.
    pub fn width(&self) -> usize {
        match self {
            SampleRows::Shared(v) => v.len(),
            SampleRows::PerSample(m) => m.ncols(),
        }
    }
}

impl From<Vec<f64>> for SampleRows {
    fn from(values: Vec<f64>) -> Self {
        SampleRows::Shared(values)
    }
}

impl From<Matrix> for SampleRows {
    fn from(values: Matrix) -> Self {
        SampleRows::PerSample(values)
    }
}

/// What to do with sample rows containing NaN or infinite values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NonFinitePolicy {
    /// Replace the whole row with zeros and warn once (batch keeps running).
    #[default]
    Zero,
    /// Fail the request, listing the offending rows.
    Reject,
}

/// Diffusion model fitted by `madym_DWI_lite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum DwiModel {
    Adc,
    Ivim,
}

impl DwiModel {
    /// Name as understood by the engine.
    pub fn engine_name(self) -> &'static str {
        match self {
            DwiModel::Adc => "ADC",
            DwiModel::Ivim => "IVIM",
        }
    }
}

/// T1 mapping method used by `madym_T1_lite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum T1Method {
    /// Variable flip angle; scanner params are flip angles (degrees).
    Vfa,
    /// Inversion recovery; scanner params are inversion times (ms).
    Ir,
}

impl T1Method {
    pub fn engine_name(self) -> &'static str {
        match self {
            T1Method::Vfa => "VFA",
            T1Method::Ir => "IR",
        }
    }
}

/// Settings shared by every family: where files go and how the call behaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Engine output directory. When unset a temporary directory is created
    /// and removed after decoding.
    pub output_dir: Option<PathBuf>,
    /// Base name of the result file; the engine prefixes it with the model name.
    pub output_name: String,
    /// Working directory of the engine process.
    pub working_dir: Option<PathBuf>,
    /// Parent for the owned temporary directories (system temp dir if unset).
    pub scratch_root: Option<PathBuf>,
    /// Assemble and return the command without writing files or running it.
    pub dry_run: bool,
    /// Engine `--quiet` flag (unset = engine default).
    pub quiet: Option<bool>,
    pub non_finite: NonFinitePolicy,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            output_dir: None,
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            working_dir: None,
            scratch_root: None,
            dry_run: false,
            quiet: None,
            non_finite: NonFinitePolicy::Zero,
        }
    }
}
