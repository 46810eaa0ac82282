//! Synthetic samples with known ground truth.
//!
//! Used by `mlite synth` and by tests that need realistic engine inputs.
//! Every generator is deterministic for a given seed.

use clap::ValueEnum;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::domain::{DwiModel, Matrix, T1Method};
use crate::error::LiteError;
use crate::math::tile_row;
use crate::models::{adc_signal, dwi_param_names, ir_signal, ivim_signal, t1_param_names, vfa_signal};

/// Noise added to synthetic magnitude signals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NoiseKind {
    /// Magnitude of a complex signal with Gaussian noise on both channels.
    #[default]
    Rician,
    Gaussian,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseSpec {
    pub kind: NoiseKind,
    /// Standard deviation per channel; zero disables noise.
    pub sigma: f64,
    pub seed: u64,
}

impl Default for NoiseSpec {
    fn default() -> Self {
        Self {
            kind: NoiseKind::Rician,
            sigma: 0.0,
            seed: 42,
        }
    }
}

/// Signals generated for one parameter set, repeated over `n` samples.
#[derive(Debug, Clone)]
pub struct SyntheticSet {
    /// Samples × acquisitions.
    pub signals: Matrix,
    /// B-values, flip angles or inversion times (one per column of `signals`).
    pub acquisition: Vec<f64>,
    /// Ground-truth parameters in catalogue order.
    pub truth: Vec<f64>,
}

/// Diffusion signals for the ADC or IVIM model.
pub fn dwi_samples(
    model: DwiModel,
    b_values: &[f64],
    truth: &[f64],
    n_samples: usize,
    noise: NoiseSpec,
) -> Result<SyntheticSet, LiteError> {
    check_truth(dwi_param_names(model), truth)?;
    let row: Vec<f64> = b_values
        .iter()
        .map(|&b| match model {
            DwiModel::Adc => adc_signal(b, truth[0], truth[1]),
            DwiModel::Ivim => ivim_signal(b, truth[0], truth[1], truth[2], truth[3]),
        })
        .collect();
    finish(row, b_values, truth, n_samples, noise)
}

/// Relaxation signals for VFA (`tr` required) or IR.
pub fn t1_samples(
    method: T1Method,
    scanner_params: &[f64],
    truth: &[f64],
    tr: Option<f64>,
    n_samples: usize,
    noise: NoiseSpec,
) -> Result<SyntheticSet, LiteError> {
    check_truth(t1_param_names(method), truth)?;
    let (t1, m0) = (truth[0], truth[1]);
    let row: Vec<f64> = match method {
        T1Method::Vfa => {
            let tr = tr.ok_or_else(|| LiteError::validation("TR is required for VFA signals"))?;
            scanner_params.iter().map(|&fa| vfa_signal(fa, t1, m0, tr, 1.0)).collect()
        }
        T1Method::Ir => scanner_params.iter().map(|&ti| ir_signal(ti, t1, m0)).collect(),
    };
    finish(row, scanner_params, truth, n_samples, noise)
}

/// Add noise in place.
pub fn add_noise(signals: &mut Matrix, noise: NoiseSpec) -> Result<(), LiteError> {
    if noise.sigma == 0.0 {
        return Ok(());
    }
    let normal = Normal::new(0.0, noise.sigma)
        .map_err(|e| LiteError::validation(format!("invalid noise sigma {}: {e}", noise.sigma)))?;
    let mut rng = StdRng::seed_from_u64(noise.seed);

    for v in signals.iter_mut() {
        *v = match noise.kind {
            NoiseKind::Gaussian => *v + normal.sample(&mut rng),
            NoiseKind::Rician => {
                let re = *v + normal.sample(&mut rng);
                let im = normal.sample(&mut rng);
                re.hypot(im)
            }
        };
    }
    Ok(())
}

fn finish(
    row: Vec<f64>,
    acquisition: &[f64],
    truth: &[f64],
    n_samples: usize,
    noise: NoiseSpec,
) -> Result<SyntheticSet, LiteError> {
    if n_samples == 0 || row.is_empty() {
        return Err(LiteError::validation("synthetic data needs at least one sample and one acquisition"));
    }
    let mut signals = tile_row(&row, n_samples);
    add_noise(&mut signals, noise)?;
    Ok(SyntheticSet {
        signals,
        acquisition: acquisition.to_vec(),
        truth: truth.to_vec(),
    })
}

fn check_truth(names: &[&str], truth: &[f64]) -> Result<(), LiteError> {
    if truth.len() != names.len() {
        return Err(LiteError::shape(
            "ground truth",
            format!("{} values ({})", names.len(), names.join(", ")),
            format!("{} values", truth.len()),
        ));
    }
    Ok(())
}
