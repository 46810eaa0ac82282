//! Reporting utilities: parameter statistics and run summaries.

pub mod format;

pub use format::*;

use chrono::Utc;

use crate::domain::Matrix;
use crate::error::LiteError;
use crate::fit::{FittedOutput, ParamBlock};
use crate::io::export::{LayoutSummary, ParamStats, RunSummary};

/// Samples whose first error code is nonzero.
pub fn failed_samples(error_codes: &Matrix) -> Vec<usize> {
    if error_codes.ncols() == 0 {
        return Vec::new();
    }
    error_codes
        .column(0)
        .iter()
        .enumerate()
        .filter(|(_, code)| **code != 0.0)
        .map(|(i, _)| i)
        .collect()
}

/// Per-parameter statistics over samples that fitted without error.
pub fn param_stats(params: &ParamBlock, error_codes: &Matrix) -> Vec<ParamStats> {
    let failed = failed_samples(error_codes);
    params
        .names
        .iter()
        .zip(params.values.column_iter())
        .map(|(name, col)| {
            let mut values: Vec<f64> = col
                .iter()
                .enumerate()
                .filter(|(i, v)| v.is_finite() && !failed.contains(i))
                .map(|(_, v)| *v)
                .collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            stats_of(name, &values)
        })
        .collect()
}

fn stats_of(name: &str, sorted: &[f64]) -> ParamStats {
    let n = sorted.len();
    if n == 0 {
        return ParamStats {
            name: name.to_string(),
            n,
            mean: f64::NAN,
            median: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
        };
    }
    let median = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    };
    ParamStats {
        name: name.to_string(),
        n,
        mean: sorted.iter().sum::<f64>() / n as f64,
        median,
        min: sorted[0],
        max: sorted[n - 1],
    }
}

/// JSON-ready summary of a decoded fit.
pub fn run_summary(output: &dyn FittedOutput, input: &str) -> Result<RunSummary, LiteError> {
    let report = output.report();
    let layout = &report.layout;
    Ok(RunSummary {
        tool: "mlite".to_string(),
        family: output.family().to_string(),
        model: output.model_name().to_string(),
        created_at: Utc::now(),
        input: input.to_string(),
        command: report.command.tokens(),
        options: output.options_json()?,
        n_samples: output.params().values.nrows(),
        n_failed: failed_samples(output.error_codes()).len(),
        layout: LayoutSummary {
            error_codes: layout.blocks.error_codes,
            residual: layout.blocks.residual,
            iauc: layout.blocks.iauc,
            params: layout.params,
            modelled: layout.blocks.modelled,
            signal_derived: layout.blocks.signal_derived,
        },
        zeroed_rows: report.sanitized.rows.clone(),
        params: param_stats(output.params(), output.error_codes()),
    })
}
