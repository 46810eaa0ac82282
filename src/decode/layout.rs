//! Column layout of the engine's result matrix.
//!
//! Block order is fixed:
//!
//! `[error codes (2)] [residual (0|1)] [IAUC (k)] [params (?)] [modelled series (0|n)] [signal-derived series (0|n)]`
//!
//! Every width except the parameter block is computed from the request. The
//! parameter block is whatever remains after subtracting all known blocks;
//! a result narrower than the known blocks means the engine and the wrapper
//! disagree on the protocol.

use std::path::Path;

use crate::domain::{DceOptions, Matrix};
use crate::error::LiteError;

pub const ERROR_CODES_WIDTH: usize = 2;
pub const RESIDUAL_WIDTH: usize = 1;

/// IAUC times the engine uses when none are passed.
pub const ENGINE_DEFAULT_IAUC_TIMES: [f64; 3] = [60.0, 90.0, 120.0];
pub const ENGINE_DEFAULT_IAUC_AT_PEAK: bool = false;
pub const ENGINE_DEFAULT_OUTPUT_CT_MOD: bool = false;
pub const ENGINE_DEFAULT_OUTPUT_CT_SIG: bool = false;

/// Widths of every block except the parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub error_codes: usize,
    pub residual: usize,
    pub iauc: usize,
    pub modelled: usize,
    pub signal_derived: usize,
}

impl ColumnLayout {
    /// Time-series layout. Unset layout flags resolve to the engine defaults.
    pub fn dce(opts: &DceOptions, n_dyns: usize) -> Self {
        let n_times = opts
            .iauc_times
            .as_ref()
            .map_or(ENGINE_DEFAULT_IAUC_TIMES.len(), Vec::len);
        let at_peak = opts.iauc_at_peak.unwrap_or(ENGINE_DEFAULT_IAUC_AT_PEAK);
        let ct_mod = opts.output_ct_mod.unwrap_or(ENGINE_DEFAULT_OUTPUT_CT_MOD);
        let ct_sig = opts.output_ct_sig.unwrap_or(ENGINE_DEFAULT_OUTPUT_CT_SIG);

        Self {
            error_codes: ERROR_CODES_WIDTH,
            residual: RESIDUAL_WIDTH,
            iauc: n_times + usize::from(at_peak),
            modelled: if ct_mod { n_dyns } else { 0 },
            signal_derived: if ct_sig { n_dyns } else { 0 },
        }
    }

    /// Diffusion layout: errors, residual, params.
    pub fn dwi() -> Self {
        Self {
            error_codes: ERROR_CODES_WIDTH,
            residual: RESIDUAL_WIDTH,
            iauc: 0,
            modelled: 0,
            signal_derived: 0,
        }
    }

    /// Relaxation layout: errors, params.
    pub fn t1() -> Self {
        Self {
            residual: 0,
            ..Self::dwi()
        }
    }

    /// Sum of all computed block widths.
    pub fn known_width(&self) -> usize {
        self.error_codes + self.residual + self.iauc + self.modelled + self.signal_derived
    }

    /// Fix the parameter block width by elimination.
    pub fn resolve(&self, total: usize, path: &Path) -> Result<ResolvedLayout, LiteError> {
        let known = self.known_width();
        if total < known {
            return Err(LiteError::LayoutMismatch {
                path: path.to_path_buf(),
                expected_min: known,
                actual: total,
            });
        }
        let params = total - known;
        if params == 0 {
            tracing::warn!("result '{}' has no parameter columns", path.display());
        }
        Ok(ResolvedLayout {
            blocks: *self,
            params,
        })
    }
}

/// A layout whose parameter width is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLayout {
    pub blocks: ColumnLayout,
    pub params: usize,
}

/// The result matrix cut into its blocks. Absent blocks have zero columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Blocks {
    pub error_codes: Matrix,
    pub residual: Matrix,
    pub iauc: Matrix,
    pub params: Matrix,
    pub modelled: Matrix,
    pub signal_derived: Matrix,
}

impl ResolvedLayout {
    pub fn total_width(&self) -> usize {
        self.blocks.known_width() + self.params
    }

    /// Start column and width of each block in protocol order.
    pub fn spans(&self) -> [(usize, usize); 6] {
        let widths = [
            self.blocks.error_codes,
            self.blocks.residual,
            self.blocks.iauc,
            self.params,
            self.blocks.modelled,
            self.blocks.signal_derived,
        ];
        let mut start = 0;
        widths.map(|w| {
            let span = (start, w);
            start += w;
            span
        })
    }

    /// Split a result matrix; its width must equal `total_width()`.
    pub fn split(&self, result: &Matrix) -> Result<Blocks, LiteError> {
        if result.ncols() != self.total_width() {
            return Err(LiteError::shape(
                "result matrix",
                format!("{} columns", self.total_width()),
                format!("{} columns", result.ncols()),
            ));
        }
        let [err, res, iauc, params, modelled, signal] =
            self.spans().map(|(start, w)| result.columns(start, w).into_owned());
        Ok(Blocks {
            error_codes: err,
            residual: res,
            iauc,
            params,
            modelled,
            signal_derived: signal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::hstack;
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn result_path() -> PathBuf {
        PathBuf::from("/tmp/out/ETM_madym_analysis.dat")
    }

    #[test]
    fn dce_with_both_series_and_three_iauc_times() {
        let mut opts = DceOptions::new("ETM");
        opts.iauc_times = Some(vec![60.0, 90.0, 120.0]);
        opts.output_ct_mod = Some(true);
        opts.output_ct_sig = Some(true);
        let layout = ColumnLayout::dce(&opts, 20);
        assert_eq!(layout.known_width(), 2 + 1 + 3 + 20 + 20);

        let resolved = layout.resolve(50, &result_path()).unwrap();
        assert_eq!(resolved.params, 4);
        assert_eq!(resolved.spans()[3], (6, 4));
        assert_eq!(resolved.spans()[5], (30, 20));
    }

    #[test]
    fn unset_flags_use_engine_defaults() {
        let layout = ColumnLayout::dce(&DceOptions::new("ETM"), 20);
        assert_eq!(layout.iauc, 3);
        assert_eq!(layout.modelled, 0);
        assert_eq!(layout.signal_derived, 0);

        let mut opts = DceOptions::new("ETM");
        opts.iauc_times = Some(vec![60.0]);
        opts.iauc_at_peak = Some(true);
        assert_eq!(ColumnLayout::dce(&opts, 20).iauc, 2);
    }

    #[test]
    fn series_blocks_are_independent() {
        let mut opts = DceOptions::new("ETM");
        opts.output_ct_sig = Some(true);
        let layout = ColumnLayout::dce(&opts, 15);
        assert_eq!((layout.modelled, layout.signal_derived), (0, 15));
    }

    #[test]
    fn dwi_three_by_five_gives_two_params() {
        let result = Matrix::from_fn(3, 5, |i, j| (i * 10 + j) as f64);
        let resolved = ColumnLayout::dwi().resolve(5, &result_path()).unwrap();
        let blocks = resolved.split(&result).unwrap();
        assert_eq!(blocks.error_codes.shape(), (3, 2));
        assert_eq!(blocks.residual.shape(), (3, 1));
        assert_eq!(blocks.params.shape(), (3, 2));
        assert_eq!(blocks.params[(2, 0)], 23.0);
        assert_eq!(blocks.iauc.ncols(), 0);
    }

    #[test]
    fn t1_has_no_residual() {
        let resolved = ColumnLayout::t1().resolve(4, &result_path()).unwrap();
        assert_eq!(resolved.params, 2);
        assert_eq!(resolved.spans()[3], (2, 2));
    }

    #[test]
    fn narrow_result_is_a_layout_mismatch() {
        let mut opts = DceOptions::new("ETM");
        opts.output_ct_mod = Some(true);
        let err = ColumnLayout::dce(&opts, 20).resolve(20, &result_path()).unwrap_err();
        match err {
            LiteError::LayoutMismatch { expected_min, actual, .. } => {
                assert_eq!(expected_min, 26);
                assert_eq!(actual, 20);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    proptest! {
        #[test]
        fn blocks_round_trip(
            n in 1usize..6,
            n_dyns in 1usize..12,
            n_iauc in 0usize..4,
            at_peak in any::<bool>(),
            ct_mod in any::<bool>(),
            ct_sig in any::<bool>(),
            n_params in 0usize..8,
        ) {
            let mut opts = DceOptions::new("ETM");
            opts.iauc_times = Some((0..n_iauc).map(|i| 60.0 * (i + 1) as f64).collect());
            opts.iauc_at_peak = Some(at_peak);
            opts.output_ct_mod = Some(ct_mod);
            opts.output_ct_sig = Some(ct_sig);
            let layout = ColumnLayout::dce(&opts, n_dyns);

            let block = |tag: f64, w: usize| Matrix::from_fn(n, w, |i, j| tag * 1000.0 + (i * 100 + j) as f64);
            let expected = Blocks {
                error_codes: block(1.0, 2),
                residual: block(2.0, 1),
                iauc: block(3.0, layout.iauc),
                params: block(4.0, n_params),
                modelled: block(5.0, layout.modelled),
                signal_derived: block(6.0, layout.signal_derived),
            };
            let result = hstack(&[
                &expected.error_codes,
                &expected.residual,
                &expected.iauc,
                &expected.params,
                &expected.modelled,
                &expected.signal_derived,
            ]).unwrap();

            let resolved = layout.resolve(result.ncols(), &result_path()).unwrap();
            prop_assert_eq!(resolved.params, n_params);
            prop_assert_eq!(resolved.total_width(), result.ncols());
            prop_assert_eq!(resolved.split(&result).unwrap(), expected);
        }
    }
}
