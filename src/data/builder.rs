//! SampleMatrix builder.
//!
//! Turns caller arrays into the exact matrix the engine reads from its input
//! file:
//!
//! - normalize the primary array to samples × features
//! - broadcast shared auxiliary values to every sample (or shape-check per-sample ones)
//! - prepend/append auxiliary blocks in the order the engine expects
//! - sanitize rows containing NaN/inf
//!
//! Nothing here touches the filesystem; every error is raised before I/O.

use crate::domain::{Matrix, NonFinitePolicy, SampleColumn, SampleRows};
use crate::error::LiteError;
use crate::math::{as_samples, hstack, tile_row};

/// Rows that were found to contain non-finite values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    /// Zero-based sample indices, ascending.
    pub rows: Vec<usize>,
}

impl SanitizeReport {
    pub fn is_clean(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Output of the builder: the final input matrix plus what was sanitized.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleMatrix {
    pub matrix: Matrix,
    pub n_samples: usize,
    /// Width of the primary block (time points, B-values, flip angles, ...).
    pub primary_width: usize,
    pub sanitized: SanitizeReport,
}

/// Assembles the engine input matrix block by block.
#[derive(Debug, Clone)]
pub struct SampleMatrixBuilder {
    n_samples: usize,
    primary_width: usize,
    leading: Vec<Matrix>,
    primary: Matrix,
    trailing: Vec<Matrix>,
}

impl SampleMatrixBuilder {
    /// Start from the primary array. The sample count is fixed from here on.
    pub fn new(primary: Matrix) -> Result<Self, LiteError> {
        let primary = as_samples(primary);
        if primary.nrows() == 0 || primary.ncols() == 0 {
            return Err(LiteError::validation(format!(
                "input data must have at least one sample and one value, got {}x{}",
                primary.nrows(),
                primary.ncols()
            )));
        }
        Ok(Self {
            n_samples: primary.nrows(),
            primary_width: primary.ncols(),
            leading: Vec::new(),
            primary,
            trailing: Vec::new(),
        })
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn primary_width(&self) -> usize {
        self.primary_width
    }

    /// Put a per-sample row block before the primary block.
    ///
    /// The block must be as wide as the primary block (one B-value or flip
    /// angle per input signal).
    pub fn prepend_rows(mut self, name: &str, rows: &SampleRows) -> Result<Self, LiteError> {
        let block = broadcast_rows(name, rows, self.n_samples, Some(self.primary_width))?;
        self.leading.push(block);
        Ok(self)
    }

    /// Append one per-sample column after everything added so far.
    pub fn append_column(mut self, name: &str, column: &SampleColumn) -> Result<Self, LiteError> {
        let values = broadcast_column(name, column, self.n_samples)?;
        self.trailing
            .push(Matrix::from_column_slice(self.n_samples, 1, &values));
        Ok(self)
    }

    /// Concatenate all blocks and sanitize non-finite rows.
    pub fn build(self, policy: NonFinitePolicy) -> Result<SampleMatrix, LiteError> {
        let mut blocks: Vec<&Matrix> = self.leading.iter().collect();
        blocks.push(&self.primary);
        blocks.extend(self.trailing.iter());
        let mut matrix = hstack(&blocks)?;

        let sanitized = sanitize_rows(&mut matrix, policy)?;
        Ok(SampleMatrix {
            matrix,
            n_samples: self.n_samples,
            primary_width: self.primary_width,
            sanitized,
        })
    }
}

/// Expand a `SampleColumn` to exactly `n` values.
pub fn broadcast_column(name: &str, column: &SampleColumn, n: usize) -> Result<Vec<f64>, LiteError> {
    match column {
        SampleColumn::Shared(v) => Ok(vec![*v; n]),
        SampleColumn::PerSample(values) if values.len() == 1 => Ok(vec![values[0]; n]),
        SampleColumn::PerSample(values) if values.len() == n => Ok(values.clone()),
        SampleColumn::PerSample(values) => Err(LiteError::shape(
            name,
            format!("1 or {n} values"),
            format!("{} values", values.len()),
        )),
    }
}

/// Expand a `SampleRows` to an `n`-row matrix.
///
/// With `width` set, a shared row must have that many values, or `n × width`
/// values which are read row by row. Per-sample matrices must be `n × width`;
/// a single-row matrix is tiled.
pub fn broadcast_rows(
    name: &str,
    rows: &SampleRows,
    n: usize,
    width: Option<usize>,
) -> Result<Matrix, LiteError> {
    match rows {
        SampleRows::Shared(values) => match width {
            None => Ok(tile_row(values, n)),
            Some(w) if values.len() == w => Ok(tile_row(values, n)),
            Some(w) if w > 0 && values.len() == n * w => Ok(Matrix::from_row_slice(n, w, values)),
            Some(w) => Err(LiteError::shape(
                name,
                format!("{w} or {} values", n * w),
                format!("{} values", values.len()),
            )),
        },
        SampleRows::PerSample(m) => {
            if let Some(w) = width.filter(|&w| m.ncols() != w) {
                return Err(LiteError::shape(
                    name,
                    format!("{w} columns"),
                    format!("{} columns", m.ncols()),
                ));
            }
            if m.nrows() == n {
                Ok(m.clone())
            } else if m.nrows() == 1 {
                let row: Vec<f64> = m.row(0).iter().copied().collect();
                Ok(tile_row(&row, n))
            } else {
                Err(LiteError::shape(
                    name,
                    format!("1 or {n} rows"),
                    format!("{} rows", m.nrows()),
                ))
            }
        }
    }
}

/// Zero every row that contains a NaN or infinite value.
///
/// With `NonFinitePolicy::Zero` a single aggregated warning is logged; with
/// `Reject` the offending rows are reported as a validation error.
pub fn sanitize_rows(matrix: &mut Matrix, policy: NonFinitePolicy) -> Result<SanitizeReport, LiteError> {
    let rows: Vec<usize> = matrix
        .row_iter()
        .enumerate()
        .filter(|(_, row)| row.iter().any(|v| !v.is_finite()))
        .map(|(i, _)| i)
        .collect();

    if rows.is_empty() {
        return Ok(SanitizeReport::default());
    }

    match policy {
        NonFinitePolicy::Reject => Err(LiteError::validation(format!(
            "{} sample(s) contain NaN or infinite values (rows {})",
            rows.len(),
            preview_indices(&rows)
        ))),
        NonFinitePolicy::Zero => {
            for &i in &rows {
                matrix.row_mut(i).fill(0.0);
            }
            tracing::warn!(
                "{} of {} samples contain NaN or infinite values; these will be set to zero for model fitting (rows {})",
                rows.len(),
                matrix.nrows(),
                preview_indices(&rows)
            );
            Ok(SanitizeReport { rows })
        }
    }
}

/// Zero individual non-finite entries (used for per-sample initial parameters).
pub fn zero_non_finite(matrix: &mut Matrix) -> usize {
    let mut count = 0;
    for v in matrix.iter_mut() {
        if !v.is_finite() {
            *v = 0.0;
            count += 1;
        }
    }
    count
}

fn preview_indices(rows: &[usize]) -> String {
    const MAX_SHOWN: usize = 10;
    let shown: Vec<String> = rows.iter().take(MAX_SHOWN).map(|r| r.to_string()).collect();
    if rows.len() > MAX_SHOWN {
        format!("{}, ...", shown.join(", "))
    } else {
        shown.join(", ")
    }
}
