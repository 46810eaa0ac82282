//! Small matrix helpers on top of `nalgebra::DMatrix`.
//!
//! The lite protocol only ever needs a handful of reshaping operations:
//! turning caller input into samples-as-rows, tiling a shared row, and
//! concatenating column blocks.

use crate::domain::Matrix;
use crate::error::LiteError;

/// Build a matrix from row vectors. All rows must have the same length.
pub fn from_rows(rows: &[Vec<f64>]) -> Result<Matrix, LiteError> {
    let ncols = rows.first().map(Vec::len).unwrap_or(0);
    if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
        return Err(LiteError::shape(
            format!("row {idx}"),
            format!("{ncols} values"),
            format!("{} values", row.len()),
        ));
    }
    Ok(Matrix::from_fn(rows.len(), ncols, |i, j| rows[i][j]))
}

/// One sample: a 1-D series becomes a single row.
pub fn row_vector(values: &[f64]) -> Matrix {
    Matrix::from_row_slice(1, values.len(), values)
}

/// Normalize caller input so that rows are samples.
///
/// A column vector (n × 1, n > 1) is read as one sample of n values, not n
/// samples of one value.
pub fn as_samples(data: Matrix) -> Matrix {
    if data.ncols() == 1 && data.nrows() > 1 {
        data.transpose()
    } else {
        data
    }
}

/// Repeat one row `n` times.
pub fn tile_row(row: &[f64], n: usize) -> Matrix {
    Matrix::from_fn(n, row.len(), |_, j| row[j])
}

/// Concatenate column blocks left to right.
pub fn hstack(blocks: &[&Matrix]) -> Result<Matrix, LiteError> {
    let nrows = blocks.first().map(|b| b.nrows()).unwrap_or(0);
    if let Some(bad) = blocks.iter().find(|b| b.nrows() != nrows) {
        return Err(LiteError::shape(
            "column block",
            format!("{nrows} rows"),
            format!("{} rows", bad.nrows()),
        ));
    }

    let ncols = blocks.iter().map(|b| b.ncols()).sum();
    let mut out = Matrix::zeros(nrows, ncols);
    let mut col = 0;
    for block in blocks {
        out.columns_mut(col, block.ncols()).copy_from(*block);
        col += block.ncols();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_vector_becomes_one_sample() {
        let col = Matrix::from_column_slice(4, 1, &[1.0, 2.0, 3.0, 4.0]);
        let m = as_samples(col);
        assert_eq!(m.shape(), (1, 4));
        assert_eq!(m[(0, 3)], 4.0);

        // A single value stays a single value.
        let one = as_samples(Matrix::from_element(1, 1, 7.0));
        assert_eq!(one.shape(), (1, 1));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, LiteError::Shape { .. }));
    }

    #[test]
    fn hstack_concatenates_in_order() {
        let a = Matrix::from_row_slice(2, 1, &[1.0, 2.0]);
        let b = Matrix::from_row_slice(2, 2, &[3.0, 4.0, 5.0, 6.0]);
        let m = hstack(&[&a, &b]).unwrap();
        assert_eq!(m, Matrix::from_row_slice(2, 3, &[1.0, 3.0, 4.0, 2.0, 5.0, 6.0]));
    }

    #[test]
    fn hstack_rejects_row_mismatch() {
        let a = Matrix::zeros(2, 1);
        let b = Matrix::zeros(3, 1);
        assert!(hstack(&[&a, &b]).is_err());
    }

    #[test]
    fn tile_row_repeats() {
        let m = tile_row(&[1.0, 2.0], 3);
        assert_eq!(m.shape(), (3, 2));
        assert!(m.row_iter().all(|r| r[0] == 1.0 && r[1] == 2.0));
    }
}
