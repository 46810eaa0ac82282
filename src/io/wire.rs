//! Flat-text wire format shared with the engine.
//!
//! One sample per line, values separated by single spaces, fixed 5 decimal
//! places. Vectors are written one value per line. Reading accepts any
//! whitespace and skips blank lines.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::domain::Matrix;
use crate::error::LiteError;

/// Primary input matrix.
pub const INPUT_DATA_FILE: &str = "input_data.dat";
/// Dynamic time points (minutes).
pub const DYN_TIMES_FILE: &str = "dyn_times.dat";
/// Temporal noise per time point.
pub const DYN_NOISE_FILE: &str = "dyn_noise.dat";
/// Per-sample initial parameters.
pub const INIT_PARAMS_FILE: &str = "input_params.dat";

/// Decimal places used for every value written to the wire.
pub const WIRE_PRECISION: usize = 5;

/// Write a matrix, one row per line.
pub fn write_matrix(path: &Path, matrix: &Matrix) -> Result<(), LiteError> {
    let file = File::create(path).map_err(|e| LiteError::io(path, e))?;
    let mut out = BufWriter::new(file);
    let mut line = String::new();

    for row in matrix.row_iter() {
        line.clear();
        for (j, v) in row.iter().enumerate() {
            if j > 0 {
                line.push(' ');
            }
            line.push_str(&format!("{v:.prec$}", prec = WIRE_PRECISION));
        }
        line.push('\n');
        out.write_all(line.as_bytes()).map_err(|e| LiteError::io(path, e))?;
    }
    out.flush().map_err(|e| LiteError::io(path, e))
}

/// Write a vector, one value per line.
pub fn write_vector(path: &Path, values: &[f64]) -> Result<(), LiteError> {
    let file = File::create(path).map_err(|e| LiteError::io(path, e))?;
    let mut out = BufWriter::new(file);
    for v in values {
        writeln!(out, "{v:.prec$}", prec = WIRE_PRECISION).map_err(|e| LiteError::io(path, e))?;
    }
    out.flush().map_err(|e| LiteError::io(path, e))
}

/// Read a whitespace-separated matrix.
///
/// Fails on unparsable numbers, rows of different widths, or an empty file.
pub fn read_matrix(path: &Path) -> Result<Matrix, LiteError> {
    let file = File::open(path).map_err(|e| LiteError::io(path, e))?;
    let reader = BufReader::new(file);

    let mut values = Vec::new();
    let mut ncols: Option<usize> = None;
    let mut nrows = 0;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| LiteError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }

        let before = values.len();
        for token in line.split_whitespace() {
            let v: f64 = token.parse().map_err(|_| {
                LiteError::decode(path, format!("line {}: '{token}' is not a number", line_no + 1))
            })?;
            values.push(v);
        }
        let width = values.len() - before;
        match ncols {
            None => ncols = Some(width),
            Some(expected) if expected != width => {
                return Err(LiteError::decode(
                    path,
                    format!("line {}: expected {expected} values, found {width}", line_no + 1),
                ));
            }
            Some(_) => {}
        }
        nrows += 1;
    }

    let ncols = ncols.ok_or_else(|| LiteError::decode(path, "file contains no rows"))?;
    Ok(Matrix::from_row_slice(nrows, ncols, &values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_text_has_fixed_precision() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(INPUT_DATA_FILE);
        let m = Matrix::from_row_slice(2, 2, &[1.0, 0.123456, -2.5, 1e-7]);
        write_matrix(&path, &m).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "1.00000 0.12346\n-2.50000 0.00000\n");

        let back = read_matrix(&path).unwrap();
        assert_eq!(back.shape(), (2, 2));
        assert!((back[(0, 1)] - 0.12346).abs() < 1e-12);
    }

    #[test]
    fn vector_is_one_value_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DYN_TIMES_FILE);
        write_vector(&path, &[0.0, 0.5, 1.0]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec!["0.00000", "0.50000", "1.00000"]);
    }

    #[test]
    fn reader_skips_blank_lines_and_accepts_tabs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.dat");
        std::fs::write(&path, "1\t2  3\n\n4 5 6\n\n").unwrap();
        let m = read_matrix(&path).unwrap();
        assert_eq!(m, Matrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
    }

    #[test]
    fn reader_rejects_ragged_and_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let ragged = dir.path().join("ragged.dat");
        std::fs::write(&ragged, "1 2 3\n4 5\n").unwrap();
        let err = read_matrix(&ragged).unwrap_err();
        assert!(err.to_string().contains("line 2"));

        let garbage = dir.path().join("garbage.dat");
        std::fs::write(&garbage, "1 x 3\n").unwrap();
        assert!(matches!(read_matrix(&garbage), Err(LiteError::Decode { .. })));

        let empty = dir.path().join("empty.dat");
        std::fs::write(&empty, "\n\n").unwrap();
        assert!(read_matrix(&empty).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_matrix(Path::new("/definitely/not/here.dat")).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
