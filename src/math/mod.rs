//! Mathematical utilities: reshaping and stacking sample matrices.

pub mod matrix;

pub use matrix::*;
