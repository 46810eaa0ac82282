//! Model knowledge kept on the wrapper side.
//!
//! The engine does all the fitting; the wrapper only needs:
//! - parameter names per model (validation, CSV headers, summaries)
//! - simple forward models to generate synthetic test data

pub mod catalog;
pub mod forward;

pub use catalog::*;
pub use forward::*;
