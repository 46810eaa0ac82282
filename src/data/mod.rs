//! Input data: building the engine input matrix and generating synthetic samples.

pub mod builder;
pub mod synthetic;

pub use builder::*;
pub use synthetic::*;
