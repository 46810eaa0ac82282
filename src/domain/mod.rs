//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the numeric vocabulary (`Matrix`, `SampleColumn`, `SampleRows`)
//! - run-level settings (`RunSettings`, `NonFinitePolicy`)
//! - per-family requests and engine options (`DceRequest`, `DwiRequest`, `T1Request`)

pub mod request;
pub mod types;

pub use request::*;
pub use types::*;
