//! `madym-lite` library crate.
//!
//! Batch wrappers around the madym "lite" fitting tools. Each call turns
//! in-memory samples into the engine's text wire format, runs one engine
//! process, and decodes its result matrix into named parameter blocks.
//!
//! The binary (`mlite`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the per-family fitters are reusable from other Rust code

pub mod app;
pub mod cli;
pub mod data;
pub mod decode;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
