//! Crate error type.
//!
//! Every failure class of the lite protocol maps to one variant so callers can
//! match on it instead of parsing messages:
//!
//! - validation problems (shapes, missing inputs) are raised before any file I/O
//! - engine failures carry the exit code and the exact command that was run
//! - decode failures carry the expected vs. actual column counts

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, LiteError>;

#[derive(Debug, Error)]
pub enum LiteError {
    /// Request is inconsistent (missing mandatory input, bad option combination).
    #[error("invalid request: {0}")]
    Validation(String),

    /// An auxiliary array cannot be reconciled with the sample count.
    #[error("{name}: expected {expected}, got {actual}")]
    Shape {
        name: String,
        expected: String,
        actual: String,
    },

    /// Reading or writing a file/directory failed.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The engine executable could not be started at all.
    #[error("failed to launch engine ({source}). Command was: {command}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine ran but exited unsuccessfully.
    #[error("engine failed to execute, {}. Command ran was: {command}", describe_exit(.code))]
    EngineFailed { code: Option<i32>, command: String },

    /// The result file could not be parsed.
    #[error("failed to decode '{}': {message}", .path.display())]
    Decode { path: PathBuf, message: String },

    /// The result matrix is narrower than the request implies.
    #[error(
        "result '{}' has {actual} columns but the request implies at least {expected_min}; engine and wrapper disagree on the column protocol",
        .path.display()
    )]
    LayoutMismatch {
        path: PathBuf,
        expected_min: usize,
        actual: usize,
    },

    /// A value could not be serialised for an export.
    #[error("failed to serialise {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Environment/engine location problems.
    #[error("configuration error: {0}")]
    Config(String),
}

impl LiteError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn shape(name: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::Shape {
            name: name.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Process exit code used by the `mlite` binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Shape { .. } | Self::Config(_) => 2,
            Self::Io { .. } | Self::Serialize { .. } => 3,
            Self::Launch { .. } | Self::EngineFailed { .. } => 4,
            Self::Decode { .. } | Self::LayoutMismatch { .. } => 5,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("returning code {code}"),
        None => "terminated by a signal".to_string(),
    }
}
