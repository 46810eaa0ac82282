//! Independent requests in parallel.
//!
//! Each request runs its own engine process with its own scratch
//! directories on the rayon pool; nothing is shared between calls. Engine
//! output is logged with the job label so interleaved lines stay readable.

use rayon::prelude::*;

use crate::engine::LogSink;
use crate::error::LiteError;

/// Log sink that tags every engine line with a job label.
#[derive(Debug, Clone)]
pub struct LabelledSink {
    pub label: String,
}

impl LogSink for LabelledSink {
    fn line(&mut self, line: &str) {
        tracing::info!(target: "engine", "[{}] {line}", self.label);
    }
}

/// Run `fit` over every `(label, request)` pair in parallel.
///
/// Results come back in input order; one failure does not stop the others.
pub fn fit_all<R, O, F>(jobs: &[(String, R)], fit: F) -> Vec<Result<O, LiteError>>
where
    R: Sync,
    O: Send,
    F: Fn(&R, &mut dyn LogSink) -> Result<O, LiteError> + Sync,
{
    jobs.par_iter()
        .map(|(label, req)| {
            let mut sink = LabelledSink { label: label.clone() };
            let result = fit(req, &mut sink);
            if let Err(e) = &result {
                tracing::error!("[{label}] {e}");
            }
            result
        })
        .collect()
}
