//! Process Invoker.
//!
//! Runs the engine without a shell, streams stdout and stderr line by line to
//! a `LogSink` while the child runs, and maps a nonzero exit into
//! `LiteError::EngineFailed`. There is no timeout: a hung engine blocks the
//! caller until it is killed externally.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::Stdio;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use crate::engine::command::CommandLine;
use crate::error::LiteError;

/// Receives engine output lines as they arrive.
pub trait LogSink {
    fn line(&mut self, line: &str);
}

/// Forwards engine output to `tracing` under target `engine`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn line(&mut self, line: &str) {
        tracing::info!(target: "engine", "{line}");
    }
}

impl<F: FnMut(&str)> LogSink for F {
    fn line(&mut self, line: &str) {
        self(line)
    }
}

/// Launch `cmd`, optionally in `cwd`, and block until it exits.
pub fn run(cmd: &CommandLine, cwd: Option<&Path>, sink: &mut dyn LogSink) -> Result<(), LiteError> {
    let command = cmd.to_string();
    tracing::info!("running engine: {command}");

    let mut process = cmd.to_command();
    process
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        process.current_dir(dir);
    }

    let mut child = process.spawn().map_err(|source| LiteError::Launch {
        command: command.clone(),
        source,
    })?;

    let (tx, rx) = mpsc::channel();
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(forward_lines(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(forward_lines(stderr, tx.clone()));
    }
    drop(tx);

    // Ends once both pipes close.
    for line in rx {
        sink.line(&line);
    }
    for reader in readers {
        if reader.join().is_err() {
            tracing::warn!("engine output reader thread panicked");
        }
    }

    let status = child.wait().map_err(|source| LiteError::Launch {
        command: command.clone(),
        source,
    })?;

    if status.success() {
        tracing::debug!("engine finished: {command}");
        Ok(())
    } else {
        Err(LiteError::EngineFailed {
            code: status.code(),
            command,
        })
    }
}

fn forward_lines<R: Read + Send + 'static>(pipe: R, tx: Sender<String>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Err(e) => {
                    tracing::warn!("engine output stream closed early: {e}");
                    break;
                }
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']);
                    if tx.send(line.to_string()).is_err() {
                        break;
                    }
                }
            }
        }
    })
}
