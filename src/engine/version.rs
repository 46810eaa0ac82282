//! Engine version query.

use std::path::Path;
use std::process::Command;

use crate::error::LiteError;

/// Run `<exe> -v` and return its trimmed stdout.
pub fn engine_version(exe: &Path) -> Result<String, LiteError> {
    let command = format!("{} -v", exe.display());
    let output = Command::new(exe)
        .arg("-v")
        .output()
        .map_err(|source| LiteError::Launch {
            command: command.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(LiteError::EngineFailed {
            code: output.status.code(),
            command,
        });
    }
    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if version.is_empty() {
        return Err(LiteError::Config(format!("'{command}' printed no version")));
    }
    Ok(version)
}
