//! Scratch directories for one engine call.
//!
//! Every call gets a fresh input directory. The output directory is either
//! the caller's (kept) or a fresh temporary one (removed). Both temporary
//! directories are `tempfile::TempDir`s, so they are removed when the
//! `Scratch` is dropped on any error path as well.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::domain::RunSettings;
use crate::error::LiteError;

const INPUT_PREFIX: &str = "mlite-in-";
const OUTPUT_PREFIX: &str = "mlite-out-";

/// Directories an engine call reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WirePaths {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl WirePaths {
    /// Placeholder paths for a dry run. Nothing is created.
    pub fn dry_run(run: &RunSettings) -> Self {
        let root = run.scratch_root.clone().unwrap_or_else(std::env::temp_dir);
        Self {
            input_dir: root.join(format!("{INPUT_PREFIX}dry-run")),
            output_dir: run
                .output_dir
                .clone()
                .unwrap_or_else(|| root.join(format!("{OUTPUT_PREFIX}dry-run"))),
        }
    }

    pub fn input_file(&self, name: &str) -> PathBuf {
        self.input_dir.join(name)
    }

    /// The engine names its result `{model}_{output_name}`.
    pub fn result_file(&self, model: &str, output_name: &str) -> PathBuf {
        self.output_dir.join(format!("{model}_{output_name}"))
    }
}

#[derive(Debug)]
enum OutputDir {
    Owned(TempDir),
    Caller(PathBuf),
}

/// Owned scratch space for one call.
#[derive(Debug)]
pub struct Scratch {
    input: TempDir,
    output: OutputDir,
}

impl Scratch {
    /// Create the input directory and, unless the caller supplied one, an
    /// owned output directory. A caller directory is created if missing.
    pub fn acquire(run: &RunSettings) -> Result<Self, LiteError> {
        let root = run.scratch_root.clone().unwrap_or_else(std::env::temp_dir);
        let input = make_temp(&root, INPUT_PREFIX)?;

        let output = match &run.output_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|e| LiteError::io(dir, e))?;
                OutputDir::Caller(dir.clone())
            }
            None => OutputDir::Owned(make_temp(&root, OUTPUT_PREFIX)?),
        };

        tracing::debug!("scratch input dir {}", input.path().display());
        Ok(Self { input, output })
    }

    pub fn paths(&self) -> WirePaths {
        let output_dir = match &self.output {
            OutputDir::Owned(dir) => dir.path().to_path_buf(),
            OutputDir::Caller(dir) => dir.clone(),
        };
        WirePaths {
            input_dir: self.input.path().to_path_buf(),
            output_dir,
        }
    }

    /// Remove the owned directories now, reporting failures.
    ///
    /// A failed removal is logged rather than returned: the engine call has
    /// already succeeded or failed on its own terms by the time this runs.
    pub fn release(self) {
        let Scratch { input, output } = self;
        close(input);
        if let OutputDir::Owned(dir) = output {
            close(dir);
        }
    }
}

fn make_temp(root: &Path, prefix: &str) -> Result<TempDir, LiteError> {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir_in(root)
        .map_err(|e| LiteError::io(root, e))
}

fn close(dir: TempDir) {
    let path = dir.path().to_path_buf();
    if let Err(e) = dir.close() {
        tracing::warn!("failed to remove scratch dir {}: {e}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(root: &Path) -> RunSettings {
        RunSettings {
            scratch_root: Some(root.to_path_buf()),
            ..RunSettings::default()
        }
    }

    #[test]
    fn owned_directories_are_removed_on_release() {
        let root = tempfile::tempdir().unwrap();
        let scratch = Scratch::acquire(&settings(root.path())).unwrap();
        let paths = scratch.paths();
        assert!(paths.input_dir.is_dir());
        assert!(paths.output_dir.is_dir());
        assert_ne!(paths.input_dir, paths.output_dir);

        scratch.release();
        assert!(!paths.input_dir.exists());
        assert!(!paths.output_dir.exists());
    }

    #[test]
    fn dropping_removes_directories() {
        let root = tempfile::tempdir().unwrap();
        let paths = {
            let scratch = Scratch::acquire(&settings(root.path())).unwrap();
            scratch.paths()
        };
        assert!(!paths.input_dir.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn caller_output_dir_is_kept() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("results");
        let run = RunSettings {
            output_dir: Some(out.clone()),
            ..settings(root.path())
        };
        let scratch = Scratch::acquire(&run).unwrap();
        assert_eq!(scratch.paths().output_dir, out);
        scratch.release();
        assert!(out.is_dir());
    }

    #[test]
    fn dry_run_paths_are_deterministic() {
        let run = settings(Path::new("/scratch"));
        let a = WirePaths::dry_run(&run);
        assert_eq!(a, WirePaths::dry_run(&run));
        assert_eq!(
            a.result_file("ETM", "madym_analysis.dat"),
            PathBuf::from("/scratch/mlite-out-dry-run/ETM_madym_analysis.dat")
        );
        assert!(!a.input_dir.exists());
    }
}
