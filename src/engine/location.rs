//! Where the engine executables live.
//!
//! Resolved once at the outermost boundary (CLI / app) and handed to the
//! orchestrators as an executable path. With no root configured the bare
//! tool name is used and the OS resolves it from `PATH`.

use std::path::PathBuf;

/// Environment variable naming the directory holding the engine tools.
pub const ROOT_VAR: &str = "MADYM_ROOT";

/// The three lite tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    DceLite,
    DwiLite,
    T1Lite,
}

impl Tool {
    pub fn file_stem(self) -> &'static str {
        match self {
            Tool::DceLite => "madym_DCE_lite",
            Tool::DwiLite => "madym_DWI_lite",
            Tool::T1Lite => "madym_T1_lite",
        }
    }

    /// Stem plus the platform executable suffix.
    pub fn file_name(self) -> String {
        format!("{}{}", self.file_stem(), std::env::consts::EXE_SUFFIX)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineLocation {
    pub root: Option<PathBuf>,
}

impl EngineLocation {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Load `.env` (if present) and read `MADYM_ROOT`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let root = lookup(ROOT_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self { root }
    }

    /// Full path to a tool, or the bare file name when no root is set.
    pub fn tool_path(&self, tool: Tool) -> PathBuf {
        match &self.root {
            Some(root) => root.join(tool.file_name()),
            None => {
                tracing::warn!(
                    "{ROOT_VAR} not set; expecting {} on PATH",
                    tool.file_stem()
                );
                PathBuf::from(tool.file_name())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_from_lookup() {
        let loc = EngineLocation::from_lookup(|k| (k == ROOT_VAR).then(|| "/opt/madym/bin".to_string()));
        assert_eq!(loc.root, Some(PathBuf::from("/opt/madym/bin")));
        let exe = loc.tool_path(Tool::DwiLite);
        assert!(exe.starts_with("/opt/madym/bin"));
        assert!(exe.to_string_lossy().contains("madym_DWI_lite"));
    }

    #[test]
    fn blank_root_is_unset() {
        let loc = EngineLocation::from_lookup(|_| Some("  ".to_string()));
        assert_eq!(loc.root, None);
        assert_eq!(loc.tool_path(Tool::T1Lite), PathBuf::from(Tool::T1Lite.file_name()));
    }
}
