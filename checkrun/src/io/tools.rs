//! Startup resolution of configured tools to absolute executable paths.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::core::placeholder::Placeholders;
use crate::error::TestError;

/// Resolved tool paths, keyed by placeholder name (without `%`).
///
/// Built once before any test runs and shared read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolPaths {
    paths: BTreeMap<String, PathBuf>,
}

impl ToolPaths {
    /// Look every configured tool up on `PATH`.
    ///
    /// The first tool that cannot be found (or is not executable) fails the
    /// whole run.
    #[instrument(skip_all, fields(tools = tools.len()))]
    pub fn resolve(tools: &BTreeMap<String, String>) -> Result<Self, TestError> {
        let mut paths = BTreeMap::new();
        for (name, exe) in tools {
            let path = which::which(exe).map_err(|err| TestError::ToolNotFound {
                token: format!("%{name}"),
                reason: format!("{exe}: {err}"),
            })?;
            debug!(tool = %name, path = %path.display(), "resolved tool");
            paths.insert(name.clone(), path);
        }
        Ok(Self { paths })
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.paths.get(name).map(PathBuf::as_path)
    }

    /// Placeholder values for one test: every tool, `%s` and `%t`.
    pub fn placeholders(&self, test_path: &Path, scratch: &Path) -> Placeholders {
        let mut placeholders = Placeholders::new();
        for (name, path) in &self.paths {
            placeholders.insert(name.clone(), path.display().to_string());
        }
        placeholders.insert("s", test_path.display().to_string());
        placeholders.insert("t", scratch.display().to_string());
        placeholders
    }

    /// Whether `%name` is something a RUN line may use.
    pub fn knows_placeholder(&self, name: &str) -> bool {
        matches!(name, "s" | "t") || self.get(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_tools_on_path() {
        let tools = BTreeMap::from([("shell".to_string(), "sh".to_string())]);
        let resolved = ToolPaths::resolve(&tools).expect("sh on PATH");
        let path = resolved.get("shell").expect("shell");
        assert!(path.is_absolute());
    }

    #[test]
    fn missing_tool_is_fatal() {
        let tools = BTreeMap::from([(
            "opt".to_string(),
            "definitely-not-a-real-tool-4c1e".to_string(),
        )]);
        let err = ToolPaths::resolve(&tools).expect_err("missing");
        assert!(err.is_fatal());
        match err {
            TestError::ToolNotFound { token, .. } => assert_eq!(token, "%opt"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn placeholders_include_builtins() {
        let tools = BTreeMap::from([("shell".to_string(), "sh".to_string())]);
        let resolved = ToolPaths::resolve(&tools).expect("resolve");
        let placeholders =
            resolved.placeholders(Path::new("/src/test/a.c"), Path::new("/tmp/scratch"));
        assert_eq!(placeholders.get("s"), Some("/src/test/a.c"));
        assert_eq!(placeholders.get("t"), Some("/tmp/scratch"));
        assert!(placeholders.contains("shell"));
        assert!(resolved.knows_placeholder("t"));
        assert!(resolved.knows_placeholder("shell"));
        assert!(!resolved.knows_placeholder("clang"));
    }
}
