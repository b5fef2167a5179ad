//! Harness configuration stored in `checkrun.toml`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "checkrun.toml";

/// Harness configuration (TOML).
///
/// Missing fields default to the layout of an llir checkout: tests under
/// `test/`, the C frontend and `llir-opt` as tools.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory searched recursively in suite mode.
    pub test_root: PathBuf,

    /// Keep per-test scratch directories instead of deleting them.
    pub keep_scratch: bool,

    /// Stop the suite after the first failing test.
    pub fail_fast: bool,

    /// Kill a pipeline that runs longer than this. No limit when unset.
    pub stage_timeout_secs: Option<u64>,

    /// Captured stdout/stderr per stream beyond this many bytes is discarded.
    pub output_limit_bytes: usize,

    /// File extensions that are never tests (inputs used by other stages).
    pub exclude_extensions: Vec<String>,

    /// Placeholder name (without `%`) to executable name or path.
    pub tools: BTreeMap<String, String>,

    /// File extension to comment marker.
    pub markers: BTreeMap<String, String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let tools = [("clang", "clang"), ("opt", "llir-opt")];
        let markers = [
            ("c", "//"),
            ("cc", "//"),
            ("cpp", "//"),
            ("h", "//"),
            ("S", "#"),
            ("s", "#"),
            ("py", "#"),
            ("sh", "#"),
            ("ll", ";"),
        ];
        Self {
            test_root: PathBuf::from("test"),
            keep_scratch: false,
            fail_fast: false,
            stage_timeout_secs: None,
            output_limit_bytes: 16 * 1024 * 1024,
            exclude_extensions: vec!["h".to_string(), "inc".to_string()],
            tools: to_map(&tools),
            markers: to_map(&markers),
        }
    }
}

fn to_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.stage_timeout_secs == Some(0) {
            return Err(anyhow!("stage_timeout_secs must be > 0 when set"));
        }
        for (name, exe) in &self.tools {
            if name.is_empty() || !name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
                return Err(anyhow!("tools: `{name}` is not a valid placeholder name"));
            }
            if matches!(name.as_str(), "s" | "t") {
                return Err(anyhow!("tools: `%{name}` is reserved"));
            }
            if exe.trim().is_empty() {
                return Err(anyhow!("tools.{name} must be non-empty"));
            }
        }
        for (ext, marker) in &self.markers {
            if marker.trim().is_empty() {
                return Err(anyhow!("markers.{ext} must be non-empty"));
            }
        }
        Ok(())
    }

    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_secs.map(Duration::from_secs)
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.exclude_extensions.iter().any(|e| e == ext))
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `HarnessConfig::default()`.
pub fn load_config(path: &Path) -> Result<HarnessConfig> {
    if !path.exists() {
        let cfg = HarnessConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: HarnessConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, HarnessConfig::default());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "test_root = \"tests/lit\"\nstage_timeout_secs = 30\n\n[tools]\nopt = \"/opt/bin/llir-opt\"\n",
        )
        .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.test_root, PathBuf::from("tests/lit"));
        assert_eq!(cfg.stage_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.tools.get("opt").map(String::as_str), Some("/opt/bin/llir-opt"));
        assert!(!cfg.tools.contains_key("clang"));
        assert_eq!(cfg.markers, HarnessConfig::default().markers);
    }

    #[test]
    fn rejects_reserved_and_malformed_tool_names() {
        let mut cfg = HarnessConfig::default();
        cfg.tools.insert("s".to_string(), "sed".to_string());
        assert!(cfg.validate().is_err());

        let mut cfg = HarnessConfig::default();
        cfg.tools.insert("llir-opt".to_string(), "llir-opt".to_string());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_limits() {
        let cfg = HarnessConfig {
            output_limit_bytes: 0,
            ..HarnessConfig::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = HarnessConfig {
            stage_timeout_secs: Some(0),
            ..HarnessConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn excludes_helper_extensions() {
        let cfg = HarnessConfig::default();
        assert!(cfg.is_excluded(Path::new("test/codegen/helpers.h")));
        assert!(!cfg.is_excluded(Path::new("test/codegen/atomic.c")));
        assert!(!cfg.is_excluded(Path::new("test/README")));
    }
}
