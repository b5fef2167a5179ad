//! Shared types passed between the engine stages.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::TestError;

/// A test file and the comment marker its directives are written behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSpec {
    pub path: PathBuf,
    pub marker: String,
}

impl TestSpec {
    /// Pick the comment marker for `path` from its extension.
    ///
    /// `path` should already be absolute; stages run inside a scratch
    /// directory, so a relative path would not resolve there.
    pub fn from_path(path: &Path, markers: &BTreeMap<String, String>) -> Result<Self, TestError> {
        let marker = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| markers.get(ext))
            .ok_or_else(|| TestError::UnknownFileExtension {
                path: path.to_path_buf(),
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            marker: marker.clone(),
        })
    }
}

/// Directives extracted from one test file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestDirectives {
    /// A `DISABLED` directive was found; nothing runs.
    Disabled,
    /// The single RUN line plus the CHECK strings in file order.
    Run { run: String, checks: Vec<String> },
}

/// Result of running one test.
#[derive(Debug)]
pub enum TestOutcome {
    Pass,
    Skipped,
    Fail(TestError),
}

/// Captured output of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTrace {
    pub command: String,
    pub exit_code: Option<i32>,
    pub stderr: Vec<u8>,
}

/// Everything a pipeline run produced, consumed by the check verifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionTrace {
    pub stages: Vec<StageTrace>,
    /// Standard output of the final stage.
    pub stdout: Vec<u8>,
}

impl ExecutionTrace {
    /// Stderr of every stage, concatenated in pipeline order.
    pub fn stderr(&self) -> Vec<u8> {
        self.stages
            .iter()
            .flat_map(|stage| stage.stderr.iter().copied())
            .collect()
    }
}
