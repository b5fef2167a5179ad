//! Per-test scratch directories.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::TestError;

/// Working directory a test's pipeline runs in.
///
/// A temporary directory is removed when dropped; a caller-supplied or kept
/// directory stays on disk.
#[derive(Debug)]
pub enum Scratch {
    Temp(TempDir),
    Kept(PathBuf),
}

impl Scratch {
    /// Fresh temporary directory named after the test file.
    pub fn temporary(test_path: &Path, keep: bool) -> Result<Self, TestError> {
        let stem = test_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("test");
        let dir = tempfile::Builder::new()
            .prefix(&format!("checkrun-{stem}-"))
            .tempdir()
            .map_err(|err| TestError::io(std::env::temp_dir(), err))?;
        if keep {
            return Ok(Scratch::Kept(dir.keep()));
        }
        Ok(Scratch::Temp(dir))
    }

    /// Use `dir` as-is, creating it if absent.
    pub fn at(dir: &Path) -> Result<Self, TestError> {
        fs::create_dir_all(dir).map_err(|err| TestError::io(dir, err))?;
        let dir = fs::canonicalize(dir).map_err(|err| TestError::io(dir, err))?;
        Ok(Scratch::Kept(dir))
    }

    pub fn path(&self) -> &Path {
        match self {
            Scratch::Temp(dir) => dir.path(),
            Scratch::Kept(path) => path,
        }
    }
}
