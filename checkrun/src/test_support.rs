//! Test-only helpers for building test trees and fake tools.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary checkout with a `test/` root and a `bin/` of fake tools.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("test"))?;
        fs::create_dir_all(dir.path().join("bin"))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn test_root(&self) -> PathBuf {
        self.path().join("test")
    }

    /// Write a test file under `test/`, creating parent directories.
    pub fn write_test(&self, rel: &str, contents: &str) -> io::Result<PathBuf> {
        let path = self.test_root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Write an executable `sh` script to `bin/<name>` and return its path.
    pub fn write_tool(&self, name: &str, body: &str) -> io::Result<PathBuf> {
        let path = self.path().join("bin").join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
        let mut perms = fs::metadata(&path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms)?;
        Ok(path)
    }

    /// Tool table mapping each placeholder name to an absolute script path.
    pub fn tools(&self, names: &[&str]) -> BTreeMap<String, String> {
        names
            .iter()
            .map(|name| {
                let path = self.path().join("bin").join(name);
                (name.to_string(), path.display().to_string())
            })
            .collect()
    }
}
