//! Recursive test file discovery for suite mode.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use walkdir::WalkDir;

use crate::io::config::HarnessConfig;

/// Collect every candidate test file under `root`.
///
/// Hidden entries and files with an excluded extension are skipped. The list
/// is sorted so runs are deterministic. Files are returned even when no
/// comment marker is known for them; that is reported per test.
pub fn discover_tests(root: &Path, cfg: &HarnessConfig) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        bail!("test root {} is not a directory", root.display());
    }
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));
    for entry in walker {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if cfg.is_excluded(path) {
            continue;
        }
        files.push(path.to_path_buf());
    }
    files.sort();
    Ok(files)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|name| name.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_nested_tests_sorted_and_filtered() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::create_dir_all(root.join("x86_64")).expect("mkdir");
        fs::create_dir_all(root.join("ppc")).expect("mkdir");
        fs::create_dir_all(root.join(".cache")).expect("mkdir");
        fs::write(root.join("x86_64/atomic.c"), "").expect("write");
        fs::write(root.join("x86_64/defs.h"), "").expect("write");
        fs::write(root.join("ppc/arguments.c"), "").expect("write");
        fs::write(root.join(".cache/stale.c"), "").expect("write");
        fs::write(root.join(".hidden.c"), "").expect("write");
        fs::write(root.join("README.txt"), "").expect("write");

        let files = discover_tests(root, &HarnessConfig::default()).expect("discover");
        let rel: Vec<_> = files
            .iter()
            .map(|path| path.strip_prefix(root).expect("prefix").to_path_buf())
            .collect();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("README.txt"),
                PathBuf::from("ppc/arguments.c"),
                PathBuf::from("x86_64/atomic.c"),
            ]
        );
    }

    #[test]
    fn missing_root_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(discover_tests(&temp.path().join("nope"), &HarnessConfig::default()).is_err());
    }
}
