//! Shared test helpers.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a temp directory holding a test hosts file.
pub fn temp_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("etchosts_test_")
        .tempdir()
        .expect("temp dir")
}

/// Write `content` to `hosts` inside `dir` and return its path.
pub fn hosts_file(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("hosts");
    fs::write(&path, content).expect("write hosts");
    path
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).expect("read hosts")
}

/// Non-blank, non-comment lines.
pub fn entry_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect()
}
