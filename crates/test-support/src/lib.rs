//! Scratch directories for tests that need real files.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Temporary directory removed on drop.
pub struct TempRoot {
    dir: TempDir,
}

impl TempRoot {
    pub fn new(prefix: &str) -> Self {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .unwrap_or_else(|err| panic!("failed to create temp dir: {err}"));
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// File-backed SQLite url inside this directory, created on first connect.
    pub fn sqlite_url(&self, name: &str) -> String {
        format!("sqlite://{}?mode=rwc", self.join(name).to_string_lossy())
    }
}
