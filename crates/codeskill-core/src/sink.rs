//! Where a run's reports and generated files land.
//!
//! Paths are joined onto the project root verbatim. A generated path such as
//! `../outside.txt` or an absolute path escapes the project tree; there is
//! no sandboxing.

use crate::error::Result;
use crate::io::{atomic_write, to_pretty_json};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub trait ProjectSink {
    /// Create or overwrite `path` (relative to the project root).
    fn write(&self, path: &str, data: &[u8]) -> Result<()>;

    fn read_to_string(&self, path: &str) -> Result<String>;

    fn exists(&self, path: &str) -> bool;
}

/// Write `value` as pretty JSON through any sink.
pub fn write_json<T: Serialize + ?Sized>(
    sink: &dyn ProjectSink,
    path: &str,
    value: &T,
) -> Result<()> {
    sink.write(path, &to_pretty_json(value)?)
}

/// Writes to the local filesystem under `root`.
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl ProjectSink for FsSink {
    fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        atomic_write(&self.resolve(path), data)
    }

    fn read_to_string(&self, path: &str) -> Result<String> {
        Ok(std::fs::read_to_string(self.resolve(path))?)
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_relative_to_root() {
        let dir = TempDir::new().unwrap();
        let sink = FsSink::new(dir.path());
        sink.write("src/app.py", b"print('hi')\n").unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("src/app.py")).unwrap(),
            "print('hi')\n"
        );
        assert!(sink.exists("src/app.py"));
        assert_eq!(sink.read_to_string("src/app.py").unwrap(), "print('hi')\n");
    }

    #[test]
    fn json_is_pretty() {
        let dir = TempDir::new().unwrap();
        let sink = FsSink::new(dir.path());
        write_json(&sink, "docs/x.json", &serde_json::json!({"k": [1]})).unwrap();
        let text = sink.read_to_string("docs/x.json").unwrap();
        assert!(text.contains("\n  \"k\": [\n    1\n  ]"));
    }

    #[test]
    fn parent_segments_are_not_contained() {
        let dir = TempDir::new().unwrap();
        let inner = dir.path().join("project");
        std::fs::create_dir_all(&inner).unwrap();
        let sink = FsSink::new(&inner);
        sink.write("../escaped.txt", b"x").unwrap();
        assert!(dir.path().join("escaped.txt").exists());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = FsSink::new(dir.path()).read_to_string("nope.txt").unwrap_err();
        assert!(matches!(err, crate::error::SkillError::Io(_)));
    }
}
