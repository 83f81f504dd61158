//! Per-invocation scratch directory management (C11, spec.md §5, §9).
//!
//! Each planning invocation acquires exactly one scratch directory at
//! start and releases it unconditionally on every exit path, mirroring how
//! the teacher's `runner.rs` wraps each FastGA call in a `tempfile::TempDir`.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Owns the lifetime of the scratch directory used to exchange files with
/// external tools during one invocation. Dropping it removes the
/// directory, so it is held for the duration of `plan()` regardless of how
/// that call returns.
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("gibplan_").tempdir()?;
        Ok(Scratch { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Allocates a path inside the scratch directory for a named temp
    /// file; the caller is responsible for writing/reading it.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_dir_exists_then_is_removed() {
        let path;
        {
            let scratch = Scratch::new().unwrap();
            path = scratch.path().to_path_buf();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn file_paths_are_scoped_to_scratch_dir() {
        let scratch = Scratch::new().unwrap();
        let f = scratch.file("query.fa");
        assert_eq!(f.parent().unwrap(), scratch.path());
    }
}
