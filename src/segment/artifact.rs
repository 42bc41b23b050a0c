//! Scoped files: deleted when dropped, on every exit path.
//!
//! Deletion failures are logged and swallowed so they never mask the
//! outcome of the work that used the file.

use crate::segment::planner::SegmentWindow;
use std::io;
use std::path::{Path, PathBuf};

/// A file removed from disk when the guard is dropped (unless disarmed).
#[derive(Debug)]
pub struct ScopedFile {
    path: PathBuf,
    armed: bool,
}

impl ScopedFile {
    /// Takes ownership of `path`; the file is removed on drop.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    /// Wraps `path` without taking ownership; drop leaves the file alone.
    pub fn borrowed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if the file will be removed on drop.
    pub fn is_owned(&self) -> bool {
        self.armed
    }

    /// Size of the file in bytes.
    pub fn len(&self) -> io::Result<u64> {
        std::fs::metadata(&self.path).map(|m| m.len())
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// Removes the file now (if owned). Equivalent to dropping the guard.
    pub fn release(self) {}

    /// Gives up ownership and returns the path; the file stays on disk.
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::trace!(path = %self.path.display(), "removed scoped file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove file");
            }
        }
    }
}

/// Decoded audio produced for one window, deleted when dropped.
#[derive(Debug)]
pub struct SegmentArtifact {
    window: SegmentWindow,
    file: ScopedFile,
}

impl SegmentArtifact {
    pub fn new(window: SegmentWindow, path: impl Into<PathBuf>) -> Self {
        Self {
            window,
            file: ScopedFile::new(path),
        }
    }

    pub fn window(&self) -> &SegmentWindow {
        &self.window
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Size of the artifact in bytes.
    pub fn len(&self) -> io::Result<u64> {
        self.file.len()
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        self.file.is_empty()
    }
}
