//! Read-only storage backend.
//!
//! Wraps another backend and prevents mutations from executing, while still
//! indicating success on return. Used for dry runs.

use crate::error::Result;
use crate::{BackendHandle, BoxReader, FileInfo, StorageBackend};
use std::path::Path;

/// Read-only storage backend.
///
/// Wraps another backend and silently drops all write, delete and rename
/// operations, logging an [`info event`](tracing::Event) for each.
///
/// Because dropped renames never happen, later existence checks still see
/// the original layout. Callers predicting a sequence of mutations have to
/// track the names they would have claimed or freed themselves.
#[derive(Clone)]
pub struct ReadOnlyBackend {
    inner: BackendHandle,
}
impl ReadOnlyBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

impl StorageBackend for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn list(&self, extension: &str, recursive: bool) -> Result<Vec<FileInfo>> {
        self.inner.list(extension, recursive)
    }

    fn exists(&self, path: &Path) -> Result<bool> {
        self.inner.exists(path)
    }

    fn reader(&self, path: &Path) -> Result<BoxReader> {
        self.inner.reader(path)
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        tracing::info!(path = %path.display(), bytes = data.len(), "Skipping write during dry run");
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<()> {
        tracing::info!(path = %path.display(), "Skipping delete during dry run");
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        tracing::info!(from = %from.display(), to = %to.display(), "Skipping rename during dry run");
        Ok(())
    }

    fn stat(&self, path: &Path) -> Result<FileInfo> {
        self.inner.stat(path)
    }
}
