//! Cache persisted as a JSON document inside the library.

use crate::Cache;
use crate::error::{ErrorKind, Result};
use crate::records::{Record, Records};
use apkshelf_storage::BackendHandle;
use exn::ResultExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// A cache stored as a JSON array of `{"filename": ..., "value": ...}`
/// objects at a fixed path of a storage backend.
///
/// Reads and writes go through the backend, so a read-only backend turns
/// [`commit`](Cache::commit) into a no-op for dry runs.
///
/// # Examples
///
/// ```
/// use apkshelf_cache::{Cache, JsonCache};
/// use apkshelf_storage::backend::LocalBackend;
/// use std::sync::Arc;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let backend = Arc::new(LocalBackend::new(dir.path())?);
/// let mut cache: JsonCache<String> = JsonCache::new(backend, "cache.json");
/// cache.reconstruct();
/// cache.add("App_v2.apk", "App.png".to_string());
/// cache.commit()?;
/// # Ok(())
/// # }
/// ```
pub struct JsonCache<V> {
    backend: BackendHandle,
    path: PathBuf,
    records: Records<V>,
}

impl<V> JsonCache<V> {
    /// Create an empty cache backed by `path`. Nothing is read until
    /// [`reconstruct`](Cache::reconstruct) is called.
    pub fn new(backend: BackendHandle, path: impl Into<PathBuf>) -> Self {
        Self { backend, path: path.into(), records: Records::default() }
    }

    /// Location of the document, relative to the backend root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The loaded records, in document order.
    pub fn records(&self) -> &[Record<V>] {
        self.records.as_slice()
    }
}

impl<V: DeserializeOwned> JsonCache<V> {
    fn load(&self) -> Option<Vec<Record<V>>> {
        match self.backend.exists(&self.path) {
            Ok(true) => {},
            Ok(false) => {
                tracing::debug!(path = %self.path.display(), "No cache document yet; starting empty");
                return None;
            },
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Cache document is inaccessible; starting empty: {e:?}");
                return None;
            },
        }
        let reader = match self.backend.reader(&self.path) {
            Ok(reader) => reader,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Cache document is unreadable; starting empty: {e:?}");
                return None;
            },
        };
        match serde_json::from_reader(reader) {
            Ok(records) => Some(records),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Cache document is corrupt; starting empty");
                None
            },
        }
    }
}

impl<V: Serialize + DeserializeOwned> Cache<V> for JsonCache<V> {
    fn contains(&self, filename: &str) -> bool {
        self.records.get(filename).is_some()
    }

    fn get(&self, filename: &str) -> Option<&V> {
        self.records.get(filename)
    }

    fn add(&mut self, filename: &str, value: V) {
        self.records.add(filename, value);
    }

    fn remove(&mut self, filename: &str) -> Option<V> {
        self.records.remove(filename)
    }

    fn size(&self) -> usize {
        self.records.len()
    }

    fn filenames(&self) -> Vec<String> {
        self.records.filenames()
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn reconstruct(&mut self) {
        self.records = self.load().map(Records::from_records).unwrap_or_default();
        tracing::debug!(records = self.records.len(), "Cache loaded");
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn commit(&mut self) -> Result<()> {
        let document = serde_json::to_vec_pretty(self.records.as_slice()).or_raise(|| ErrorKind::InvalidData)?;
        self.backend.write(&self.path, &document).or_raise(|| ErrorKind::Storage(self.path.clone()))?;
        tracing::debug!(records = self.records.len(), "Cache committed");
        Ok(())
    }
}
