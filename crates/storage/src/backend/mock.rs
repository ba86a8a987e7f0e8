//! In-memory storage backend for testing.

use crate::error::{ErrorKind, Result};
use crate::models::has_extension;
use crate::path::validate as validate_path;
use crate::{BoxReader, FileInfo, StorageBackend};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A mutation performed against a [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Write(PathBuf),
    Delete(PathBuf),
    Rename(PathBuf, PathBuf),
}

#[derive(Default)]
struct State {
    files: BTreeMap<PathBuf, Vec<u8>>,
    failing: BTreeSet<PathBuf>,
    operations: Vec<Operation>,
}

/// In-memory storage backend for testing.
///
/// Besides storing files, the mock records every successful mutation (see
/// [`operations`](Self::operations)) and can be told to fail any operation
/// touching a given path (see [`fail_on`](Self::fail_on)).
///
/// # Examples
///
/// ```
/// use apkshelf_storage::backend::MockBackend;
/// use apkshelf_storage::StorageBackend;
/// use std::path::Path;
///
/// let backend = MockBackend::with_files([("A.apk", b"zip")]);
/// assert!(backend.exists(Path::new("A.apk")).unwrap());
/// backend.rename(Path::new("A.apk"), Path::new("App_v1.apk")).unwrap();
/// assert_eq!(backend.operations().len(), 1);
/// ```
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<State>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation. If test setup is wrong, then
    /// the test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut state = State::default();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            state.files.insert(validated, data.into());
        }
        Self { state: Mutex::new(state) }
    }

    /// Make every operation that touches `path` fail with
    /// [`ErrorKind::PermissionDenied`].
    pub fn fail_on(self, path: impl Into<PathBuf>) -> Self {
        self.lock().failing.insert(path.into());
        self
    }

    /// Successful mutations, in the order they happened.
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().operations.clone()
    }

    /// Forget recorded operations, keeping the files.
    pub fn clear_operations(&self) {
        self.lock().operations.clear();
    }

    /// Sorted paths of every stored file.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().files.keys().cloned().collect()
    }

    /// Contents of a stored file.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.lock().files.get(path.as_ref()).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn checked(state: &State, path: &Path) -> Result<PathBuf> {
        let path = validate_path(path)?;
        if state.failing.contains(&path) {
            exn::bail!(ErrorKind::PermissionDenied(path));
        }
        Ok(path)
    }
}

impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn list(&self, extension: &str, recursive: bool) -> Result<Vec<FileInfo>> {
        let state = self.lock();
        Ok(state
            .files
            .iter()
            .filter(|(path, _)| recursive || path.components().count() == 1)
            .filter(|(path, _)| has_extension(path, extension))
            .map(|(path, data)| FileInfo::new(path.clone(), data.len() as u64))
            .collect())
    }

    fn exists(&self, path: &Path) -> Result<bool> {
        let state = self.lock();
        let path = Self::checked(&state, path)?;
        Ok(state.files.contains_key(&path))
    }

    fn reader(&self, path: &Path) -> Result<BoxReader> {
        let state = self.lock();
        let path = Self::checked(&state, path)?;
        let data = state.files.get(&path).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let mut state = self.lock();
        let path = Self::checked(&state, path)?;
        state.files.insert(path.clone(), data.to_vec());
        state.operations.push(Operation::Write(path));
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        let path = Self::checked(&state, path)?;
        if state.files.remove(&path).is_none() {
            exn::bail!(ErrorKind::NotFound(path));
        }
        state.operations.push(Operation::Delete(path));
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut state = self.lock();
        let from = Self::checked(&state, from)?;
        let to = Self::checked(&state, to)?;
        let data = state.files.remove(&from).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(from.clone())))?;
        state.files.insert(to.clone(), data);
        state.operations.push(Operation::Rename(from, to));
        Ok(())
    }

    fn stat(&self, path: &Path) -> Result<FileInfo> {
        let state = self.lock();
        let path = Self::checked(&state, path)?;
        let data = state.files.get(&path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        Ok(FileInfo::new(path, data.len() as u64))
    }
}
