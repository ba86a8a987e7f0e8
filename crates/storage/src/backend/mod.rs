//! Storage backend trait and implementations.
//!
//! [`StorageBackend`] is the only way the rest of apkshelf touches the
//! library directory. Swapping [`LocalBackend`] for [`MockBackend`] (behind
//! the `mock` feature) lets the organizer be tested without a filesystem, and
//! wrapping either in [`ReadOnlyBackend`] turns every mutation into a logged
//! no-op for dry runs.

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod ro;

pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::{MockBackend, Operation};
pub use self::ro::ReadOnlyBackend;
use crate::BoxReader;
use crate::error::Result;
use crate::models::FileInfo;
use std::path::Path;

/// Unified, blocking interface for library storage.
///
/// # Path Handling
/// All paths are relative to the library root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use apkshelf_storage::{StorageBackend, error::Result};
///
/// fn size_of(backend: &dyn StorageBackend, path: &Path) -> Result<u64> {
///     if backend.exists(path)? {
///         Ok(backend.stat(path)?.size)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
pub trait StorageBackend: Send + Sync {
    /// Human-readable name of the backend, used for logging only.
    fn name(&self) -> &str;

    /// List every file whose extension matches `extension` (case-insensitive,
    /// leading dot optional), sorted by path.
    ///
    /// When `recursive` is `false` only the root directory itself is listed.
    /// Entries that cannot be inspected are logged and skipped.
    fn list(&self, extension: &str, recursive: bool) -> Result<Vec<FileInfo>>;

    /// Check if a file exists.
    fn exists(&self, path: &Path) -> Result<bool>;

    /// Open a file for reading.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    fn reader(&self, path: &Path) -> Result<BoxReader>;

    /// Create or overwrite a file, creating parent directories as needed.
    fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    fn delete(&self, path: &Path) -> Result<()>;

    /// Rename/move a file within the library.
    ///
    /// # Notes
    /// - Parent directories of `to` are created as needed.
    /// - If `to` already exists it is overwritten, so callers that must not
    ///   clobber check [`exists`](Self::exists) first.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Get file metadata without reading contents.
    fn stat(&self, path: &Path) -> Result<FileInfo>;
}
