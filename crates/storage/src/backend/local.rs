//! Local filesystem storage backend.

use crate::error::{ErrorKind, Result};
use crate::models::has_extension;
use crate::path::validate as validate_path;
use crate::{BoxReader, FileInfo, StorageBackend};
use exn::ResultExt;
use std::fs::{self, DirEntry, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

enum WalkEntry {
    File(FileInfo),
    Descend(PathBuf),
    Skip,
}

/// Local filesystem storage backend rooted at an existing directory.
///
/// # Examples
///
/// ```no_run
/// use apkshelf_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("/srv/apks")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// Open the library rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidDirectory`] if `root` does not exist or is
    /// not a directory. Unlike the other backends this never creates the
    /// root: pointing apkshelf at a typo should fail loudly.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            tracing::warn!(root = %root.display(), "Library root is not a valid directory or does not exist");
            exn::bail!(ErrorKind::InvalidDirectory(root.to_path_buf()));
        }
        let root = fs::canonicalize(root).map_err(|e| Self::map_io_error(e, root))?;
        Ok(Self { name: root.display().to_string(), root })
    }

    /// Absolute path of the library root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the absolute path for a relative storage path.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    /// Convert an absolute path back to a relative storage path.
    fn relative_path(&self, absolute: impl AsRef<Path>) -> Result<PathBuf> {
        let absolute = absolute.as_ref();
        let relative = absolute.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("path `{}` is not within root `{}`", absolute.display(), self.root.display()))
        })?;
        validate_path(relative)
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    fn process_entry(&self, entry: &DirEntry, extension: &str, recursive: bool) -> Result<WalkEntry> {
        let path = entry.path();
        let metadata = entry.metadata().map_err(|e| Self::map_io_error(e, &path))?;
        if metadata.is_dir() {
            return Ok(if recursive { WalkEntry::Descend(path) } else { WalkEntry::Skip });
        }
        if metadata.is_file() && has_extension(&path, extension) {
            return Ok(WalkEntry::File(FileInfo::new(self.relative_path(&path)?, metadata.len())));
        }
        // Other extensions, and most likely broken symlinks.
        Ok(WalkEntry::Skip)
    }
}

impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list(&self, extension: &str, recursive: bool) -> Result<Vec<FileInfo>> {
        let mut files = Vec::new();
        let mut stack = vec![self.root.clone()];
        while let Some(current) = stack.pop() {
            let entries = match fs::read_dir(&current) {
                Ok(entries) => entries,
                Err(e) if current == self.root => exn::bail!(Self::map_io_error(e, &current)),
                Err(e) => {
                    tracing::warn!(path = %current.display(), error = %e, "Skipping unreadable directory");
                    continue;
                },
            };
            for entry in entries {
                let walked = match entry {
                    Ok(entry) => self.process_entry(&entry, extension, recursive),
                    Err(e) => Err(exn::Exn::from(Self::map_io_error(e, &current))),
                };
                match walked {
                    Ok(WalkEntry::File(file)) => files.push(file),
                    Ok(WalkEntry::Descend(dir)) => stack.push(dir),
                    Ok(WalkEntry::Skip) => {},
                    Err(e) => tracing::warn!(directory = %current.display(), "Skipping entry: {e:?}"),
                }
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    fn exists(&self, path: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(path)?;
        Ok(abs_path.try_exists().map_err(ErrorKind::Io)?)
    }

    fn reader(&self, path: &Path) -> Result<BoxReader> {
        let abs_path = self.absolute_path(path)?;
        let file = File::open(&abs_path).map_err(|e| Self::map_io_error(e, path))?;
        Ok(Box::new(BufReader::new(file)))
    }

    /// Writes go to a sibling temporary file that is then renamed over the
    /// target, so readers never observe a half-written file.
    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        let parent = abs_path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent).map_err(|e| Self::map_io_error(e, path))?;
        let mut temp = NamedTempFile::new_in(parent).map_err(|e| Self::map_io_error(e, path))?;
        temp.write_all(data).map_err(|e| Self::map_io_error(e, path))?;
        temp.persist(&abs_path).map_err(|e| Self::map_io_error(e.error, path))?;
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::remove_file(&abs_path).map_err(|e| Self::map_io_error(e, path))?)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from_path = self.absolute_path(from)?;
        let to_path = self.absolute_path(to)?;
        if let Some(parent) = to_path.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::map_io_error(e, to))?;
        }
        Ok(fs::rename(&from_path, &to_path).map_err(|e| Self::map_io_error(e, from))?)
    }

    fn stat(&self, path: &Path) -> Result<FileInfo> {
        let abs_path = self.absolute_path(path)?;
        let metadata = fs::metadata(&abs_path).map_err(|e| Self::map_io_error(e, path))?;
        Ok(FileInfo::new(validate_path(path)?, metadata.len()))
    }
}
