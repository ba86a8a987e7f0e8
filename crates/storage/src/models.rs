//! Storage models.

use std::path::{Path, PathBuf};

/// File metadata returned by storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Relative path from storage root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self { path: path.into(), size }
    }
}

/// Case-insensitive extension match. The leading dot of `extension` is
/// optional, so both `"apk"` and `".apk"` select `App.APK`.
pub fn has_extension(path: impl AsRef<Path>, extension: &str) -> bool {
    let wanted = extension.trim().trim_start_matches('.');
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}
