//! Path validation for library-relative paths.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates and normalizes a path relative to the library root.
///
/// `.` components and repeated separators are dropped, `..` is resolved
/// lexically, and the result must be non-empty and must never climb above
/// the root. Null bytes and Windows prefixes are rejected.
///
/// ```
/// use std::path::Path;
/// use apkshelf_storage::validate_path;
///
/// assert!(validate_path("apks/App_v2.apk").is_ok());
/// assert!(validate_path("../App_v2.apk").is_err());
/// assert_eq!(validate_path("./apks//old/../App.apk").unwrap(), Path::new("apks/App.apk"));
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(original.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in original.components() {
        match component {
            Component::Normal(segment) if segment.as_encoded_bytes().contains(&0) => exn::bail!(invalid()),
            Component::Normal(segment) => normalized.push(segment),
            Component::CurDir | Component::RootDir => {},
            Component::ParentDir => {
                if !normalized.pop() {
                    exn::bail!(invalid());
                }
            },
            Component::Prefix(_) => exn::bail!(invalid()),
        }
    }
    if normalized.as_os_str().is_empty() {
        exn::bail!(invalid());
    }
    Ok(normalized)
}
