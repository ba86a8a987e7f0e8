//! Applying an operation to every archive in a batch.

use crate::archive::ArchiveReader;
use crate::error::Result;
use apkshelf_extract::Archive;
use apkshelf_storage::BackendHandle;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Open each path with `reader` and run `op` against the archive.
///
/// Paths that fail to open, and paths where `op` fails, are logged and left
/// out of the result; one bad archive never stops the batch. Successful
/// results come back in input order.
#[instrument(level = "debug", skip_all, fields(backend = backend.name()))]
pub fn apply<P, T, F>(
    backend: &BackendHandle,
    reader: &dyn ArchiveReader,
    paths: impl IntoIterator<Item = P>,
    mut op: F,
) -> Vec<(PathBuf, T)>
where
    P: AsRef<Path>,
    F: FnMut(&Path, &mut dyn Archive) -> Result<T>,
{
    let mut results = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let mut archive = match reader.open(backend, path) {
            Ok(archive) => archive,
            Err(e) => {
                tracing::warn!(path = %path.display(), "Skipping unreadable archive: {e:?}");
                continue;
            },
        };
        match op(path, archive.as_mut()) {
            Ok(value) => results.push((path.to_path_buf(), value)),
            Err(e) => tracing::warn!(path = %path.display(), "Skipping archive: {e:?}"),
        }
    }
    results
}
