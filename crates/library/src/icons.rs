//! Extracting launcher icons into the library.
//!
//! Each archive's icon is written to the icon directory under a name from
//! the icon template, and what happened is cached against the archive's
//! path and size. Archives already in the cache with an unchanged size are
//! not opened again, including ones whose icon could not be extracted: a
//! broken archive stays broken until it is replaced. Entries for archives
//! that are no longer in the library are dropped.

use crate::Context;
use crate::archive::ArchiveReader;
use crate::error::{ErrorKind, Result};
use crate::pipeline::apply;
use apkshelf_cache::Cache;
use apkshelf_extract::Archive;
use apkshelf_storage::{BackendHandle, FileInfo};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::instrument;

/// What happened to an archive's icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconOutcome {
    /// Written to the icon directory under this filename.
    Extracted(String),
    /// The archive has no usable icon.
    Failed,
}

/// Cached result for one archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconEntry {
    /// Archive size when it was processed; a different size means a
    /// different file and the entry is stale.
    pub size: u64,
    pub outcome: IconOutcome,
}

/// Totals for an icon pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IconSummary {
    /// Icons written.
    pub extracted: usize,
    /// Archives without a usable icon.
    pub failed: usize,
    /// Archives skipped because the cache already covers them.
    pub cached: usize,
    /// Archives that could not be processed at all; not cached, so they are
    /// retried next run.
    pub skipped: usize,
    /// Cache entries dropped because their archive is gone.
    pub removed: usize,
}

/// Extract the icon of every archive in `files` that the cache doesn't
/// already cover.
///
/// `files` is the whole library listing: cache entries for any other path
/// belong to archives that were renamed or deleted and are removed.
///
/// The cache should be [reconstructed](Cache::reconstruct) beforehand;
/// committing it afterwards is up to the caller.
#[instrument(skip_all, fields(backend = backend.name(), files = files.len()))]
pub fn extract_icons(
    backend: &BackendHandle,
    reader: &dyn ArchiveReader,
    cache: &mut dyn Cache<IconEntry>,
    ctx: &Context,
    files: &[FileInfo],
) -> IconSummary {
    let mut summary = IconSummary::default();
    let listed: HashSet<&str> = files.iter().filter_map(|file| file.path.to_str()).collect();
    for stale in cache.filenames().into_iter().filter(|key| !listed.contains(key.as_str())) {
        tracing::debug!(path = %stale, "Dropping cache entry for a missing archive");
        cache.remove(&stale);
        summary.removed += 1;
    }

    let mut pending: HashMap<&Path, (&str, u64)> = HashMap::new();
    let mut order = Vec::new();
    for file in files {
        let Some(key) = file.path.to_str() else {
            tracing::warn!(path = %file.path.display(), "Skipping archive with a non UTF-8 path");
            summary.skipped += 1;
            continue;
        };
        if cache.get(key).is_some_and(|entry| entry.size == file.size) {
            tracing::debug!(path = key, "Already processed");
            summary.cached += 1;
            continue;
        }
        pending.insert(&file.path, (key, file.size));
        order.push(&file.path);
    }

    let results = apply(backend, reader, &order, |path, archive| extract_icon(backend, ctx, path, archive));
    summary.skipped += order.len() - results.len();
    for (path, outcome) in results {
        let Some(&(key, size)) = pending.get(path.as_path()) else {
            continue;
        };
        match outcome {
            IconOutcome::Extracted(_) => summary.extracted += 1,
            IconOutcome::Failed => summary.failed += 1,
        }
        cache.add(key, IconEntry { size, outcome });
    }
    tracing::info!(
        extracted = summary.extracted,
        failed = summary.failed,
        cached = summary.cached,
        skipped = summary.skipped,
        removed = summary.removed,
        "Icon extraction complete"
    );
    summary
}

fn extract_icon(backend: &BackendHandle, ctx: &Context, path: &Path, archive: &mut dyn Archive) -> Result<IconOutcome> {
    let metadata = archive.metadata().clone();
    let icon = match archive.icon(ctx.max_resolution) {
        Ok(icon) => icon,
        Err(e) if e.is_invalid_archive() => {
            tracing::error!(path = %path.display(), package = %metadata.package, "Damaged archive: {e:?}");
            return Ok(IconOutcome::Failed);
        },
        Err(e) => {
            tracing::error!(path = %path.display(), package = %metadata.package, "No usable icon: {e:?}");
            return Ok(IconOutcome::Failed);
        },
    };
    let name = ctx.icon_template.generate_icon(&metadata, icon.format)?;
    let target = ctx.icon_directory.join(&name);
    backend.write(&target, &icon.bytes).or_raise(|| ErrorKind::Storage)?;
    tracing::info!(path = %path.display(), icon = %target.display(), source = %icon.source, density = icon.density, "Extracted icon");
    Ok(IconOutcome::Extracted(name))
}
