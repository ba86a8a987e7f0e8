//! The APK container: a zip holding `AndroidManifest.xml`, an optional
//! `resources.arsc` and the resource files themselves.

use crate::Archive;
use crate::error::{ErrorKind, Result};
use crate::image::{ImageFormat, validate_image};
use crate::manifest::{Manifest, Value};
use crate::models::{Icon, Metadata};
use crate::resources::{DENSITY_MEDIUM, ResourceTable};
use exn::{OptionExt, ResultExt};
use std::fmt;
use std::io::{Read, Seek};
use zip::ZipArchive;
use zip::result::ZipError;

const MANIFEST: &str = "AndroidManifest.xml";
const RESOURCES: &str = "resources.arsc";
/// Entries larger than this are not read into memory.
const MAX_ENTRY_SIZE: u64 = 64 * 1024 * 1024;
const FALLBACK_ICON_STEM: &str = "ic_launcher";

/// An opened APK.
pub struct Apk<R> {
    zip: ZipArchive<R>,
    metadata: Metadata,
    icon: Option<Value>,
    resources: Option<ResourceTable>,
}

impl<R> fmt::Debug for Apk<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Apk").field("metadata", &self.metadata).finish_non_exhaustive()
    }
}

impl<R: Read + Seek> Apk<R> {
    /// Open an APK and decode its manifest.
    ///
    /// Fails with [`ErrorKind::InvalidArchive`] when `reader` is not a zip or
    /// lacks a manifest, and with [`ErrorKind::Malformed`] or
    /// [`ErrorKind::MissingField`] when the manifest can't be decoded. A
    /// missing or broken `resources.arsc` only degrades label and icon
    /// resolution.
    pub fn open(reader: R) -> Result<Self> {
        let mut zip = ZipArchive::new(reader).or_raise(|| ErrorKind::InvalidArchive("not a zip container".to_string()))?;
        let manifest_bytes =
            read_entry(&mut zip, MANIFEST)?.ok_or_raise(|| ErrorKind::InvalidArchive(format!("no {MANIFEST}")))?;
        let manifest = Manifest::parse(&manifest_bytes)?;
        let resources = match read_entry(&mut zip, RESOURCES) {
            Ok(Some(bytes)) => match ResourceTable::parse(&bytes) {
                Ok(table) => Some(table),
                Err(e) => {
                    tracing::debug!(package = %manifest.package, error = %e, "Ignoring unreadable resource table");
                    None
                },
            },
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(package = %manifest.package, error = %e, "Ignoring unreadable resource table");
                None
            },
        };

        let name = manifest
            .label
            .as_ref()
            .and_then(|label| resolve_text(label, resources.as_ref()))
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| manifest.package.clone());
        let version_name = manifest.version_name.as_ref().and_then(|v| resolve_text(v, resources.as_ref()));
        let metadata = Metadata { package: manifest.package, version_code: manifest.version_code, name, version_name };
        Ok(Self { zip, metadata, icon: manifest.icon, resources })
    }

    /// Every raster icon candidate, highest density first.
    fn icon_candidates(&self) -> Vec<(u16, String)> {
        let mut candidates = match (&self.icon, &self.resources) {
            (Some(Value::Reference(id)), Some(table)) => table.resolve_files(*id),
            (Some(Value::String(path)), _) => vec![(density_of(path).unwrap_or(DENSITY_MEDIUM), path.clone())],
            _ => Vec::new(),
        };
        candidates.retain(|(_, path)| ImageFormat::from_path(path).is_some());
        if candidates.is_empty() {
            candidates = self
                .zip
                .file_names()
                .filter(|name| is_fallback_icon(name))
                .map(|name| (density_of(name).unwrap_or(DENSITY_MEDIUM), name.to_string()))
                .collect();
        }
        // Stable: equal densities keep resource table order.
        candidates.sort_by(|a, b| b.0.cmp(&a.0));
        candidates
    }
}

impl<R: Read + Seek> Archive for Apk<R> {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    #[tracing::instrument(level = "debug", skip(self), fields(package = %self.metadata.package))]
    fn icon(&mut self, max_resolution: u16) -> Result<Icon> {
        let candidates: Vec<_> =
            self.icon_candidates().into_iter().filter(|(density, _)| *density <= max_resolution).collect();
        let mut last_error = None;
        for (density, source) in candidates {
            let Some(bytes) = read_entry(&mut self.zip, &source)? else {
                tracing::debug!(%source, "Icon entry missing from archive");
                continue;
            };
            match validate_image(&bytes) {
                Ok(format) => return Ok(Icon { source, density, format, bytes }),
                Err(e) => {
                    tracing::debug!(%source, density, error = %e, "Skipping invalid icon candidate");
                    last_error = Some(e);
                },
            }
        }
        match last_error {
            Some(e) => Err(e),
            None => exn::bail!(ErrorKind::MissingIcon(max_resolution)),
        }
    }
}

/// Read an entry in full; `None` when the archive has no such entry.
fn read_entry<R: Read + Seek>(zip: &mut ZipArchive<R>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut file = match zip.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e).or_raise(|| ErrorKind::InvalidArchive(format!("unreadable entry {name}"))),
    };
    if file.size() > MAX_ENTRY_SIZE {
        exn::bail!(ErrorKind::InvalidArchive(format!("entry {name} is too large")));
    }
    let mut bytes = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut bytes).or_raise(|| ErrorKind::Io)?;
    Ok(Some(bytes))
}

/// A manifest value as display text, resolving references through the
/// resource table when one is available.
fn resolve_text(value: &Value, resources: Option<&ResourceTable>) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Int(n) => Some(n.to_string()),
        Value::Reference(id) => resources.and_then(|table| table.resolve_string(*id)),
        Value::Other => None,
    }
}

/// Density qualifier of a `res/<type>-<qualifiers>/...` path.
fn density_of(path: &str) -> Option<u16> {
    let directory = path.split('/').nth(1)?;
    directory.split('-').skip(1).find_map(|qualifier| match qualifier {
        "ldpi" => Some(120),
        "mdpi" => Some(160),
        "tvdpi" => Some(213),
        "hdpi" => Some(240),
        "xhdpi" => Some(320),
        "xxhdpi" => Some(480),
        "xxxhdpi" => Some(640),
        "anydpi" | "nodpi" => Some(0),
        other => other.strip_suffix("dpi").and_then(|dpi| dpi.parse().ok()),
    })
}

fn is_fallback_icon(name: &str) -> bool {
    let mut parts = name.split('/');
    let (Some("res"), Some(directory), Some(file), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    (directory.starts_with("mipmap") || directory.starts_with("drawable"))
        && file.rsplit_once('.').is_some_and(|(stem, _)| stem == FALLBACK_ICON_STEM)
        && ImageFormat::from_path(file).is_some()
}
