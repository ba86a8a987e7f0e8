//! Grouping archives by package.

use crate::archive::ArchiveReader;
use crate::pipeline::apply;
use apkshelf_extract::Metadata;
use apkshelf_storage::BackendHandle;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// One archive on disk and the identity read from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    /// Current location, relative to the library root.
    pub path: PathBuf,
    pub metadata: Metadata,
}

/// Archives grouped by package id.
///
/// Each package keeps its records in discovery order; nothing here sorts by
/// version. Packages themselves iterate in package id order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Library {
    packages: BTreeMap<String, Vec<VersionRecord>>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to its package's collection.
    pub fn insert(&mut self, record: VersionRecord) {
        self.packages.entry(record.metadata.package.clone()).or_default().push(record);
    }

    /// Records of one package, in discovery order.
    pub fn get(&self, package: &str) -> Option<&[VersionRecord]> {
        self.packages.get(package).map(Vec::as_slice)
    }

    pub fn packages(&self) -> impl Iterator<Item = (&str, &[VersionRecord])> {
        self.packages.iter().map(|(package, records)| (package.as_str(), records.as_slice()))
    }

    /// Number of packages.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Number of records across every package.
    pub fn records(&self) -> usize {
        self.packages.values().map(Vec::len).sum()
    }
}

impl IntoIterator for Library {
    type Item = (String, Vec<VersionRecord>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Vec<VersionRecord>>;

    fn into_iter(self) -> Self::IntoIter {
        self.packages.into_iter()
    }
}

impl FromIterator<VersionRecord> for Library {
    fn from_iter<I: IntoIterator<Item = VersionRecord>>(iter: I) -> Self {
        let mut library = Self::new();
        iter.into_iter().for_each(|record| library.insert(record));
        library
    }
}

/// Read every archive and group the readable ones by package.
///
/// Unreadable archives are logged and left out.
#[instrument(skip_all, fields(backend = backend.name()))]
pub fn build_library<P: AsRef<Path>>(
    backend: &BackendHandle,
    reader: &dyn ArchiveReader,
    paths: impl IntoIterator<Item = P>,
) -> Library {
    let library: Library = apply(backend, reader, paths, |_, archive| Ok(archive.metadata().clone()))
        .into_iter()
        .map(|(path, metadata)| VersionRecord { path, metadata })
        .collect();
    tracing::debug!(packages = library.len(), records = library.records(), "Library built");
    library
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::fixture::{FakeReader, apk};
    use apkshelf_storage::backend::MockBackend;
    use std::sync::Arc;

    #[test]
    fn test_groups_by_package_in_discovery_order() {
        let backend: BackendHandle = Arc::new(MockBackend::with_files([
            ("z.apk", apk("com.x", 3, "X")),
            ("a.apk", apk("com.x", 1, "X")),
            ("m.apk", apk("com.y", 7, "Y")),
            ("broken.apk", b"broken".to_vec()),
        ]));
        let library = build_library(&backend, &FakeReader, ["z.apk", "broken.apk", "m.apk", "a.apk"]);
        assert_eq!(library.len(), 2);
        assert_eq!(library.records(), 3);
        let paths: Vec<_> = library.get("com.x").unwrap().iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("z.apk"), PathBuf::from("a.apk")]);
        assert_eq!(library.get("com.y").unwrap()[0].metadata.version_code, 7);
        assert!(library.get("com.z").is_none());
    }

    #[test]
    fn test_packages_iterate_by_id() {
        let backend: BackendHandle =
            Arc::new(MockBackend::with_files([("b.apk", apk("com.b", 1, "B")), ("a.apk", apk("com.a", 1, "A"))]));
        let library = build_library(&backend, &FakeReader, ["b.apk", "a.apk"]);
        let packages: Vec<_> = library.packages().map(|(package, _)| package).collect();
        assert_eq!(packages, vec!["com.a", "com.b"]);
    }

    #[test]
    fn test_empty() {
        let backend: BackendHandle = Arc::new(MockBackend::default());
        let library = build_library(&backend, &FakeReader, Vec::<PathBuf>::new());
        assert!(library.is_empty());
    }
}
