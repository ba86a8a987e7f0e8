//! Deciding what happens to a single record.

use crate::Context;
use crate::library::VersionRecord;
use crate::organize::error::{ErrorKind, Result};
use apkshelf_storage::BackendHandle;
use exn::ResultExt;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const OLD_SUFFIX: &str = ".old";
const DUPLICATE_SUFFIX: &str = ".dupe";

/// How a record relates to the rest of its package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Class {
    /// Carries the highest version code and gets the plain name.
    Canonical,
    /// Superseded by a higher version code.
    Old,
    /// Its name is already taken by another file.
    Duplicate,
}

/// The filesystem change a record needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Plan {
    /// Already correctly named.
    Keep,
    Rename { class: Class, to: PathBuf },
    Delete { class: Class },
}

/// Names that are taken in the library, as far as this pass knows.
///
/// Starts from what the backend reports and layers this pass's own renames
/// and deletions on top, so a backend that drops mutations (dry runs) still
/// sees the layout the pass would have produced.
pub(crate) struct Names<'a> {
    backend: &'a BackendHandle,
    claimed: HashSet<PathBuf>,
    vacated: HashSet<PathBuf>,
}

impl<'a> Names<'a> {
    pub fn new(backend: &'a BackendHandle) -> Self {
        Self { backend, claimed: HashSet::new(), vacated: HashSet::new() }
    }

    pub fn is_taken(&self, path: &Path) -> Result<bool> {
        if self.claimed.contains(path) {
            return Ok(true);
        }
        if self.vacated.contains(path) {
            return Ok(false);
        }
        self.backend.exists(path).or_raise(|| ErrorKind::Storage)
    }

    pub fn renamed(&mut self, from: &Path, to: &Path) {
        self.claimed.remove(from);
        self.vacated.insert(from.to_path_buf());
        self.vacated.remove(to);
        self.claimed.insert(to.to_path_buf());
    }

    pub fn deleted(&mut self, path: &Path) {
        self.claimed.remove(path);
        self.vacated.insert(path.to_path_buf());
    }
}

/// Work out what to do with `record`, given the highest version code of its
/// package.
///
/// `duplicates` is the package's running duplicate counter: each collision
/// takes the next free `[d].dupe` slot.
pub(crate) fn plan(
    ctx: &Context,
    names: &Names<'_>,
    record: &VersionRecord,
    canonical_code: u64,
    duplicates: &mut usize,
) -> Result<Plan> {
    let class = if record.metadata.version_code == canonical_code { Class::Canonical } else { Class::Old };
    let name = ctx.template.generate(&record.metadata).or_raise(|| ErrorKind::Template)?;
    let parent = record.path.parent().unwrap_or(Path::new(""));
    let target = match class {
        Class::Old => parent.join(format!("{name}{OLD_SUFFIX}")),
        _ => parent.join(&name),
    };

    if target == record.path {
        return Ok(Plan::Keep);
    }
    if !names.is_taken(&target)? {
        return Ok(match class {
            Class::Old if ctx.delete_old_versions => Plan::Delete { class },
            _ => Plan::Rename { class, to: target },
        });
    }

    if ctx.delete_duplicates {
        *duplicates += 1;
        return Ok(Plan::Delete { class: Class::Duplicate });
    }
    loop {
        let candidate = parent.join(format!("{name}[{}]{DUPLICATE_SUFFIX}", *duplicates));
        *duplicates += 1;
        if candidate == record.path {
            return Ok(Plan::Keep);
        }
        if !names.is_taken(&candidate)? {
            return Ok(Plan::Rename { class: Class::Duplicate, to: candidate });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apkshelf_config::Config;
    use apkshelf_extract::Metadata;
    use apkshelf_storage::backend::MockBackend;
    use rstest::rstest;
    use std::sync::Arc;

    fn record(path: &str, version_code: u64) -> VersionRecord {
        VersionRecord {
            path: PathBuf::from(path),
            metadata: Metadata {
                package: "com.x".to_string(),
                version_code,
                name: "App".to_string(),
                version_name: None,
            },
        }
    }

    fn context(delete_duplicates: bool, delete_old_versions: bool) -> Context {
        Context::try_from(&Config { delete_duplicates, delete_old_versions, ..Config::default() }).unwrap()
    }

    #[rstest]
    #[case::canonical("B.apk", 2, Plan::Rename { class: Class::Canonical, to: PathBuf::from("App_v2.apk") })]
    #[case::old("A.apk", 1, Plan::Rename { class: Class::Old, to: PathBuf::from("App_v1.apk.old") })]
    #[case::in_place("App_v2.apk", 2, Plan::Keep)]
    #[case::nested("sub/B.apk", 2, Plan::Rename { class: Class::Canonical, to: PathBuf::from("sub/App_v2.apk") })]
    fn test_plan(#[case] path: &str, #[case] version_code: u64, #[case] expected: Plan) {
        let backend: BackendHandle = Arc::new(MockBackend::default());
        let names = Names::new(&backend);
        let mut duplicates = 0;
        assert_eq!(plan(&context(false, false), &names, &record(path, version_code), 2, &mut duplicates).unwrap(), expected);
        assert_eq!(duplicates, 0);
    }

    #[test]
    fn test_duplicate_counter_skips_taken_slots() {
        let backend: BackendHandle =
            Arc::new(MockBackend::with_files([("App_v2.apk", b"x".to_vec()), ("App_v2.apk[0].dupe", b"x".to_vec())]));
        let names = Names::new(&backend);
        let mut duplicates = 0;
        let plan = plan(&context(false, false), &names, &record("C.apk", 2), 2, &mut duplicates).unwrap();
        assert_eq!(plan, Plan::Rename { class: Class::Duplicate, to: PathBuf::from("App_v2.apk[1].dupe") });
        assert_eq!(duplicates, 2);
    }

    #[test]
    fn test_delete_old_only_without_collision() {
        let backend: BackendHandle = Arc::new(MockBackend::with_files([("App_v1.apk.old", b"x".to_vec())]));
        let mut names = Names::new(&backend);
        let mut duplicates = 0;
        let ctx = context(false, true);
        assert_eq!(plan(&ctx, &names, &record("A.apk", 1), 2, &mut duplicates).unwrap(), Plan::Rename {
            class: Class::Duplicate,
            to: PathBuf::from("App_v1.apk[0].dupe")
        });
        names.deleted(Path::new("App_v1.apk.old"));
        assert_eq!(plan(&ctx, &names, &record("A.apk", 1), 2, &mut duplicates).unwrap(), Plan::Delete {
            class: Class::Old
        });
    }

    #[test]
    fn test_names_compare_exactly() {
        let backend: BackendHandle = Arc::new(MockBackend::with_files([("app_v2.apk", b"x".to_vec())]));
        let names = Names::new(&backend);
        let mut duplicates = 0;
        let plan = plan(&context(false, false), &names, &record("app_v2.apk", 2), 2, &mut duplicates).unwrap();
        assert_eq!(plan, Plan::Rename { class: Class::Canonical, to: PathBuf::from("App_v2.apk") });
        assert!(!names.is_taken(Path::new("App_v2.apk")).unwrap());
    }

    #[test]
    fn test_names_track_renames() {
        let backend: BackendHandle = Arc::new(MockBackend::with_files([("A.apk", b"x".to_vec())]));
        let mut names = Names::new(&backend);
        names.renamed(Path::new("A.apk"), Path::new("App_v1.apk"));
        assert!(!names.is_taken(Path::new("A.apk")).unwrap());
        assert!(names.is_taken(Path::new("App_v1.apk")).unwrap());
    }
}
