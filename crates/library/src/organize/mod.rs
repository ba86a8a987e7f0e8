//! Version reconciliation.
//!
//! Renames every archive of a package so the highest version code carries
//! the canonical template name, superseded versions gain an `.old` suffix,
//! and anything whose name is already taken becomes `<name>[d].dupe`.
//! Either kind of leftover can be deleted instead.
//!
//! Records are visited package by package, in collection order; when several
//! records share the highest version code the first one visited is canonical
//! and the rest collide against it. A failure on one record is logged and
//! reported as [`Outcome::Failed`]; it never stops the batch. Re-running over
//! an organized library changes nothing, because `.old` and `.dupe` files no
//! longer match the archive extension and canonical names are already in
//! place.
//!
//! Names are compared exactly. On a case-insensitive filesystem an archive
//! whose name differs from its target only in case (`app_v2.apk` against
//! `App_v2.apk`) sees itself as the occupant and is renamed to a `.dupe`
//! rather than re-cased.

pub mod error;
mod record;

use self::error::{ErrorKind, Result};
use self::record::{Class, Names, Plan, plan};
use crate::library::{Library, VersionRecord};
use crate::{Context, TieBreak};
use apkshelf_storage::BackendHandle;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// What reconciliation did to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Already correctly named; no filesystem call was made.
    Unchanged,
    /// Renamed to the canonical name.
    Renamed(PathBuf),
    /// Renamed to its `.old` name.
    RenamedOld(PathBuf),
    /// Renamed to a `[d].dupe` name.
    RenamedDuplicate(PathBuf),
    DeletedOld,
    DeletedDuplicate,
    /// The record could not be reconciled; its file is untouched.
    Failed,
}

/// Totals for a reconciliation pass.
///
/// `old` and `duplicates` count records by classification, including those
/// whose rename or delete then failed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub old: usize,
    pub duplicates: usize,
    /// Every record's original path and outcome, in the order visited.
    pub outcomes: Vec<(PathBuf, Outcome)>,
}

impl Summary {
    /// Outcome recorded for the record originally at `path`.
    pub fn outcome(&self, path: impl AsRef<Path>) -> Option<&Outcome> {
        self.outcomes.iter().find(|(p, _)| p == path.as_ref()).map(|(_, outcome)| outcome)
    }

    /// Number of records that failed.
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|(_, outcome)| *outcome == Outcome::Failed).count()
    }
}

/// Reconcile every package in `library`.
#[instrument(skip_all, fields(backend = backend.name(), packages = library.len()))]
pub fn reconcile(backend: &BackendHandle, library: Library, ctx: &Context) -> Summary {
    let mut summary = Summary::default();
    let mut names = Names::new(backend);
    for (package, mut records) in library {
        if ctx.tie_break == TieBreak::Path {
            records.sort_by(|a, b| a.path.cmp(&b.path));
        }
        reconcile_package(backend, ctx, &mut names, &package, &records, &mut summary);
    }
    tracing::info!(old = summary.old, duplicates = summary.duplicates, failed = summary.failed(), "Reconciliation complete");
    summary
}

#[instrument(level = "debug", skip_all, fields(package = %package))]
fn reconcile_package(
    backend: &BackendHandle,
    ctx: &Context,
    names: &mut Names<'_>,
    package: &str,
    records: &[VersionRecord],
    summary: &mut Summary,
) {
    let Some(canonical_code) = records.iter().map(|r| r.metadata.version_code).max() else {
        return;
    };
    let mut duplicates = 0;
    for record in records {
        let outcome = match plan(ctx, names, record, canonical_code, &mut duplicates) {
            Ok(plan) => {
                match plan {
                    Plan::Rename { class: Class::Old, .. } | Plan::Delete { class: Class::Old } => summary.old += 1,
                    Plan::Rename { class: Class::Duplicate, .. } | Plan::Delete { class: Class::Duplicate } => {
                        summary.duplicates += 1
                    },
                    _ => {},
                }
                execute(backend, names, &record.path, plan)
            },
            Err(e) => Err(e),
        };
        let outcome = outcome.unwrap_or_else(|e| {
            tracing::error!(%package, path = %record.path.display(), "Failed to reconcile: {e:?}");
            Outcome::Failed
        });
        match &outcome {
            Outcome::Unchanged => tracing::debug!(path = %record.path.display(), "Already in place"),
            Outcome::Renamed(to) | Outcome::RenamedOld(to) | Outcome::RenamedDuplicate(to) => {
                tracing::info!(from = %record.path.display(), to = %to.display(), "Renamed")
            },
            Outcome::DeletedOld | Outcome::DeletedDuplicate => tracing::info!(path = %record.path.display(), "Deleted"),
            Outcome::Failed => {},
        }
        summary.outcomes.push((record.path.clone(), outcome));
    }
}

fn execute(backend: &BackendHandle, names: &mut Names<'_>, path: &Path, plan: Plan) -> Result<Outcome> {
    match plan {
        Plan::Keep => Ok(Outcome::Unchanged),
        Plan::Rename { class, to } => {
            backend.rename(path, &to).or_raise(|| ErrorKind::Storage)?;
            names.renamed(path, &to);
            Ok(match class {
                Class::Canonical => Outcome::Renamed(to),
                Class::Old => Outcome::RenamedOld(to),
                Class::Duplicate => Outcome::RenamedDuplicate(to),
            })
        },
        Plan::Delete { class } => {
            backend.delete(path).or_raise(|| ErrorKind::Storage)?;
            names.deleted(path);
            Ok(match class {
                Class::Duplicate => Outcome::DeletedDuplicate,
                _ => Outcome::DeletedOld,
            })
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::fixture::{FakeReader, apk};
    use crate::library::build_library;
    use apkshelf_config::Config;
    use apkshelf_storage::backend::{LocalBackend, MockBackend, Operation, ReadOnlyBackend};
    use rstest::rstest;
    use std::sync::Arc;

    fn context(delete_duplicates: bool, delete_old_versions: bool, tie_break: TieBreak) -> Context {
        Context::try_from(&Config { delete_duplicates, delete_old_versions, tie_break, ..Config::default() }).unwrap()
    }

    /// Build the library from every `.apk` in the backend root, then reconcile.
    fn run(backend: &BackendHandle, ctx: &Context) -> Summary {
        let files = backend.list("apk", false).unwrap();
        let library = build_library(backend, &FakeReader, files.iter().map(|file| &file.path));
        reconcile(backend, library, ctx)
    }

    fn paths(backend: &MockBackend) -> Vec<String> {
        backend.paths().iter().map(|p| p.display().to_string()).collect()
    }

    #[test]
    fn test_newer_version_is_canonical() {
        let mock = Arc::new(MockBackend::with_files([("A.apk", apk("com.x", 1, "App")), ("B.apk", apk("com.x", 2, "App"))]));
        let backend: BackendHandle = mock.clone();
        let summary = run(&backend, &context(false, false, TieBreak::FirstSeen));

        assert_eq!(paths(&mock), vec!["App_v1.apk.old", "App_v2.apk"]);
        assert_eq!((summary.old, summary.duplicates), (1, 0));
        assert_eq!(summary.outcome("A.apk"), Some(&Outcome::RenamedOld(PathBuf::from("App_v1.apk.old"))));
        assert_eq!(summary.outcome("B.apk"), Some(&Outcome::Renamed(PathBuf::from("App_v2.apk"))));
    }

    #[test]
    fn test_same_version_becomes_duplicate() {
        let mock = Arc::new(MockBackend::with_files([("A.apk", apk("com.x", 2, "App")), ("B.apk", apk("com.x", 2, "App"))]));
        let backend: BackendHandle = mock.clone();
        let summary = run(&backend, &context(false, false, TieBreak::FirstSeen));

        assert_eq!(paths(&mock), vec!["App_v2.apk", "App_v2.apk[0].dupe"]);
        assert_eq!((summary.old, summary.duplicates), (0, 1));
        assert_eq!(summary.outcome("B.apk"), Some(&Outcome::RenamedDuplicate(PathBuf::from("App_v2.apk[0].dupe"))));
    }

    #[test]
    fn test_mixed_versions() {
        let mock = Arc::new(MockBackend::with_files([
            ("a.apk", apk("com.x", 3, "App")),
            ("b.apk", apk("com.x", 5, "App")),
            ("c.apk", apk("com.x", 5, "App")),
            ("d.apk", apk("com.x", 2, "App")),
        ]));
        let backend: BackendHandle = mock.clone();
        let summary = run(&backend, &context(false, false, TieBreak::FirstSeen));

        assert_eq!(paths(&mock), vec!["App_v2.apk.old", "App_v3.apk.old", "App_v5.apk", "App_v5.apk[0].dupe"]);
        assert_eq!((summary.old, summary.duplicates), (2, 1));
    }

    #[rstest]
    #[case::keep_all(false, false)]
    #[case::delete_duplicates(true, false)]
    #[case::delete_old_versions(false, true)]
    #[case::delete_both(true, true)]
    fn test_second_run_changes_nothing(#[case] delete_duplicates: bool, #[case] delete_old_versions: bool) {
        let mock = Arc::new(MockBackend::with_files([
            ("a.apk", apk("com.x", 3, "App")),
            ("b.apk", apk("com.x", 5, "App")),
            ("c.apk", apk("com.x", 5, "App")),
            ("d.apk", apk("com.x", 2, "App")),
            ("other.apk", apk("com.y", 1, "Other")),
        ]));
        let backend: BackendHandle = mock.clone();
        let ctx = context(delete_duplicates, delete_old_versions, TieBreak::FirstSeen);
        let first = run(&backend, &ctx);
        assert_eq!((first.old, first.duplicates), (2, 1));
        let organized = paths(&mock);
        assert_eq!(organized.iter().any(|p| p.ends_with(".dupe")), !delete_duplicates);
        assert_eq!(organized.iter().any(|p| p.ends_with(".old")), !delete_old_versions);
        mock.clear_operations();

        let summary = run(&backend, &ctx);
        assert!(mock.operations().is_empty());
        assert_eq!(paths(&mock), organized);
        assert_eq!((summary.old, summary.duplicates), (0, 0));
        assert!(summary.outcomes.iter().all(|(_, outcome)| *outcome == Outcome::Unchanged));
    }

    #[test]
    fn test_local_backend_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, contents: Vec<u8>| std::fs::write(dir.path().join(name), contents).unwrap();
        write("A.apk", apk("com.x", 1, "App"));
        write("B.apk", apk("com.x", 2, "App"));
        write("C.apk", apk("com.y", 2, "Other"));
        write("D.apk", apk("com.y", 2, "Other"));
        let backend: BackendHandle = Arc::new(LocalBackend::new(dir.path()).unwrap());
        let ctx = context(false, false, TieBreak::FirstSeen);
        let listing = || {
            let mut names: Vec<String> = std::fs::read_dir(dir.path())
                .unwrap()
                .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        };

        let summary = run(&backend, &ctx);
        assert_eq!((summary.old, summary.duplicates), (1, 1));
        assert_eq!(summary.outcome("A.apk"), Some(&Outcome::RenamedOld(PathBuf::from("App_v1.apk.old"))));
        assert_eq!(summary.outcome("B.apk"), Some(&Outcome::Renamed(PathBuf::from("App_v2.apk"))));
        assert_eq!(summary.outcome("C.apk"), Some(&Outcome::Renamed(PathBuf::from("Other_v2.apk"))));
        assert_eq!(summary.outcome("D.apk"), Some(&Outcome::RenamedDuplicate(PathBuf::from("Other_v2.apk[0].dupe"))));
        let organized = listing();
        assert_eq!(organized, vec!["App_v1.apk.old", "App_v2.apk", "Other_v2.apk", "Other_v2.apk[0].dupe"]);
        assert_eq!(std::fs::read(dir.path().join("App_v2.apk")).unwrap(), apk("com.x", 2, "App"));

        let again = run(&backend, &ctx);
        assert_eq!(again.outcomes.len(), 2);
        assert!(again.outcomes.iter().all(|(_, outcome)| *outcome == Outcome::Unchanged));
        assert_eq!((again.old, again.duplicates), (0, 0));
        assert_eq!(listing(), organized);
    }

    #[test]
    fn test_failure_is_isolated() {
        let mock = Arc::new(
            MockBackend::with_files([
                ("A.apk", apk("com.x", 1, "App")),
                ("B.apk", apk("com.x", 2, "App")),
                ("C.apk", apk("com.y", 1, "Other")),
            ])
            .fail_on("App_v1.apk.old"),
        );
        let backend: BackendHandle = mock.clone();
        let summary = run(&backend, &context(false, false, TieBreak::FirstSeen));

        assert_eq!(summary.outcome("A.apk"), Some(&Outcome::Failed));
        assert_eq!(summary.outcome("B.apk"), Some(&Outcome::Renamed(PathBuf::from("App_v2.apk"))));
        assert_eq!(summary.outcome("C.apk"), Some(&Outcome::Renamed(PathBuf::from("Other_v1.apk"))));
        assert_eq!(summary.failed(), 1);
        assert_eq!(paths(&mock), vec!["A.apk", "App_v2.apk", "Other_v1.apk"]);
    }

    #[test]
    fn test_delete_flags() {
        let mock = Arc::new(MockBackend::with_files([
            ("A.apk", apk("com.x", 1, "App")),
            ("B.apk", apk("com.x", 2, "App")),
            ("C.apk", apk("com.x", 2, "App")),
        ]));
        let backend: BackendHandle = mock.clone();
        let summary = run(&backend, &context(true, true, TieBreak::FirstSeen));

        assert_eq!(mock.operations(), vec![
            Operation::Delete(PathBuf::from("A.apk")),
            Operation::Rename(PathBuf::from("B.apk"), PathBuf::from("App_v2.apk")),
            Operation::Delete(PathBuf::from("C.apk")),
        ]);
        assert_eq!(summary.outcome("A.apk"), Some(&Outcome::DeletedOld));
        assert_eq!(summary.outcome("C.apk"), Some(&Outcome::DeletedDuplicate));
        assert_eq!((summary.old, summary.duplicates), (1, 1));
        assert_eq!(paths(&mock), vec!["App_v2.apk"]);
    }

    #[test]
    fn test_existing_canonical_file_wins() {
        let mock = Arc::new(MockBackend::with_files([
            ("App_v2.apk", apk("com.x", 2, "App")),
            ("App_v2.apk[0].dupe", apk("com.x", 2, "App")),
            ("download.apk", apk("com.x", 2, "App")),
        ]));
        let backend: BackendHandle = mock.clone();
        let summary = run(&backend, &context(false, false, TieBreak::FirstSeen));

        assert_eq!(summary.outcome("App_v2.apk"), Some(&Outcome::Unchanged));
        assert_eq!(
            summary.outcome("download.apk"),
            Some(&Outcome::RenamedDuplicate(PathBuf::from("App_v2.apk[1].dupe")))
        );
    }

    #[rstest]
    #[case::first_seen(TieBreak::FirstSeen, "b.apk")]
    #[case::path(TieBreak::Path, "a.apk")]
    fn test_tie_break(#[case] tie_break: TieBreak, #[case] canonical: &str) {
        let mock = Arc::new(MockBackend::with_files([("a.apk", apk("com.x", 4, "App")), ("b.apk", apk("com.x", 4, "App"))]));
        let backend: BackendHandle = mock.clone();
        let library = build_library(&backend, &FakeReader, ["b.apk", "a.apk"]);
        let summary = reconcile(&backend, library, &context(false, false, tie_break));

        assert_eq!(summary.outcome(canonical), Some(&Outcome::Renamed(PathBuf::from("App_v4.apk"))));
        assert_eq!(summary.duplicates, 1);
    }

    #[test]
    fn test_dry_run_predicts_layout() {
        let mock = Arc::new(MockBackend::with_files([
            ("App_v2.apk", apk("com.x", 1, "App")),
            ("B.apk", apk("com.x", 2, "App")),
            ("C.apk", apk("com.x", 2, "App")),
        ]));
        let inner: BackendHandle = mock.clone();
        let backend: BackendHandle = Arc::new(ReadOnlyBackend::new(inner));
        let summary = run(&backend, &context(false, false, TieBreak::FirstSeen));

        assert!(mock.operations().is_empty());
        assert_eq!(summary.outcome("App_v2.apk"), Some(&Outcome::RenamedOld(PathBuf::from("App_v1.apk.old"))));
        assert_eq!(summary.outcome("B.apk"), Some(&Outcome::Renamed(PathBuf::from("App_v2.apk"))));
        assert_eq!(summary.outcome("C.apk"), Some(&Outcome::RenamedDuplicate(PathBuf::from("App_v2.apk[0].dupe"))));
    }

    #[test]
    fn test_template_failure() {
        let mock = Arc::new(MockBackend::with_files([("A.apk", apk("com.x", 1, "App"))]));
        let backend: BackendHandle = mock.clone();
        let mut ctx = context(false, false, TieBreak::FirstSeen);
        ctx.template = "{{ version_name }}".parse().unwrap();
        let summary = run(&backend, &ctx);

        assert_eq!(summary.outcome("A.apk"), Some(&Outcome::Failed));
        assert!(mock.operations().is_empty());
    }
}
