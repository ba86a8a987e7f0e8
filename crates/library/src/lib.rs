//! Building, reconciling and mining an APK library.
//!
//! A library is a directory of archives. [`build_library`] groups them by
//! package, [`reconcile`] renames each package's archives so the newest
//! version carries the canonical name, and [`extract_icons`] pulls launcher
//! icons out of archives that haven't been processed before.
//!
//! Everything is driven through a [`StorageBackend`](apkshelf_storage::StorageBackend)
//! and an [`ArchiveReader`], and configured through a [`Context`] built once
//! from the loaded [`Config`].

mod archive;
pub mod error;
mod icons;
mod library;
pub mod organize;
mod pipeline;
mod template;

pub use crate::archive::{ApkReader, ArchiveReader};
pub use crate::icons::{IconEntry, IconOutcome, IconSummary, extract_icons};
pub use crate::library::{Library, VersionRecord, build_library};
pub use crate::organize::{Outcome, Summary, reconcile};
pub use crate::pipeline::apply;
pub use crate::template::PathGenerator;
pub use apkshelf_config::TieBreak;

use crate::error::Error;
use apkshelf_config::Config;
use std::path::PathBuf;

/// Settings the library operations need, with templates compiled.
#[derive(Debug)]
pub struct Context {
    /// Canonical archive filename.
    pub template: PathGenerator,
    /// Extracted icon filename.
    pub icon_template: PathGenerator,
    /// Where icons are written, relative to the library root.
    pub icon_directory: PathBuf,
    pub max_resolution: u16,
    pub delete_duplicates: bool,
    pub delete_old_versions: bool,
    pub tie_break: TieBreak,
}

impl TryFrom<&Config> for Context {
    type Error = Error;

    fn try_from(config: &Config) -> Result<Self, Self::Error> {
        Ok(Self {
            template: config.template.parse()?,
            icon_template: config.icons.template.parse()?,
            icon_directory: config.icons.directory.clone(),
            max_resolution: config.icons.max_resolution,
            delete_duplicates: config.delete_duplicates,
            delete_old_versions: config.delete_old_versions,
            tie_break: config.tie_break,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rstest::rstest;

    #[test]
    fn test_context_from_config() {
        let config = Config { delete_duplicates: true, tie_break: TieBreak::Path, ..Config::default() };
        let context = Context::try_from(&config).unwrap();
        assert!(context.delete_duplicates);
        assert!(!context.delete_old_versions);
        assert_eq!(context.tie_break, TieBreak::Path);
        assert_eq!(context.max_resolution, 640);
        assert_eq!(context.icon_directory, PathBuf::from("app_icon"));
    }

    #[rstest]
    #[case::archive(|c: &mut Config| c.template = "{{ name".to_string())]
    #[case::icon(|c: &mut Config| c.icons.template = "{% if %}".to_string())]
    fn test_context_rejects_bad_template(#[case] change: fn(&mut Config)) {
        let mut config = Config::default();
        change(&mut config);
        let err = Context::try_from(&config).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Template));
    }

    #[test]
    fn test_context_templates_have_helpers() {
        let config = Config {
            template: "{{ truncate(name, 3)|slug }}_v{{ version }}.apk".to_string(),
            ..Config::default()
        };
        let context = Context::try_from(&config).unwrap();
        let metadata = apkshelf_extract::Metadata {
            package: "com.example.app".to_string(),
            version_code: 2,
            name: "Example".to_string(),
            version_name: None,
        };
        assert_eq!(context.template.generate(&metadata).unwrap(), "exa_v2.apk");
    }
}
