//! Layered configuration for apkshelf.
//!
//! Settings are merged from, lowest precedence first:
//!
//! 1. built-in defaults ([`Config::default`]),
//! 2. a configuration file: an explicit path, or `config.toml` in the
//!    platform configuration directory (TOML, YAML or JSON by extension),
//! 3. environment variables prefixed `APKSHELF_`, with `__` separating
//!    nested keys (`APKSHELF_ICONS__MAX_RESOLUTION=480`).
//!
//! The command line applies its own overrides on top of the loaded value.
//! The result is built once and passed by reference; nothing reads global
//! state.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const ENV_PREFIX: &str = "APKSHELF_";
const CONFIG_FILE: &str = "config.toml";

/// How to order records of one package before reconciling them.
///
/// Only matters when several archives share the highest version code: the
/// first record visited keeps the canonical name and the rest become
/// duplicates.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// Discovery order: whatever the directory listing produced.
    #[default]
    FirstSeen,
    /// Lexical order of the current file path.
    Path,
}
impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FirstSeen => "first-seen",
            Self::Path => "path",
        })
    }
}
impl FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "first-seen" => Ok(Self::FirstSeen),
            "path" => Ok(Self::Path),
            other => Err(format!("unknown tie-break `{other}` (expected `first-seen` or `path`)")),
        }
    }
}

/// Icon extraction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IconConfig {
    /// Directory, relative to the library root, receiving extracted icons.
    pub directory: PathBuf,
    /// Filename template for extracted icons.
    pub template: String,
    /// Highest icon density (dpi) to extract.
    pub max_resolution: u16,
}
impl Default for IconConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("app_icon"),
            template: "{{ name }}.{{ extension }}".to_string(),
            max_resolution: 640,
        }
    }
}

/// Cache document settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache document path, relative to the library root.
    pub file: PathBuf,
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self { file: PathBuf::from("cache.json") }
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Library root directory.
    pub library: PathBuf,
    /// Descend into subdirectories of the root.
    pub recursive: bool,
    /// Extension of the archives to organize.
    pub extension: String,
    /// Filename template for organized archives.
    pub template: String,
    /// Delete duplicates instead of renaming them to `.dupe`.
    pub delete_duplicates: bool,
    /// Delete superseded versions instead of renaming them to `.old`.
    pub delete_old_versions: bool,
    pub tie_break: TieBreak,
    pub icons: IconConfig,
    pub cache: CacheConfig,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            library: PathBuf::from("."),
            recursive: false,
            extension: "apk".to_string(),
            template: "{{ name }}_v{{ version }}.apk".to_string(),
            delete_duplicates: false,
            delete_old_versions: false,
            tie_break: TieBreak::default(),
            icons: IconConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// With `file` set, that file must exist. Otherwise the default
    /// `config.toml` in the platform configuration directory is used when
    /// present.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::MissingFile(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_file().filter(|path| path.is_file()),
        };
        Self::figment(file.as_deref()).extract().or_raise(|| ErrorKind::Load)
    }

    /// The merged providers, for callers that want to inspect or extend them.
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file {
            tracing::debug!(path = %path.display(), "Reading configuration file");
            figment = match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// `config.toml` inside the platform configuration directory.
    pub fn default_file() -> Option<PathBuf> {
        ProjectDirs::from("", "", "apkshelf").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Check the settings before anything touches the library.
    ///
    /// Templates are not checked here: they are compiled once, with their
    /// helpers registered, when the library builds its context from this
    /// configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.library.is_dir() {
            exn::bail!(ErrorKind::InvalidDirectory(self.library.clone()));
        }
        if self.extension.trim().trim_start_matches('.').is_empty() {
            exn::bail!(ErrorKind::Invalid("extension", "must not be empty".to_string()));
        }
        if self.icons.max_resolution == 0 {
            exn::bail!(ErrorKind::Invalid("icons.max_resolution", "must be greater than zero".to_string()));
        }
        Self::check_relative("icons.directory", &self.icons.directory)?;
        Self::check_relative("cache.file", &self.cache.file)?;
        Ok(())
    }

    fn check_relative(key: &'static str, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() || path.is_absolute() {
            exn::bail!(ErrorKind::Invalid(key, format!("`{}` must be a path relative to the library", path.display())));
        }
        Ok(())
    }
}
