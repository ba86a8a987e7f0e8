//! Filename templating for organized archives and extracted icons.
//!
//! Converts archive [`Metadata`] into deterministic filenames using
//! user-configured [upon] templates. The template syntax follows upon's
//! Mustache-like conventions (`{{ variable }}`, `{{ value|formatter }}`),
//! extended with two helpers:
//!
//! - **`slug`**: converts strings to URL-safe slugs, stripping quotation marks
//!   first to avoid artifacts like leading/trailing hyphens.
//! - **`truncate`**: truncates strings to a maximum byte length at a character
//!   boundary, usable as either `truncate(value, n)` or `{{ value|truncate: n }}`.
//!
//! # Template Variables
//!
//! | Variable       | Type              | Description                                  |
//! |----------------|-------------------|----------------------------------------------|
//! | `package`      | `String`          | Package id, e.g. `com.example.app`           |
//! | `name`         | `String`          | Application label (package id if absent)     |
//! | `version`      | `u64`             | Version code                                 |
//! | `version_name` | `Option<String>`  | Human-readable version, e.g. `"4.2.0"`       |
//! | `extension`    | `String`          | Icon templates only: `png` or `webp`         |
//!
//! String values have `/`, `\` and NUL replaced by `_` before rendering, and
//! the rendered result must be a single path component: templates name files,
//! they never move them between directories.
//!
//! # Example
//!
//! ```
//! use apkshelf_extract::Metadata;
//! use apkshelf_library::PathGenerator;
//!
//! let metadata = Metadata {
//!     package: "com.example.app".into(),
//!     version_code: 42,
//!     name: "Example App".into(),
//!     version_name: Some("4.2".into()),
//! };
//! let generator: PathGenerator = "{{ name|slug }}-{{ version_name }}.apk".parse().unwrap();
//! assert_eq!(generator.generate(&metadata).unwrap(), "example-app-4.2.apk");
//! ```

use crate::error::{Error, ErrorKind, Result};
use apkshelf_extract::{ImageFormat, Metadata};
use exn::ResultExt;
use std::path::{Component, Path};
use std::str::FromStr;
use tracing::instrument;
use upon::{Engine, Template};

/// Generates deterministic filenames from [`Metadata`] and a user-defined
/// template string.
///
/// Constructed via [`FromStr`], which compiles the template eagerly so that
/// syntax errors surface at creation time rather than at render time. The
/// compiled template is reusable across many [`generate`](Self::generate) calls.
pub struct PathGenerator {
    engine: Engine<'static>,
    template: Template<'static>,
}
impl FromStr for PathGenerator {
    type Err = Error;

    /// Compiles the given template string into a reusable [`PathGenerator`].
    ///
    /// Registers the `slug` formatter and `truncate` function before compiling,
    /// so both are available in the template. Returns [`ErrorKind::Template`] if
    /// the template syntax is invalid.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut engine = Engine::new();
        addons::configure(&mut engine);
        // Compile the template early so we can fail-fast in construction.
        let template = engine.compile(s.to_string()).or_raise(|| ErrorKind::Template)?;
        Ok(Self { engine, template })
    }
}
impl std::fmt::Debug for PathGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathGenerator").finish_non_exhaustive()
    }
}
impl PathGenerator {
    /// Renders the archive filename for the given [`Metadata`].
    #[instrument(level = "debug", skip_all, fields(package = %metadata.package))]
    pub fn generate(&self, metadata: &Metadata) -> Result<String> {
        self.render(Self::parameters(metadata, None))
    }

    /// Renders an icon filename; the template additionally sees `extension`.
    #[instrument(level = "debug", skip_all, fields(package = %metadata.package))]
    pub fn generate_icon(&self, metadata: &Metadata, format: ImageFormat) -> Result<String> {
        self.render(Self::parameters(metadata, Some(format)))
    }

    fn render(&self, parameters: upon::Value) -> Result<String> {
        let name = self.template.render(&self.engine, parameters).to_string().or_raise(|| ErrorKind::Template)?;
        Self::normalize(name)
    }

    /// Trims the rendered name and checks that it names exactly one file.
    fn normalize(s: impl Into<String>) -> Result<String> {
        let name = s.into().trim().to_string();
        let mut components = Path::new(&name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(name),
            _ => exn::bail!(ErrorKind::Template),
        }
    }

    /// Replaces characters that would turn a value into a path.
    fn sanitize(value: &str) -> String {
        value.replace(['/', '\\', '\0'], "_")
    }

    /// Builds the [`upon::Value`] map exposed to the template engine.
    fn parameters(metadata: &Metadata, format: Option<ImageFormat>) -> upon::Value {
        upon::value! {
            package: Self::sanitize(&metadata.package),
            name: Self::sanitize(&metadata.name),
            version: metadata.version_code,
            version_name: metadata.version_name.as_deref().map(Self::sanitize),
            extension: format.map(|f| f.extension()),
        }
    }
}

/// Custom [`upon`] extensions for path-safe string manipulation.
mod addons {
    use rslug::slugify;
    use std::fmt::Write;
    use upon::{Engine, Value, fmt as upon_fmt};

    /// Custom formatter that converts strings to URL-safe slugs.
    ///
    /// Strips quotation marks before slugifying to avoid awkward slug output
    /// like `"hello"` becoming `-hello-`.
    fn slug_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => {
                // Various quotation marks: '"''""„"`«»
                let marks = [
                    '\u{0027}', '\u{0022}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{201E}', '\u{201B}',
                    '\u{0060}', '\u{00AB}', '\u{00BB}', '\u{2039}', '\u{203A}',
                ];
                let stripped: String = s.chars().filter(|c| !marks.contains(c)).collect();
                write!(f, "{}", slugify!(&stripped))?
            },
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    /// Truncates a string to a maximum byte length at a character boundary.
    fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> String {
        s[..s.floor_char_boundary(max_bytes)].to_string()
    }

    /// Registers the `slug` formatter and `truncate` function on the given engine.
    pub(crate) fn configure(engine: &mut Engine<'_>) {
        engine.add_formatter("slug", slug_formatter);
        engine.add_function("truncate", truncate_to_char_boundary);
    }
}
