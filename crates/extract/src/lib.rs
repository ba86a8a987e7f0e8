//! Reading Android application packages.
//!
//! An [`Apk`] decodes the binary `AndroidManifest.xml` of a package for its
//! identity and version, resolves the label and icon through
//! `resources.arsc`, and extracts the best launcher icon not exceeding a
//! requested density.

mod apk;
mod chunk;
pub mod error;
mod image;
mod manifest;
mod models;
mod resources;

pub use apk::Apk;
pub use image::{ImageFormat, validate_image};
pub use models::{Icon, Metadata};

/// An opened application package.
pub trait Archive {
    /// Identity, version and label, decoded when the archive was opened.
    fn metadata(&self) -> &Metadata;

    /// The launcher icon with the highest density not exceeding
    /// `max_resolution` (dpi), validated as a PNG or WebP image.
    fn icon(&mut self, max_resolution: u16) -> error::Result<Icon>;
}
