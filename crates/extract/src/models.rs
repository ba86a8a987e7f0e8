use crate::image::ImageFormat;

/// What an archive says about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Package id, e.g. `com.example.app`.
    pub package: String,
    /// Version ordinal. Includes `versionCodeMajor` in the upper 32 bits.
    pub version_code: u64,
    /// Human-readable label, or the package id when the label is missing or
    /// cannot be resolved.
    pub name: String,
    pub version_name: Option<String>,
}

/// An extracted, validated icon image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    /// Entry name inside the archive.
    pub source: String,
    /// Density bucket in dpi.
    pub density: u16,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}
