//! Extraction Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file could not be read at all.
    #[display("I/O error")]
    Io,
    /// The file is not a readable APK (bad zip container or no manifest).
    #[display("invalid archive: {_0}")]
    InvalidArchive(#[error(not(source))] String),
    /// A binary XML or resource table structure is truncated or inconsistent.
    #[display("malformed {_0}")]
    Malformed(#[error(not(source))] &'static str),
    /// A required manifest attribute is absent.
    #[display("missing required field: {_0}")]
    MissingField(#[error(not(source))] &'static str),
    /// No icon exists at or below the requested resolution.
    #[display("no icon available at or below {_0}dpi")]
    MissingIcon(#[error(not(source))] u16),
    /// The icon bytes are not a valid image.
    #[display("invalid image: {_0}")]
    InvalidImage(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // The archive either parses or it doesn't.
        false
    }

    /// Returns `true` for failures that mean "this file is not a usable APK",
    /// as opposed to a derived asset being missing or corrupt.
    pub fn is_invalid_archive(&self) -> bool {
        matches!(self, Self::Io | Self::InvalidArchive(_) | Self::Malformed(_) | Self::MissingField(_))
    }
}
