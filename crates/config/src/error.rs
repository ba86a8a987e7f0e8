//! Config Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// All of them are fatal: nothing runs against a misconfigured library.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The configured library root is missing or not a directory.
    #[display("library root is not a directory: {}", _0.display())]
    InvalidDirectory(#[error(not(source))] PathBuf),
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {}", _0.display())]
    MissingFile(#[error(not(source))] PathBuf),
    /// The layered configuration could not be merged or deserialized.
    #[display("could not load configuration")]
    Load,
    /// A setting has an unusable value.
    #[display("invalid setting `{_0}`: {_1}")]
    Invalid(#[error(not(source))] &'static str, String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
