//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a library failure.
///
/// Each variant identifies the subsystem that failed, allowing callers to
/// inspect the error tree without matching on opaque strings.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A template failed to render a usable filename.
    #[display("could not generate filename from template")]
    Template,
    /// A storage backend operation (read, write, rename, delete) failed.
    #[display("storage operation failed")]
    Storage,
    /// The archive could not be opened or decoded.
    #[display("invalid archive")]
    Archive,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
