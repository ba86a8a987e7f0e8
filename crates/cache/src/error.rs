//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// Loading never fails (a missing or unreadable document just means starting
/// empty), so every kind here comes from [`commit`](crate::Cache::commit).
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The record set could not be encoded.
    #[display("invalid cache data")]
    InvalidData,
    /// The cache document could not be written.
    #[display("could not write cache document: {}", _0.display())]
    Storage(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
