//! Error types for the [`organize`](super) module.
//!
//! Nothing here escapes [`reconcile`](super::reconcile): a record whose
//! reconciliation fails is logged and reported as
//! [`Outcome::Failed`](super::Outcome::Failed).

use derive_more::{Display, Error};

/// An organize error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for organize operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a failure to reconcile one record.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The [`PathGenerator`](crate::PathGenerator) could not render a name.
    #[display("could not render target name")]
    Template,
    /// Checking, renaming or deleting a file failed.
    #[display("storage operation failed")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
