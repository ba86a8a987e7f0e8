//! Errors that end the process.

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Configuration could not be loaded or is invalid.
    #[display("invalid configuration")]
    Config,
    /// The library directory could not be opened or listed.
    #[display("library is inaccessible")]
    Storage,
    /// The icon cache could not be written back.
    #[display("could not save the cache")]
    Cache,
}
