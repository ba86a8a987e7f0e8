//! Storage backends for an apkshelf library.
//!
//! Every path handed to a [`StorageBackend`] is relative to the library root
//! and is checked by [`validate_path`] before it touches anything. All
//! operations are blocking; the library is processed strictly sequentially.

pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::models::{FileInfo, has_extension};
pub use crate::path::validate as validate_path;
use std::io::{Read, Seek};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;

/// A readable, seekable byte source, as needed by zip containers.
pub trait ReadSeek: Read + Seek + Send {}
impl<T: Read + Seek + Send> ReadSeek for T {}

/// Owned reader returned by [`StorageBackend::reader`].
pub type BoxReader = Box<dyn ReadSeek>;
