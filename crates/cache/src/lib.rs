//! Persistent record cache for idempotent batch operations.
//!
//! A cache associates a filename with an arbitrary value (for the icon pass:
//! what happened to that archive's icon). It is loaded once at the start of a
//! run with [`Cache::reconstruct`], consulted and updated while processing,
//! and written back with [`Cache::commit`] before the process exits. The
//! durable document is the source of truth across runs; the in-memory set is
//! owned exclusively by one cache instance for the duration of a run.
//!
//! Records are kept as an ordered list and looked up by scanning for a
//! matching filename. [`Cache::add`] is an upsert, so re-adding a filename
//! never produces a second record.

pub mod error;
mod json;
mod memory;
mod records;

pub use crate::json::JsonCache;
pub use crate::memory::MemoryCache;
pub use crate::records::Record;

/// The cache contract shared by every backing store.
pub trait Cache<V> {
    /// `true` if a record for `filename` is currently loaded.
    fn contains(&self, filename: &str) -> bool;

    /// The value recorded for `filename`, if any.
    fn get(&self, filename: &str) -> Option<&V>;

    /// Insert a record, or replace the value of the existing one.
    fn add(&mut self, filename: &str, value: V);

    /// Remove the record for `filename`, returning its value. Removing an
    /// unknown filename is a no-op.
    fn remove(&mut self, filename: &str) -> Option<V>;

    /// Number of loaded records.
    fn size(&self) -> usize;

    /// Every loaded filename, in record order.
    fn filenames(&self) -> Vec<String>;

    /// Replace the loaded records with the durable ones. A missing or
    /// unreadable store yields an empty set instead of an error.
    fn reconstruct(&mut self);

    /// Overwrite the durable store with the loaded records.
    fn commit(&mut self) -> error::Result<()>;
}
