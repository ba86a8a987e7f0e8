//! Cache kept entirely in memory.

use crate::Cache;
use crate::error::Result;
use crate::records::Records;

/// A cache whose "durable" store is an in-memory snapshot taken on every
/// [`commit`](Cache::commit). Useful for tests and for runs that must not
/// leave a cache document behind.
#[derive(Debug, Clone)]
pub struct MemoryCache<V> {
    committed: Records<V>,
    records: Records<V>,
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self { committed: Records::default(), records: Records::default() }
    }
}

impl<V> MemoryCache<V> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<V: Clone> Cache<V> for MemoryCache<V> {
    fn contains(&self, filename: &str) -> bool {
        self.records.get(filename).is_some()
    }

    fn get(&self, filename: &str) -> Option<&V> {
        self.records.get(filename)
    }

    fn add(&mut self, filename: &str, value: V) {
        self.records.add(filename, value);
    }

    fn remove(&mut self, filename: &str) -> Option<V> {
        self.records.remove(filename)
    }

    fn size(&self) -> usize {
        self.records.len()
    }

    fn filenames(&self) -> Vec<String> {
        self.records.filenames()
    }

    fn reconstruct(&mut self) {
        self.records = self.committed.clone();
    }

    fn commit(&mut self) -> Result<()> {
        self.committed = self.records.clone();
        Ok(())
    }
}
