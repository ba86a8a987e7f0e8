//! The ordered record list behind every cache.

use serde::{Deserialize, Serialize};

/// One persisted association between a filename and a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record<V> {
    pub filename: String,
    pub value: V,
}

/// Ordered record list with upsert semantics, shared by the cache
/// implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Records<V> {
    records: Vec<Record<V>>,
}

impl<V> Default for Records<V> {
    fn default() -> Self {
        Self { records: Vec::new() }
    }
}

impl<V> Records<V> {
    /// Build from a persisted list. Later records win over earlier ones with
    /// the same filename, so a hand-edited document can't break the upsert
    /// invariant.
    pub fn from_records(records: Vec<Record<V>>) -> Self {
        let mut set = Self::default();
        for record in records {
            set.add(&record.filename, record.value);
        }
        set
    }

    fn position(&self, filename: &str) -> Option<usize> {
        self.records.iter().position(|record| record.filename == filename)
    }

    pub fn get(&self, filename: &str) -> Option<&V> {
        self.position(filename).map(|index| &self.records[index].value)
    }

    pub fn add(&mut self, filename: &str, value: V) {
        match self.position(filename) {
            Some(index) => self.records[index].value = value,
            None => self.records.push(Record { filename: filename.to_string(), value }),
        }
    }

    pub fn remove(&mut self, filename: &str) -> Option<V> {
        self.position(filename).map(|index| self.records.remove(index).value)
    }

    /// Filenames in record order.
    pub fn filenames(&self) -> Vec<String> {
        self.records.iter().map(|record| record.filename.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn as_slice(&self) -> &[Record<V>] {
        &self.records
    }
}
