//! `resources.arsc` decoding, just enough to resolve string and file
//! resources referenced from the manifest.
//!
//! The table is a `RES_TABLE_TYPE` chunk with a global string pool (all
//! string *values*) and one package chunk per package. Each package holds
//! type chunks: one per (type, configuration) pair, each an array of entry
//! offsets followed by the entries themselves. A resource id is
//! `0xPPTTEEEE`: package, type (1-based) and entry index.

use crate::chunk::{
    Chunk, RES_STRING_POOL_TYPE, RES_TABLE_PACKAGE_TYPE, RES_TABLE_TYPE, RES_TABLE_TYPE_TYPE, StringPool,
    TYPE_REFERENCE, TYPE_STRING, bytes_at, u8_at, u16_at, u32_at,
};
use crate::error::{ErrorKind, Result};
use std::collections::HashMap;

const FLAG_SPARSE: u8 = 0x01;
const FLAG_OFFSET16: u8 = 0x02;
const ENTRY_FLAG_COMPLEX: u16 = 0x0001;
const ENTRY_FLAG_COMPACT: u16 = 0x0008;
const NO_ENTRY: u32 = u32::MAX;
/// References are followed at most this many hops.
const MAX_REFERENCE_DEPTH: usize = 8;

/// Density buckets, in dpi.
pub(crate) const DENSITY_DEFAULT: u16 = 0;
pub(crate) const DENSITY_MEDIUM: u16 = 160;
const DENSITY_ANY: u16 = 0xFFFE;
const DENSITY_NONE: u16 = 0xFFFF;

/// One value of a resource under one configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    language: [u8; 2],
    density: u16,
    data_type: u8,
    data: u32,
}
impl Entry {
    fn is_default_locale(&self) -> bool {
        self.language == [0, 0]
    }

    /// Effective density for "best icon" selection. An unqualified
    /// configuration means mdpi; `anydpi`/`nodpi` rank lowest.
    fn effective_density(&self) -> u16 {
        match self.density {
            DENSITY_DEFAULT => DENSITY_MEDIUM,
            DENSITY_ANY | DENSITY_NONE => 0,
            dpi => dpi,
        }
    }
}

/// A decoded resource table.
#[derive(Debug, Default)]
pub(crate) struct ResourceTable {
    strings: StringPool,
    entries: HashMap<u32, Vec<Entry>>,
}

impl ResourceTable {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let root = Chunk::parse(bytes)?;
        if root.kind != RES_TABLE_TYPE {
            exn::bail!(ErrorKind::Malformed("resource table"));
        }
        let mut table = Self::default();
        for chunk in root.children() {
            let chunk = chunk?;
            match chunk.kind {
                RES_STRING_POOL_TYPE => table.strings = StringPool::parse(&chunk)?,
                RES_TABLE_PACKAGE_TYPE => table.parse_package(&chunk)?,
                _ => {},
            }
        }
        Ok(table)
    }

    fn parse_package(&mut self, package: &Chunk<'_>) -> Result<()> {
        let package_id = u32_at(package.data, 8, "package")? & 0xFF;
        for chunk in package.children() {
            let chunk = chunk?;
            if chunk.kind == RES_TABLE_TYPE_TYPE {
                self.parse_type(package_id, &chunk)?;
            }
        }
        Ok(())
    }

    fn parse_type(&mut self, package_id: u32, chunk: &Chunk<'_>) -> Result<()> {
        let data = chunk.data;
        let type_id = u32::from(u8_at(data, 8, "type")?);
        let flags = u8_at(data, 9, "type")?;
        let entry_count = u32_at(data, 12, "type")? as usize;
        let entries_start = u32_at(data, 16, "type")? as usize;
        // ResTable_config begins at byte 20 with its own size; locale sits at
        // +8 and density at +14.
        let config_size = u32_at(data, 20, "type config")? as usize;
        let language = if config_size >= 12 {
            let l = bytes_at(data, 28, 2, "type config")?;
            [l[0], l[1]]
        } else {
            [0, 0]
        };
        let density = if config_size >= 16 { u16_at(data, 34, "type config")? } else { DENSITY_DEFAULT };

        for (index, offset) in Self::entry_offsets(chunk, flags, entry_count)? {
            let at = entries_start + offset;
            let entry_flags = u16_at(data, at + 2, "entry")?;
            let (data_type, value) = if entry_flags & ENTRY_FLAG_COMPACT != 0 {
                ((entry_flags >> 8) as u8, u32_at(data, at + 4, "entry")?)
            } else if entry_flags & ENTRY_FLAG_COMPLEX != 0 {
                // Bags (styles, plurals, ...) never name an icon or a label.
                continue;
            } else {
                let entry_size = usize::from(u16_at(data, at, "entry")?);
                (u8_at(data, at + entry_size + 3, "entry value")?, u32_at(data, at + entry_size + 4, "entry value")?)
            };
            let id = (package_id << 24) | (type_id << 16) | index;
            self.entries.entry(id).or_default().push(Entry { language, density, data_type, data: value });
        }
        Ok(())
    }

    /// `(entry index, byte offset from entries start)` for every present entry.
    fn entry_offsets(chunk: &Chunk<'_>, flags: u8, count: usize) -> Result<Vec<(u32, usize)>> {
        let data = chunk.data;
        let base = chunk.header_size;
        let mut offsets = Vec::with_capacity(count);
        for i in 0..count {
            if flags & FLAG_SPARSE != 0 {
                let index = u32::from(u16_at(data, base + i * 4, "sparse entries")?);
                let offset = usize::from(u16_at(data, base + i * 4 + 2, "sparse entries")?) * 4;
                offsets.push((index, offset));
            } else if flags & FLAG_OFFSET16 != 0 {
                let offset = u16_at(data, base + i * 2, "entry offsets")?;
                if offset != u16::MAX {
                    offsets.push((i as u32, usize::from(offset) * 4));
                }
            } else {
                let offset = u32_at(data, base + i * 4, "entry offsets")?;
                if offset != NO_ENTRY {
                    offsets.push((i as u32, offset as usize));
                }
            }
        }
        Ok(offsets)
    }

    /// Every string value of `id` under any configuration, following
    /// references, paired with the configuration's effective density.
    fn strings_of(&self, id: u32, depth: usize) -> Vec<(&Entry, &str)> {
        if depth > MAX_REFERENCE_DEPTH {
            return Vec::new();
        }
        let Some(entries) = self.entries.get(&id) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        for entry in entries {
            match entry.data_type {
                TYPE_STRING => {
                    if let Some(s) = self.strings.get(entry.data) {
                        found.push((entry, s));
                    }
                },
                TYPE_REFERENCE => found.extend(self.strings_of(entry.data, depth + 1)),
                _ => {},
            }
        }
        found
    }

    /// Resolves a string resource, preferring the default locale.
    pub fn resolve_string(&self, id: u32) -> Option<String> {
        let candidates = self.strings_of(id, 0);
        candidates
            .iter()
            .find(|(entry, _)| entry.is_default_locale())
            .or_else(|| candidates.first())
            .map(|(_, s)| s.to_string())
    }

    /// File paths a resource resolves to, with their effective density.
    pub fn resolve_files(&self, id: u32) -> Vec<(u16, String)> {
        self.strings_of(id, 0)
            .into_iter()
            .map(|(entry, path)| (entry.effective_density(), path.to_string()))
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::fixture::table;
    use super::*;

    const STRING_TYPE: u8 = 0x0f;
    const MIPMAP_TYPE: u8 = 0x08;

    #[test]
    fn test_resolve_string_prefers_default_locale() {
        let bytes = table(&["Exemple", "Example"], vec![
            (STRING_TYPE, *b"fr", 0, vec![(1, TYPE_STRING, 0)]),
            (STRING_TYPE, [0, 0], 0, vec![(1, TYPE_STRING, 1)]),
        ]);
        let table = ResourceTable::parse(&bytes).unwrap();
        assert_eq!(table.resolve_string(0x7f0f_0001).as_deref(), Some("Example"));
        assert_eq!(table.resolve_string(0x7f0f_0000), None);
    }

    #[test]
    fn test_resolve_string_through_reference() {
        let bytes = table(&["Aliased"], vec![(STRING_TYPE, [0, 0], 0, vec![
            (0, TYPE_STRING, 0),
            (2, TYPE_REFERENCE, 0x7f0f_0000),
        ])]);
        let table = ResourceTable::parse(&bytes).unwrap();
        assert_eq!(table.resolve_string(0x7f0f_0002).as_deref(), Some("Aliased"));
    }

    #[test]
    fn test_reference_cycle_terminates() {
        let bytes = table(&[], vec![(STRING_TYPE, [0, 0], 0, vec![(0, TYPE_REFERENCE, 0x7f0f_0000)])]);
        let table = ResourceTable::parse(&bytes).unwrap();
        assert_eq!(table.resolve_string(0x7f0f_0000), None);
    }

    #[test]
    fn test_resolve_files_with_density() {
        let bytes = table(
            &["res/mipmap-hdpi-v4/ic_launcher.png", "res/mipmap-xxxhdpi-v4/ic_launcher.png", "res/mipmap/ic.png"],
            vec![
                (MIPMAP_TYPE, [0, 0], 240, vec![(0, TYPE_STRING, 0)]),
                (MIPMAP_TYPE, [0, 0], 640, vec![(0, TYPE_STRING, 1)]),
                (MIPMAP_TYPE, [0, 0], 0, vec![(0, TYPE_STRING, 2)]),
            ],
        );
        let table = ResourceTable::parse(&bytes).unwrap();
        let files = table.resolve_files(0x7f08_0000);
        assert_eq!(files, vec![
            (240, "res/mipmap-hdpi-v4/ic_launcher.png".to_string()),
            (640, "res/mipmap-xxxhdpi-v4/ic_launcher.png".to_string()),
            (160, "res/mipmap/ic.png".to_string()),
        ]);
    }

    #[test]
    fn test_rejects_non_table() {
        let err = ResourceTable::parse(&[0x03, 0, 8, 0, 8, 0, 0, 0]).unwrap_err();
        assert_eq!(*err, ErrorKind::Malformed("resource table"));
    }
}
