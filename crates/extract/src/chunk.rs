//! Android resource chunk framing shared by binary XML and resource tables.
//!
//! Every structure starts with a `ResChunk_header`: a little-endian `u16`
//! type, a `u16` header size and a `u32` total size (header included).
//! Chunks nest; a parent's body is a sequence of child chunks.

use crate::error::{ErrorKind, Result};
use byteorder::{ByteOrder, LittleEndian};

pub(crate) const RES_STRING_POOL_TYPE: u16 = 0x0001;
pub(crate) const RES_TABLE_TYPE: u16 = 0x0002;
pub(crate) const RES_XML_TYPE: u16 = 0x0003;
pub(crate) const RES_XML_START_ELEMENT_TYPE: u16 = 0x0102;
pub(crate) const RES_XML_RESOURCE_MAP_TYPE: u16 = 0x0180;
pub(crate) const RES_TABLE_PACKAGE_TYPE: u16 = 0x0200;
pub(crate) const RES_TABLE_TYPE_TYPE: u16 = 0x0201;

/// `Res_value` data types.
pub(crate) const TYPE_REFERENCE: u8 = 0x01;
pub(crate) const TYPE_STRING: u8 = 0x03;
pub(crate) const TYPE_INT_DEC: u8 = 0x10;
pub(crate) const TYPE_INT_HEX: u8 = 0x11;

const CHUNK_HEADER_SIZE: usize = 8;
const NO_INDEX: u32 = u32::MAX;
const UTF8_FLAG: u32 = 1 << 8;

pub(crate) fn bytes_at<'a>(data: &'a [u8], offset: usize, len: usize, what: &'static str) -> Result<&'a [u8]> {
    match offset.checked_add(len) {
        Some(end) if end <= data.len() => Ok(&data[offset..end]),
        _ => exn::bail!(ErrorKind::Malformed(what)),
    }
}

pub(crate) fn u8_at(data: &[u8], offset: usize, what: &'static str) -> Result<u8> {
    Ok(bytes_at(data, offset, 1, what)?[0])
}

pub(crate) fn u16_at(data: &[u8], offset: usize, what: &'static str) -> Result<u16> {
    Ok(LittleEndian::read_u16(bytes_at(data, offset, 2, what)?))
}

pub(crate) fn u32_at(data: &[u8], offset: usize, what: &'static str) -> Result<u32> {
    Ok(LittleEndian::read_u32(bytes_at(data, offset, 4, what)?))
}

/// One framed chunk. `data` spans the whole chunk, header included.
#[derive(Clone, Copy)]
pub(crate) struct Chunk<'a> {
    pub kind: u16,
    pub header_size: usize,
    pub data: &'a [u8],
}
impl<'a> Chunk<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let kind = u16_at(bytes, 0, "chunk header")?;
        let header_size = usize::from(u16_at(bytes, 2, "chunk header")?);
        let size = u32_at(bytes, 4, "chunk header")? as usize;
        if header_size < CHUNK_HEADER_SIZE || size < header_size || size > bytes.len() {
            exn::bail!(ErrorKind::Malformed("chunk header"));
        }
        Ok(Self { kind, header_size, data: &bytes[..size] })
    }

    /// Child chunks following this chunk's header.
    pub fn children(&self) -> Chunks<'a> {
        Chunks { rest: &self.data[self.header_size..] }
    }
}

pub(crate) struct Chunks<'a> {
    rest: &'a [u8],
}
impl<'a> Iterator for Chunks<'a> {
    type Item = Result<Chunk<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.len() < CHUNK_HEADER_SIZE {
            return None;
        }
        match Chunk::parse(self.rest) {
            Ok(chunk) => {
                self.rest = &self.rest[chunk.data.len()..];
                Some(Ok(chunk))
            },
            Err(e) => {
                self.rest = &[];
                Some(Err(e))
            },
        }
    }
}

/// A decoded `ResStringPool`.
#[derive(Debug, Default)]
pub(crate) struct StringPool {
    strings: Vec<String>,
}
impl StringPool {
    pub fn parse(chunk: &Chunk<'_>) -> Result<Self> {
        if chunk.kind != RES_STRING_POOL_TYPE {
            exn::bail!(ErrorKind::Malformed("string pool"));
        }
        let data = chunk.data;
        let count = u32_at(data, 8, "string pool")? as usize;
        let utf8 = u32_at(data, 16, "string pool")? & UTF8_FLAG != 0;
        let strings_start = u32_at(data, 20, "string pool")? as usize;
        let mut strings = Vec::with_capacity(count.min(data.len() / 4));
        for index in 0..count {
            let offset = u32_at(data, chunk.header_size + index * 4, "string pool offsets")? as usize;
            let start = strings_start.checked_add(offset).ok_or_else(|| exn::Exn::from(ErrorKind::Malformed("string pool")))?;
            strings.push(if utf8 { Self::decode_utf8(data, start)? } else { Self::decode_utf16(data, start)? });
        }
        Ok(Self { strings })
    }

    /// Looks up a string by index; `0xFFFFFFFF` means "no string".
    pub fn get(&self, index: u32) -> Option<&str> {
        if index == NO_INDEX {
            return None;
        }
        self.strings.get(index as usize).map(String::as_str)
    }

    fn decode_utf8(data: &[u8], mut pos: usize) -> Result<String> {
        // Length in UTF-16 units first (unused), then length in bytes; each
        // is one byte, or two when the high bit is set.
        let utf16_len = u8_at(data, pos, "utf-8 string")?;
        pos += if utf16_len & 0x80 != 0 { 2 } else { 1 };
        let first = u8_at(data, pos, "utf-8 string")?;
        let len = if first & 0x80 != 0 {
            let second = u8_at(data, pos + 1, "utf-8 string")?;
            pos += 2;
            (usize::from(first & 0x7F) << 8) | usize::from(second)
        } else {
            pos += 1;
            usize::from(first)
        };
        Ok(String::from_utf8_lossy(bytes_at(data, pos, len, "utf-8 string")?).into_owned())
    }

    fn decode_utf16(data: &[u8], mut pos: usize) -> Result<String> {
        let first = u16_at(data, pos, "utf-16 string")?;
        let len = if first & 0x8000 != 0 {
            let second = u16_at(data, pos + 2, "utf-16 string")?;
            pos += 4;
            (usize::from(first & 0x7FFF) << 16) | usize::from(second)
        } else {
            pos += 2;
            usize::from(first)
        };
        let raw = bytes_at(data, pos, len * 2, "utf-16 string")?;
        let units: Vec<u16> = raw.chunks_exact(2).map(LittleEndian::read_u16).collect();
        Ok(String::from_utf16_lossy(&units))
    }
}
