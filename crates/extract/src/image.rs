//! Structural validation of extracted icon images.

use crate::chunk::bytes_at;
use crate::error::{ErrorKind, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use derive_more::Display;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// Raster formats an icon may be stored in.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    #[display("png")]
    Png,
    #[display("webp")]
    Webp,
}
impl ImageFormat {
    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    /// Guess the format from an archive entry name.
    pub fn from_path(path: &str) -> Option<Self> {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".png") {
            Some(Self::Png)
        } else if lower.ends_with(".webp") {
            Some(Self::Webp)
        } else {
            None
        }
    }
}

/// Check that `bytes` hold a well-formed PNG or WebP image.
///
/// PNG files are walked chunk by chunk: `IHDR` must come first, every CRC
/// must match and the stream must end in `IEND`. WebP files only get their
/// RIFF container header checked.
pub fn validate_image(bytes: &[u8]) -> Result<ImageFormat> {
    if bytes.starts_with(&PNG_SIGNATURE) {
        validate_png(bytes)?;
        return Ok(ImageFormat::Png);
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        let declared = LittleEndian::read_u32(&bytes[4..8]) as usize;
        if declared + 8 > bytes.len() {
            exn::bail!(ErrorKind::InvalidImage("truncated webp"));
        }
        return Ok(ImageFormat::Webp);
    }
    exn::bail!(ErrorKind::InvalidImage("unrecognised format"))
}

fn validate_png(bytes: &[u8]) -> Result<()> {
    let mut pos = PNG_SIGNATURE.len();
    let mut first = true;
    loop {
        let header = bytes_at(bytes, pos, 8, "png chunk").map_err(|_| exn::Exn::from(ErrorKind::InvalidImage("truncated png")))?;
        let length = BigEndian::read_u32(&header[0..4]) as usize;
        let kind = &header[4..8];
        let Some(body) = bytes.get(pos + 4..pos + 8 + length) else {
            exn::bail!(ErrorKind::InvalidImage("truncated png"));
        };
        let Some(crc) = bytes.get(pos + 8 + length..pos + 12 + length) else {
            exn::bail!(ErrorKind::InvalidImage("truncated png"));
        };
        if crc32fast::hash(body) != BigEndian::read_u32(crc) {
            exn::bail!(ErrorKind::InvalidImage("png checksum mismatch"));
        }
        if first && kind != b"IHDR" {
            exn::bail!(ErrorKind::InvalidImage("png missing IHDR"));
        }
        if kind == b"IEND" {
            return Ok(());
        }
        first = false;
        pos += 12 + length;
    }
}
