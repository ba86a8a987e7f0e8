//! The seam between the library and archive decoding.

use crate::error::{ErrorKind, Result};
use apkshelf_extract::{Apk, Archive};
use apkshelf_storage::BackendHandle;
use exn::ResultExt;
use std::path::Path;

/// Opens archives stored in a backend.
///
/// The library only ever talks to archives through this trait, so tests (and
/// future container formats) can substitute their own reader.
pub trait ArchiveReader {
    fn open(&self, backend: &BackendHandle, path: &Path) -> Result<Box<dyn Archive>>;
}

/// Reads APK files.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApkReader;

impl ArchiveReader for ApkReader {
    fn open(&self, backend: &BackendHandle, path: &Path) -> Result<Box<dyn Archive>> {
        let reader = backend.reader(path).or_raise(|| ErrorKind::Storage)?;
        let apk = Apk::open(reader).or_raise(|| ErrorKind::Archive)?;
        Ok(Box::new(apk))
    }
}

/// An [`ArchiveReader`] that decodes plain-text stand-ins, for tests that
/// care about what happens *around* archives rather than inside them.
///
/// File contents are `package;version_code;name[;icon]` where `icon` is
/// `png`, `webp` or `none` (the default). Anything else fails to open.
#[cfg(test)]
pub(crate) mod fixture {
    use super::*;
    use apkshelf_extract::error::{ErrorKind as ExtractErrorKind, Result as ExtractResult};
    use apkshelf_extract::{Icon, ImageFormat, Metadata};
    use std::io::Read;

    pub struct FakeArchive {
        metadata: Metadata,
        icon: Option<ImageFormat>,
    }

    impl Archive for FakeArchive {
        fn metadata(&self) -> &Metadata {
            &self.metadata
        }

        fn icon(&mut self, max_resolution: u16) -> ExtractResult<Icon> {
            match self.icon {
                Some(format) => Ok(Icon {
                    source: format!("res/mipmap-hdpi/ic_launcher.{}", format.extension()),
                    density: 240.min(max_resolution),
                    format,
                    bytes: format!("{}:{}", self.metadata.package, format.extension()).into_bytes(),
                }),
                None => exn::bail!(ExtractErrorKind::MissingIcon(max_resolution)),
            }
        }
    }

    pub struct FakeReader;

    impl ArchiveReader for FakeReader {
        fn open(&self, backend: &BackendHandle, path: &Path) -> Result<Box<dyn Archive>> {
            let mut contents = String::new();
            backend.reader(path).or_raise(|| ErrorKind::Storage)?.read_to_string(&mut contents).or_raise(|| ErrorKind::Storage)?;
            let fields: Vec<&str> = contents.split(';').collect();
            let (package, code, name, icon) = match fields.as_slice() {
                [package, code, name] => (*package, *code, *name, "none"),
                [package, code, name, icon] => (*package, *code, *name, *icon),
                _ => exn::bail!(ErrorKind::Archive),
            };
            let version_code = code.parse::<u64>().or_raise(|| ErrorKind::Archive)?;
            let icon = match icon {
                "png" => Some(ImageFormat::Png),
                "webp" => Some(ImageFormat::Webp),
                _ => None,
            };
            let metadata = Metadata { package: package.to_string(), version_code, name: name.to_string(), version_name: None };
            Ok(Box::new(FakeArchive { metadata, icon }))
        }
    }

    /// Contents for a stand-in archive.
    pub fn apk(package: &str, version_code: u64, name: &str) -> Vec<u8> {
        format!("{package};{version_code};{name}").into_bytes()
    }

    /// Contents for a stand-in archive with an icon.
    pub fn apk_with_icon(package: &str, version_code: u64, name: &str, icon: &str) -> Vec<u8> {
        format!("{package};{version_code};{name};{icon}").into_bytes()
    }
}
