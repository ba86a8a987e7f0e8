//! `AndroidManifest.xml` decoding.
//!
//! APKs ship the manifest as Android binary XML: a root `RES_XML_TYPE`
//! chunk holding a string pool, a resource map (string index → attribute
//! resource id) and one chunk per XML node. Only the handful of attributes
//! apkshelf needs are pulled out of the `<manifest>` and `<application>`
//! start elements; everything else is skipped.

use crate::chunk::{
    Chunk, RES_STRING_POOL_TYPE, RES_XML_RESOURCE_MAP_TYPE, RES_XML_START_ELEMENT_TYPE, RES_XML_TYPE, StringPool,
    TYPE_INT_DEC, TYPE_INT_HEX, TYPE_REFERENCE, TYPE_STRING, u8_at, u16_at, u32_at,
};
use crate::error::{ErrorKind, Result};
use byteorder::{ByteOrder, LittleEndian};
use exn::OptionExt;

const ATTR_LABEL: u32 = 0x0101_0001;
const ATTR_ICON: u32 = 0x0101_0002;
const ATTR_VERSION_CODE: u32 = 0x0101_021b;
const ATTR_VERSION_NAME: u32 = 0x0101_021c;
const ATTR_VERSION_CODE_MAJOR: u32 = 0x0101_0576;

/// An attribute value as stored in binary XML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Value {
    String(String),
    Int(u32),
    /// A resource id, to be resolved through `resources.arsc`.
    Reference(u32),
    Other,
}

/// The attributes of interest, straight from the manifest.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Manifest {
    pub package: String,
    pub version_code: u64,
    pub version_name: Option<Value>,
    pub label: Option<Value>,
    pub icon: Option<Value>,
}

/// Attributes apkshelf reads, with their framework resource ids.
const KNOWN_ATTRIBUTES: [(&str, u32); 5] = [
    ("label", ATTR_LABEL),
    ("icon", ATTR_ICON),
    ("versionCode", ATTR_VERSION_CODE),
    ("versionName", ATTR_VERSION_NAME),
    ("versionCodeMajor", ATTR_VERSION_CODE_MAJOR),
];

struct Attribute {
    name: String,
    resource_id: Option<u32>,
    value: Value,
}
impl Attribute {
    /// Canonical name of a known attribute. Obfuscators may strip attribute
    /// names; the resource map still identifies framework attributes.
    fn key(&self) -> Option<&'static str> {
        if self.name == "package" {
            return Some("package");
        }
        KNOWN_ATTRIBUTES
            .iter()
            .find(|(name, id)| self.resource_id == Some(*id) || self.name == *name)
            .map(|(name, _)| *name)
    }
}

impl Manifest {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let root = Chunk::parse(bytes)?;
        if root.kind != RES_XML_TYPE {
            exn::bail!(ErrorKind::Malformed("binary xml"));
        }
        let mut pool = StringPool::default();
        let mut resource_map: Vec<u32> = Vec::new();
        let mut package = None;
        let mut version_code = None;
        let mut version_code_major = 0u64;
        let mut manifest = Manifest::default();
        let mut seen_manifest = false;
        let mut seen_application = false;

        for chunk in root.children() {
            let chunk = chunk?;
            match chunk.kind {
                RES_STRING_POOL_TYPE => pool = StringPool::parse(&chunk)?,
                RES_XML_RESOURCE_MAP_TYPE => {
                    resource_map = chunk.data[chunk.header_size..]
                        .chunks_exact(4)
                        .map(LittleEndian::read_u32)
                        .collect();
                },
                RES_XML_START_ELEMENT_TYPE => {
                    let (element, attributes) = Self::start_element(&chunk, &pool, &resource_map)?;
                    match element.as_str() {
                        "manifest" if !seen_manifest => {
                            seen_manifest = true;
                            for attribute in attributes {
                                match (attribute.key(), attribute.value) {
                                    (Some("package"), Value::String(s)) => package = Some(s),
                                    (Some("versionCode"), Value::Int(code)) => version_code = Some(u64::from(code)),
                                    (Some("versionCodeMajor"), Value::Int(major)) => {
                                        version_code_major = u64::from(major)
                                    },
                                    (Some("versionName"), value) => manifest.version_name = Some(value),
                                    _ => {},
                                }
                            }
                        },
                        "application" if !seen_application => {
                            seen_application = true;
                            for attribute in attributes {
                                match attribute.key() {
                                    Some("label") => manifest.label = Some(attribute.value),
                                    Some("icon") => manifest.icon = Some(attribute.value),
                                    _ => {},
                                }
                            }
                        },
                        _ => {},
                    }
                },
                _ => {},
            }
        }

        manifest.package = package.filter(|p| !p.is_empty()).ok_or_raise(|| ErrorKind::MissingField("package"))?;
        let version_code = version_code.ok_or_raise(|| ErrorKind::MissingField("versionCode"))?;
        manifest.version_code = (version_code_major << 32) | version_code;
        Ok(manifest)
    }

    /// Decodes a `ResXMLTree_attrExt` start element into its name and attributes.
    fn start_element(chunk: &Chunk<'_>, pool: &StringPool, resource_map: &[u32]) -> Result<(String, Vec<Attribute>)> {
        let data = chunk.data;
        let ext = chunk.header_size;
        let name = pool.get(u32_at(data, ext + 4, "start element")?).unwrap_or_default().to_string();
        let attribute_start = usize::from(u16_at(data, ext + 8, "start element")?);
        let attribute_size = usize::from(u16_at(data, ext + 10, "start element")?);
        let attribute_count = usize::from(u16_at(data, ext + 12, "start element")?);
        if attribute_size < 20 {
            exn::bail!(ErrorKind::Malformed("start element"));
        }
        let mut attributes = Vec::with_capacity(attribute_count);
        for index in 0..attribute_count {
            let at = ext + attribute_start + index * attribute_size;
            let name_index = u32_at(data, at + 4, "attribute")?;
            let raw_value = u32_at(data, at + 8, "attribute")?;
            let data_type = u8_at(data, at + 15, "attribute")?;
            let value_data = u32_at(data, at + 16, "attribute")?;
            let value = match data_type {
                TYPE_STRING => Value::String(pool.get(value_data).or(pool.get(raw_value)).unwrap_or_default().to_string()),
                TYPE_INT_DEC | TYPE_INT_HEX => Value::Int(value_data),
                TYPE_REFERENCE => Value::Reference(value_data),
                _ => match pool.get(raw_value) {
                    Some(raw) => Value::String(raw.to_string()),
                    None => Value::Other,
                },
            };
            attributes.push(Attribute {
                name: pool.get(name_index).unwrap_or_default().to_string(),
                resource_id: resource_map.get(name_index as usize).copied(),
                value,
            });
        }
        Ok((name, attributes))
    }
}

/// Binary XML writer for tests in this crate.
#[cfg(test)]
pub(crate) mod fixture {
    use super::*;
    use crate::chunk::fixture::{chunk, string_pool};

    /// `(name, data type, data)`; string data are pool indices.
    pub type Attr = (&'static str, u8, u32);

    pub enum Label {
        Text(&'static str),
        Reference(u32),
    }

    pub struct XmlBuilder {
        strings: Vec<&'static str>,
        resource_ids: Vec<u32>,
        elements: Vec<(&'static str, Vec<Attr>)>,
    }
    impl XmlBuilder {
        /// Attribute names carrying resource ids must lead the string pool,
        /// so they are interned up front, as aapt does.
        pub fn new(resource_attributes: &[(&'static str, u32)]) -> Self {
            Self {
                strings: resource_attributes.iter().map(|(name, _)| *name).collect(),
                resource_ids: resource_attributes.iter().map(|(_, id)| *id).collect(),
                elements: Vec::new(),
            }
        }

        /// Index of `s` in the string pool, adding it if needed.
        pub fn string(&mut self, s: &'static str) -> u32 {
            match self.strings.iter().position(|x| *x == s) {
                Some(i) => i as u32,
                None => {
                    self.strings.push(s);
                    (self.strings.len() - 1) as u32
                },
            }
        }

        pub fn element(mut self, name: &'static str, attrs: Vec<Attr>) -> Self {
            self.elements.push((name, attrs));
            self
        }

        pub fn build(mut self) -> Vec<u8> {
            let elements = std::mem::take(&mut self.elements);
            let mut nodes = Vec::new();
            for (name, attrs) in elements {
                let name_index = self.string(name);
                let mut ext = Vec::new();
                ext.extend_from_slice(&u32::MAX.to_le_bytes()); // ns
                ext.extend_from_slice(&name_index.to_le_bytes());
                ext.extend_from_slice(&20u16.to_le_bytes()); // attributeStart
                ext.extend_from_slice(&20u16.to_le_bytes()); // attributeSize
                ext.extend_from_slice(&(attrs.len() as u16).to_le_bytes());
                ext.extend_from_slice(&[0; 6]); // id, class, style
                for (attr, data_type, data) in attrs {
                    let attr_index = self.string(attr);
                    let raw = if data_type == TYPE_STRING { data } else { u32::MAX };
                    ext.extend_from_slice(&u32::MAX.to_le_bytes());
                    ext.extend_from_slice(&attr_index.to_le_bytes());
                    ext.extend_from_slice(&raw.to_le_bytes());
                    ext.extend_from_slice(&8u16.to_le_bytes());
                    ext.push(0);
                    ext.push(data_type);
                    ext.extend_from_slice(&data.to_le_bytes());
                }
                // lineNumber and comment complete the 16 byte node header.
                let header = [1u32.to_le_bytes(), u32::MAX.to_le_bytes()].concat();
                nodes.extend(chunk(RES_XML_START_ELEMENT_TYPE, &header, &ext));
            }
            let pool = string_pool(&self.strings);
            let ids: Vec<u8> = self.resource_ids.iter().flat_map(|id| id.to_le_bytes()).collect();
            let map = chunk(RES_XML_RESOURCE_MAP_TYPE, &[], &ids);
            chunk(RES_XML_TYPE, &[], &[pool, map, nodes].concat())
        }
    }

    /// A typical aapt-style manifest with an icon reference on `<application>`.
    pub fn manifest(package: &'static str, version_code: u32, version_name: &'static str, label: Label, icon: u32) -> Vec<u8> {
        let mut builder = XmlBuilder::new(&[
            ("label", ATTR_LABEL),
            ("icon", ATTR_ICON),
            ("versionCode", ATTR_VERSION_CODE),
            ("versionName", ATTR_VERSION_NAME),
        ]);
        let package_index = builder.string(package);
        let version_name_index = builder.string(version_name);
        let label = match label {
            Label::Text(text) => ("label", TYPE_STRING, builder.string(text)),
            Label::Reference(id) => ("label", TYPE_REFERENCE, id),
        };
        builder
            .element("manifest", vec![
                ("versionCode", TYPE_INT_DEC, version_code),
                ("versionName", TYPE_STRING, version_name_index),
                ("package", TYPE_STRING, package_index),
            ])
            .element("application", vec![label, ("icon", TYPE_REFERENCE, icon)])
            .build()
    }
}
