//! Write path: compound document to JSON:API bytes.
//!
//! ```text
//! { "data": <resource object | array | null>,
//!   "included": [ <resource object>, ... ],   omitted when empty
//!   "meta": { ... },                          omitted when absent
//!   "links": { ... } }                        omitted when absent
//! ```
//!
//! A resource object carries `type`, `id`, its attributes as sibling members,
//! and a `links` object with one entry per relationship. Writing holds no
//! state beyond the output stream.

use std::io;

use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::value::RawValue;
use serde_json::Value;
use tracing::warn;

use crate::codec::keys;
use crate::error::WriteError;
use crate::model::{AttributeValue, CompoundDocument, Relationship, ResourceKey, ResourceObject};
use crate::options::WriteOptions;

/// Writes `document` to `writer`.
pub fn write_document<W: io::Write>(
    writer: W,
    document: &CompoundDocument,
    options: &WriteOptions,
) -> Result<(), WriteError> {
    write_json(writer, document, options)
}

/// Writes `document` into a new buffer.
pub fn to_vec(document: &CompoundDocument, options: &WriteOptions) -> Result<Vec<u8>, WriteError> {
    let mut buffer = Vec::with_capacity(256);
    write_document(&mut buffer, document, options)?;
    Ok(buffer)
}

/// Writes `document` into a string.
pub fn to_string(document: &CompoundDocument, options: &WriteOptions) -> Result<String, WriteError> {
    let buffer = to_vec(document, options)?;
    String::from_utf8(buffer).map_err(|err| WriteError::Json(serde_json::Error::custom(err)))
}

/// Renders `document` as a JSON value.
pub fn to_value(document: &CompoundDocument) -> Result<Value, WriteError> {
    Ok(serde_json::to_value(document)?)
}

pub(crate) fn write_json<W, T>(writer: W, value: &T, options: &WriteOptions) -> Result<(), WriteError>
where
    W: io::Write,
    T: Serialize + ?Sized,
{
    let result = if options.pretty {
        value.serialize(&mut serde_json::Serializer::pretty(writer))
    } else {
        value.serialize(&mut serde_json::Serializer::new(writer))
    };
    result.map_err(|err| {
        if err.is_io() {
            WriteError::Io(err.into())
        } else {
            WriteError::Json(err)
        }
    })
}

impl Serialize for CompoundDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if self.is_collection() {
            map.serialize_entry(keys::DATA, &Resources(self.primary()))?;
        } else {
            map.serialize_entry(keys::DATA, &self.primary().first())?;
        }
        if !self.included().is_empty() {
            map.serialize_entry(keys::INCLUDED, &Resources(self.included()))?;
        }
        if let Some(meta) = &self.meta {
            map.serialize_entry(keys::META, meta)?;
        }
        if let Some(links) = &self.links {
            map.serialize_entry(keys::LINKS, links)?;
        }
        map.end()
    }
}

struct Resources<'a>(&'a [ResourceObject]);

impl Serialize for Resources<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for resource in self.0 {
            seq.serialize_element(resource)?;
        }
        seq.end()
    }
}

impl Serialize for ResourceObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(keys::TYPE, &self.resource_type)?;
        map.serialize_entry(keys::ID, &self.id)?;
        for (key, value) in &self.attributes {
            map.serialize_entry(key, &Attribute { key, value })?;
        }
        if !self.relationships.is_empty() {
            map.serialize_entry(keys::LINKS, &Relationships(&self.relationships))?;
        }
        if let Some(meta) = &self.meta {
            map.serialize_entry(keys::META, meta)?;
        }
        map.end()
    }
}

struct Attribute<'a> {
    key: &'a str,
    value: &'a AttributeValue,
}

impl Serialize for Attribute<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value {
            AttributeValue::Json(value) => value.serialize(serializer),
            AttributeValue::RawJson(None) | AttributeValue::Decimal(None) => {
                serializer.serialize_unit()
            }
            AttributeValue::RawJson(Some(text)) => match minify(text) {
                Some(raw) => raw.serialize(serializer),
                None => {
                    warn!(attribute = self.key, "invalid embedded JSON replaced with {{}}");
                    serializer.serialize_map(Some(0))?.end()
                }
            },
            AttributeValue::Decimal(Some(number)) => serializer.collect_str(number),
        }
    }
}

/// Re-parses embedded JSON text and returns it minified, or `None` if the
/// text is not valid JSON.
fn minify(text: &str) -> Option<Box<RawValue>> {
    let value: Value = serde_json::from_str(text).ok()?;
    serde_json::value::to_raw_value(&value).ok()
}

struct Relationships<'a>(&'a [(String, Relationship)]);

impl Serialize for Relationships<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, relationship) in self.0 {
            map.serialize_entry(key, relationship)?;
        }
        map.end()
    }
}

impl Serialize for Relationship {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        let links = self.links();
        if let Some(url) = &links.relationship {
            map.serialize_entry(keys::SELF, url)?;
        }
        if let Some(url) = &links.related {
            map.serialize_entry(keys::RESOURCE, url)?;
        }
        match self {
            Relationship::Unlinked { .. } | Relationship::ToOne { linkage: None, .. } => {}
            Relationship::ToOne {
                linkage: Some(key), ..
            } => {
                map.serialize_entry(keys::TYPE, &key.resource_type)?;
                map.serialize_entry(keys::ID, &key.id)?;
            }
            Relationship::ToMany { linkage, .. } => {
                map.serialize_entry(keys::DATA, &Linkage(linkage))?;
            }
        }
        map.end()
    }
}

struct Linkage<'a>(&'a [ResourceKey]);

impl Serialize for Linkage<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for key in self.0 {
            seq.serialize_element(key)?;
        }
        seq.end()
    }
}

impl Serialize for ResourceKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(keys::TYPE, &self.resource_type)?;
        map.serialize_entry(keys::ID, &self.id)?;
        map.end()
    }
}
