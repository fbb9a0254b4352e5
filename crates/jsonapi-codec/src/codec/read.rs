//! Read path: JSON:API bytes to a compound document.
//!
//! The top level, primary data and `included` are streamed through serde
//! seeds. Each resource object is buffered until its `type` is known, then
//! its attributes and relationships are decoded with that type's field
//! descriptors.
//!
//! Relationship values accept both wire encodings of linkage:
//!
//! ```text
//! to-many: { "type": "cities", "ids": ["11", "12"] }
//!          { "data": [{ "type": "cities", "id": "11" }, ...] }
//! to-one:  { "type": "countries", "id": "21" }  or  null
//! ```
//!
//! Both may also carry `self` and `resource` URLs; a relationship with URLs
//! and no linkage reads back as unlinked.
//!
//! Failures are recorded as a structured [`ReadError`] in the per-call
//! context and surfaced instead of the serde error that unwound the parse.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::io;

use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Value};
use tracing::debug;

use crate::codec::keys;
use crate::error::{ReadError, RelationshipPayloadError};
use crate::model::{
    AttributeValue, CompoundDocument, Relationship, RelationshipLinks, ResourceKey, ResourceObject,
};
use crate::options::ReadOptions;
use crate::registry::{AttributeEncoding, FieldKind, TypeRegistration, TypeRegistry};

/// Reads a document from `reader`.
pub fn read_document<R: io::Read>(
    reader: R,
    registry: &TypeRegistry,
    options: &ReadOptions,
) -> Result<CompoundDocument, ReadError> {
    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    read_with(&mut deserializer, registry, options)
}

/// Reads a document from a byte slice.
pub fn from_slice(
    bytes: &[u8],
    registry: &TypeRegistry,
    options: &ReadOptions,
) -> Result<CompoundDocument, ReadError> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    read_with(&mut deserializer, registry, options)
}

/// Reads a document from a string.
pub fn from_str(
    text: &str,
    registry: &TypeRegistry,
    options: &ReadOptions,
) -> Result<CompoundDocument, ReadError> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    read_with(&mut deserializer, registry, options)
}

fn read_with<'de, R>(
    deserializer: &mut serde_json::Deserializer<R>,
    registry: &TypeRegistry,
    options: &ReadOptions,
) -> Result<CompoundDocument, ReadError>
where
    R: serde_json::de::Read<'de>,
{
    let ctx = ReadContext::new(registry, options);
    DocumentSeed { ctx: &ctx }
        .deserialize(&mut *deserializer)
        .and_then(|document| deserializer.end().map(|()| document))
        .map_err(|err| {
            let error = match ctx.take_error() {
                Some(error) => error,
                None if err.is_io() => ReadError::from(io::Error::from(err)),
                None => ReadError::from(&err),
            };
            debug!(code = %error.code(), %error, "document rejected");
            error
        })
}

/// Per-call read state.
struct ReadContext<'r> {
    registry: &'r TypeRegistry,
    options: &'r ReadOptions,
    resources: Cell<usize>,
    error: RefCell<Option<ReadError>>,
}

impl<'r> ReadContext<'r> {
    fn new(registry: &'r TypeRegistry, options: &'r ReadOptions) -> Self {
        Self {
            registry,
            options,
            resources: Cell::new(0),
            error: RefCell::new(None),
        }
    }

    /// Records `error` and returns a serde error to unwind with.
    fn reject<E: de::Error>(&self, error: ReadError) -> E {
        let message = error.to_string();
        let mut slot = self.error.borrow_mut();
        if slot.is_none() {
            *slot = Some(error);
        }
        E::custom(message)
    }

    fn take_error(&self) -> Option<ReadError> {
        self.error.borrow_mut().take()
    }

    fn count_resource(&self) -> Result<(), ReadError> {
        let count = self.resources.get() + 1;
        if count > self.options.max_resources {
            return Err(ReadError::LimitExceeded {
                field: "resource objects",
                max: self.options.max_resources,
            });
        }
        self.resources.set(count);
        Ok(())
    }

    fn resolve_linkage(&self, resource_type: &str, id: &str) -> Result<ResourceKey, ReadError> {
        let registration = self.registry.type_for_wire_name(resource_type)?;
        Ok(ResourceKey::new(registration.wire_name(), id))
    }
}

/// Rejects every non-container token with `$error(found)`.
macro_rules! reject_scalars {
    ($error:expr) => {
        fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
            Err(self.ctx.reject(($error)("a boolean")))
        }

        fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
            Err(self.ctx.reject(($error)("a number")))
        }

        fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
            Err(self.ctx.reject(($error)("a number")))
        }

        fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
            Err(self.ctx.reject(($error)("a number")))
        }

        fn visit_str<E: de::Error>(self, _: &str) -> Result<Self::Value, E> {
            Err(self.ctx.reject(($error)("a string")))
        }
    };
}

// =============================================================================
// Top level
// =============================================================================

#[derive(Clone, Copy)]
struct DocumentSeed<'c, 'r> {
    ctx: &'c ReadContext<'r>,
}

impl<'de> DeserializeSeed<'de> for DocumentSeed<'_, '_> {
    type Value = CompoundDocument;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for DocumentSeed<'_, '_> {
    type Value = CompoundDocument;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON:API document object")
    }

    reject_scalars!(|found| ReadError::RootNotObject { found });

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Err(self.ctx.reject(ReadError::RootNotObject { found: "null" }))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, _: A) -> Result<Self::Value, A::Error> {
        Err(self.ctx.reject(ReadError::RootNotObject { found: "an array" }))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let ctx = self.ctx;
        let mut data = None;
        let mut included = None;
        let mut meta = None;
        let mut links = None;

        while let Some(key) = map.next_key::<String>()? {
            let seen = match key.as_str() {
                keys::DATA => data.is_some(),
                keys::INCLUDED => included.is_some(),
                keys::META => meta.is_some(),
                keys::LINKS => links.is_some(),
                _ => return Err(ctx.reject(ReadError::UnknownTopLevelKey { key })),
            };
            if seen {
                return Err(ctx.reject(ReadError::DuplicateKey { key }));
            }
            match key.as_str() {
                keys::DATA => data = Some(map.next_value_seed(PrimaryDataSeed { ctx })?),
                keys::INCLUDED => included = Some(map.next_value_seed(IncludedSeed { ctx })?),
                keys::META => match map.next_value::<Value>()? {
                    Value::Object(object) => meta = Some(object),
                    _ => return Err(ctx.reject(ReadError::MetaNotObject)),
                },
                _ => match map.next_value::<Value>()? {
                    Value::Object(object) => links = Some(object),
                    _ => return Err(ctx.reject(ReadError::LinksNotObject)),
                },
            }
        }

        let Some(data) = data else {
            return Err(ctx.reject(ReadError::MissingPrimaryData));
        };
        let mut document = match data {
            PrimaryData::Single(resource) => CompoundDocument::single(resource),
            PrimaryData::Many(resources) => {
                let mut keys = FxHashSet::default();
                for resource in &resources {
                    if !keys.insert(resource.key()) {
                        return Err(ctx.reject(duplicate(resource)));
                    }
                }
                CompoundDocument::collection(resources)
            }
        };
        for resource in included.unwrap_or_default() {
            let error = duplicate(&resource);
            if !document.add_included(resource) {
                return Err(ctx.reject(error));
            }
        }
        document.meta = meta;
        document.links = links;
        Ok(document)
    }
}

fn duplicate(resource: &ResourceObject) -> ReadError {
    ReadError::DuplicateResource {
        resource_type: resource.resource_type.clone(),
        id: resource.id.clone(),
    }
}

enum PrimaryData {
    Single(Option<ResourceObject>),
    Many(Vec<ResourceObject>),
}

// =============================================================================
// Primary data and included
// =============================================================================

#[derive(Clone, Copy)]
struct PrimaryDataSeed<'c, 'r> {
    ctx: &'c ReadContext<'r>,
}

impl<'de> DeserializeSeed<'de> for PrimaryDataSeed<'_, '_> {
    type Value = PrimaryData;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for PrimaryDataSeed<'_, '_> {
    type Value = PrimaryData;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a resource object, an array of resource objects, or null")
    }

    reject_scalars!(|found| ReadError::InvalidPrimaryData { found });

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(PrimaryData::Single(None))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        read_resource(self.ctx, map).map(|resource| PrimaryData::Single(Some(resource)))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Self::Value, A::Error> {
        read_resources(self.ctx, seq).map(PrimaryData::Many)
    }
}

#[derive(Clone, Copy)]
struct IncludedSeed<'c, 'r> {
    ctx: &'c ReadContext<'r>,
}

impl<'de> DeserializeSeed<'de> for IncludedSeed<'_, '_> {
    type Value = Vec<ResourceObject>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for IncludedSeed<'_, '_> {
    type Value = Vec<ResourceObject>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of resource objects")
    }

    reject_scalars!(|found| ReadError::IncludedNotArray { found });

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Err(self.ctx.reject(ReadError::IncludedNotArray { found: "null" }))
    }

    fn visit_map<A: MapAccess<'de>>(self, _: A) -> Result<Self::Value, A::Error> {
        Err(self.ctx.reject(ReadError::IncludedNotArray { found: "an object" }))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Self::Value, A::Error> {
        read_resources(self.ctx, seq)
    }
}

fn read_resources<'de, A: SeqAccess<'de>>(
    ctx: &ReadContext<'_>,
    mut seq: A,
) -> Result<Vec<ResourceObject>, A::Error> {
    let mut resources = Vec::new();
    while let Some(resource) = seq.next_element_seed(ResourceSeed { ctx })? {
        resources.push(resource);
    }
    Ok(resources)
}

// =============================================================================
// Resource objects
// =============================================================================

#[derive(Clone, Copy)]
struct ResourceSeed<'c, 'r> {
    ctx: &'c ReadContext<'r>,
}

impl<'de> DeserializeSeed<'de> for ResourceSeed<'_, '_> {
    type Value = ResourceObject;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for ResourceSeed<'_, '_> {
    type Value = ResourceObject;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a resource object")
    }

    reject_scalars!(|found| ReadError::ResourceNotObject { found });

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Err(self.ctx.reject(ReadError::ResourceNotObject { found: "null" }))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, _: A) -> Result<Self::Value, A::Error> {
        Err(self.ctx.reject(ReadError::ResourceNotObject { found: "an array" }))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        read_resource(self.ctx, map)
    }
}

/// Members of one resource object, held until `type` is known.
#[derive(Default)]
struct PendingResource {
    id: Option<Value>,
    resource_type: Option<Value>,
    links: Option<Value>,
    meta: Option<Value>,
    attributes: Vec<(String, Value)>,
}

fn read_resource<'de, A: MapAccess<'de>>(
    ctx: &ReadContext<'_>,
    mut map: A,
) -> Result<ResourceObject, A::Error> {
    let mut pending = PendingResource::default();
    let mut members = FxHashSet::default();
    while let Some(key) = map.next_key::<String>()? {
        if !members.insert(key.clone()) {
            return Err(ctx.reject(ReadError::DuplicateResourceMember { member: key }));
        }
        let value: Value = map.next_value()?;
        match key.as_str() {
            keys::ID => pending.id = Some(value),
            keys::TYPE => pending.resource_type = Some(value),
            keys::LINKS => pending.links = Some(value),
            keys::META => pending.meta = Some(value),
            _ => pending.attributes.push((key, value)),
        }
    }
    pending.resolve(ctx).map_err(|error| ctx.reject(error))
}

impl PendingResource {
    fn resolve(self, ctx: &ReadContext<'_>) -> Result<ResourceObject, ReadError> {
        let id = required_string(self.id, keys::ID)?;
        let resource_type = required_string(self.resource_type, keys::TYPE)?;
        let registration = ctx.registry.type_for_wire_name(&resource_type)?;
        ctx.count_resource()?;

        let mut resource = ResourceObject::new(resource_type, id);
        for (key, value) in self.attributes {
            let value = decode_attribute(registration, &key, value)?;
            resource.set_attribute(key, value);
        }

        match self.links {
            None => {}
            Some(Value::Object(links)) => {
                for (key, value) in links {
                    let relationship = read_relationship(ctx, registration, &key, value)?;
                    resource.set_relationship(key, relationship);
                }
            }
            Some(_) => return Err(ReadError::RelationshipsNotObject),
        }

        resource.meta = match self.meta {
            None => None,
            Some(Value::Object(meta)) => Some(meta),
            Some(_) => return Err(ReadError::MetaNotObject),
        };
        Ok(resource)
    }
}

fn required_string(value: Option<Value>, field: &'static str) -> Result<String, ReadError> {
    match value {
        None => Err(ReadError::MissingResourceField { field }),
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(text),
        Some(_) => Err(ReadError::InvalidResourceField { field }),
    }
}

fn decode_attribute(
    registration: &TypeRegistration,
    key: &str,
    value: Value,
) -> Result<AttributeValue, ReadError> {
    let kind = registration.field_by_key(key).map(|field| field.kind());
    match kind {
        Some(kind) if kind.is_relationship() => Err(ReadError::RelationshipAsAttribute {
            resource_type: registration.wire_name().to_owned(),
            key: key.to_owned(),
        }),
        Some(FieldKind::Attribute(AttributeEncoding::RawJson)) => Ok(match value {
            Value::Null => AttributeValue::RawJson(None),
            other => AttributeValue::RawJson(Some(other.to_string())),
        }),
        Some(FieldKind::Attribute(AttributeEncoding::Decimal)) => decode_decimal(&value)
            .map(AttributeValue::Decimal)
            .map_err(|reason| ReadError::InvalidAttribute {
                resource_type: registration.wire_name().to_owned(),
                key: key.to_owned(),
                reason,
            }),
        _ => Ok(AttributeValue::Json(value)),
    }
}

fn decode_decimal(value: &Value) -> Result<Option<Decimal>, String> {
    let text = match value {
        Value::Null => return Ok(None),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        _ => return Err("expected a decimal string or number".to_owned()),
    };
    Decimal::from_str_exact(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Some)
        .map_err(|err| format!("`{text}` is not an exact decimal: {err}"))
}

// =============================================================================
// Relationships
// =============================================================================

fn read_relationship(
    ctx: &ReadContext<'_>,
    registration: &TypeRegistration,
    key: &str,
    value: Value,
) -> Result<Relationship, ReadError> {
    let kind = registration.field_by_key(key).map(|field| field.kind());
    match kind {
        Some(FieldKind::ToOne(_)) => read_to_one(ctx, key, value),
        Some(FieldKind::ToMany(_)) => read_to_many(ctx, key, value),
        _ => Err(ReadError::relationship(
            key,
            RelationshipPayloadError::UnknownRelationship,
        )),
    }
}

fn read_to_one(ctx: &ReadContext<'_>, key: &str, value: Value) -> Result<Relationship, ReadError> {
    let fail = |kind| ReadError::relationship(key, kind);
    let object = match value {
        Value::Null => return Ok(Relationship::to_one(None, RelationshipLinks::default())),
        Value::Object(object) => object,
        _ => return Err(fail(RelationshipPayloadError::NotAnObject)),
    };
    check_members(&object, &[keys::ID, keys::TYPE, keys::SELF, keys::RESOURCE], key)?;
    let links = read_links(&object, key)?;

    match (object.get(keys::ID), object.get(keys::TYPE)) {
        (None, None) if !links.is_empty() => Ok(Relationship::unlinked(links)),
        (Some(Value::Null), Some(Value::Null)) => Ok(Relationship::to_one(None, links)),
        (id, resource_type) => {
            let id = linkage_string(id).ok_or_else(|| {
                fail(RelationshipPayloadError::InvalidToOne { field: keys::ID })
            })?;
            let resource_type = linkage_string(resource_type).ok_or_else(|| {
                fail(RelationshipPayloadError::InvalidToOne { field: keys::TYPE })
            })?;
            let target = ctx.resolve_linkage(resource_type, id)?;
            Ok(Relationship::to_one(Some(target), links))
        }
    }
}

fn read_to_many(ctx: &ReadContext<'_>, key: &str, value: Value) -> Result<Relationship, ReadError> {
    let fail = |kind| ReadError::relationship(key, kind);
    let Value::Object(object) = value else {
        return Err(fail(RelationshipPayloadError::NotAnObject));
    };
    check_members(
        &object,
        &[keys::IDS, keys::TYPE, keys::DATA, keys::SELF, keys::RESOURCE],
        key,
    )?;
    let links = read_links(&object, key)?;

    let ids = object.get(keys::IDS);
    let resource_type = object.get(keys::TYPE);
    let data = object.get(keys::DATA);
    let linkage = match (ids, resource_type, data) {
        (Some(_), _, Some(_)) => return Err(fail(RelationshipPayloadError::DataAndIds)),
        (None, Some(_), Some(_)) => return Err(fail(RelationshipPayloadError::DataAndType)),
        (None, None, Some(data)) => read_data_linkage(ctx, key, data)?,
        (Some(_), None, None) => return Err(fail(RelationshipPayloadError::IdsWithoutType)),
        (None, Some(_), None) => return Err(fail(RelationshipPayloadError::TypeWithoutIds)),
        (Some(ids), Some(resource_type), None) => {
            read_ids_linkage(ctx, key, ids, resource_type)?
        }
        (None, None, None) if !links.is_empty() => return Ok(Relationship::unlinked(links)),
        (None, None, None) => return Err(fail(RelationshipPayloadError::MissingLinkage)),
    };
    Ok(Relationship::to_many(linkage, links))
}

fn read_data_linkage(
    ctx: &ReadContext<'_>,
    key: &str,
    data: &Value,
) -> Result<Vec<ResourceKey>, ReadError> {
    let Value::Array(items) = data else {
        return Err(ReadError::relationship(
            key,
            RelationshipPayloadError::DataNotArray,
        ));
    };
    check_linkage_len(ctx, items.len())?;

    let mut linkage = Vec::with_capacity(items.len());
    for item in items {
        let member = |field: &'static str| {
            linkage_string(item.get(field)).ok_or_else(|| {
                ReadError::relationship(key, RelationshipPayloadError::InvalidDataElement { field })
            })
        };
        let resource_type = member(keys::TYPE)?;
        let id = member(keys::ID)?;
        linkage.push(ctx.resolve_linkage(resource_type, id)?);
    }
    Ok(linkage)
}

fn read_ids_linkage(
    ctx: &ReadContext<'_>,
    key: &str,
    ids: &Value,
    resource_type: &Value,
) -> Result<Vec<ResourceKey>, ReadError> {
    let fail = |kind| ReadError::relationship(key, kind);
    let resource_type = linkage_string(Some(resource_type))
        .ok_or_else(|| fail(RelationshipPayloadError::TypeNotString))?;
    let Value::Array(ids) = ids else {
        return Err(fail(RelationshipPayloadError::IdsNotStrings));
    };
    check_linkage_len(ctx, ids.len())?;

    let registration = ctx.registry.type_for_wire_name(resource_type)?;
    ids.iter()
        .map(|id| {
            linkage_string(Some(id))
                .map(|id| ResourceKey::new(registration.wire_name(), id))
                .ok_or_else(|| fail(RelationshipPayloadError::IdsNotStrings))
        })
        .collect()
}

fn check_linkage_len(ctx: &ReadContext<'_>, len: usize) -> Result<(), ReadError> {
    if len > ctx.options.max_linkage {
        return Err(ReadError::LimitExceeded {
            field: "relationship linkage",
            max: ctx.options.max_linkage,
        });
    }
    Ok(())
}

fn check_members(
    object: &Map<String, Value>,
    allowed: &[&str],
    key: &str,
) -> Result<(), ReadError> {
    match object.keys().find(|member| !allowed.contains(&member.as_str())) {
        Some(member) => Err(ReadError::relationship(
            key,
            RelationshipPayloadError::UnexpectedKey {
                key: member.clone(),
            },
        )),
        None => Ok(()),
    }
}

fn read_links(object: &Map<String, Value>, key: &str) -> Result<RelationshipLinks, ReadError> {
    let url = |member: &'static str| match object.get(member) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(url)) => Ok(Some(url.clone())),
        Some(_) => Err(ReadError::relationship(
            key,
            RelationshipPayloadError::UrlNotString { member },
        )),
    };
    Ok(RelationshipLinks {
        relationship: url(keys::SELF)?,
        related: url(keys::RESOURCE)?,
    })
}

/// A non-blank string linkage member.
fn linkage_string(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.as_str()),
        _ => None,
    }
}
