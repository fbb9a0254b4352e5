//! Resource objects: the wire-agnostic form of one domain entity.

use std::fmt;

use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::model::Relationship;

/// Identity of a logical resource: wire type name plus id.
///
/// Two objects with equal keys are the same resource no matter how many
/// in-memory instances represent them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    /// Wire type name.
    pub resource_type: String,
    /// Resource id.
    pub id: String,
}

impl ResourceKey {
    /// Creates a key.
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.id)
    }
}

/// The value of one attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Any JSON value, written as-is.
    Json(Value),
    /// JSON text carried as a string and embedded verbatim (minified).
    ///
    /// Text that does not parse is written as `{}`.
    RawJson(Option<String>),
    /// Extended-precision number, written as its exact string form.
    Decimal(Option<Decimal>),
}

impl AttributeValue {
    /// Returns the plain JSON value, if this is a [`AttributeValue::Json`].
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            AttributeValue::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns true for JSON null and for absent raw/decimal values.
    pub fn is_null(&self) -> bool {
        match self {
            AttributeValue::Json(value) => value.is_null(),
            AttributeValue::RawJson(text) => text.is_none(),
            AttributeValue::Decimal(number) => number.is_none(),
        }
    }
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        AttributeValue::Json(value)
    }
}

impl From<Decimal> for AttributeValue {
    fn from(value: Decimal) -> Self {
        AttributeValue::Decimal(Some(value))
    }
}

/// One resource: id, type, attributes and relationships.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceObject {
    /// Resource id (never empty).
    pub id: String,
    /// Wire type name, resolvable through the registry.
    pub resource_type: String,
    /// Attributes in declaration order. Never contains the id or a relationship.
    pub attributes: Vec<(String, AttributeValue)>,
    /// Relationships in declaration order, keyed by wire key.
    pub relationships: Vec<(String, Relationship)>,
    /// Resource-level `meta`.
    pub meta: Option<Map<String, Value>>,
}

impl ResourceObject {
    /// Creates a resource with no attributes or relationships.
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            attributes: Vec::new(),
            relationships: Vec::new(),
            meta: None,
        }
    }

    /// Returns the (type, id) key of this resource.
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.resource_type.clone(), self.id.clone())
    }

    /// Returns true if this resource has the given key.
    pub fn has_key(&self, key: &ResourceKey) -> bool {
        self.resource_type == key.resource_type && self.id == key.id
    }

    /// Looks up an attribute by wire key.
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Looks up a relationship by wire key.
    pub fn relationship(&self, key: &str) -> Option<&Relationship> {
        self.relationships
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, r)| r)
    }

    /// Sets an attribute, replacing any previous value under the same key.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Sets a relationship, replacing any previous one under the same key.
    pub fn set_relationship(&mut self, key: impl Into<String>, relationship: Relationship) {
        let key = key.into();
        match self.relationships.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = relationship,
            None => self.relationships.push((key, relationship)),
        }
    }

    /// Builder form of [`ResourceObject::set_attribute`].
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Builder form of [`ResourceObject::set_relationship`].
    pub fn with_relationship(mut self, key: impl Into<String>, relationship: Relationship) -> Self {
        self.set_relationship(key, relationship);
        self
    }
}
