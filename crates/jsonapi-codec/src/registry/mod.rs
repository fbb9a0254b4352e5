//! Type registry: per-resource-type structure queried by the codec.
//!
//! Each Rust type handed to the walker is registered once with its wire type
//! name, an id accessor and an ordered list of field descriptors. Field kinds
//! are resolved when the registry is built, so the walker only switches on a
//! closed tag and never inspects objects beyond one downcast per accessor.

mod builder;

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::RegistryError;
use crate::model::AttributeValue;

pub use builder::{FieldsBuilder, RegistryBuilder};

/// A domain object as seen by the walker.
pub type EntityRef = Arc<dyn Any + Send + Sync>;

type IdGetter = Arc<dyn Fn(&dyn Any) -> Option<String> + Send + Sync>;
type AttributeGetter =
    Arc<dyn Fn(&dyn Any) -> Option<Result<AttributeValue, String>> + Send + Sync>;
type ToOneGetter = Arc<dyn Fn(&dyn Any) -> Option<Option<EntityRef>> + Send + Sync>;
type ToManyGetter = Arc<dyn Fn(&dyn Any) -> Option<Vec<EntityRef>> + Send + Sync>;

/// How an attribute value is carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeEncoding {
    /// Ordinary serde serialization.
    Plain,
    /// A string holding JSON text, embedded as raw JSON.
    RawJson,
    /// Extended-precision number, written as an exact string.
    Decimal,
}

/// Target of a relationship field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelatedType {
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl RelatedType {
    pub(crate) fn of<R: Any>() -> Self {
        Self {
            type_id: TypeId::of::<R>(),
            type_name: std::any::type_name::<R>(),
        }
    }
}

/// The closed set of field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Stored scalar attribute.
    Attribute(AttributeEncoding),
    /// Value derived from the object on write; read back as plain JSON.
    Computed,
    /// Relationship to zero or one resource.
    ToOne(RelatedType),
    /// Relationship to an ordered collection of resources.
    ToMany(RelatedType),
}

impl FieldKind {
    pub fn is_relationship(&self) -> bool {
        matches!(self, FieldKind::ToOne(_) | FieldKind::ToMany(_))
    }

    pub fn related(&self) -> Option<RelatedType> {
        match self {
            FieldKind::ToOne(related) | FieldKind::ToMany(related) => Some(*related),
            FieldKind::Attribute(_) | FieldKind::Computed => None,
        }
    }

    pub fn encoding(&self) -> Option<AttributeEncoding> {
        match self {
            FieldKind::Attribute(encoding) => Some(*encoding),
            FieldKind::Computed => Some(AttributeEncoding::Plain),
            FieldKind::ToOne(_) | FieldKind::ToMany(_) => None,
        }
    }
}

/// Current value of one field of one object.
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// Attribute or computed value, or the serialization failure message.
    Attribute(Result<AttributeValue, String>),
    /// Resolved to-one target.
    One(Option<EntityRef>),
    /// Resolved to-many targets in enumeration order.
    Many(Vec<EntityRef>),
}

#[derive(Clone)]
enum Accessor {
    Value(AttributeGetter),
    One(ToOneGetter),
    Many(ToManyGetter),
}

/// One declared field of a registered type.
#[derive(Clone)]
pub struct FieldDescriptor {
    name: String,
    json_key: String,
    kind: FieldKind,
    accessor: Accessor,
}

impl FieldDescriptor {
    /// Member name, as used in inclusion paths.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key under which the field appears on the wire.
    pub fn json_key(&self) -> &str {
        &self.json_key
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Reads the field from `object`.
    ///
    /// Returns `None` if `object` is not of the type this field was
    /// registered on.
    pub fn get(&self, object: &dyn Any) -> Option<FieldValue> {
        match &self.accessor {
            Accessor::Value(get) => get(object).map(FieldValue::Attribute),
            Accessor::One(get) => get(object).map(FieldValue::One),
            Accessor::Many(get) => get(object).map(FieldValue::Many),
        }
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("json_key", &self.json_key)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// The identifier field of a registered type.
#[derive(Clone)]
pub struct IdField {
    accessor: IdGetter,
}

impl IdField {
    /// Reads the id from `object`, or `None` on a type mismatch.
    pub fn get(&self, object: &dyn Any) -> Option<String> {
        (self.accessor)(object)
    }
}

impl fmt::Debug for IdField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdField").finish_non_exhaustive()
    }
}

/// Everything the codec knows about one resource type.
#[derive(Debug, Clone)]
pub struct TypeRegistration {
    type_id: TypeId,
    type_name: &'static str,
    wire_name: String,
    id: IdField,
    fields: Vec<FieldDescriptor>,
}

impl TypeRegistration {
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name, for diagnostics.
    pub fn rust_type_name(&self) -> &'static str {
        self.type_name
    }

    /// Wire type name (the `type` member).
    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    pub fn id_field(&self) -> &IdField {
        &self.id
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Finds a field by member name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Finds a field by wire key.
    pub fn field_by_key(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.json_key == key)
    }
}

/// Immutable set of registered resource types.
///
/// Built once with [`TypeRegistry::builder`] and shared by every walk, read
/// and write; it holds no per-call state.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    registrations: Vec<TypeRegistration>,
    by_type: FxHashMap<TypeId, usize>,
    by_wire_name: FxHashMap<String, usize>,
}

impl TypeRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Iterates registrations in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeRegistration> {
        self.registrations.iter()
    }

    pub fn registration_for(&self, type_id: TypeId) -> Option<&TypeRegistration> {
        self.by_type
            .get(&type_id)
            .map(|&index| &self.registrations[index])
    }

    pub fn registration<T: Any>(&self) -> Option<&TypeRegistration> {
        self.registration_for(TypeId::of::<T>())
    }

    /// Finds the registration of a type-erased object.
    pub fn registration_of(&self, object: &dyn Any) -> Option<&TypeRegistration> {
        self.registration_for(object.type_id())
    }

    pub fn fields_for(&self, type_id: TypeId) -> Option<&[FieldDescriptor]> {
        self.registration_for(type_id).map(TypeRegistration::fields)
    }

    pub fn id_field_for(&self, type_id: TypeId) -> Option<&IdField> {
        self.registration_for(type_id).map(TypeRegistration::id_field)
    }

    pub fn wire_type_name_for(&self, type_id: TypeId) -> Option<&str> {
        self.registration_for(type_id).map(TypeRegistration::wire_name)
    }

    /// Resolves a wire type name.
    pub fn type_for_wire_name(&self, wire_name: &str) -> Result<&TypeRegistration, RegistryError> {
        self.by_wire_name
            .get(wire_name)
            .map(|&index| &self.registrations[index])
            .ok_or_else(|| RegistryError::UnknownResourceType {
                type_name: wire_name.to_owned(),
            })
    }
}

/// Converts a member name to its default wire key (lowerCamelCase).
///
/// `snake_case` and `PascalCase` names are both accepted.
pub fn default_json_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '_' {
            upper_next = !key.is_empty();
            continue;
        }
        if key.is_empty() {
            key.extend(ch.to_lowercase());
        } else if upper_next {
            key.extend(ch.to_uppercase());
        } else {
            key.push(ch);
        }
        upper_next = false;
    }
    key
}
