//! Fluent registration API.
//!
//! ```rust
//! use std::sync::Arc;
//! use jsonapi_codec::TypeRegistry;
//!
//! struct Author { id: u64, name: String, books: Vec<Arc<Book>> }
//! struct Book { id: u64, title: String }
//!
//! let registry = TypeRegistry::builder()
//!     .register::<Author>("authors", |a| a.id.to_string(), |f| f
//!         .attribute("name", |a| a.name.clone())
//!         .to_many("books", |a| a.books.clone())
//!     )
//!     .register::<Book>("books", |b| b.id.to_string(), |f| f
//!         .attribute("title", |b| b.title.clone())
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(registry.len(), 2);
//! ```

use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

use rust_decimal::Decimal;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use super::{
    default_json_key, Accessor, AttributeEncoding, EntityRef, FieldDescriptor, FieldKind, IdField,
    RelatedType, TypeRegistration, TypeRegistry,
};
use crate::error::RegistryError;
use crate::model::AttributeValue;

/// Keys a field may never use: they are members of the resource object itself.
const RESERVED_KEYS: [&str; 4] = ["id", "type", "links", "meta"];

/// Builder for a [`TypeRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registrations: Vec<TypeRegistration>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under `wire_name`.
    ///
    /// `id` returns the resource id; `fields` declares the remaining fields
    /// in wire order.
    pub fn register<T: Any + Send + Sync>(
        mut self,
        wire_name: impl Into<String>,
        id: impl Fn(&T) -> String + Send + Sync + 'static,
        fields: impl FnOnce(FieldsBuilder<T>) -> FieldsBuilder<T>,
    ) -> Self {
        let builder = fields(FieldsBuilder::new());
        self.registrations.push(TypeRegistration {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            wire_name: wire_name.into(),
            id: IdField {
                accessor: Arc::new(move |object: &dyn Any| object.downcast_ref::<T>().map(&id)),
            },
            fields: builder.fields,
        });
        self
    }

    /// Validates the registrations and builds the registry.
    pub fn build(self) -> Result<TypeRegistry, RegistryError> {
        let mut by_type = FxHashMap::default();
        let mut by_wire_name = FxHashMap::default();

        for (index, registration) in self.registrations.iter().enumerate() {
            if registration.wire_name.is_empty() {
                return Err(RegistryError::EmptyWireName {
                    rust_type: registration.type_name,
                });
            }
            if by_type.insert(registration.type_id, index).is_some() {
                return Err(RegistryError::DuplicateType {
                    rust_type: registration.type_name,
                });
            }
            if by_wire_name
                .insert(registration.wire_name.clone(), index)
                .is_some()
            {
                return Err(RegistryError::DuplicateWireName {
                    wire_name: registration.wire_name.clone(),
                });
            }
            check_fields(registration)?;
        }

        for registration in &self.registrations {
            for field in &registration.fields {
                if let Some(related) = field.kind.related() {
                    if !by_type.contains_key(&related.type_id) {
                        return Err(RegistryError::UnregisteredRelatedType {
                            resource_type: registration.wire_name.clone(),
                            field: field.name.clone(),
                            related: related.type_name,
                        });
                    }
                }
            }
        }

        Ok(TypeRegistry {
            registrations: self.registrations,
            by_type,
            by_wire_name,
        })
    }
}

fn check_fields(registration: &TypeRegistration) -> Result<(), RegistryError> {
    let mut names = FxHashSet::default();
    let mut keys = FxHashSet::default();
    for field in &registration.fields {
        if RESERVED_KEYS.contains(&field.json_key.as_str()) {
            return Err(RegistryError::ReservedKey {
                resource_type: registration.wire_name.clone(),
                key: field.json_key.clone(),
            });
        }
        if !names.insert(field.name.as_str()) {
            return Err(RegistryError::DuplicateField {
                resource_type: registration.wire_name.clone(),
                key: field.name.clone(),
            });
        }
        if !keys.insert(field.json_key.as_str()) {
            return Err(RegistryError::DuplicateField {
                resource_type: registration.wire_name.clone(),
                key: field.json_key.clone(),
            });
        }
    }
    Ok(())
}

/// Declares the fields of one registered type, in wire order.
pub struct FieldsBuilder<T> {
    fields: Vec<FieldDescriptor>,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Any + Send + Sync> FieldsBuilder<T> {
    fn new() -> Self {
        Self {
            fields: Vec::new(),
            _marker: PhantomData,
        }
    }

    fn push(mut self, name: &str, kind: FieldKind, accessor: Accessor) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.to_owned(),
            json_key: default_json_key(name),
            kind,
            accessor,
        });
        self
    }

    fn value_accessor<V, F>(f: F) -> Accessor
    where
        V: Serialize,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        Accessor::Value(Arc::new(move |object: &dyn Any| {
            object.downcast_ref::<T>().map(|entity| {
                serde_json::to_value(f(entity))
                    .map(AttributeValue::Json)
                    .map_err(|err| err.to_string())
            })
        }))
    }

    /// A plain attribute serialized through serde.
    pub fn attribute<V, F>(self, name: &str, f: F) -> Self
    where
        V: Serialize,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.push(
            name,
            FieldKind::Attribute(AttributeEncoding::Plain),
            Self::value_accessor(f),
        )
    }

    /// An attribute holding JSON text, embedded verbatim on write.
    pub fn raw_json<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&T) -> Option<String> + Send + Sync + 'static,
    {
        let accessor = Accessor::Value(Arc::new(move |object: &dyn Any| {
            object
                .downcast_ref::<T>()
                .map(|entity| Ok(AttributeValue::RawJson(f(entity))))
        }));
        self.push(name, FieldKind::Attribute(AttributeEncoding::RawJson), accessor)
    }

    /// An extended-precision numeric attribute.
    pub fn decimal<D, F>(self, name: &str, f: F) -> Self
    where
        D: Into<Option<Decimal>>,
        F: Fn(&T) -> D + Send + Sync + 'static,
    {
        let accessor = Accessor::Value(Arc::new(move |object: &dyn Any| {
            object
                .downcast_ref::<T>()
                .map(|entity| Ok(AttributeValue::Decimal(f(entity).into())))
        }));
        self.push(name, FieldKind::Attribute(AttributeEncoding::Decimal), accessor)
    }

    /// A value computed from the object. Written like an attribute, never
    /// decoded into anything but plain JSON.
    pub fn computed<V, F>(self, name: &str, f: F) -> Self
    where
        V: Serialize,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.push(name, FieldKind::Computed, Self::value_accessor(f))
    }

    /// A to-one relationship. `f` returns the already-resolved target.
    pub fn to_one<R, F>(self, name: &str, f: F) -> Self
    where
        R: Any + Send + Sync,
        F: Fn(&T) -> Option<Arc<R>> + Send + Sync + 'static,
    {
        let accessor = Accessor::One(Arc::new(move |object: &dyn Any| {
            object
                .downcast_ref::<T>()
                .map(|entity| f(entity).map(|target| target as EntityRef))
        }));
        self.push(name, FieldKind::ToOne(RelatedType::of::<R>()), accessor)
    }

    /// A to-many relationship. `f` returns the targets in enumeration order.
    pub fn to_many<R, I, F>(self, name: &str, f: F) -> Self
    where
        R: Any + Send + Sync,
        I: IntoIterator<Item = Arc<R>>,
        F: Fn(&T) -> I + Send + Sync + 'static,
    {
        let accessor = Accessor::Many(Arc::new(move |object: &dyn Any| {
            object.downcast_ref::<T>().map(|entity| {
                f(entity)
                    .into_iter()
                    .map(|target| target as EntityRef)
                    .collect()
            })
        }));
        self.push(name, FieldKind::ToMany(RelatedType::of::<R>()), accessor)
    }

    /// Overrides the wire key of the most recently declared field.
    pub fn with_key(mut self, key: &str) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.json_key = key.to_owned();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shelf {
        id: String,
        label: String,
        books: Vec<Arc<Book>>,
    }

    struct Book {
        id: String,
    }

    #[test]
    fn test_json_key_defaults_and_override() {
        let registry = TypeRegistry::builder()
            .register::<Shelf>("shelves", |s| s.id.clone(), |f| {
                f.attribute("shelf_label", |s| s.label.clone())
                    .to_many("books", |s| s.books.clone())
                    .with_key("volumes")
            })
            .register::<Book>("books", |b| b.id.clone(), |f| f)
            .build()
            .unwrap();

        let shelves = registry.registration::<Shelf>().unwrap();
        assert_eq!(shelves.fields()[0].json_key(), "shelfLabel");
        assert_eq!(shelves.fields()[1].name(), "books");
        assert_eq!(shelves.fields()[1].json_key(), "volumes");
    }

    #[test]
    fn test_rejects_duplicate_wire_name() {
        let err = TypeRegistry::builder()
            .register::<Shelf>("things", |s| s.id.clone(), |f| f)
            .register::<Book>("things", |b| b.id.clone(), |f| f)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateWireName {
                wire_name: "things".into()
            }
        );
    }

    #[test]
    fn test_rejects_duplicate_type_and_empty_name() {
        let err = TypeRegistry::builder()
            .register::<Book>("books", |b| b.id.clone(), |f| f)
            .register::<Book>("volumes", |b| b.id.clone(), |f| f)
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateType { .. }));

        let err = TypeRegistry::builder()
            .register::<Book>("", |b| b.id.clone(), |f| f)
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::EmptyWireName { .. }));
    }

    #[test]
    fn test_rejects_reserved_and_duplicate_keys() {
        let err = TypeRegistry::builder()
            .register::<Shelf>("shelves", |s| s.id.clone(), |f| {
                f.attribute("label", |s| s.label.clone()).with_key("type")
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::ReservedKey { ref key, .. } if key == "type"));

        let err = TypeRegistry::builder()
            .register::<Shelf>("shelves", |s| s.id.clone(), |f| {
                f.attribute("label", |s| s.label.clone())
                    .computed("title", |s| s.label.len())
                    .with_key("label")
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateField { ref key, .. } if key == "label"));
    }

    #[test]
    fn test_rejects_unregistered_related_type() {
        let err = TypeRegistry::builder()
            .register::<Shelf>("shelves", |s| s.id.clone(), |f| {
                f.to_many("books", |s| s.books.clone())
            })
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::UnregisteredRelatedType { ref field, .. } if field == "books"
        ));
    }
}
