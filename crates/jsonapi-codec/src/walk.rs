//! Graph walker: turns domain objects into a compound document.
//!
//! The walk keeps one arena of resource objects keyed by (type, id). A key is
//! inserted before the object's fields are visited, so a cycle finds the
//! in-progress entry and stops. Every logical resource is therefore converted
//! at most once per walk, and the number of visits is bounded by the number
//! of distinct resources reachable.
//!
//! A resource reached again through a different inclusion path is reused as
//! first built: relationships skipped on the first visit are not expanded
//! retroactively.

use std::any::Any;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{BuildError, InclusionError};
use crate::model::{
    AttributeValue, CompoundDocument, InclusionPath, Relationship, ResourceKey, ResourceObject,
    Selector,
};
use crate::options::LinkOptions;
use crate::registry::{EntityRef, FieldKind, FieldValue, TypeRegistration, TypeRegistry};

/// Builds a collection document from `objects`, expanding `paths`.
///
/// Relationship URLs are root-relative. Use [`DocumentBuilder`] for a base
/// URL, top-level metadata or single-resource documents.
pub fn build_document(
    registry: &TypeRegistry,
    objects: &[EntityRef],
    paths: &[InclusionPath],
) -> Result<CompoundDocument, BuildError> {
    let links = LinkOptions::default();
    let (primary, included) = Walk::new(registry, paths, &links).run(objects)?;
    let mut document = CompoundDocument::collection(primary);
    for resource in included {
        document.add_included(resource);
    }
    Ok(document)
}

/// Configures and runs graph walks.
///
/// A builder may be reused; every call to [`single`](Self::single) or
/// [`collection`](Self::collection) starts a fresh walk.
#[derive(Debug, Clone)]
pub struct DocumentBuilder<'r> {
    registry: &'r TypeRegistry,
    paths: Vec<InclusionPath>,
    links: LinkOptions,
    meta: Option<Map<String, Value>>,
}

impl<'r> DocumentBuilder<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            paths: Vec::new(),
            links: LinkOptions::default(),
            meta: None,
        }
    }

    /// Adds an inclusion path.
    pub fn include(mut self, path: InclusionPath) -> Self {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
        self
    }

    /// Adds a dotted inclusion path such as `countries.cities`.
    pub fn include_path(self, path: &str) -> Result<Self, InclusionError> {
        Ok(self.include(InclusionPath::parse(path)?))
    }

    /// Adds the inclusion path described by `selector`.
    pub fn include_selector(self, selector: &Selector) -> Result<Self, InclusionError> {
        Ok(self.include(InclusionPath::from_selector(selector)?))
    }

    /// Sets the base for relationship URLs.
    pub fn links(mut self, links: LinkOptions) -> Self {
        self.links = links;
        self
    }

    /// Sets top-level metadata.
    pub fn meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn paths(&self) -> &[InclusionPath] {
        &self.paths
    }

    /// Builds a single-resource document; `None` gives `"data": null`.
    pub fn single<T: Any + Send + Sync>(
        &self,
        object: Option<Arc<T>>,
    ) -> Result<CompoundDocument, BuildError> {
        self.build_single(object.map(|object| object as EntityRef))
    }

    /// Builds a collection document.
    pub fn collection<T, I>(&self, objects: I) -> Result<CompoundDocument, BuildError>
    where
        T: Any + Send + Sync,
        I: IntoIterator<Item = Arc<T>>,
    {
        let objects: Vec<EntityRef> = objects
            .into_iter()
            .map(|object| object as EntityRef)
            .collect();
        self.build_collection(&objects)
    }

    /// Type-erased form of [`single`](Self::single).
    pub fn build_single(&self, object: Option<EntityRef>) -> Result<CompoundDocument, BuildError> {
        let objects: Vec<EntityRef> = object.into_iter().collect();
        let (primary, included) = self.walk(&objects)?;
        Ok(self.assemble(CompoundDocument::single(primary.into_iter().next()), included))
    }

    /// Type-erased form of [`collection`](Self::collection).
    pub fn build_collection(&self, objects: &[EntityRef]) -> Result<CompoundDocument, BuildError> {
        let (primary, included) = self.walk(objects)?;
        Ok(self.assemble(CompoundDocument::collection(primary), included))
    }

    fn walk(
        &self,
        objects: &[EntityRef],
    ) -> Result<(Vec<ResourceObject>, Vec<ResourceObject>), BuildError> {
        Walk::new(self.registry, &self.paths, &self.links).run(objects)
    }

    fn assemble(
        &self,
        mut document: CompoundDocument,
        included: Vec<ResourceObject>,
    ) -> CompoundDocument {
        for resource in included {
            document.add_included(resource);
        }
        document.meta = self.meta.clone();
        document
    }
}

type ConvertedFields = (Vec<(String, AttributeValue)>, Vec<(String, Relationship)>);

/// State of one walk. Owned by a single call and dropped with it.
struct Walk<'a> {
    registry: &'a TypeRegistry,
    paths: &'a [InclusionPath],
    links: &'a LinkOptions,
    slots: Vec<ResourceObject>,
    index: FxHashMap<ResourceKey, usize>,
    related: Vec<usize>,
}

impl<'a> Walk<'a> {
    fn new(registry: &'a TypeRegistry, paths: &'a [InclusionPath], links: &'a LinkOptions) -> Self {
        Self {
            registry,
            paths,
            links,
            slots: Vec::new(),
            index: FxHashMap::default(),
            related: Vec::new(),
        }
    }

    /// Returns (primary, included). Included holds related resources in
    /// discovery order; primary resources are never among them.
    ///
    /// Every primary key is reserved before any field is converted, so each
    /// primary resource is built at the root path even when another primary
    /// reaches it through a relationship first.
    fn run(
        mut self,
        objects: &[EntityRef],
    ) -> Result<(Vec<ResourceObject>, Vec<ResourceObject>), BuildError> {
        let mut primary_slots = Vec::with_capacity(objects.len());
        let mut pending = Vec::with_capacity(objects.len());
        for object in objects {
            let (registration, key) = self.resolve(object)?;
            if self.index.contains_key(&key) {
                debug!(resource = %key, "primary resource repeated, skipping");
                continue;
            }
            let slot = self.reserve(key.clone(), false);
            primary_slots.push(slot);
            pending.push((slot, object, registration, key));
        }

        for (slot, object, registration, key) in pending {
            self.fill(slot, registration, &**object, &key, "")?;
        }

        let mut slots: Vec<Option<ResourceObject>> = self.slots.into_iter().map(Some).collect();
        let primary = primary_slots
            .iter()
            .filter_map(|&slot| slots[slot].take())
            .collect();
        let included = self
            .related
            .iter()
            .filter_map(|&slot| slots[slot].take())
            .collect();
        Ok((primary, included))
    }

    /// Looks up the registration of `entity` and its (type, id) key.
    fn resolve(&self, entity: &EntityRef) -> Result<(&'a TypeRegistration, ResourceKey), BuildError> {
        let object: &dyn Any = &**entity;
        let registry = self.registry;
        let registration = registry
            .registration_of(object)
            .ok_or(BuildError::UnregisteredType {
                type_id: object.type_id(),
            })?;
        let id = registration
            .id_field()
            .get(object)
            .ok_or_else(|| BuildError::AccessorMismatch {
                resource_type: registration.wire_name().to_owned(),
                field: "id".to_owned(),
            })?;
        if id.is_empty() {
            return Err(BuildError::EmptyId {
                resource_type: registration.wire_name().to_owned(),
            });
        }
        Ok((registration, ResourceKey::new(registration.wire_name(), id)))
    }

    /// Inserts an empty resource for `key` and returns its slot.
    fn reserve(&mut self, key: ResourceKey, as_related: bool) -> usize {
        let slot = self.slots.len();
        self.slots
            .push(ResourceObject::new(key.resource_type.clone(), key.id.clone()));
        self.index.insert(key, slot);
        if as_related {
            self.related.push(slot);
        }
        slot
    }

    fn fill(
        &mut self,
        slot: usize,
        registration: &TypeRegistration,
        object: &dyn Any,
        key: &ResourceKey,
        path: &str,
    ) -> Result<(), BuildError> {
        let (attributes, relationships) = self.convert_fields(registration, object, key, path)?;
        let resource = &mut self.slots[slot];
        resource.attributes = attributes;
        resource.relationships = relationships;
        Ok(())
    }

    /// Converts a related resource reached at `path`, or reuses the
    /// conversion already made for its key.
    fn visit(&mut self, entity: &EntityRef, path: &str) -> Result<ResourceKey, BuildError> {
        let (registration, key) = self.resolve(entity)?;
        if self.index.contains_key(&key) {
            debug!(resource = %key, path, "resource already converted, reusing");
            return Ok(key);
        }
        let slot = self.reserve(key.clone(), true);
        self.fill(slot, registration, &**entity, &key, path)?;
        Ok(key)
    }

    fn convert_fields(
        &mut self,
        registration: &TypeRegistration,
        object: &dyn Any,
        key: &ResourceKey,
        path: &str,
    ) -> Result<ConvertedFields, BuildError> {
        let mut attributes = Vec::new();
        let mut relationships = Vec::new();
        let mismatch = |field: &str| BuildError::AccessorMismatch {
            resource_type: key.resource_type.clone(),
            field: field.to_owned(),
        };

        for field in registration.fields() {
            let json_key = field.json_key().to_owned();
            match field.kind() {
                FieldKind::Attribute(_) | FieldKind::Computed => {
                    match field.get(object).ok_or_else(|| mismatch(field.name()))? {
                        FieldValue::Attribute(Ok(value)) => attributes.push((json_key, value)),
                        FieldValue::Attribute(Err(message)) => {
                            return Err(BuildError::Attribute {
                                resource_type: key.resource_type.clone(),
                                field: field.name().to_owned(),
                                message,
                            });
                        }
                        FieldValue::One(_) | FieldValue::Many(_) => {
                            return Err(mismatch(field.name()));
                        }
                    }
                }
                FieldKind::ToOne(_) | FieldKind::ToMany(_) => {
                    let property_path = if path.is_empty() {
                        field.name().to_owned()
                    } else {
                        format!("{path}.{}", field.name())
                    };
                    let links = self
                        .links
                        .relationship_links(&key.resource_type, &key.id, &json_key);

                    if !self.paths.iter().any(|p| p.matches(&property_path)) {
                        relationships.push((json_key, Relationship::unlinked(links)));
                        continue;
                    }
                    debug!(resource = %key, path = %property_path, "expanding relationship");

                    let relationship =
                        match field.get(object).ok_or_else(|| mismatch(field.name()))? {
                            FieldValue::One(None) => Relationship::to_one(None, links),
                            FieldValue::One(Some(target)) => {
                                let target_key = self.visit(&target, &property_path)?;
                                Relationship::to_one(Some(target_key), links)
                            }
                            FieldValue::Many(targets) => {
                                let mut linkage = Vec::with_capacity(targets.len());
                                for target in &targets {
                                    let target_key = self.visit(target, &property_path)?;
                                    linkage.push(target_key);
                                }
                                Relationship::to_many(linkage, links)
                            }
                            FieldValue::Attribute(_) => return Err(mismatch(field.name())),
                        };
                    relationships.push((json_key, relationship));
                }
            }
        }
        Ok((attributes, relationships))
    }
}
