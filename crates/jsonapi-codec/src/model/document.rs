//! Compound documents: primary data plus the related-resource section.

use rustc_hash::FxHashSet;
use serde_json::{Map, Value};

use crate::model::{ResourceKey, ResourceObject};

/// A complete document, as built by the walker or parsed by the reader.
///
/// The included section never holds a resource whose key is already present
/// in the primary data or earlier in the included section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompoundDocument {
    /// Top-level `meta`.
    pub meta: Option<Map<String, Value>>,
    /// Top-level `links`.
    pub links: Option<Map<String, Value>>,
    primary: Vec<ResourceObject>,
    is_collection: bool,
    included: Vec<ResourceObject>,
    keys: FxHashSet<ResourceKey>,
}

impl CompoundDocument {
    /// Creates a single-resource document. `None` is written as `"data": null`.
    pub fn single(primary: Option<ResourceObject>) -> Self {
        let primary: Vec<ResourceObject> = primary.into_iter().collect();
        let keys = primary.iter().map(ResourceObject::key).collect();
        Self {
            primary,
            is_collection: false,
            keys,
            ..Self::default()
        }
    }

    /// Creates a collection document.
    pub fn collection(primary: impl IntoIterator<Item = ResourceObject>) -> Self {
        let primary: Vec<ResourceObject> = primary.into_iter().collect();
        let keys = primary.iter().map(ResourceObject::key).collect();
        Self {
            primary,
            is_collection: true,
            keys,
            ..Self::default()
        }
    }

    /// Sets top-level metadata.
    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Adds a related resource.
    ///
    /// Returns `false` (and drops the resource) if its key is already present
    /// anywhere in the document.
    pub fn add_included(&mut self, resource: ResourceObject) -> bool {
        if !self.keys.insert(resource.key()) {
            return false;
        }
        self.included.push(resource);
        true
    }

    /// Primary resources, in order. At most one unless this is a collection.
    pub fn primary(&self) -> &[ResourceObject] {
        &self.primary
    }

    /// Whether primary data is an array.
    pub fn is_collection(&self) -> bool {
        self.is_collection
    }

    /// Related resources, in discovery order.
    pub fn included(&self) -> &[ResourceObject] {
        &self.included
    }

    /// Returns true if a resource with this key is present.
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.keys.contains(key)
    }

    /// Finds a resource by key in either section.
    pub fn find(&self, key: &ResourceKey) -> Option<&ResourceObject> {
        self.primary
            .iter()
            .chain(&self.included)
            .find(|resource| resource.has_key(key))
    }

    /// Splits the document into (primary, included).
    pub fn into_parts(self) -> (Vec<ResourceObject>, Vec<ResourceObject>) {
        (self.primary, self.included)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_included_dedup_against_primary_and_itself() {
        let mut doc = CompoundDocument::single(Some(ResourceObject::new("continents", "31")));
        assert!(doc.add_included(ResourceObject::new("countries", "21")));
        assert!(!doc.add_included(ResourceObject::new("countries", "21")));
        assert!(!doc.add_included(ResourceObject::new("continents", "31")));
        assert!(doc.add_included(ResourceObject::new("countries", "31")));

        assert_eq!(doc.included().len(), 2);
        assert!(doc.contains(&ResourceKey::new("countries", "31")));
    }

    #[test]
    fn test_single_holds_at_most_one() {
        let doc = CompoundDocument::single(None);
        assert!(!doc.is_collection());
        assert!(doc.primary().is_empty());

        let doc = CompoundDocument::collection(vec![
            ResourceObject::new("cities", "11"),
            ResourceObject::new("cities", "12"),
        ]);
        assert!(doc.is_collection());
        assert_eq!(doc.primary().len(), 2);
        assert!(doc.find(&ResourceKey::new("cities", "12")).is_some());
    }
}
