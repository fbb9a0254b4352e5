//! Relationship values.

use rustc_hash::FxHashSet;

use crate::model::ResourceKey;

/// The two URLs every relationship may carry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelationshipLinks {
    /// URL of the related resource(s), written as `resource`.
    pub related: Option<String>,
    /// URL of the relationship itself, written as `self`.
    pub relationship: Option<String>,
}

impl RelationshipLinks {
    /// Returns true if neither URL is set.
    pub fn is_empty(&self) -> bool {
        self.related.is_none() && self.relationship.is_none()
    }
}

/// A relationship from one resource to others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relationship {
    /// Reference only: URLs but no linkage.
    Unlinked { links: RelationshipLinks },
    /// To-one linkage. `None` is an empty (null) relationship.
    ToOne {
        linkage: Option<ResourceKey>,
        links: RelationshipLinks,
    },
    /// To-many linkage in source order, unique by (type, id).
    ToMany {
        linkage: Vec<ResourceKey>,
        links: RelationshipLinks,
    },
}

impl Relationship {
    /// Creates an unlinked relationship.
    pub fn unlinked(links: RelationshipLinks) -> Self {
        Relationship::Unlinked { links }
    }

    /// Creates a to-one relationship.
    pub fn to_one(linkage: Option<ResourceKey>, links: RelationshipLinks) -> Self {
        Relationship::ToOne { linkage, links }
    }

    /// Creates a to-many relationship.
    ///
    /// Repeated keys keep their first position only.
    pub fn to_many(linkage: impl IntoIterator<Item = ResourceKey>, links: RelationshipLinks) -> Self {
        let mut seen = FxHashSet::default();
        let linkage = linkage
            .into_iter()
            .filter(|key| seen.insert(key.clone()))
            .collect();
        Relationship::ToMany { linkage, links }
    }

    /// Returns the relationship's URLs.
    pub fn links(&self) -> &RelationshipLinks {
        match self {
            Relationship::Unlinked { links }
            | Relationship::ToOne { links, .. }
            | Relationship::ToMany { links, .. } => links,
        }
    }

    /// Returns true unless this is [`Relationship::Unlinked`].
    pub fn is_linked(&self) -> bool {
        !matches!(self, Relationship::Unlinked { .. })
    }

    /// Returns the linked keys; empty for unlinked and null to-one.
    pub fn linked_keys(&self) -> &[ResourceKey] {
        match self {
            Relationship::Unlinked { .. } => &[],
            Relationship::ToOne { linkage, .. } => linkage.as_slice(),
            Relationship::ToMany { linkage, .. } => linkage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_many_keeps_first_occurrence() {
        let rel = Relationship::to_many(
            [
                ResourceKey::new("cities", "12"),
                ResourceKey::new("cities", "11"),
                ResourceKey::new("cities", "12"),
            ],
            RelationshipLinks::default(),
        );
        assert_eq!(
            rel.linked_keys(),
            &[ResourceKey::new("cities", "12"), ResourceKey::new("cities", "11")]
        );
    }

    #[test]
    fn test_linked_keys_by_variant() {
        let links = RelationshipLinks::default();
        assert!(Relationship::unlinked(links.clone()).linked_keys().is_empty());
        assert!(!Relationship::unlinked(links.clone()).is_linked());
        assert!(Relationship::to_one(None, links.clone()).linked_keys().is_empty());
        assert!(Relationship::to_one(None, links.clone()).is_linked());

        let key = ResourceKey::new("continents", "31");
        let rel = Relationship::to_one(Some(key.clone()), links);
        assert_eq!(rel.linked_keys(), std::slice::from_ref(&key));
    }
}
