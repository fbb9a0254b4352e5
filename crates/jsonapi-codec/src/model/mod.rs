//! Wire-agnostic document model.
//!
//! - Resources (id, type, attributes, relationships)
//! - Relationships (unlinked, to-one, to-many)
//! - Compound documents (primary data plus included resources)
//! - Inclusion paths and the expansion matcher

pub mod document;
pub mod path;
pub mod relationship;
pub mod resource;

pub use document::CompoundDocument;
pub use path::{should_expand, InclusionPath, Selector};
pub use relationship::{Relationship, RelationshipLinks};
pub use resource::{AttributeValue, ResourceKey, ResourceObject};
