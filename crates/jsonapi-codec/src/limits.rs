//! Bounds applied while decoding untrusted documents.
//!
//! These are the defaults for [`ReadOptions`](crate::ReadOptions); hosts with
//! larger bulk payloads can raise them per reader.

/// Media type of every document this crate writes.
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

/// Maximum resource objects (primary plus included) in one document.
pub const MAX_RESOURCE_OBJECTS: usize = 100_000;

/// Maximum linkage entries in one to-many relationship.
pub const MAX_LINKAGE_ENTRIES: usize = 10_000;
