//! JSON:API codec: object graphs to compound documents and back.
//!
//! This crate converts in-memory domain objects into JSON:API documents and
//! parses JSON:API documents into resource objects, validating the wire
//! format with precise rejection reasons.
//!
//! # Overview
//!
//! - A [`TypeRegistry`] describes each resource type once: wire type name,
//!   id accessor and ordered field descriptors.
//! - The [walker](walk) follows caller-declared inclusion paths through the
//!   graph, converting every reachable resource at most once, and collects
//!   expanded related resources into the `included` section.
//! - The [codec] writes documents with serde and reads them back through a
//!   registry-aware streaming state machine.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::{Arc, OnceLock, Weak};
//! use jsonapi_codec::{codec, DocumentBuilder, ReadOptions, TypeRegistry, WriteOptions};
//!
//! struct Continent { id: u32, name: String, countries: OnceLock<Vec<Arc<Country>>> }
//! struct Country { id: u32, name: String, continent: OnceLock<Weak<Continent>> }
//!
//! let registry = TypeRegistry::builder()
//!     .register::<Continent>("continents", |c| c.id.to_string(), |f| f
//!         .attribute("name", |c| c.name.clone())
//!         .to_many("countries", |c| c.countries.get().cloned().unwrap_or_default())
//!     )
//!     .register::<Country>("countries", |c| c.id.to_string(), |f| f
//!         .attribute("name", |c| c.name.clone())
//!         .to_one("continent", |c| c.continent.get().and_then(Weak::upgrade))
//!     )
//!     .build()
//!     .unwrap();
//!
//! let america = Arc::new(Continent {
//!     id: 31,
//!     name: "North America".into(),
//!     countries: OnceLock::new(),
//! });
//! let usa = Arc::new(Country {
//!     id: 21,
//!     name: "USA".into(),
//!     continent: OnceLock::new(),
//! });
//! usa.continent.set(Arc::downgrade(&america)).unwrap();
//! america.countries.set(vec![usa]).ok();
//!
//! let document = DocumentBuilder::new(&registry)
//!     .include_path("countries")
//!     .unwrap()
//!     .single(Some(america))
//!     .unwrap();
//! assert_eq!(document.included().len(), 1);
//!
//! let bytes = codec::to_vec(&document, &WriteOptions::compact()).unwrap();
//! let decoded = codec::from_slice(&bytes, &registry, &ReadOptions::default()).unwrap();
//! assert_eq!(decoded.primary()[0].id, "31");
//! assert_eq!(decoded.included()[0].id, "21");
//! ```
//!
//! # Modules
//!
//! - [`registry`]: Type registry and field descriptors
//! - [`model`]: Resource objects, relationships, documents, inclusion paths
//! - [`walk`]: Graph walker / aggregator
//! - [`codec`]: Wire encoding and decoding, error payloads
//! - [`error`]: Error types
//! - [`limits`]: Bounds for decoding untrusted input
//!
//! # Security
//!
//! The reader is designed for untrusted input:
//! - Resource and linkage counts are bounded by [`ReadOptions`]
//! - Every rejection is a [`ReadError`] with a stable [`ErrorCode`], never a panic
//! - Walks terminate on cyclic graphs: each (type, id) is converted once

pub mod codec;
pub mod error;
pub mod limits;
pub mod model;
pub mod options;
pub mod registry;
pub mod walk;

pub use codec::{read_document, write_document, write_error, ErrorDocument, ErrorObject};
pub use error::{
    BuildError, ErrorCode, InclusionError, ReadError, RegistryError, RelationshipPayloadError,
    WriteError,
};
pub use limits::MEDIA_TYPE;
pub use model::{
    should_expand, AttributeValue, CompoundDocument, InclusionPath, Relationship,
    RelationshipLinks, ResourceKey, ResourceObject, Selector,
};
pub use options::{LinkOptions, ReadOptions, WriteOptions};
pub use registry::{
    AttributeEncoding, EntityRef, FieldDescriptor, FieldKind, FieldValue, RelatedType,
    TypeRegistration, TypeRegistry,
};
pub use walk::{build_document, DocumentBuilder};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
