//! JSON:API wire encoding and decoding.
//!
//! Documents are written through serde (`Serialize` impls on the model types
//! streamed into a `serde_json::Serializer`) and read through a registry-aware
//! `DeserializeSeed` state machine that rejects malformed input with a
//! [`ReadError`](crate::ReadError).

pub mod errors;
pub mod read;
pub mod write;

pub use errors::{write_error, ErrorDocument, ErrorObject};
pub use read::{from_slice, from_str, read_document};
pub use write::{to_string, to_value, to_vec, write_document};

/// Member names used on the wire.
pub(crate) mod keys {
    pub const DATA: &str = "data";
    pub const INCLUDED: &str = "included";
    pub const META: &str = "meta";
    pub const LINKS: &str = "links";
    pub const ID: &str = "id";
    pub const TYPE: &str = "type";
    pub const IDS: &str = "ids";
    pub const SELF: &str = "self";
    pub const RESOURCE: &str = "resource";
}
