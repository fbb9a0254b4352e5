//! Error types for document building, reading and writing.

use std::any::TypeId;
use std::fmt;
use std::io;

use thiserror::Error;

/// Rejection categories reported to clients.
///
/// Every read failure maps onto exactly one code; the code is what ends up in
/// the `code` member of the rendered error object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Root is not an object, or the token stream is not the shape required.
    MalformedDocument,
    /// No `data` member at the top level.
    MissingPrimaryData,
    /// Resource object missing `id`/`type`, or either has the wrong type.
    InvalidResourceObject,
    /// `type` names nothing in the registry.
    UnknownResourceType,
    /// Relationship payload breaks the `ids`/`type` vs `data` rules.
    InvalidRelationshipPayload,
    /// A top-level member other than `data`, `included`, `meta`, `links`.
    UnknownTopLevelKey,
    /// `meta` is present but not an object.
    InvalidMetadata,
    /// Caller-declared inclusion selector has an unsupported shape.
    InvalidInclusionExpression,
    /// The input stream failed before the document was complete.
    InputUnavailable,
}

impl ErrorCode {
    /// Returns the stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::MalformedDocument => "malformed_document",
            ErrorCode::MissingPrimaryData => "missing_primary_data",
            ErrorCode::InvalidResourceObject => "invalid_resource_object",
            ErrorCode::UnknownResourceType => "unknown_resource_type",
            ErrorCode::InvalidRelationshipPayload => "invalid_relationship_payload",
            ErrorCode::UnknownTopLevelKey => "unknown_top_level_key",
            ErrorCode::InvalidMetadata => "invalid_metadata",
            ErrorCode::InvalidInclusionExpression => "invalid_inclusion_expression",
            ErrorCode::InputUnavailable => "input_unavailable",
        }
    }

    /// Returns a short human-readable summary.
    pub fn title(&self) -> &'static str {
        match self {
            ErrorCode::MalformedDocument => "Malformed document",
            ErrorCode::MissingPrimaryData => "Missing primary data",
            ErrorCode::InvalidResourceObject => "Invalid resource object",
            ErrorCode::UnknownResourceType => "Unknown resource type",
            ErrorCode::InvalidRelationshipPayload => "Invalid relationship payload",
            ErrorCode::UnknownTopLevelKey => "Unknown top-level key",
            ErrorCode::InvalidMetadata => "Invalid metadata",
            ErrorCode::InvalidInclusionExpression => "Invalid inclusion expression",
            ErrorCode::InputUnavailable => "Input unavailable",
        }
    }

    /// HTTP status for this rejection. Everything but a failed input stream
    /// is a client error.
    pub fn status(&self) -> u16 {
        match self {
            ErrorCode::InputUnavailable => 500,
            _ => 400,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The specific way a relationship payload is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationshipPayloadError {
    /// Both `data` and `ids` were given.
    DataAndIds,
    /// Both `data` and `type` were given.
    DataAndType,
    /// Neither `ids` nor `data` was given.
    MissingLinkage,
    /// `ids` was given without `type`.
    IdsWithoutType,
    /// `type` was given without `ids`.
    TypeWithoutIds,
    /// The relationship value is not an object (or null, for to-one).
    NotAnObject,
    /// `ids` is not an array of non-empty strings.
    IdsNotStrings,
    /// `type` is not a string.
    TypeNotString,
    /// `data` is not an array.
    DataNotArray,
    /// An element of `data` lacks a non-empty string `field`.
    InvalidDataElement { field: &'static str },
    /// A to-one value lacks a non-empty string `field`.
    InvalidToOne { field: &'static str },
    /// A link URL member is not a string.
    UrlNotString { member: &'static str },
    /// A member the relationship object does not allow.
    UnexpectedKey { key: String },
    /// The resource type declares no relationship under this key.
    UnknownRelationship,
}

impl fmt::Display for RelationshipPayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationshipPayloadError::DataAndIds => {
                f.write_str("if `data` is specified, then `ids` may not be")
            }
            RelationshipPayloadError::DataAndType => {
                f.write_str("if `data` is specified, then `type` may not be")
            }
            RelationshipPayloadError::MissingLinkage => {
                f.write_str("either `data` or `ids` must be specified")
            }
            RelationshipPayloadError::IdsWithoutType => {
                f.write_str("if `ids` is specified, then `type` must also be specified")
            }
            RelationshipPayloadError::TypeWithoutIds => {
                f.write_str("if `type` is specified, then `ids` must also be specified")
            }
            RelationshipPayloadError::NotAnObject => {
                f.write_str("the relationship value must be an object")
            }
            RelationshipPayloadError::IdsNotStrings => {
                f.write_str("`ids` must be an array of non-empty strings")
            }
            RelationshipPayloadError::TypeNotString => f.write_str("`type` must be a string"),
            RelationshipPayloadError::DataNotArray => f.write_str("`data` must be an array"),
            RelationshipPayloadError::InvalidDataElement { field } => write!(
                f,
                "each element of `data` must be an object with a non-empty string `{field}`"
            ),
            RelationshipPayloadError::InvalidToOne { field } => write!(
                f,
                "a to-one relationship must be null or carry a non-empty string `{field}`"
            ),
            RelationshipPayloadError::UrlNotString { member } => {
                write!(f, "`{member}` must be a string")
            }
            RelationshipPayloadError::UnexpectedKey { key } => {
                write!(f, "unexpected member `{key}`")
            }
            RelationshipPayloadError::UnknownRelationship => {
                f.write_str("no relationship is declared under this key")
            }
        }
    }
}

/// Error while reading a document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReadError {
    // === InputUnavailable ===
    #[error("failed to read input: {message}")]
    Io { kind: io::ErrorKind, message: String },

    // === MalformedDocument ===
    #[error("document root is {found}, expected an object")]
    RootNotObject { found: &'static str },

    #[error("malformed JSON at line {line}, column {column}: {message}")]
    MalformedJson {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("the `data` member is {found}, expected a resource object, an array or null")]
    InvalidPrimaryData { found: &'static str },

    #[error("the `included` member is {found}, expected an array")]
    IncludedNotArray { found: &'static str },

    #[error("the top-level `links` member must be an object")]
    LinksNotObject,

    #[error("the top-level member `{key}` appears more than once")]
    DuplicateKey { key: String },

    #[error("{field} count exceeds maximum {max}")]
    LimitExceeded { field: &'static str, max: usize },

    // === MissingPrimaryData ===
    #[error("expected primary data located at the `data` key")]
    MissingPrimaryData,

    // === InvalidResourceObject ===
    #[error("expected a resource object, found {found}")]
    ResourceNotObject { found: &'static str },

    #[error("the resource object does not have the required property `{field}`")]
    MissingResourceField { field: &'static str },

    #[error("the property `{field}` must have a non-empty string value")]
    InvalidResourceField { field: &'static str },

    #[error("the resource object member `{member}` appears more than once")]
    DuplicateResourceMember { member: String },

    #[error("attribute `{key}` of `{resource_type}` is invalid: {reason}")]
    InvalidAttribute {
        resource_type: String,
        key: String,
        reason: String,
    },

    #[error("`{key}` is a relationship of `{resource_type}` and must appear under `links`")]
    RelationshipAsAttribute { resource_type: String, key: String },

    #[error("resource `{resource_type}` `{id}` appears more than once in the document")]
    DuplicateResource { resource_type: String, id: String },

    // === UnknownResourceType ===
    #[error("the type `{type_name}` is not registered")]
    UnknownResourceType { type_name: String },

    // === InvalidRelationshipPayload ===
    #[error("the `links` member of a resource object must be an object")]
    RelationshipsNotObject,

    #[error("relationship `{key}`: {kind}")]
    InvalidRelationship {
        key: String,
        kind: RelationshipPayloadError,
    },

    // === UnknownTopLevelKey ===
    #[error("the key `{key}` is not valid in the top-level context")]
    UnknownTopLevelKey { key: String },

    // === InvalidMetadata ===
    #[error("the `meta` member must be an object")]
    MetaNotObject,
}

impl ReadError {
    /// Returns the taxonomy code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ReadError::RootNotObject { .. }
            | ReadError::MalformedJson { .. }
            | ReadError::InvalidPrimaryData { .. }
            | ReadError::IncludedNotArray { .. }
            | ReadError::LinksNotObject
            | ReadError::DuplicateKey { .. }
            | ReadError::LimitExceeded { .. } => ErrorCode::MalformedDocument,
            ReadError::Io { .. } => ErrorCode::InputUnavailable,
            ReadError::MissingPrimaryData => ErrorCode::MissingPrimaryData,
            ReadError::ResourceNotObject { .. }
            | ReadError::MissingResourceField { .. }
            | ReadError::InvalidResourceField { .. }
            | ReadError::DuplicateResourceMember { .. }
            | ReadError::InvalidAttribute { .. }
            | ReadError::RelationshipAsAttribute { .. }
            | ReadError::DuplicateResource { .. } => ErrorCode::InvalidResourceObject,
            ReadError::UnknownResourceType { .. } => ErrorCode::UnknownResourceType,
            ReadError::RelationshipsNotObject | ReadError::InvalidRelationship { .. } => {
                ErrorCode::InvalidRelationshipPayload
            }
            ReadError::UnknownTopLevelKey { .. } => ErrorCode::UnknownTopLevelKey,
            ReadError::MetaNotObject => ErrorCode::InvalidMetadata,
        }
    }

    /// HTTP status to answer with.
    pub fn status(&self) -> u16 {
        self.code().status()
    }

    pub(crate) fn relationship(key: &str, kind: RelationshipPayloadError) -> Self {
        ReadError::InvalidRelationship {
            key: key.to_owned(),
            kind,
        }
    }
}

impl From<&serde_json::Error> for ReadError {
    fn from(err: &serde_json::Error) -> Self {
        ReadError::MalformedJson {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}

impl From<io::Error> for ReadError {
    fn from(err: io::Error) -> Self {
        ReadError::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<RegistryError> for ReadError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownResourceType { type_name } => {
                ReadError::UnknownResourceType { type_name }
            }
            other => ReadError::UnknownResourceType {
                type_name: other.to_string(),
            },
        }
    }
}

/// Error while converting a caller-declared inclusion selector or path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InclusionError {
    #[error("invalid inclusion expression: `{construct}` is not a field access or a select")]
    InvalidExpression { construct: String },

    #[error("inclusion expression does not select any field")]
    Empty,

    #[error("inclusion path `{path}` contains an empty segment")]
    EmptySegment { path: String },
}

impl InclusionError {
    /// Returns the taxonomy code for this error.
    pub fn code(&self) -> ErrorCode {
        ErrorCode::InvalidInclusionExpression
    }
}

/// Error while building or querying a [`TypeRegistry`](crate::TypeRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("the type `{type_name}` is not registered")]
    UnknownResourceType { type_name: String },

    #[error("wire type name must not be empty (registering `{rust_type}`)")]
    EmptyWireName { rust_type: &'static str },

    #[error("wire type name `{wire_name}` is registered twice")]
    DuplicateWireName { wire_name: String },

    #[error("Rust type `{rust_type}` is registered twice")]
    DuplicateType { rust_type: &'static str },

    #[error("`{resource_type}` declares the key `{key}` more than once")]
    DuplicateField { resource_type: String, key: String },

    #[error("`{resource_type}` uses the reserved key `{key}`")]
    ReservedKey { resource_type: String, key: String },

    #[error("relationship `{field}` of `{resource_type}` points at unregistered type `{related}`")]
    UnregisteredRelatedType {
        resource_type: String,
        field: String,
        related: &'static str,
    },
}

/// Error while walking an object graph into a document.
///
/// These indicate a mismatch between the registry and the objects handed to
/// the walker, not bad client input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("object of type {type_id:?} is not registered")]
    UnregisteredType { type_id: TypeId },

    #[error("resource of type `{resource_type}` has an empty id")]
    EmptyId { resource_type: String },

    #[error("field `{field}` of `{resource_type}` could not be serialized: {message}")]
    Attribute {
        resource_type: String,
        field: String,
        message: String,
    },

    #[error("accessor for `{field}` of `{resource_type}` was handed an object of another type")]
    AccessorMismatch { resource_type: String, field: String },
}

/// Error while writing a document.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_codes() {
        assert_eq!(
            ReadError::RootNotObject { found: "an array" }.code(),
            ErrorCode::MalformedDocument
        );
        assert_eq!(ReadError::MissingPrimaryData.code(), ErrorCode::MissingPrimaryData);
        assert_eq!(
            ReadError::MissingResourceField { field: "id" }.code(),
            ErrorCode::InvalidResourceObject
        );
        assert_eq!(
            ReadError::relationship("tags", RelationshipPayloadError::DataAndIds).code(),
            ErrorCode::InvalidRelationshipPayload
        );
        assert_eq!(ReadError::MetaNotObject.code(), ErrorCode::InvalidMetadata);
        assert_eq!(
            ReadError::UnknownTopLevelKey { key: "x".into() }.status(),
            400
        );
        assert_eq!(ErrorCode::InputUnavailable.status(), 500);
    }

    #[test]
    fn test_mutual_exclusion_messages_are_distinct() {
        let kinds = [
            RelationshipPayloadError::DataAndIds,
            RelationshipPayloadError::DataAndType,
            RelationshipPayloadError::MissingLinkage,
            RelationshipPayloadError::IdsWithoutType,
            RelationshipPayloadError::TypeWithoutIds,
        ];
        let messages: Vec<String> = kinds.iter().map(ToString::to_string).collect();
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_registry_error_converts_to_unknown_type() {
        let err: ReadError = RegistryError::UnknownResourceType {
            type_name: "planets".into(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::UnknownResourceType);
        assert_eq!(err.to_string(), "the type `planets` is not registered");
    }
}
