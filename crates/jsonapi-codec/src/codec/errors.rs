//! Error payloads.
//!
//! Rejections are answered with a JSON:API error document written through
//! the same serializer as ordinary documents:
//!
//! ```text
//! {"errors":[{"status":"400","code":"missing_primary_data","title":"...","detail":"..."}]}
//! ```

use std::io;

use serde::Serialize;

use crate::codec::write::write_json;
use crate::error::{ErrorCode, InclusionError, ReadError, WriteError};
use crate::options::WriteOptions;

/// One entry of an error document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorObject {
    /// HTTP status as a string.
    pub status: String,
    /// Stable machine-readable code.
    pub code: String,
    /// Summary shared by every error with this code.
    pub title: String,
    /// Description of this occurrence.
    pub detail: String,
}

impl ErrorObject {
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            status: code.status().to_string(),
            code: code.code().to_owned(),
            title: code.title().to_owned(),
            detail: detail.into(),
        }
    }
}

/// A document whose only member is `errors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDocument {
    pub errors: Vec<ErrorObject>,
}

impl From<ErrorObject> for ErrorDocument {
    fn from(error: ErrorObject) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl ReadError {
    pub fn to_error_object(&self) -> ErrorObject {
        ErrorObject::new(self.code(), self.to_string())
    }

    /// Renders this error as a single-entry error document.
    pub fn to_error_document(&self) -> ErrorDocument {
        self.to_error_object().into()
    }
}

impl InclusionError {
    pub fn to_error_object(&self) -> ErrorObject {
        ErrorObject::new(self.code(), self.to_string())
    }
}

/// Writes the error document for `error`.
pub fn write_error<W: io::Write>(
    writer: W,
    error: &ReadError,
    options: &WriteOptions,
) -> Result<(), WriteError> {
    write_json(writer, &error.to_error_document(), options)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::RelationshipPayloadError;

    #[test]
    fn test_error_document_shape() {
        let mut out = Vec::new();
        write_error(&mut out, &ReadError::MissingPrimaryData, &WriteOptions::compact()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            value,
            json!({
                "errors": [{
                    "status": "400",
                    "code": "missing_primary_data",
                    "title": "Missing primary data",
                    "detail": "expected primary data located at the `data` key"
                }]
            })
        );
    }

    #[test]
    fn test_relationship_error_detail_names_key() {
        let error = ReadError::relationship("countries", RelationshipPayloadError::DataAndIds);
        let object = error.to_error_object();
        assert_eq!(object.code, "invalid_relationship_payload");
        assert_eq!(
            object.detail,
            "relationship `countries`: if `data` is specified, then `ids` may not be"
        );
    }

    #[test]
    fn test_inclusion_error_object() {
        let object = InclusionError::InvalidExpression {
            construct: "where".into(),
        }
        .to_error_object();
        assert_eq!(object.code, "invalid_inclusion_expression");
        assert_eq!(object.status, "400");
    }
}
