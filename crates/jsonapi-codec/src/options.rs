//! Codec configuration.
//!
//! All option structs are plain data with defaults, so a host can embed them
//! in its own configuration file and deserialize them with serde.

use serde::{Deserialize, Serialize};

use crate::limits::{MAX_LINKAGE_ENTRIES, MAX_RESOURCE_OBJECTS};
use crate::model::RelationshipLinks;

/// Options for writing documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Indent the output.
    ///
    /// Raw JSON attributes stay minified either way.
    pub pretty: bool,
}

impl WriteOptions {
    /// Compact output (the default).
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    /// Indented output.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

/// Options for reading documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Maximum resource objects across `data` and `included`.
    pub max_resources: usize,
    /// Maximum linkage entries in a single to-many relationship.
    pub max_linkage: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            max_resources: MAX_RESOURCE_OBJECTS,
            max_linkage: MAX_LINKAGE_ENTRIES,
        }
    }
}

/// Options for the relationship URLs attached while walking a graph.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkOptions {
    /// Prefix for every generated URL, without a trailing slash
    /// (e.g. `https://api.example.com/v1`). Empty means root-relative.
    pub base_url: String,
}

impl LinkOptions {
    /// Creates link options with the given base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Builds the URLs for relationship `key` of resource `resource_type`/`id`.
    ///
    /// ```text
    /// related:      {base}/{type}/{id}/{key}
    /// relationship: {base}/{type}/{id}/links/{key}
    /// ```
    pub fn relationship_links(&self, resource_type: &str, id: &str, key: &str) -> RelationshipLinks {
        let base = &self.base_url;
        RelationshipLinks {
            related: Some(format!("{base}/{resource_type}/{id}/{key}")),
            relationship: Some(format!("{base}/{resource_type}/{id}/links/{key}")),
        }
    }
}
