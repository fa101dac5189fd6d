//! Content checksums for compiled mappings
//!
//! Generators and the preview executor cache on the checksum of the
//! document a mapping was compiled from.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::document::MappingDocument;

/// SHA256 checksum, lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Checksum of a JSON value's compact serialization
    pub fn from_json(value: &serde_json::Value) -> Self {
        let canonical = serde_json::to_vec(value).unwrap_or_default();
        Self::from_bytes(&canonical)
    }

    /// Checksum of a document as the compiler received it
    pub fn of_document(document: &MappingDocument) -> Self {
        let canonical = serde_json::to_vec(document).unwrap_or_default();
        Self::from_bytes(&canonical)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `document` still hashes to this checksum
    pub fn matches(&self, document: &MappingDocument) -> bool {
        *self == Self::of_document(document)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Checksum {
    fn from(s: String) -> Self {
        Self(s)
    }
}
