//! Mapping Document
//!
//! The graph the visual editor produces: functoid nodes, edges between
//! nodes and the two schema sentinels, the schemas themselves and any
//! overlays. The compiler only ever reads a document.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::error::{MapperError, Result};
use crate::operations::FunctoidKind;
use crate::schema::SchemaOverlay;

/// Wire id of the source-schema sentinel endpoint
pub const SOURCE_SCHEMA_ID: &str = "source-schema";

/// Wire id of the target-schema sentinel endpoint
pub const TARGET_SCHEMA_ID: &str = "target-schema";

/// One end of an edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Endpoint {
    SourceSchema,
    TargetSchema,
    Node(String),
}

impl Endpoint {
    pub fn node(id: impl Into<String>) -> Self {
        Endpoint::Node(id.into())
    }

    pub fn id(&self) -> &str {
        match self {
            Endpoint::SourceSchema => SOURCE_SCHEMA_ID,
            Endpoint::TargetSchema => TARGET_SCHEMA_ID,
            Endpoint::Node(id) => id,
        }
    }

    pub fn as_node(&self) -> Option<&str> {
        match self {
            Endpoint::Node(id) => Some(id),
            _ => None,
        }
    }
}

impl From<String> for Endpoint {
    fn from(id: String) -> Self {
        match id.as_str() {
            SOURCE_SCHEMA_ID => Endpoint::SourceSchema,
            TARGET_SCHEMA_ID => Endpoint::TargetSchema,
            _ => Endpoint::Node(id),
        }
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.id().to_string()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// A transformation node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctoidNode {
    pub id: String,
    pub kind: FunctoidKind,
    /// User-facing label, used for shared-value name hints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Kind-specific settings (template text, constant value, ...)
    #[serde(default)]
    pub config: Value,
}

impl FunctoidNode {
    pub fn new(id: impl Into<String>, kind: FunctoidKind) -> Self {
        Self {
            id: id.into(),
            kind,
            label: None,
            config: Value::Null,
        }
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// String config entry, if present
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }
}

/// A directed connection between two endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEdge {
    #[serde(default)]
    pub id: String,
    pub source: Endpoint,
    /// Schema handle when `source` is the source schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    pub target: Endpoint,
    /// `input-<N>` on functoids, a schema handle on the target schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl MappingEdge {
    pub fn new(id: impl Into<String>, source: Endpoint, target: Endpoint) -> Self {
        Self {
            id: id.into(),
            source,
            source_handle: None,
            target,
            target_handle: None,
        }
    }

    pub fn with_source_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }

    pub fn with_target_handle(mut self, handle: impl Into<String>) -> Self {
        self.target_handle = Some(handle.into());
        self
    }

    /// Position encoded in an `input-<N>` target handle
    pub fn input_index(&self) -> Option<usize> {
        self.target_handle
            .as_deref()?
            .strip_prefix("input-")?
            .parse()
            .ok()
    }
}

/// The complete mapping graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingDocument {
    #[serde(default)]
    pub nodes: Vec<FunctoidNode>,
    #[serde(default)]
    pub edges: Vec<MappingEdge>,
    #[serde(default)]
    pub source_schema: Value,
    #[serde(default)]
    pub target_schema: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema_overlays: Vec<SchemaOverlay>,
    /// Editor metadata, passed through to the compiled output
    #[serde(default)]
    pub metadata: Value,
}

impl MappingDocument {
    /// Parse a document from JSON text
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read a document from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MapperError::DocumentNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content).map_err(|e| {
            MapperError::InvalidDocument(format!("{}: {}", path.display(), e))
        })
    }

    pub fn node(&self, id: &str) -> Option<&FunctoidNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_sentinels() {
        assert_eq!(Endpoint::from("source-schema".to_string()), Endpoint::SourceSchema);
        assert_eq!(Endpoint::from("target-schema".to_string()), Endpoint::TargetSchema);
        assert_eq!(Endpoint::from("n1".to_string()), Endpoint::node("n1"));
        assert_eq!(Endpoint::TargetSchema.as_node(), None);
        assert_eq!(Endpoint::node("n1").as_node(), Some("n1"));
    }

    #[test]
    fn test_input_index() {
        let edge = MappingEdge::new("e", Endpoint::SourceSchema, Endpoint::node("n"));
        assert_eq!(edge.input_index(), None);
        assert_eq!(edge.clone().with_target_handle("input-3").input_index(), Some(3));
        assert_eq!(edge.clone().with_target_handle("input-x").input_index(), None);
        assert_eq!(edge.with_target_handle("value").input_index(), None);
    }

    #[test]
    fn test_parse_document() {
        let doc = MappingDocument::from_json_str(
            &json!({
                "nodes": [{ "id": "n1", "kind": "add", "label": "Total" }],
                "edges": [{
                    "id": "e1",
                    "source": "source-schema",
                    "sourceHandle": "$.a",
                    "target": "n1",
                    "targetHandle": "input-0"
                }],
                "sourceSchema": { "type": "object" },
                "schemaOverlays": [{ "side": "target", "path": "$", "patch": {} }]
            })
            .to_string(),
        )
        .unwrap();

        assert_eq!(doc.nodes[0].kind, FunctoidKind::Add);
        assert_eq!(doc.edges[0].source, Endpoint::SourceSchema);
        assert_eq!(doc.edges[0].target, Endpoint::node("n1"));
        assert!(doc.target_schema.is_null());
        assert_eq!(doc.schema_overlays.len(), 1);
        assert!(doc.node("n1").is_some());
    }

    #[test]
    fn test_load_missing_file() {
        let err = MappingDocument::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, MapperError::DocumentNotFound(_)));
    }
}
