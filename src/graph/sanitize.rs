//! Graph Sanitation
//!
//! Removes edges the compiler cannot use: edges whose endpoint id names no
//! node, and edges whose schema handle does not resolve in the overlaid
//! schema on that side. The editor keeps such edges around while the user
//! is mid-edit; the compiler heals them away instead of failing.

use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashSet;

use super::Diagnostics;
use crate::document::{Endpoint, MappingDocument, MappingEdge};
use crate::schema::{apply_overlays, handle_exists_in_schema, SchemaSide};

/// Source and target schemas with the document's overlays applied
pub fn overlaid_schemas<'a>(
    document: &'a MappingDocument,
    source: Option<&'a Value>,
    target: Option<&'a Value>,
) -> (Cow<'a, Value>, Cow<'a, Value>) {
    let source = source.unwrap_or(&document.source_schema);
    let target = target.unwrap_or(&document.target_schema);
    (
        apply_overlays(source, &document.schema_overlays, SchemaSide::Source),
        apply_overlays(target, &document.schema_overlays, SchemaSide::Target),
    )
}

/// Sanitize against the document's own schemas.
pub fn sanitize<'a>(
    document: &'a MappingDocument,
    diagnostics: &mut Diagnostics,
) -> Cow<'a, MappingDocument> {
    sanitize_against(document, None, None, diagnostics)
}

/// Sanitize against explicit schemas (falling back to the document's).
///
/// Returns `Cow::Borrowed(document)` when no edge was removed, otherwise a
/// copy with only the edge list replaced. A side whose schema is absent
/// (`null`) skips handle validation.
pub fn sanitize_against<'a>(
    document: &'a MappingDocument,
    source_schema: Option<&Value>,
    target_schema: Option<&Value>,
    diagnostics: &mut Diagnostics,
) -> Cow<'a, MappingDocument> {
    let (source, target) = overlaid_schemas(document, source_schema, target_schema);
    sanitize_overlaid(document, &source, &target, diagnostics)
}

/// Sanitize against schemas that already carry the document's overlays.
pub fn sanitize_overlaid<'a>(
    document: &'a MappingDocument,
    source: &Value,
    target: &Value,
    diagnostics: &mut Diagnostics,
) -> Cow<'a, MappingDocument> {
    let valid_ids: HashSet<&str> = document.nodes.iter().map(|n| n.id.as_str()).collect();

    let kept: Vec<&MappingEdge> = document
        .edges
        .iter()
        .filter(|edge| keep_edge(edge, &valid_ids, source, target, diagnostics))
        .collect();

    if kept.len() == document.edges.len() {
        return Cow::Borrowed(document);
    }

    tracing::debug!(
        removed = document.edges.len() - kept.len(),
        remaining = kept.len(),
        "sanitized mapping document"
    );

    Cow::Owned(MappingDocument {
        nodes: document.nodes.clone(),
        edges: kept.into_iter().cloned().collect(),
        source_schema: document.source_schema.clone(),
        target_schema: document.target_schema.clone(),
        schema_overlays: document.schema_overlays.clone(),
        metadata: document.metadata.clone(),
    })
}

fn keep_edge(
    edge: &MappingEdge,
    valid_ids: &HashSet<&str>,
    source: &Value,
    target: &Value,
    diagnostics: &mut Diagnostics,
) -> bool {
    for endpoint in [&edge.source, &edge.target] {
        if let Endpoint::Node(id) = endpoint {
            if !valid_ids.contains(id.as_str()) {
                diagnostics.orphan_edge(&edge.id, id);
                return false;
            }
        }
    }

    let ends = [
        (&edge.source, edge.source_handle.as_deref()),
        (&edge.target, edge.target_handle.as_deref()),
    ];
    for (endpoint, handle) in ends {
        let (schema, side) = match endpoint {
            Endpoint::SourceSchema => (source, "source"),
            Endpoint::TargetSchema => (target, "target"),
            Endpoint::Node(_) => continue,
        };
        if schema.is_null() {
            continue;
        }
        let handle = handle.unwrap_or_default();
        if !handle_exists_in_schema(handle, schema) {
            diagnostics.unresolved_handle(&edge.id, handle, side);
            return false;
        }
    }

    true
}
