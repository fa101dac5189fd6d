//! Schema Overlays
//!
//! The editor lets users patch a schema at a specific handle (add a field
//! to an open object, narrow a union, ...) without touching the schema file.
//! Overlays are applied with JSON merge-patch semantics (RFC 7386) to the
//! subschema the handle addresses, in document order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

use super::handle::parse_handle;
use super::resolver::locate;

/// Which schema of the document an overlay patches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaSide {
    Source,
    Target,
}

/// A patch applied to one schema at a handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaOverlay {
    pub side: SchemaSide,
    /// Handle of the patched subschema (`$` for the root)
    pub path: String,
    pub patch: Value,
}

/// Apply every overlay for `side` to `schema`.
///
/// Borrows the input untouched when no overlay targets this side. Overlays
/// whose path does not resolve are skipped with a warning.
pub fn apply_overlays<'a>(
    schema: &'a Value,
    overlays: &[SchemaOverlay],
    side: SchemaSide,
) -> Cow<'a, Value> {
    let mut relevant = overlays.iter().filter(|o| o.side == side).peekable();
    if relevant.peek().is_none() || schema.is_null() {
        return Cow::Borrowed(schema);
    }

    let mut patched = schema.clone();
    for overlay in relevant {
        let pointer = parse_handle(&overlay.path)
            .and_then(|segments| locate(&segments, &patched).map(|(pointer, _)| pointer));

        match pointer.and_then(|p| patched.pointer_mut(&p)) {
            Some(target) => merge_patch(target, &overlay.patch),
            None => {
                tracing::warn!(
                    path = %overlay.path,
                    side = ?overlay.side,
                    "schema overlay path does not resolve, skipping"
                );
            }
        }
    }

    Cow::Owned(patched)
}

/// RFC 7386 merge patch
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(entries) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(object) = target {
        for (key, value) in entries {
            if value.is_null() {
                object.remove(key);
            } else {
                merge_patch(object.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}
