//! Schema Path Resolution
//!
//! Checks whether a handle addresses a declared property of a JSON Schema.
//! Union schemas (`oneOf`/`anyOf`/`allOf`) are searched branch by branch and
//! local `$ref` pointers are followed against the root schema.

use std::collections::HashSet;

use serde_json::Value;

use super::handle::{parse_handle, HandleSegment};

/// Composition keywords whose branches are searched for properties
const BRANCH_KEYWORDS: [&str; 3] = ["oneOf", "anyOf", "allOf"];

/// Guard against `$ref` cycles
const MAX_REF_DEPTH: usize = 32;

/// True when every segment of `handle` resolves inside `schema`.
///
/// Empty or malformed handles and a `null` schema never resolve.
pub fn handle_exists_in_schema(handle: &str, schema: &Value) -> bool {
    if schema.is_null() {
        return false;
    }
    let Some(segments) = parse_handle(handle) else {
        return false;
    };
    resolve_segments(&segments, schema).is_some()
}

/// Walk `segments` from the root and return the addressed subschema.
pub fn resolve_segments<'a>(segments: &[HandleSegment], root: &'a Value) -> Option<&'a Value> {
    locate(segments, root).map(|(_, schema)| schema)
}

/// Walk `segments` from the root, returning the JSON pointer of the
/// addressed subschema alongside it.
///
/// When a `$ref` is followed the pointer jumps to the referenced
/// definition, so patches at that pointer affect every user of it.
pub fn locate<'a>(segments: &[HandleSegment], root: &'a Value) -> Option<(String, &'a Value)> {
    let (mut pointer, mut current) = deref(String::new(), root, root)?;

    for segment in segments {
        let mut visited = HashSet::from([pointer.clone()]);
        let (prop_pointer, property) =
            find_property(&pointer, current, &segment.name, root, &mut visited)?;
        (pointer, current) = deref(prop_pointer, property, root)?;

        if segment.array {
            if let Some(items) = current.get("items") {
                (pointer, current) = deref(format!("{}/items", pointer), items, root)?;
            }
        }
    }

    Some((pointer, current))
}

/// Look `name` up in direct properties, then in each union branch.
///
/// `visited` holds the pointers of schemas already searched for this
/// segment; a branch that leads back to one of them is skipped.
fn find_property<'a>(
    pointer: &str,
    schema: &'a Value,
    name: &str,
    root: &'a Value,
    visited: &mut HashSet<String>,
) -> Option<(String, &'a Value)> {
    if let Some(prop) = schema.get("properties").and_then(|p| p.get(name)) {
        return Some((format!("{}/properties/{}", pointer, escape_token(name)), prop));
    }

    for keyword in BRANCH_KEYWORDS {
        let Some(branches) = schema.get(keyword).and_then(Value::as_array) else {
            continue;
        };
        for (i, branch) in branches.iter().enumerate() {
            let Some((branch_pointer, branch)) =
                deref(format!("{}/{}/{}", pointer, keyword, i), branch, root)
            else {
                continue;
            };
            if !visited.insert(branch_pointer.clone()) {
                continue;
            }
            if let Some(found) = find_property(&branch_pointer, branch, name, root, visited) {
                return Some(found);
            }
        }
    }

    None
}

/// Follow local `$ref` pointers until a concrete schema is reached.
fn deref<'a>(pointer: String, schema: &'a Value, root: &'a Value) -> Option<(String, &'a Value)> {
    let mut pointer = pointer;
    let mut current = schema;
    for _ in 0..MAX_REF_DEPTH {
        let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
            return Some((pointer, current));
        };
        // Only document-local refs can be followed without I/O
        let target = reference.strip_prefix('#')?;
        current = root.pointer(target)?;
        pointer = target.to_string();
    }
    None
}

fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}
