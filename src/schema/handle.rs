//! Handle Grammar
//!
//! A handle names a field location on a schema-backed endpoint:
//!
//! ```text
//! $.order.lines[].price
//! $.payment.[kind=card] Card payment.number
//! ```
//!
//! - `$` is the root marker
//! - `.` separates segments
//! - a trailing `[]` marks an array segment (descend into `items`)
//! - `[key=value] free text` segments are discriminated-branch labels the
//!   editor inserts for grouping; they are not schema path components
//!
//! Dots inside the `[key=value]` brackets do not separate segments. The free
//! text after the brackets ends at the next dot, so it must not contain one.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Root marker every schema handle starts with
pub const ROOT_MARKER: &str = "$";

/// Suffix marking an array segment
pub const ARRAY_SUFFIX: &str = "[]";

static BRANCH_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[^\[\]=]+=[^\[\]]*\]").expect("valid branch label regex"));

/// One real path component of a handle
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandleSegment {
    /// Property name with any array suffix stripped
    pub name: String,
    /// Whether the segment carried the `[]` suffix
    pub array: bool,
}

impl HandleSegment {
    fn parse(raw: &str) -> Self {
        match raw.strip_suffix(ARRAY_SUFFIX) {
            Some(name) => Self { name: name.to_string(), array: true },
            None => Self { name: raw.to_string(), array: false },
        }
    }
}

impl fmt::Display for HandleSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.array {
            write!(f, "{}{}", self.name, ARRAY_SUFFIX)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// True for `[key=value] label` segments.
pub fn is_branch_label(segment: &str) -> bool {
    BRANCH_LABEL.is_match(segment)
}

/// Parse a handle into its real path segments.
///
/// Returns `None` for handles without the root marker or with empty
/// segments. The bare root (`$`) parses to an empty path.
pub fn parse_handle(handle: &str) -> Option<Vec<HandleSegment>> {
    let rest = handle.trim().strip_prefix(ROOT_MARKER)?;
    if rest.is_empty() {
        return Some(Vec::new());
    }
    let rest = rest.strip_prefix('.')?;

    let mut segments = Vec::new();
    for raw in split_segments(rest) {
        if is_branch_label(raw) {
            continue;
        }
        let segment = HandleSegment::parse(raw);
        if segment.name.is_empty() {
            return None;
        }
        segments.push(segment);
    }
    Some(segments)
}

/// Cleaned field path for the IR: root marker and branch labels removed,
/// array suffixes kept.
pub fn clean_path(handle: &str) -> String {
    let trimmed = handle.trim();
    let rest = trimmed
        .strip_prefix(ROOT_MARKER)
        .map(|r| r.strip_prefix('.').unwrap_or(r))
        .unwrap_or(trimmed);

    split_segments(rest)
        .into_iter()
        .filter(|segment| !segment.is_empty() && !is_branch_label(segment))
        .collect::<Vec<_>>()
        .join(".")
}

/// Split on `.` outside of `[...]`.
fn split_segments(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in path.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => {
                segments.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&path[start..]);
    segments
}

/// True when a path addresses a per-item (array element) position.
pub fn is_array_path(path: &str) -> bool {
    path.contains(ARRAY_SUFFIX)
}
