//! Schema-side helpers: handle grammar, path resolution and overlays.

pub mod handle;
pub mod overlay;
pub mod resolver;

pub use handle::{clean_path, is_array_path, is_branch_label, parse_handle, HandleSegment};
pub use overlay::{apply_overlays, merge_patch, SchemaOverlay, SchemaSide};
pub use resolver::{handle_exists_in_schema, locate, resolve_segments};
