//! Schema Mapper
//!
//! Compiles a visually authored mapping graph (source fields → functoid
//! nodes → target fields) into a portable, expression-based IR that code
//! generators and the preview executor render.
//!
//! ## Features
//!
//! - **Self-healing input**: Orphan edges and handles missing from the
//!   (overlaid) schemas are dropped with a diagnostic instead of failing
//! - **Dependency ordering**: Nodes are built with a Kahn worklist; cycles
//!   and missing inputs are reported, never fatal
//! - **Shared values**: Pure, non-trivial results used more than once are
//!   hoisted into named shared expressions, except in array context
//! - **Dead-code elimination**: Shared values no mapping reaches are dropped
//!
//! ## Pipeline
//!
//! ```text
//! MappingDocument ──sanitize──▶ FunctoidGraph ──build──▶ BuiltExpr per node
//!                                                      │
//!            CompiledMapping ◀──collect── rewrite ◀──analyze
//! ```

pub mod checksum;
pub mod compiler;
pub mod config;
pub mod document;
pub mod error;
pub mod graph;
pub mod ir;
pub mod operations;
pub mod schema;
pub mod template;

pub use checksum::Checksum;
pub use compiler::{compile, Compilation, Compiler, CompilerOptions, UnbuiltNode, UnbuiltReason};
pub use config::{MapperConfig, OutputFormat};
pub use document::{Endpoint, FunctoidNode, MappingDocument, MappingEdge};
pub use error::{MapperError, Result};
pub use graph::{DiagnosticCode, DiagnosticItem, Diagnostics, Severity};
pub use ir::{CompiledMapping, Expression, FieldMapping, SharedExpression};
pub use operations::{FunctoidKind, OperationRegistry};
pub use schema::handle_exists_in_schema;
