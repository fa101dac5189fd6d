//! Mapping Compiler
//!
//! ```text
//! MappingDocument
//!   -> sanitize   (drop orphan edges and unresolvable handles)
//!   -> build      (Kahn worklist, one BuiltExpr per node)
//!   -> analyze    (ref counts, purity, cost, array scope)
//!   -> rewrite    (name shared values, inline the rest)
//!   -> collect    (drop unreferenced shared values)
//!   -> CompiledMapping
//! ```
//!
//! Compilation never fails. Anything the compiler had to degrade is
//! reported in [`Compilation::diagnostics`] and, for nodes that could not
//! be built, [`Compilation::unbuilt`].

pub mod analysis;
pub mod builder;
pub mod constant;
pub mod rewrite;

pub use analysis::{Shareability, SharedNode};
pub use builder::{BuildOutput, UnbuiltNode, UnbuiltReason};
pub use rewrite::Rewriter;

use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;
use crate::document::MappingDocument;
use crate::graph::{overlaid_schemas, sanitize_overlaid, Diagnostics, FunctoidGraph};
use crate::ir::{CompiledMapping, MappingSchemas};
use crate::operations::OperationRegistry;

/// Tunables for shared-value hoisting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Hoist shared values at all
    pub hoist_shared: bool,
    /// Cheapest expression worth hoisting
    pub min_hoist_cost: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            hoist_shared: true,
            min_hoist_cost: 2,
        }
    }
}

/// Result of one compilation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Compilation {
    pub output: CompiledMapping,
    /// Nodes that could not be built; references to them compiled to `null`
    pub unbuilt: Vec<UnbuiltNode>,
    pub diagnostics: Diagnostics,
}

/// Stateless compiler over an explicit operation registry
#[derive(Debug, Clone)]
pub struct Compiler {
    registry: OperationRegistry,
    options: CompilerOptions,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(OperationRegistry::standard(), CompilerOptions::default())
    }
}

impl Compiler {
    pub fn new(registry: OperationRegistry, options: CompilerOptions) -> Self {
        Self { registry, options }
    }

    pub fn with_options(options: CompilerOptions) -> Self {
        Self::new(OperationRegistry::standard(), options)
    }

    /// Compile a document into the mapping IR.
    pub fn compile(&self, document: &MappingDocument) -> Compilation {
        let mut diagnostics = Diagnostics::new();

        let (source, target) = overlaid_schemas(document, None, None);
        let cleaned = sanitize_overlaid(document, &source, &target, &mut diagnostics);
        let graph = FunctoidGraph::new(&cleaned);

        let built = builder::build(&graph, &self.registry, &mut diagnostics);
        let shareability = analysis::analyze(&graph, &built, &self.registry, &self.options);
        let (mappings, shared_expressions) =
            rewrite::assemble(&graph, &built, &shareability, &self.registry, &mut diagnostics);

        let output = CompiledMapping {
            mappings,
            shared_expressions,
            schemas: MappingSchemas {
                source: source.into_owned(),
                target: target.into_owned(),
            },
            metadata: document.metadata.clone(),
            checksum: Checksum::of_document(document),
        };

        tracing::debug!(
            nodes = document.nodes.len(),
            mappings = output.mappings.len(),
            shared = output.shared_expressions.len(),
            unbuilt = built.unbuilt.len(),
            diagnostics = diagnostics.len(),
            "compiled mapping document"
        );

        Compilation {
            output,
            unbuilt: built.unbuilt,
            diagnostics,
        }
    }
}

/// Compile with the standard operation set and default options.
pub fn compile(document: &MappingDocument) -> CompiledMapping {
    Compiler::default().compile(document).output
}
