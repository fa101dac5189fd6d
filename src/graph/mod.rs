//! Functoid Graph
//!
//! A read-only petgraph index over a [`MappingDocument`]. Functoid nodes
//! become graph nodes; every edge between two existing functoids becomes a
//! graph edge weighted with its position in the document's edge list.
//! Edges touching a schema sentinel or an unknown node id are kept in the
//! per-node `incoming`/`outgoing` tables only.
//!
//! Shared by the builder (Kahn worklist, SCC classification) and the
//! shareability analysis (ref counts, array-context reachability).

pub mod diagnostics;
pub mod sanitize;

pub use diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics, Severity};
pub use sanitize::{overlaid_schemas, sanitize, sanitize_against, sanitize_overlaid};

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::document::{Endpoint, FunctoidNode, MappingDocument, MappingEdge};

/// Index over the functoids and edges of one document
pub struct FunctoidGraph<'a> {
    /// Node weight: the functoid. Edge weight: index into `document.edges`.
    pub(crate) graph: DiGraph<&'a FunctoidNode, usize>,

    /// Node index lookup: functoid id -> NodeIndex
    pub(crate) node_indices: HashMap<&'a str, NodeIndex>,

    /// Every edge ending at a functoid, in document order
    pub(crate) incoming: HashMap<&'a str, Vec<&'a MappingEdge>>,

    /// Every edge leaving a functoid, in document order
    pub(crate) outgoing: HashMap<&'a str, Vec<&'a MappingEdge>>,

    /// Edges ending at the target-schema sentinel, in document order
    pub(crate) target_edges: Vec<&'a MappingEdge>,
}

impl<'a> FunctoidGraph<'a> {
    pub fn new(document: &'a MappingDocument) -> Self {
        let mut graph = DiGraph::with_capacity(document.nodes.len(), document.edges.len());
        let mut node_indices = HashMap::with_capacity(document.nodes.len());

        for node in &document.nodes {
            if node_indices.contains_key(node.id.as_str()) {
                tracing::warn!(node = %node.id, "duplicate functoid id, keeping the first");
                continue;
            }
            let idx = graph.add_node(node);
            node_indices.insert(node.id.as_str(), idx);
        }

        let mut incoming: HashMap<&str, Vec<&MappingEdge>> = HashMap::new();
        let mut outgoing: HashMap<&str, Vec<&MappingEdge>> = HashMap::new();
        let mut target_edges = Vec::new();

        for (position, edge) in document.edges.iter().enumerate() {
            if let Some(id) = edge.target.as_node() {
                incoming.entry(id).or_default().push(edge);
            }
            if let Some(id) = edge.source.as_node() {
                outgoing.entry(id).or_default().push(edge);
            }
            if edge.target == Endpoint::TargetSchema {
                target_edges.push(edge);
            }

            let from = edge.source.as_node().and_then(|id| node_indices.get(id));
            let to = edge.target.as_node().and_then(|id| node_indices.get(id));
            if let (Some(&from), Some(&to)) = (from, to) {
                graph.add_edge(from, to, position);
            }
        }

        Self {
            graph,
            node_indices,
            incoming,
            outgoing,
            target_edges,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Functoids in document order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &'a FunctoidNode)> + '_ {
        self.graph.node_indices().map(move |idx| (idx, self.graph[idx]))
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.node_indices.get(id).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &'a FunctoidNode {
        self.graph[idx]
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_indices.contains_key(id)
    }

    pub fn incoming(&self, id: &str) -> &[&'a MappingEdge] {
        self.incoming.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn outgoing(&self, id: &str) -> &[&'a MappingEdge] {
        self.outgoing.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn target_edges(&self) -> &[&'a MappingEdge] {
        &self.target_edges
    }

    /// Underlying petgraph, for algorithms
    pub fn inner(&self) -> &DiGraph<&'a FunctoidNode, usize> {
        &self.graph
    }
}
