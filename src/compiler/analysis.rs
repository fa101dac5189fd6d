//! Shareability Analysis
//!
//! Decides which node outputs are worth naming and evaluating once. A node
//! is shareable when all of the following hold:
//!
//! - more than one consumer (functoids or target fields)
//! - its operation is pure
//! - its built expression costs at least `min_hoist_cost`
//! - it is not array-scoped
//!
//! A node is array-scoped when any downstream path reaches a target field
//! under an array selector (`[]`). Such a value is evaluated per item, so it
//! is never hoisted, not even for its scalar uses.

use petgraph::graph::NodeIndex;
use petgraph::visit::{Dfs, Reversed};
use std::collections::{HashMap, HashSet};

use super::builder::BuildOutput;
use super::CompilerOptions;
use crate::document::Endpoint;
use crate::graph::FunctoidGraph;
use crate::ir::Expr;
use crate::operations::OperationRegistry;
use crate::schema::is_array_path;

/// Prefix of generated shared-value names
pub const SHARED_PREFIX: &str = "shared_";

/// A node selected for hoisting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedNode {
    pub node_id: String,
    pub var_name: String,
    pub ref_count: usize,
}

/// Analysis result: the shareable nodes, in build order
#[derive(Debug, Clone, Default)]
pub struct Shareability {
    shared: Vec<SharedNode>,
    by_id: HashMap<String, usize>,
}

impl Shareability {
    pub fn is_shareable(&self, node_id: &str) -> bool {
        self.by_id.contains_key(node_id)
    }

    pub fn get(&self, node_id: &str) -> Option<&SharedNode> {
        self.by_id.get(node_id).map(|&i| &self.shared[i])
    }

    pub fn var_name(&self, node_id: &str) -> Option<&str> {
        self.get(node_id).map(|s| s.var_name.as_str())
    }

    /// Shareable nodes in build order
    pub fn iter(&self) -> impl Iterator<Item = &SharedNode> {
        self.shared.iter()
    }

    pub fn len(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.is_empty()
    }

    fn push(&mut self, node: SharedNode) {
        self.by_id.insert(node.node_id.clone(), self.shared.len());
        self.shared.push(node);
    }
}

/// Select shareable nodes among the built ones.
pub fn analyze(
    graph: &FunctoidGraph<'_>,
    built: &BuildOutput,
    registry: &OperationRegistry,
    options: &CompilerOptions,
) -> Shareability {
    let mut result = Shareability::default();
    if !options.hoist_shared {
        return result;
    }

    let scoped = array_scoped(graph);
    let mut taken = HashSet::new();

    for node_id in &built.order {
        let (Some(idx), Some(expr)) = (graph.index_of(node_id), built.get(node_id)) else {
            continue;
        };
        let node = graph.node(idx);

        let refs = ref_count(graph, node_id);
        if refs < 2 || !registry.is_pure(&node.kind) || scoped.contains(&idx) {
            continue;
        }
        let expr_cost = cost(expr);
        if expr_cost < options.min_hoist_cost {
            continue;
        }

        let var_name = unique_name(var_name_for(node_id), &mut taken);
        tracing::trace!(node = %node_id, refs, cost = expr_cost, var = %var_name, "shareable");
        result.push(SharedNode {
            node_id: node_id.clone(),
            var_name,
            ref_count: refs,
        });
    }

    tracing::debug!(
        shareable = result.len(),
        array_scoped = scoped.len(),
        "shareability analysis complete"
    );
    result
}

/// Consumers of a node: outgoing edges into functoids or target fields.
pub fn ref_count(graph: &FunctoidGraph<'_>, node_id: &str) -> usize {
    graph
        .outgoing(node_id)
        .iter()
        .filter(|edge| edge.target != Endpoint::SourceSchema)
        .count()
}

/// Structural evaluation cost of an expression
pub fn cost<R>(expr: &Expr<R>) -> usize {
    match expr {
        Expr::Literal { .. } | Expr::Field { .. } | Expr::Reference(_) => 1,
        Expr::Binary { left, right, .. } => 2 + cost(left) + cost(right),
        Expr::Unary { operand, .. } => 2 + cost(operand),
        Expr::Call { args, .. } => 3 + args.iter().map(cost).sum::<usize>(),
        Expr::Conditional {
            condition,
            then_branch,
            else_branch,
        } => 3 + cost(condition) + cost(then_branch).max(cost(else_branch)),
        Expr::Array { elements } => 2 + elements.iter().map(cost).sum::<usize>(),
        Expr::Object { entries } => 2 + entries.iter().map(|e| cost(&e.value)).sum::<usize>(),
    }
}

/// Every node with a path to an array-selector target field.
///
/// One reverse DFS seeded from all direct feeders; the visited set is
/// shared between seeds so each node is walked once.
pub fn array_scoped(graph: &FunctoidGraph<'_>) -> HashSet<NodeIndex> {
    let reversed = Reversed(graph.inner());
    let mut dfs = Dfs::empty(reversed);
    let mut scoped = HashSet::new();

    let seeds = graph
        .target_edges()
        .iter()
        .filter(|edge| edge.target_handle.as_deref().is_some_and(is_array_path))
        .filter_map(|edge| edge.source.as_node())
        .filter_map(|id| graph.index_of(id));

    for seed in seeds {
        if scoped.contains(&seed) {
            continue;
        }
        dfs.move_to(seed);
        while let Some(idx) = dfs.next(reversed) {
            scoped.insert(idx);
        }
    }

    scoped
}

/// `shared_` plus the node id with anything non-alphanumeric replaced
pub fn var_name_for(node_id: &str) -> String {
    let sanitized: String = node_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}{}", SHARED_PREFIX, sanitized)
}

fn unique_name(base: String, taken: &mut HashSet<String>) -> String {
    let mut name = base.clone();
    let mut suffix = 2;
    while !taken.insert(name.clone()) {
        name = format!("{}_{}", base, suffix);
        suffix += 1;
    }
    name
}
