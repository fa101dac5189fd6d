//! Shared-Reference Rewriting
//!
//! Resolves every [`Placeholder`] left by the builder. A reference to a
//! shareable node becomes a named [`SharedRef`]; any other reference is
//! replaced by that node's own expression, rewritten recursively. Rewritten
//! nodes are memoized, so a node reached from many places is rewritten once.
//!
//! Afterwards only the shared values reachable from a mapping (directly or
//! through other live shared values) are emitted.
//!
//! [`Placeholder`]: crate::ir::Placeholder
//! [`SharedRef`]: crate::ir::SharedRef

use std::collections::HashMap;

use super::analysis::Shareability;
use super::builder::BuildOutput;
use crate::document::{Endpoint, MappingEdge};
use crate::graph::{Diagnostics, FunctoidGraph};
use crate::ir::{BuiltExpr, Expr, Expression, FieldMapping, SharedExpression};
use crate::operations::OperationRegistry;
use crate::schema::clean_path;

/// Memoizing placeholder resolver
pub struct Rewriter<'b> {
    built: &'b BuildOutput,
    shareability: &'b Shareability,
    inlined: HashMap<String, Expression>,
}

impl<'b> Rewriter<'b> {
    pub fn new(built: &'b BuildOutput, shareability: &'b Shareability) -> Self {
        Self {
            built,
            shareability,
            inlined: HashMap::new(),
        }
    }

    /// Rewrite a built expression, resolving all of its placeholders.
    pub fn rewrite(&mut self, expr: &BuiltExpr, diagnostics: &mut Diagnostics) -> Expression {
        expr.map_refs(&mut |placeholder| self.resolve(&placeholder.node_id, diagnostics))
    }

    /// What a use site of `node_id` compiles to
    pub fn resolve(&mut self, node_id: &str, diagnostics: &mut Diagnostics) -> Expression {
        match self.shareability.var_name(node_id) {
            Some(var_name) => Expression::shared(node_id, var_name),
            None => self.inline(node_id, diagnostics),
        }
    }

    /// The node's own expression, fully rewritten. Unbuilt nodes are `null`.
    pub fn inline(&mut self, node_id: &str, diagnostics: &mut Diagnostics) -> Expression {
        if let Some(done) = self.inlined.get(node_id) {
            return done.clone();
        }

        let built = self.built;
        let expr = match built.get(node_id) {
            Some(expr) => self.rewrite(expr, diagnostics),
            None => {
                diagnostics.unbuildable_reference(node_id);
                Expr::null()
            }
        };
        self.inlined.insert(node_id.to_string(), expr.clone());
        expr
    }
}

/// Rewrite the document's target edges into field mappings and collect the
/// live shared expressions.
///
/// Shared values are named after their node's label, or after the
/// operation's display name when the node has none.
pub fn assemble(
    graph: &FunctoidGraph<'_>,
    built: &BuildOutput,
    shareability: &Shareability,
    registry: &OperationRegistry,
    diagnostics: &mut Diagnostics,
) -> (Vec<FieldMapping>, Vec<SharedExpression>) {
    let mut rewriter = Rewriter::new(built, shareability);

    let mappings: Vec<FieldMapping> = graph
        .target_edges()
        .iter()
        .map(|edge| FieldMapping {
            target_path: clean_path(edge.target_handle.as_deref().unwrap_or_default()),
            expression: mapping_expr(edge, &mut rewriter, diagnostics),
        })
        .collect();

    // Liveness: follow shared references out of the mappings, then out of
    // each newly live shared value's own expression.
    let mut live: HashMap<String, Expression> = HashMap::new();
    let mut worklist: Vec<String> = Vec::new();
    for mapping in &mappings {
        mapping
            .expression
            .for_each_ref(&mut |r| worklist.push(r.node_id.clone()));
    }

    while let Some(node_id) = worklist.pop() {
        if live.contains_key(&node_id) {
            continue;
        }
        let expr = rewriter.inline(&node_id, diagnostics);
        expr.for_each_ref(&mut |r| worklist.push(r.node_id.clone()));
        live.insert(node_id, expr);
    }

    let shared: Vec<SharedExpression> = shareability
        .iter()
        .filter_map(|node| {
            let expression = live.remove(&node.node_id)?;
            let hint = graph.index_of(&node.node_id).and_then(|idx| {
                let functoid = graph.node(idx);
                functoid.label.as_deref().and_then(hint_name).or_else(|| {
                    registry
                        .get(&functoid.kind)
                        .and_then(|info| hint_name(&info.display_name))
                })
            });
            Some(SharedExpression {
                node_id: node.node_id.clone(),
                var_name: node.var_name.clone(),
                expression,
                hint_name: hint,
                ref_count: node.ref_count,
            })
        })
        .collect();

    let dead = shareability.len() - shared.len();
    if dead > 0 {
        tracing::debug!(dead, "dropped unreferenced shared expressions");
    }

    (mappings, shared)
}

fn mapping_expr(edge: &MappingEdge, rewriter: &mut Rewriter<'_>, diagnostics: &mut Diagnostics) -> Expression {
    match &edge.source {
        Endpoint::SourceSchema => Expr::field(clean_path(edge.source_handle.as_deref().unwrap_or_default())),
        Endpoint::Node(id) => rewriter.resolve(id, diagnostics),
        Endpoint::TargetSchema => Expr::null(),
    }
}

/// Identifier-friendly name from a node label: `"Order Total"` -> `order_total`
pub fn hint_name(label: &str) -> Option<String> {
    let mut result = String::with_capacity(label.len() + 4);
    let mut prev_lower = false;

    for c in label.trim().chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else if c.is_ascii_alphanumeric() {
            result.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        } else if !result.is_empty() && !result.ends_with('_') {
            result.push('_');
            prev_lower = false;
        }
    }

    let trimmed = result.trim_end_matches('_');
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return Some(format!("_{}", trimmed));
    }
    Some(trimmed.to_string())
}
