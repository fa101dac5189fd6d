//! Expression Builder
//!
//! Turns every functoid into a [`BuiltExpr`] in dependency order. A node is
//! ready once every functoid feeding it has been built; edges from the
//! source schema never block. Ready nodes are processed from a worklist
//! (Kahn's algorithm), so each node and edge is visited once.
//!
//! Whatever never becomes ready is reported in [`BuildOutput::unbuilt`]
//! with the reason: a dependency cycle, an input from a node that does not
//! exist, or an upstream node that itself could not be built.

use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};

use super::constant;
use crate::document::{Endpoint, FunctoidNode, MappingEdge};
use crate::graph::{DiagnosticCode, DiagnosticItem, Diagnostics, FunctoidGraph};
use crate::ir::{BinaryOp, BuiltExpr, Expr, UnaryOp};
use crate::operations::{FunctoidKind, OperationRegistry};
use crate::schema::clean_path;
use crate::template::{self, TemplatePart};

// =============================================================================
// Output
// =============================================================================

/// Why a node was left unbuilt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "nodeId", rename_all = "camelCase")]
pub enum UnbuiltReason {
    /// Member of a dependency cycle (or feeds itself)
    Cycle,
    /// Has an input edge from this id, which names no node
    MissingInput(String),
    /// Depends on this node, which was not built either
    UpstreamUnbuilt(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnbuiltNode {
    pub node_id: String,
    pub reason: UnbuiltReason,
}

/// Everything the builder produced
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub expressions: HashMap<String, BuiltExpr>,
    /// Built node ids, in the order they were built (dependencies first)
    pub order: Vec<String>,
    /// Unbuilt nodes, in document order
    pub unbuilt: Vec<UnbuiltNode>,
}

impl BuildOutput {
    pub fn get(&self, node_id: &str) -> Option<&BuiltExpr> {
        self.expressions.get(node_id)
    }

    pub fn is_built(&self, node_id: &str) -> bool {
        self.expressions.contains_key(node_id)
    }
}

// =============================================================================
// Worklist
// =============================================================================

/// Build every node of the graph whose dependencies can be satisfied.
pub fn build(
    graph: &FunctoidGraph<'_>,
    registry: &OperationRegistry,
    diagnostics: &mut Diagnostics,
) -> BuildOutput {
    let inner = graph.inner();
    let mut pending: HashMap<NodeIndex, usize> = HashMap::with_capacity(graph.node_count());
    let mut blocked: HashSet<NodeIndex> = HashSet::new();
    let mut ready = VecDeque::new();

    for (idx, node) in graph.nodes() {
        let in_degree = inner.edges_directed(idx, Direction::Incoming).count();
        if missing_input(graph, node).is_some() {
            blocked.insert(idx);
        }
        if in_degree == 0 && !blocked.contains(&idx) {
            ready.push_back(idx);
        }
        pending.insert(idx, in_degree);
    }

    let mut output = BuildOutput::default();

    while let Some(idx) = ready.pop_front() {
        let node = graph.node(idx);
        let inputs = collect_inputs(graph.incoming(&node.id));
        let expr = build_node(node, inputs, registry, diagnostics);
        tracing::trace!(node = %node.id, kind = %node.kind, "built");

        output.expressions.insert(node.id.clone(), expr);
        output.order.push(node.id.clone());

        for successor in inner.neighbors_directed(idx, Direction::Outgoing) {
            if let Some(count) = pending.get_mut(&successor) {
                *count = count.saturating_sub(1);
                if *count == 0 && !blocked.contains(&successor) {
                    ready.push_back(successor);
                }
            }
        }
    }

    if output.order.len() < graph.node_count() {
        output.unbuilt = classify_unbuilt(graph, &output, diagnostics);
    }

    tracing::debug!(
        built = output.order.len(),
        unbuilt = output.unbuilt.len(),
        "expression build complete"
    );

    output
}

/// First input edge whose source id names no node
fn missing_input<'a>(graph: &FunctoidGraph<'a>, node: &FunctoidNode) -> Option<&'a str> {
    graph
        .incoming(&node.id)
        .iter()
        .copied()
        .filter_map(|edge| edge.source.as_node())
        .find(|id| !graph.contains(id))
}

fn classify_unbuilt(
    graph: &FunctoidGraph<'_>,
    output: &BuildOutput,
    diagnostics: &mut Diagnostics,
) -> Vec<UnbuiltNode> {
    let inner = graph.inner();
    let cyclic: HashSet<NodeIndex> = tarjan_scc(inner)
        .into_iter()
        .filter(|scc| scc.len() > 1 || inner.contains_edge(scc[0], scc[0]))
        .flatten()
        .collect();

    let mut unbuilt = Vec::new();
    for (idx, node) in graph.nodes() {
        if output.is_built(&node.id) {
            continue;
        }

        let reason = if cyclic.contains(&idx) {
            diagnostics.push(DiagnosticItem::new(
                &node.id,
                DiagnosticCode::CyclicDependency,
                format!("Node '{}' is part of a dependency cycle, compiled to null", node.id),
            ));
            UnbuiltReason::Cycle
        } else if let Some(missing) = missing_input(graph, node) {
            diagnostics.push(DiagnosticItem::new(
                &node.id,
                DiagnosticCode::MissingInput,
                format!("Node '{}' has an input from missing node '{}'", node.id, missing),
            ));
            UnbuiltReason::MissingInput(missing.to_string())
        } else {
            let upstream = graph
                .incoming(&node.id)
                .iter()
                .filter_map(|edge| edge.source.as_node())
                .find(|id| !output.is_built(id))
                .unwrap_or_default();
            diagnostics.push(DiagnosticItem::new(
                &node.id,
                DiagnosticCode::UpstreamUnbuilt,
                format!("Node '{}' depends on unbuilt node '{}'", node.id, upstream),
            ));
            UnbuiltReason::UpstreamUnbuilt(upstream.to_string())
        };

        unbuilt.push(UnbuiltNode {
            node_id: node.id.clone(),
            reason,
        });
    }
    unbuilt
}

// =============================================================================
// Inputs
// =============================================================================

/// Input expressions ordered by their `input-<N>` handle. Edges without an
/// index follow the indexed ones, in edge order.
fn collect_inputs(edges: &[&MappingEdge]) -> Vec<BuiltExpr> {
    let (mut indexed, unindexed): (Vec<_>, Vec<_>) = edges
        .iter()
        .map(|edge| (edge.input_index(), *edge))
        .partition(|(index, _)| index.is_some());
    indexed.sort_by_key(|(index, _)| *index);

    indexed
        .into_iter()
        .chain(unindexed)
        .map(|(_, edge)| input_expr(edge))
        .collect()
}

fn input_expr(edge: &MappingEdge) -> BuiltExpr {
    match &edge.source {
        Endpoint::SourceSchema => Expr::field(clean_path(edge.source_handle.as_deref().unwrap_or_default())),
        Endpoint::Node(id) => BuiltExpr::placeholder(id.as_str()),
        Endpoint::TargetSchema => Expr::null(),
    }
}

/// Positional access with `null` for anything unbound
struct Inputs(Vec<BuiltExpr>);

impl Inputs {
    fn at(&self, index: usize) -> BuiltExpr {
        self.0.get(index).cloned().unwrap_or_else(Expr::null)
    }

    fn bound(&self, index: usize) -> Option<BuiltExpr> {
        self.0.get(index).cloned()
    }

    fn all(self) -> Vec<BuiltExpr> {
        self.0
    }
}

// =============================================================================
// Construction Rules
// =============================================================================

fn build_node(
    node: &FunctoidNode,
    inputs: Vec<BuiltExpr>,
    registry: &OperationRegistry,
    diagnostics: &mut Diagnostics,
) -> BuiltExpr {
    use FunctoidKind as K;

    if !registry.contains(&node.kind) {
        diagnostics.push(DiagnosticItem::new(
            &node.id,
            DiagnosticCode::UnknownOperation,
            format!("Operation '{}' is not available, compiled to null", node.kind),
        ));
        return Expr::null();
    }

    let inputs = Inputs(inputs);
    let binary = |op| Expr::binary(op, inputs.at(0), inputs.at(1));
    let unary = |op| Expr::unary(op, inputs.at(0));

    match &node.kind {
        K::Add => binary(BinaryOp::Add),
        K::Subtract => binary(BinaryOp::Subtract),
        K::Multiply => binary(BinaryOp::Multiply),
        K::Divide => binary(BinaryOp::Divide),
        K::Modulo => binary(BinaryOp::Modulo),
        K::Power => binary(BinaryOp::Power),

        K::Equal => binary(BinaryOp::Equal),
        K::NotEqual => binary(BinaryOp::NotEqual),
        K::LessThan => binary(BinaryOp::LessThan),
        K::LessThanOrEqual => binary(BinaryOp::LessThanOrEqual),
        K::GreaterThan => binary(BinaryOp::GreaterThan),
        K::GreaterThanOrEqual => binary(BinaryOp::GreaterThanOrEqual),

        K::And => binary(BinaryOp::And),
        K::Or => binary(BinaryOp::Or),
        K::Not => unary(UnaryOp::Not),

        K::Negate => unary(UnaryOp::Negate),
        K::Abs => unary(UnaryOp::Abs),
        K::Ceil => unary(UnaryOp::Ceil),
        K::Floor => unary(UnaryOp::Floor),
        K::Round => unary(UnaryOp::Round),
        K::Sqrt => unary(UnaryOp::Sqrt),

        K::Concat => concat_chain(inputs.all()),
        K::Template => build_template(node, inputs, diagnostics),

        K::Substring => named_call(node, &inputs, 1, &["start", "length"]),
        K::Replace => named_call(node, &inputs, 1, &["search", "replacement"]),
        K::Split => named_call(node, &inputs, 1, &["delimiter"]),
        K::Join => named_call(node, &inputs, 1, &["separator"]),
        K::FormatDate | K::ParseDate => named_call(node, &inputs, 1, &["format"]),
        K::AddDays => named_call(node, &inputs, 1, &["days"]),
        K::DateDiff => named_call(node, &inputs, 2, &["unit"]),

        K::If => Expr::conditional(inputs.at(0), inputs.at(1), inputs.at(2)),
        K::DefaultValue => {
            let fallback = inputs
                .bound(1)
                .or_else(|| config_literal(node, "defaultValue"))
                .unwrap_or_else(Expr::null);
            let value = inputs.at(0);
            Expr::conditional(
                Expr::binary(BinaryOp::NotEqual, value.clone(), Expr::null()),
                value,
                fallback,
            )
        }
        K::Switch => build_switch(node, &inputs),

        K::Constant => constant::parse_constant(&node.config).unwrap_or_else(|e| {
            diagnostics.push(
                DiagnosticItem::new(
                    &node.id,
                    DiagnosticCode::MalformedConstant,
                    format!("Constant kept as plain text: {}", e),
                )
                .with_context(format!("Config: {}", node.config)),
            );
            constant::fallback(&node.config)
        }),

        K::CustomFunction => Expr::call_with_config(
            node.config_str("functionName").unwrap_or("customFunction"),
            inputs.all(),
            node.config.clone(),
        ),

        K::Unknown(name) => {
            diagnostics.push(DiagnosticItem::new(
                &node.id,
                DiagnosticCode::UnknownOperation,
                format!("Unknown operation '{}', compiled to null", name),
            ));
            Expr::null()
        }

        // uppercase, lowercase, trim, length, collections, conversions, now
        other => Expr::call(other.name(), inputs.all()),
    }
}

/// Right-chained concat: `a + (b + (c + d))`
fn concat_chain(parts: Vec<BuiltExpr>) -> BuiltExpr {
    let mut parts = parts.into_iter().rev();
    let Some(last) = parts.next() else {
        return Expr::string("");
    };
    parts.fold(last, |acc, part| Expr::binary(BinaryOp::Concat, part, acc))
}

/// Call with `positional` leading inputs, then one argument per config
/// parameter. An input bound at a parameter's position wins over config.
fn named_call(node: &FunctoidNode, inputs: &Inputs, positional: usize, params: &[&str]) -> BuiltExpr {
    let mut args: Vec<BuiltExpr> = (0..positional).map(|i| inputs.at(i)).collect();
    for (offset, param) in params.iter().enumerate() {
        let arg = inputs
            .bound(positional + offset)
            .or_else(|| config_literal(node, param))
            .unwrap_or_else(Expr::null);
        args.push(arg);
    }
    Expr::call(node.kind.name(), args)
}

fn config_literal(node: &FunctoidNode, key: &str) -> Option<BuiltExpr> {
    node.config
        .get(key)
        .filter(|v| !v.is_null())
        .map(|v| Expr::literal(v.clone()))
}

fn build_template(node: &FunctoidNode, inputs: Inputs, diagnostics: &mut Diagnostics) -> BuiltExpr {
    let text = node.config_str("template").unwrap_or_default();
    if text.is_empty() {
        return Expr::string("");
    }
    if let Err(e) = template::validate(text) {
        diagnostics.push(DiagnosticItem::new(
            &node.id,
            DiagnosticCode::InvalidTemplate,
            format!("Template '{}' is invalid: {}", text, e),
        ));
    }

    let params = template::extract_params(text);
    let parts = template::split(text)
        .into_iter()
        .map(|part| match part {
            TemplatePart::Text(t) => Expr::string(t),
            TemplatePart::Param(name) => params
                .iter()
                .position(|p| *p == name)
                .and_then(|i| inputs.bound(i))
                .unwrap_or_else(|| Expr::string("")),
        })
        .collect();

    concat_chain(parts)
}

/// `subject == case0 ? in1 : subject == case1 ? in2 : ... : default`
fn build_switch(node: &FunctoidNode, inputs: &Inputs) -> BuiltExpr {
    let cases: Vec<Value> = node
        .config
        .get("cases")
        .and_then(Value::as_array)
        .map(|cases| {
            cases
                .iter()
                .map(|case| match case.get("value") {
                    Some(value) if case.is_object() => value.clone(),
                    _ => case.clone(),
                })
                .collect()
        })
        .unwrap_or_default();

    let subject = inputs.at(0);
    let default = inputs.at(cases.len() + 1);

    cases
        .into_iter()
        .enumerate()
        .rev()
        .fold(default, |otherwise, (i, case)| {
            Expr::conditional(
                Expr::binary(BinaryOp::Equal, subject.clone(), Expr::literal(case)),
                inputs.at(i + 1),
                otherwise,
            )
        })
}
