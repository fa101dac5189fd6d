//! End-to-end compilation scenarios
//!
//! Each fixture is a mapping document as the editor saves it.

use serde_json::json;

use schema_mapper::compiler::UnbuiltReason;
use schema_mapper::ir::{BinaryOp, Expr};
use schema_mapper::{
    compile, CompiledMapping, Compiler, CompilerOptions, DiagnosticCode, Endpoint, Expression,
    FunctoidKind, MappingDocument, MappingEdge, OperationRegistry,
};

fn fixture(content: &str) -> MappingDocument {
    MappingDocument::from_json_str(content).unwrap()
}

fn add(left: Expression, right: Expression) -> Expression {
    Expr::binary(BinaryOp::Add, left, right)
}

fn concat(left: Expression, right: Expression) -> Expression {
    Expr::binary(BinaryOp::Concat, left, right)
}

fn expression_of<'a>(output: &'a CompiledMapping, target: &str) -> &'a Expression {
    &output
        .mapping(target)
        .unwrap_or_else(|| panic!("no mapping for {}", target))
        .expression
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_direct_field_copy() {
    let doc = fixture(include_str!("fixtures/direct_copy.json"));
    let output = compile(&doc);

    assert_eq!(output.mappings.len(), 1);
    assert_eq!(output.mappings[0].target_path, "b");
    assert_eq!(output.mappings[0].expression, Expr::field("a"));
    assert!(output.shared_expressions.is_empty());
    assert_eq!(output.metadata, json!({ "name": "direct copy" }));

    let json = serde_json::to_value(&output).unwrap();
    assert!(json.get("sharedExpressions").is_none());
    assert_eq!(json["mappings"][0]["targetPath"], "b");
}

#[test]
fn test_pure_node_with_two_consumers_is_shared() {
    let doc = fixture(include_str!("fixtures/shared_sum.json"));
    let output = compile(&doc);

    assert_eq!(output.shared_expressions.len(), 1);
    let shared = &output.shared_expressions[0];
    assert_eq!(shared.node_id, "sum-1");
    assert_eq!(shared.var_name, "shared_sum_1");
    assert_eq!(shared.ref_count, 2);
    assert_eq!(shared.hint_name.as_deref(), Some("gross_amount"));
    assert_eq!(shared.expression, add(Expr::field("net"), Expr::field("tax")));

    let reference = Expression::shared("sum-1", "shared_sum_1");
    assert_eq!(expression_of(&output, "total"), &reference);
    assert_eq!(expression_of(&output, "summary.amount"), &reference);
}

#[test]
fn test_array_context_prevents_sharing() {
    let doc = fixture(include_str!("fixtures/array_sum.json"));
    let compilation = Compiler::default().compile(&doc);
    let output = &compilation.output;

    assert!(output.shared_expressions.is_empty());
    let inlined = add(Expr::field("net"), Expr::field("tax"));
    assert_eq!(expression_of(output, "total"), &inlined);
    assert_eq!(expression_of(output, "items[].total"), &inlined);
    assert!(compilation.diagnostics.is_empty());
}

#[test]
fn test_orphan_edges_are_removed() {
    let doc = fixture(include_str!("fixtures/orphan_edge.json"));
    let compilation = Compiler::default().compile(&doc);

    assert_eq!(
        compilation
            .diagnostics
            .with_code(DiagnosticCode::OrphanEdge)
            .count(),
        2
    );
    let json = serde_json::to_string(&compilation.output).unwrap();
    assert!(!json.contains("deleted-node"));
    assert!(compilation.output.mapping("legacy").is_none());
    assert_eq!(
        expression_of(&compilation.output, "displayName"),
        &Expr::call("uppercase", vec![Expr::field("name")])
    );
}

#[test]
fn test_template_builds_concat_chain() {
    let doc = fixture(include_str!("fixtures/url_template.json"));
    let output = compile(&doc);

    let expected = concat(
        Expr::string("http://"),
        concat(
            Expr::field("host"),
            concat(Expr::string("/api/"), Expr::field("id")),
        ),
    );
    assert_eq!(expression_of(&output, "href"), &expected);
}

#[test]
fn test_template_without_inputs_uses_empty_strings() {
    let mut doc = fixture(include_str!("fixtures/url_template.json"));
    doc.edges.retain(|e| e.id == "e3");
    let output = compile(&doc);

    let expected = concat(
        Expr::string("http://"),
        concat(Expr::string(""), concat(Expr::string("/api/"), Expr::string(""))),
    );
    assert_eq!(expression_of(&output, "href"), &expected);
}

#[test]
fn test_cycle_degrades_to_null_and_is_reported() {
    let doc = fixture(include_str!("fixtures/cycle.json"));
    let compilation = Compiler::default().compile(&doc);
    let output = &compilation.output;

    assert!(expression_of(output, "a").is_null_literal());
    assert!(expression_of(output, "b").is_null_literal());
    assert_eq!(expression_of(output, "c"), &Expr::field("seed"));

    let reasons: Vec<_> = compilation
        .unbuilt
        .iter()
        .map(|u| (u.node_id.as_str(), u.reason.clone()))
        .collect();
    assert_eq!(
        reasons,
        vec![
            ("ping", UnbuiltReason::Cycle),
            ("pong", UnbuiltReason::Cycle),
            ("after", UnbuiltReason::UpstreamUnbuilt("pong".into())),
        ]
    );
    assert!(compilation.diagnostics.has_errors());
    assert_eq!(
        compilation
            .diagnostics
            .with_code(DiagnosticCode::UnbuildableReference)
            .count(),
        2
    );
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_order_pipeline() {
    let doc = fixture(include_str!("fixtures/order_pipeline.json"));
    let compilation = Compiler::default().compile(&doc);
    let output = &compilation.output;

    // gross is shared; the unused sum qualifies too but no mapping reaches it
    let ids: Vec<_> = output
        .shared_expressions
        .iter()
        .map(|s| s.node_id.as_str())
        .collect();
    assert_eq!(ids, vec!["gross"]);

    let gross = Expression::shared("gross", "shared_gross");
    assert_eq!(expression_of(output, "gross"), &gross);
    assert_eq!(
        expression_of(output, "taxAmount"),
        &Expr::binary(BinaryOp::Multiply, gross, Expr::literal(json!(0.2)))
    );

    assert_eq!(
        expression_of(output, "customerName"),
        &concat(
            Expr::field("customer.first"),
            concat(Expr::string(" "), Expr::field("customer.last"))
        )
    );

    // impure: evaluated at every use
    let now = Expr::call("now", vec![]);
    assert_eq!(expression_of(output, "createdAt"), &now);
    assert_eq!(expression_of(output, "updatedAt"), &now);

    // branch label dropped from the field path
    assert_eq!(expression_of(output, "bankAccount"), &Expr::field("payment.iban"));

    // only resolvable through the overlay
    assert_eq!(expression_of(output, "note"), &Expr::string("n/a"));
    assert!(output.schemas.target["properties"]["note"].is_object());

    assert!(compilation.diagnostics.is_empty());
    assert!(compilation.unbuilt.is_empty());
    assert_eq!(output.metadata["version"], 3);
}

#[test]
fn test_recursive_union_schema_compiles() {
    let doc = MappingDocument {
        edges: vec![
            MappingEdge::new("e0", Endpoint::SourceSchema, Endpoint::TargetSchema)
                .with_source_handle("$.tree.value")
                .with_target_handle("$.value"),
            MappingEdge::new("e1", Endpoint::SourceSchema, Endpoint::TargetSchema)
                .with_source_handle("$.tree.missing")
                .with_target_handle("$.value"),
        ],
        source_schema: json!({
            "$defs": {
                "Tree": {
                    "oneOf": [
                        { "$ref": "#/$defs/Tree" },
                        { "properties": { "value": { "type": "string" } } }
                    ]
                }
            },
            "properties": { "tree": { "$ref": "#/$defs/Tree" } }
        }),
        target_schema: json!({ "properties": { "value": { "type": "string" } } }),
        ..Default::default()
    };
    let compilation = Compiler::default().compile(&doc);

    assert_eq!(compilation.output.mappings.len(), 1);
    assert_eq!(expression_of(&compilation.output, "value"), &Expr::field("tree.value"));
    assert_eq!(
        compilation
            .diagnostics
            .with_code(DiagnosticCode::UnresolvedHandle)
            .count(),
        1
    );
}

#[test]
fn test_no_unresolved_references_in_output() {
    let doc = fixture(include_str!("fixtures/order_pipeline.json"));
    let output = compile(&doc);
    let json = serde_json::to_value(&output).unwrap();

    fn check(value: &serde_json::Value) {
        match value {
            serde_json::Value::Object(map) => {
                if map.get("type").and_then(|t| t.as_str()) == Some("reference") {
                    let name = map.get("varName").and_then(|v| v.as_str()).unwrap_or_default();
                    assert!(!name.is_empty(), "unresolved reference: {}", value);
                }
                map.values().for_each(check);
            }
            serde_json::Value::Array(items) => items.iter().for_each(check),
            _ => {}
        }
    }
    check(&json["mappings"]);
    check(&json["sharedExpressions"]);
}

#[test]
fn test_compilation_is_deterministic() {
    let doc = fixture(include_str!("fixtures/order_pipeline.json"));
    let first = serde_json::to_string(&compile(&doc)).unwrap();
    for _ in 0..5 {
        assert_eq!(serde_json::to_string(&compile(&doc)).unwrap(), first);
    }
}

#[test]
fn test_compilation_does_not_mutate_input() {
    let doc = fixture(include_str!("fixtures/orphan_edge.json"));
    let before = doc.clone();
    let _ = compile(&doc);
    assert_eq!(doc, before);
}

#[test]
fn test_registry_without_kind_degrades_to_null() {
    let doc = fixture(include_str!("fixtures/url_template.json"));
    let registry = OperationRegistry::standard().without(&FunctoidKind::Template);
    let compilation = Compiler::new(registry, CompilerOptions::default()).compile(&doc);

    assert!(expression_of(&compilation.output, "href").is_null_literal());
    assert_eq!(
        compilation
            .diagnostics
            .with_code(DiagnosticCode::UnknownOperation)
            .count(),
        1
    );
}

#[test]
fn test_hoisting_can_be_disabled() {
    let doc = fixture(include_str!("fixtures/shared_sum.json"));
    let options = CompilerOptions {
        hoist_shared: false,
        ..Default::default()
    };
    let output = Compiler::with_options(options).compile(&doc).output;

    assert!(output.shared_expressions.is_empty());
    assert_eq!(
        expression_of(&output, "total"),
        &add(Expr::field("net"), Expr::field("tax"))
    );
}

#[test]
fn test_output_round_trips_through_json() {
    let doc = fixture(include_str!("fixtures/order_pipeline.json"));
    let output = compile(&doc);
    let text = serde_json::to_string_pretty(&output).unwrap();
    let back: CompiledMapping = serde_json::from_str(&text).unwrap();
    assert_eq!(back, output);
    assert!(back.checksum.matches(&doc));
}
