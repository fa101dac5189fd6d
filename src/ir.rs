//! Mapping IR
//!
//! The portable expression tree consumed by the code generators and the
//! preview executor. [`Expr`] is generic over its reference payload:
//!
//! - [`BuiltExpr`] = `Expr<Placeholder>`: produced by the builder, every
//!   reference is a not-yet-decided pointer to another node
//! - [`Expression`] = `Expr<SharedRef>`: compiled output, every reference
//!   names a hoisted shared value
//!
//! Rewriting is the only way from one to the other, so compiled output
//! cannot contain an unresolved reference.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::checksum::Checksum;

// =============================================================================
// Operators
// =============================================================================

/// Binary operator vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
    Concat,
}

/// Unary operator vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnaryOp {
    Not,
    Negate,
    Abs,
    Ceil,
    Floor,
    Round,
    Sqrt,
}

/// Run-time type of a literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LiteralType {
    String,
    Integer,
    Number,
    Boolean,
    Null,
    Array,
    Object,
}

impl LiteralType {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }
}

// =============================================================================
// References
// =============================================================================

/// Reference to another node's output, not yet inlined or named
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placeholder {
    pub node_id: String,
}

/// Reference to a hoisted, once-evaluated shared value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedRef {
    pub node_id: String,
    pub var_name: String,
}

// =============================================================================
// Expressions
// =============================================================================

/// Expression tree, generic over the reference payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Expr<R> {
    Literal {
        value: Value,
        #[serde(rename = "valueType")]
        value_type: LiteralType,
    },
    Field {
        path: String,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr<R>>,
        right: Box<Expr<R>>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr<R>>,
    },
    Call {
        function: String,
        args: Vec<Expr<R>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        config: Option<Value>,
    },
    Conditional {
        condition: Box<Expr<R>>,
        #[serde(rename = "then")]
        then_branch: Box<Expr<R>>,
        #[serde(rename = "else")]
        else_branch: Box<Expr<R>>,
    },
    Array {
        elements: Vec<Expr<R>>,
    },
    Object {
        entries: Vec<ObjectEntry<R>>,
    },
    Reference(R),
}

/// Key/value pair of an object expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEntry<R> {
    pub key: String,
    pub value: Expr<R>,
}

/// Expression as built, references unresolved
pub type BuiltExpr = Expr<Placeholder>;

/// Expression in compiled output
pub type Expression = Expr<SharedRef>;

impl<R> Expr<R> {
    /// Literal typed by the value's run-time type
    pub fn literal(value: Value) -> Self {
        let value_type = LiteralType::of(&value);
        Expr::Literal { value, value_type }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Expr::Literal {
            value: Value::String(s.into()),
            value_type: LiteralType::String,
        }
    }

    pub fn null() -> Self {
        Expr::Literal {
            value: Value::Null,
            value_type: LiteralType::Null,
        }
    }

    pub fn field(path: impl Into<String>) -> Self {
        Expr::Field { path: path.into() }
    }

    pub fn binary(op: BinaryOp, left: Self, right: Self) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Self) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn call(function: impl Into<String>, args: Vec<Self>) -> Self {
        Expr::Call {
            function: function.into(),
            args,
            config: None,
        }
    }

    pub fn call_with_config(function: impl Into<String>, args: Vec<Self>, config: Value) -> Self {
        Expr::Call {
            function: function.into(),
            args,
            config: Some(config),
        }
    }

    pub fn conditional(condition: Self, then_branch: Self, else_branch: Self) -> Self {
        Expr::Conditional {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        }
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self, Expr::Literal { value: Value::Null, .. })
    }

    /// Rebuild the tree, replacing every reference with `f(reference)`.
    pub fn map_refs<S, F>(&self, f: &mut F) -> Expr<S>
    where
        F: FnMut(&R) -> Expr<S>,
    {
        match self {
            Expr::Literal { value, value_type } => Expr::Literal {
                value: value.clone(),
                value_type: *value_type,
            },
            Expr::Field { path } => Expr::Field { path: path.clone() },
            Expr::Binary { op, left, right } => Expr::Binary {
                op: *op,
                left: Box::new(left.map_refs(f)),
                right: Box::new(right.map_refs(f)),
            },
            Expr::Unary { op, operand } => Expr::Unary {
                op: *op,
                operand: Box::new(operand.map_refs(f)),
            },
            Expr::Call {
                function,
                args,
                config,
            } => Expr::Call {
                function: function.clone(),
                args: args.iter().map(|a| a.map_refs(f)).collect(),
                config: config.clone(),
            },
            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => Expr::Conditional {
                condition: Box::new(condition.map_refs(f)),
                then_branch: Box::new(then_branch.map_refs(f)),
                else_branch: Box::new(else_branch.map_refs(f)),
            },
            Expr::Array { elements } => Expr::Array {
                elements: elements.iter().map(|e| e.map_refs(f)).collect(),
            },
            Expr::Object { entries } => Expr::Object {
                entries: entries
                    .iter()
                    .map(|entry| ObjectEntry {
                        key: entry.key.clone(),
                        value: entry.value.map_refs(f),
                    })
                    .collect(),
            },
            Expr::Reference(r) => f(r),
        }
    }

    /// Visit every reference in the tree, depth first, left to right.
    pub fn for_each_ref<F>(&self, f: &mut F)
    where
        F: FnMut(&R),
    {
        match self {
            Expr::Literal { .. } | Expr::Field { .. } => {}
            Expr::Binary { left, right, .. } => {
                left.for_each_ref(f);
                right.for_each_ref(f);
            }
            Expr::Unary { operand, .. } => operand.for_each_ref(f),
            Expr::Call { args, .. } => args.iter().for_each(|a| a.for_each_ref(f)),
            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.for_each_ref(f);
                then_branch.for_each_ref(f);
                else_branch.for_each_ref(f);
            }
            Expr::Array { elements } => elements.iter().for_each(|e| e.for_each_ref(f)),
            Expr::Object { entries } => entries.iter().for_each(|e| e.value.for_each_ref(f)),
            Expr::Reference(r) => f(r),
        }
    }
}

impl BuiltExpr {
    pub fn placeholder(node_id: impl Into<String>) -> Self {
        Expr::Reference(Placeholder {
            node_id: node_id.into(),
        })
    }
}

impl Expression {
    pub fn shared(node_id: impl Into<String>, var_name: impl Into<String>) -> Self {
        Expr::Reference(SharedRef {
            node_id: node_id.into(),
            var_name: var_name.into(),
        })
    }
}

// =============================================================================
// Compiled Output
// =============================================================================

/// A hoisted computation referenced from several sites
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedExpression {
    pub node_id: String,
    pub var_name: String,
    pub expression: Expression,
    /// Friendlier name derived from the node label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint_name: Option<String>,
    pub ref_count: usize,
}

/// Value written to one target field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub target_path: String,
    pub expression: Expression,
}

/// Schemas passed through to the generators (overlays applied)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingSchemas {
    pub source: Value,
    pub target: Value,
}

/// Result of compiling one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledMapping {
    pub mappings: Vec<FieldMapping>,
    /// In dependency order: a shared value only references earlier ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_expressions: Vec<SharedExpression>,
    pub schemas: MappingSchemas,
    pub metadata: Value,
    /// Checksum of the input document
    pub checksum: Checksum,
}

impl CompiledMapping {
    pub fn mapping(&self, target_path: &str) -> Option<&FieldMapping> {
        self.mappings.iter().find(|m| m.target_path == target_path)
    }

    pub fn shared(&self, node_id: &str) -> Option<&SharedExpression> {
        self.shared_expressions.iter().find(|s| s.node_id == node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literal_types() {
        assert_eq!(LiteralType::of(&json!(1)), LiteralType::Integer);
        assert_eq!(LiteralType::of(&json!(1.5)), LiteralType::Number);
        assert_eq!(LiteralType::of(&json!("x")), LiteralType::String);
        assert_eq!(LiteralType::of(&json!([1])), LiteralType::Array);
        assert_eq!(LiteralType::of(&Value::Null), LiteralType::Null);
    }

    #[test]
    fn test_serialized_shape() {
        let expr: Expression = Expr::binary(
            BinaryOp::Add,
            Expr::field("a"),
            Expr::shared("n1", "shared_n1"),
        );
        let json = serde_json::to_value(&expr).unwrap();
        assert_eq!(
            json,
            json!({
                "type": "binary",
                "op": "add",
                "left": { "type": "field", "path": "a" },
                "right": { "type": "reference", "nodeId": "n1", "varName": "shared_n1" }
            })
        );

        let back: Expression = serde_json::from_value(json).unwrap();
        assert_eq!(back, expr);
    }

    #[test]
    fn test_conditional_uses_then_else_keys() {
        let expr: BuiltExpr = Expr::conditional(Expr::null(), Expr::string("a"), Expr::literal(json!(2)));
        let json = serde_json::to_value(&expr).unwrap();
        assert!(json.get("then").is_some());
        assert!(json.get("else").is_some());
        assert_eq!(json["else"]["valueType"], "integer");
    }

    #[test]
    fn test_map_refs_and_for_each_ref() {
        let built: BuiltExpr = Expr::call(
            "join",
            vec![BuiltExpr::placeholder("a"), Expr::unary(UnaryOp::Not, BuiltExpr::placeholder("b"))],
        );

        let mut seen = Vec::new();
        built.for_each_ref(&mut |p| seen.push(p.node_id.clone()));
        assert_eq!(seen, vec!["a", "b"]);

        let resolved: Expression =
            built.map_refs(&mut |p| Expression::shared(&p.node_id, format!("v_{}", p.node_id)));
        let mut names = Vec::new();
        resolved.for_each_ref(&mut |r| names.push(r.var_name.clone()));
        assert_eq!(names, vec!["v_a", "v_b"]);
    }
}
