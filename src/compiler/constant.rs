//! Constant values
//!
//! A `constant` functoid carries its value as text plus a declared type:
//!
//! ```json
//! { "valueType": "integer", "value": "42" }
//! ```
//!
//! Scalars go through their own parser, `array` and `object` go through
//! JSON. Anything that does not parse as declared degrades to a string
//! literal of the raw text.

use serde_json::{Number, Value};
use thiserror::Error;

use crate::ir::{BuiltExpr, Expr, LiteralType, ObjectEntry};

/// Why a constant could not be interpreted as its declared type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstantError {
    #[error("unknown constant type '{0}'")]
    UnknownType(String),

    #[error("'{raw}' is not a valid {value_type}")]
    Unparseable { value_type: String, raw: String },
}

/// Interpret a constant node's config.
pub fn parse_constant(config: &Value) -> Result<BuiltExpr, ConstantError> {
    let value_type = config
        .get("valueType")
        .and_then(Value::as_str)
        .unwrap_or("string");
    let value = config.get("value").unwrap_or(&Value::Null);
    let raw = raw_text(value);

    let unparseable = || ConstantError::Unparseable {
        value_type: value_type.to_string(),
        raw: raw.clone(),
    };

    match value_type {
        "string" => Ok(Expr::string(raw.clone())),
        "null" => Ok(Expr::null()),
        "boolean" => match value {
            Value::Bool(b) => Ok(Expr::literal(Value::Bool(*b))),
            _ => match raw.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Expr::literal(Value::Bool(true))),
                "false" => Ok(Expr::literal(Value::Bool(false))),
                _ => Err(unparseable()),
            },
        },
        "integer" => {
            let parsed = match value {
                Value::Number(n) => n.as_i64(),
                _ => raw.trim().parse::<i64>().ok(),
            };
            parsed
                .map(|i| Expr::Literal {
                    value: Value::from(i),
                    value_type: LiteralType::Integer,
                })
                .ok_or_else(unparseable)
        }
        "number" => {
            let parsed = match value {
                Value::Number(n) => Some(n.clone()),
                _ => raw.trim().parse::<f64>().ok().and_then(Number::from_f64),
            };
            parsed
                .map(|n| Expr::Literal {
                    value: Value::Number(n),
                    value_type: LiteralType::Number,
                })
                .ok_or_else(unparseable)
        }
        "array" => match parse_json(value) {
            Some(Value::Array(items)) => Ok(array_of(items)),
            _ => Err(unparseable()),
        },
        // an object-typed constant may still hold an array
        "object" => match parse_json(value) {
            Some(Value::Array(items)) => Ok(array_of(items)),
            Some(Value::Object(map)) => Ok(Expr::Object {
                entries: map
                    .into_iter()
                    .map(|(key, value)| ObjectEntry {
                        key,
                        value: Expr::literal(value),
                    })
                    .collect(),
            }),
            _ => Err(unparseable()),
        },
        other => Err(ConstantError::UnknownType(other.to_string())),
    }
}

/// The string literal a malformed constant degrades to
pub fn fallback(config: &Value) -> BuiltExpr {
    Expr::string(raw_text(config.get("value").unwrap_or(&Value::Null)))
}

fn array_of(items: Vec<Value>) -> BuiltExpr {
    Expr::Array {
        elements: items.into_iter().map(Expr::literal).collect(),
    }
}

fn raw_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_json(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) => serde_json::from_str(s).ok(),
        Value::Array(_) | Value::Object(_) => Some(value.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value_type: &str, value: Value) -> Result<BuiltExpr, ConstantError> {
        parse_constant(&json!({ "valueType": value_type, "value": value }))
    }

    #[test]
    fn test_scalars() {
        assert_eq!(parse("string", json!("hi")).unwrap(), Expr::string("hi"));
        assert_eq!(parse("boolean", json!("TRUE")).unwrap(), Expr::literal(json!(true)));
        assert_eq!(parse("integer", json!(" 42 ")).unwrap(), Expr::literal(json!(42)));
        assert_eq!(parse("number", json!("2.5")).unwrap(), Expr::literal(json!(2.5)));
        assert!(parse("null", json!("whatever")).unwrap().is_null_literal());
    }

    #[test]
    fn test_integer_typed_number_keeps_number_type() {
        let expr = parse("number", json!("3")).unwrap();
        assert!(matches!(expr, Expr::Literal { value_type: LiteralType::Number, .. }));
    }

    #[test]
    fn test_array_elements_typed_at_runtime() {
        let expr = parse("array", json!("[1, \"a\", true, null]")).unwrap();
        let Expr::Array { elements } = expr else {
            panic!("expected array expression");
        };
        let types: Vec<_> = elements
            .iter()
            .map(|e| match e {
                Expr::Literal { value_type, .. } => *value_type,
                _ => panic!("expected literal"),
            })
            .collect();
        assert_eq!(
            types,
            vec![LiteralType::Integer, LiteralType::String, LiteralType::Boolean, LiteralType::Null]
        );
    }

    #[test]
    fn test_object_constant() {
        let expr = parse("object", json!("{\"b\": 2, \"a\": \"x\"}")).unwrap();
        let Expr::Object { entries } = expr else {
            panic!("expected object expression");
        };
        let keys: Vec<_> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_shape_mismatch_and_garbage() {
        assert!(parse("array", json!("{\"a\": 1}")).is_err());
        assert!(parse("array", json!("[1, 2")).is_err());
        assert!(parse("integer", json!("4.2")).is_err());
        assert_eq!(
            parse("date", json!("x")),
            Err(ConstantError::UnknownType("date".into()))
        );
    }

    #[test]
    fn test_object_type_accepts_array() {
        assert_eq!(
            parse("object", json!("[1, 2]")).unwrap(),
            Expr::Array {
                elements: vec![Expr::literal(json!(1)), Expr::literal(json!(2))]
            }
        );
        assert!(parse("object", json!("3")).is_err());
    }

    #[test]
    fn test_fallback_is_raw_text() {
        let config = json!({ "valueType": "array", "value": "[1, 2" });
        assert_eq!(fallback(&config), Expr::string("[1, 2"));
        assert_eq!(fallback(&json!({})), Expr::string(""));
    }

    #[test]
    fn test_missing_type_defaults_to_string() {
        assert_eq!(parse_constant(&json!({ "value": "7" })).unwrap(), Expr::string("7"));
    }
}
