//! Template Parameters
//!
//! Parses `{name}` placeholders out of free-form strings such as
//! `"http://{host}/api/{id}"`. The builder uses [`split`] to turn a template
//! into a concat chain; the editor uses [`validate`] and [`resolve`] for
//! previews.

use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;
use thiserror::Error;

/// A well-formed `{identifier}` placeholder
static PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid param regex"));

/// Any brace pair, well-formed or not
static ANY_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]*)\}").expect("valid placeholder regex"));

/// Reasons a template is rejected by [`validate`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template is empty")]
    Empty,

    #[error("unbalanced braces: {open} '{{' vs {close} '}}'")]
    UnbalancedBraces { open: usize, close: usize },

    #[error("parameter '{{{0}}}' must start with a letter or underscore")]
    InvalidParameterStart(String),

    #[error("empty parameter '{{}}'")]
    EmptyParameter,
}

/// One piece of a split template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    /// Literal text between parameters
    Text(String),
    /// A parameter name (without braces)
    Param(String),
}

/// Distinct parameter names in order of first appearance.
pub fn extract_params(template: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    PARAM
        .captures_iter(template)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}

/// Check that a template is usable.
pub fn validate(template: &str) -> Result<(), TemplateError> {
    if template.trim().is_empty() {
        return Err(TemplateError::Empty);
    }

    let open = template.matches('{').count();
    let close = template.matches('}').count();
    if open != close {
        return Err(TemplateError::UnbalancedBraces { open, close });
    }

    for caps in ANY_PLACEHOLDER.captures_iter(template) {
        let inner = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        match inner.chars().next() {
            None => return Err(TemplateError::EmptyParameter),
            Some(c) if !(c.is_ascii_alphabetic() || c == '_') => {
                return Err(TemplateError::InvalidParameterStart(inner.to_string()));
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// Substitute every occurrence of each `{name}` with its value.
///
/// Strings are inserted raw; other JSON values use their JSON text.
/// Placeholders without a value are left untouched.
pub fn resolve(template: &str, values: &BTreeMap<String, Value>) -> String {
    let mut output = template.to_string();
    for (name, value) in values {
        let placeholder = format!("{{{}}}", name);
        output = output.replace(&placeholder, &stringify(value));
    }
    output
}

/// Split a template at parameter boundaries. Empty text runs are omitted.
pub fn split(template: &str) -> Vec<TemplatePart> {
    let mut parts = Vec::new();
    let mut cursor = 0;

    for caps in PARAM.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > cursor {
            parts.push(TemplatePart::Text(template[cursor..whole.start()].to_string()));
        }
        parts.push(TemplatePart::Param(name.as_str().to_string()));
        cursor = whole.end();
    }

    if cursor < template.len() {
        parts.push(TemplatePart::Text(template[cursor..].to_string()));
    }

    parts
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_params_unique_in_order() {
        let params = extract_params("{b} and {a} then {b} again, {_c1}");
        assert_eq!(params, vec!["b", "a", "_c1"]);
    }

    #[test]
    fn test_extract_params_ignores_invalid_identifiers() {
        assert!(extract_params("{1abc} {} { spaced }").is_empty());
    }

    #[test]
    fn test_validate() {
        assert_eq!(validate("   "), Err(TemplateError::Empty));
        assert_eq!(
            validate("{a"),
            Err(TemplateError::UnbalancedBraces { open: 1, close: 0 })
        );
        assert_eq!(
            validate("x {9lives}"),
            Err(TemplateError::InvalidParameterStart("9lives".into()))
        );
        assert_eq!(validate("x {}"), Err(TemplateError::EmptyParameter));
        assert!(validate("http://{host}/api/{id}").is_ok());
        assert!(validate("no params at all").is_ok());
    }

    #[test]
    fn test_resolve_replaces_every_occurrence() {
        let mut values = BTreeMap::new();
        values.insert("id".to_string(), json!(42));
        values.insert("name".to_string(), json!("ada"));

        let out = resolve("{name}-{id}-{name}.{missing}", &values);
        assert_eq!(out, "ada-42-ada.{missing}");
    }

    #[test]
    fn test_resolve_treats_placeholder_literally() {
        let mut values = BTreeMap::new();
        values.insert("a.b".to_string(), json!("x"));
        assert_eq!(resolve("{a.b}{a.b}{aXb}", &values), "xx{aXb}");
    }

    #[test]
    fn test_split() {
        let parts = split("http://{host}/api/{id}");
        assert_eq!(
            parts,
            vec![
                TemplatePart::Text("http://".into()),
                TemplatePart::Param("host".into()),
                TemplatePart::Text("/api/".into()),
                TemplatePart::Param("id".into()),
            ]
        );
        assert!(split("").is_empty());
        assert_eq!(split("{only}"), vec![TemplatePart::Param("only".into())]);
    }
}
