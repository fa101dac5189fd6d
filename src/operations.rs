//! Functoid Operations
//!
//! The closed set of node kinds the compiler knows how to build, plus the
//! [`OperationRegistry`] carrying per-kind metadata (purity and
//! display name). The registry is handed to the compiler explicitly so that
//! different operation sets can be compiled against side by side.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// =============================================================================
// Functoid Kind
// =============================================================================

/// Operation kind of a functoid node. Unrecognized names are kept verbatim
/// in [`FunctoidKind::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FunctoidKind {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    // Logical
    And,
    Or,
    Not,
    // Math
    Negate,
    Abs,
    Ceil,
    Floor,
    Round,
    Sqrt,
    // String
    Concat,
    Uppercase,
    Lowercase,
    Trim,
    Length,
    Substring,
    Replace,
    Split,
    Join,
    Template,
    // Conditional
    If,
    DefaultValue,
    Switch,
    // Collection / aggregate
    Count,
    Sum,
    Average,
    Min,
    Max,
    First,
    Last,
    Distinct,
    Flatten,
    Sort,
    Reverse,
    // Conversion
    ToString,
    ToNumber,
    ToInteger,
    ToBoolean,
    // Date / time
    Now,
    FormatDate,
    ParseDate,
    AddDays,
    DateDiff,
    // Values
    Constant,
    CustomFunction,
    /// Anything else the editor produced
    Unknown(String),
}

impl FunctoidKind {
    /// Every known kind, in table order
    pub const ALL: &'static [FunctoidKind] = &[
        Self::Add,
        Self::Subtract,
        Self::Multiply,
        Self::Divide,
        Self::Modulo,
        Self::Power,
        Self::Equal,
        Self::NotEqual,
        Self::LessThan,
        Self::LessThanOrEqual,
        Self::GreaterThan,
        Self::GreaterThanOrEqual,
        Self::And,
        Self::Or,
        Self::Not,
        Self::Negate,
        Self::Abs,
        Self::Ceil,
        Self::Floor,
        Self::Round,
        Self::Sqrt,
        Self::Concat,
        Self::Uppercase,
        Self::Lowercase,
        Self::Trim,
        Self::Length,
        Self::Substring,
        Self::Replace,
        Self::Split,
        Self::Join,
        Self::Template,
        Self::If,
        Self::DefaultValue,
        Self::Switch,
        Self::Count,
        Self::Sum,
        Self::Average,
        Self::Min,
        Self::Max,
        Self::First,
        Self::Last,
        Self::Distinct,
        Self::Flatten,
        Self::Sort,
        Self::Reverse,
        Self::ToString,
        Self::ToNumber,
        Self::ToInteger,
        Self::ToBoolean,
        Self::Now,
        Self::FormatDate,
        Self::ParseDate,
        Self::AddDays,
        Self::DateDiff,
        Self::Constant,
        Self::CustomFunction,
    ];

    /// Wire name as written by the editor
    pub fn name(&self) -> &str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
            Self::Modulo => "modulo",
            Self::Power => "power",
            Self::Equal => "equal",
            Self::NotEqual => "notEqual",
            Self::LessThan => "lessThan",
            Self::LessThanOrEqual => "lessThanOrEqual",
            Self::GreaterThan => "greaterThan",
            Self::GreaterThanOrEqual => "greaterThanOrEqual",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::Negate => "negate",
            Self::Abs => "abs",
            Self::Ceil => "ceil",
            Self::Floor => "floor",
            Self::Round => "round",
            Self::Sqrt => "sqrt",
            Self::Concat => "concat",
            Self::Uppercase => "uppercase",
            Self::Lowercase => "lowercase",
            Self::Trim => "trim",
            Self::Length => "length",
            Self::Substring => "substring",
            Self::Replace => "replace",
            Self::Split => "split",
            Self::Join => "join",
            Self::Template => "template",
            Self::If => "if",
            Self::DefaultValue => "defaultValue",
            Self::Switch => "switch",
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Average => "average",
            Self::Min => "min",
            Self::Max => "max",
            Self::First => "first",
            Self::Last => "last",
            Self::Distinct => "distinct",
            Self::Flatten => "flatten",
            Self::Sort => "sort",
            Self::Reverse => "reverse",
            Self::ToString => "toString",
            Self::ToNumber => "toNumber",
            Self::ToInteger => "toInteger",
            Self::ToBoolean => "toBoolean",
            Self::Now => "now",
            Self::FormatDate => "formatDate",
            Self::ParseDate => "parseDate",
            Self::AddDays => "addDays",
            Self::DateDiff => "dateDiff",
            Self::Constant => "constant",
            Self::CustomFunction => "customFunction",
            Self::Unknown(name) => name,
        }
    }

    /// Parse a wire name. Never fails; unknown names are preserved.
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .iter()
            .find(|kind| kind.name() == name)
            .cloned()
            .unwrap_or_else(|| Self::Unknown(name.to_string()))
    }

    /// Purity of the standard operation set.
    ///
    /// `now` must be evaluated per use site and custom functions have
    /// unknown side effects.
    pub fn default_purity(&self) -> bool {
        !matches!(self, Self::Now | Self::CustomFunction | Self::Unknown(_))
    }
}

impl From<String> for FunctoidKind {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<FunctoidKind> for String {
    fn from(kind: FunctoidKind) -> Self {
        kind.name().to_string()
    }
}

impl fmt::Display for FunctoidKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Metadata for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationInfo {
    /// Safe to evaluate once and reuse the result
    pub pure: bool,
    /// Human-readable name, used for shared-value name hints
    pub display_name: String,
}

/// The set of operations a compilation may use
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    operations: HashMap<FunctoidKind, OperationInfo>,
}

impl OperationRegistry {
    /// Empty registry; every node compiles to `null`
    pub fn new() -> Self {
        Self::default()
    }

    /// The full built-in operation table
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for kind in FunctoidKind::ALL {
            registry.insert(
                kind.clone(),
                OperationInfo {
                    pure: kind.default_purity(),
                    display_name: display_name(kind.name()),
                },
            );
        }
        registry
    }

    pub fn insert(&mut self, kind: FunctoidKind, info: OperationInfo) {
        self.operations.insert(kind, info);
    }

    /// Builder-style removal, for restricted operation sets
    pub fn without(mut self, kind: &FunctoidKind) -> Self {
        self.operations.remove(kind);
        self
    }

    pub fn get(&self, kind: &FunctoidKind) -> Option<&OperationInfo> {
        self.operations.get(kind)
    }

    pub fn contains(&self, kind: &FunctoidKind) -> bool {
        self.operations.contains_key(kind)
    }

    /// Unregistered kinds are treated as impure
    pub fn is_pure(&self, kind: &FunctoidKind) -> bool {
        self.get(kind).map(|info| info.pure).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// `lessThanOrEqual` -> `Less Than Or Equal`
fn display_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if i == 0 {
            result.push(c.to_ascii_uppercase());
        } else if c.is_ascii_uppercase() {
            result.push(' ');
            result.push(c);
        } else {
            result.push(c);
        }
    }
    result
}
