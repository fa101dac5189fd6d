//! Diagnostics
//!
//! Collects the degradations a compilation applied (dropped edges, nodes
//! that could not be built, operations that fell back to defaults). Nothing
//! here blocks compilation; every item is also emitted as a `tracing` event.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Diagnostic code for categorizing issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // === Sanitation ===
    /// Edge endpoint references a node that does not exist
    OrphanEdge,
    /// Edge handle does not resolve in the (overlaid) schema
    UnresolvedHandle,

    // === Building ===
    /// Node is part of a dependency cycle
    CyclicDependency,
    /// Node has an input edge from a node that does not exist
    MissingInput,
    /// Node depends on another node that could not be built
    UpstreamUnbuilt,
    /// Node kind is not in the operation registry
    UnknownOperation,
    /// Template config failed validation
    InvalidTemplate,
    /// Constant config could not be parsed as its declared type
    MalformedConstant,

    // === Rewriting ===
    /// A reference points at a node that was never built
    UnbuildableReference,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrphanEdge => "W001",
            Self::UnresolvedHandle => "W002",
            Self::CyclicDependency => "E001",
            Self::MissingInput => "W003",
            Self::UpstreamUnbuilt => "I001",
            Self::UnknownOperation => "W004",
            Self::InvalidTemplate => "W005",
            Self::MalformedConstant => "I002",
            Self::UnbuildableReference => "W006",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::CyclicDependency => Severity::Error,

            Self::OrphanEdge
            | Self::UnresolvedHandle
            | Self::MissingInput
            | Self::UnknownOperation
            | Self::InvalidTemplate
            | Self::UnbuildableReference => Severity::Warning,

            Self::UpstreamUnbuilt | Self::MalformedConstant => Severity::Info,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Diagnostic Item
// =============================================================================

/// A single diagnostic item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// Node or edge id the diagnostic is about
    pub subject: String,
    pub code: DiagnosticCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl DiagnosticItem {
    pub fn new(subject: impl Into<String>, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.code,
            self.code.severity(),
            self.message,
            self.subject
        )?;

        for ctx in &self.context {
            write!(f, "\n  - {}", ctx)?;
        }

        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Collection of diagnostics from one compilation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an item and emit it on the log
    pub fn push(&mut self, item: DiagnosticItem) {
        match item.severity() {
            Severity::Error | Severity::Warning => tracing::warn!(
                code = %item.code,
                subject = %item.subject,
                "{}",
                item.message
            ),
            Severity::Info => tracing::debug!(
                code = %item.code,
                subject = %item.subject,
                "{}",
                item.message
            ),
        }
        self.items.push(item);
    }

    /// Edge dropped because an endpoint does not exist
    pub fn orphan_edge(&mut self, edge_id: &str, missing: &str) {
        self.push(DiagnosticItem::new(
            edge_id,
            DiagnosticCode::OrphanEdge,
            format!("Edge references missing endpoint '{}', removed", missing),
        ));
    }

    /// Edge dropped because its handle is not in the schema
    pub fn unresolved_handle(&mut self, edge_id: &str, handle: &str, side: &str) {
        self.push(
            DiagnosticItem::new(
                edge_id,
                DiagnosticCode::UnresolvedHandle,
                format!("Handle '{}' not found in {} schema, edge removed", handle, side),
            )
            .with_context(format!("Side: {}", side)),
        );
    }

    /// Reference to a node that was never built
    pub fn unbuildable_reference(&mut self, node_id: &str) {
        self.push(DiagnosticItem::new(
            node_id,
            DiagnosticCode::UnbuildableReference,
            format!("Reference to unbuilt node '{}' compiled to null", node_id),
        ));
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|i| i.severity() == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Warning)
    }

    /// Items carrying a specific code
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(move |i| i.code == code)
    }

    pub fn all(&self) -> &[DiagnosticItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Format all diagnostics for display
    pub fn format_all(&self) -> String {
        let mut output = String::new();

        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }

        if self.has_errors() {
            output.push_str(&format!(
                "\n{} error(s), {} warning(s)\n",
                self.error_count(),
                self.warning_count()
            ));
        } else if !self.is_empty() {
            output.push_str(&format!("\n{} warning(s)\n", self.warning_count()));
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl IntoIterator for Diagnostics {
    type Item = DiagnosticItem;
    type IntoIter = std::vec::IntoIter<DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagnosticItem;
    type IntoIter = std::slice::Iter<'a, DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_severity() {
        assert_eq!(DiagnosticCode::CyclicDependency.severity(), Severity::Error);
        assert_eq!(DiagnosticCode::OrphanEdge.severity(), Severity::Warning);
        assert_eq!(DiagnosticCode::MalformedConstant.severity(), Severity::Info);
    }

    #[test]
    fn test_diagnostics_collection() {
        let mut diags = Diagnostics::new();
        diags.orphan_edge("e1", "ghost");
        diags.push(DiagnosticItem::new("n1", DiagnosticCode::CyclicDependency, "cycle"));

        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.warning_count(), 1);
        assert!(diags.has_errors());
        assert_eq!(diags.with_code(DiagnosticCode::OrphanEdge).count(), 1);
    }

    #[test]
    fn test_display_includes_context() {
        let item = DiagnosticItem::new("e1", DiagnosticCode::UnresolvedHandle, "gone")
            .with_context("Side: source");
        let text = item.to_string();
        assert!(text.starts_with("[W002] warning: gone (e1)"));
        assert!(text.contains("\n  - Side: source"));
    }
}
