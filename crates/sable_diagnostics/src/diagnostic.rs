//! Structured diagnostic messages with severity, codes, and labels.

use crate::code::DiagCode;
use crate::label::Label;
use crate::severity::Severity;
use sable_source::Span;
use serde::{Deserialize, Serialize};

/// A structured diagnostic message with source locations and labels.
///
/// Diagnostics are the primary mechanism for reporting problems to the user.
/// Each diagnostic includes:
/// - A severity level and a stable [`DiagCode`]
/// - A primary message and source span
/// - Optional secondary labels, notes, and help text
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The stable code identifying the kind of diagnostic.
    pub code: DiagCode,
    /// The main diagnostic message.
    pub message: String,
    /// The primary source span where the issue was detected.
    pub primary_span: Span,
    /// Additional annotated source spans providing context.
    pub labels: Vec<Label>,
    /// Explanatory footnotes (e.g., "note: ...").
    pub notes: Vec<String>,
    /// Actionable suggestions (e.g., "help: ...").
    pub help: Vec<String>,
}

impl Diagnostic {
    /// Creates a new diagnostic at the code's default severity.
    pub fn new(code: DiagCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: code.default_severity(),
            code,
            message: message.into(),
            primary_span: span,
            labels: Vec::new(),
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Creates a new error diagnostic regardless of the code's default.
    pub fn error(code: DiagCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            ..Self::new(code, message, span)
        }
    }

    /// Creates a new warning diagnostic regardless of the code's default.
    pub fn warning(code: DiagCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::new(code, message, span)
        }
    }

    /// Adds a label to this diagnostic.
    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Adds a help message to this diagnostic.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_default_severity() {
        let diag = Diagnostic::new(DiagCode::ExpectedToken, "expected ';'", Span::DUMMY);
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(format!("{}", diag.code), "S001");

        let diag = Diagnostic::new(DiagCode::DivideByZero, "division by zero", Span::DUMMY);
        assert_eq!(diag.severity, Severity::Warning);
    }

    #[test]
    fn explicit_severity_constructors() {
        let diag = Diagnostic::error(DiagCode::DivideByZero, "division by zero", Span::DUMMY);
        assert_eq!(diag.severity, Severity::Error);
        let diag = Diagnostic::warning(DiagCode::ExpectedToken, "odd", Span::DUMMY);
        assert_eq!(diag.severity, Severity::Warning);
    }

    #[test]
    fn builder_methods() {
        let diag = Diagnostic::new(DiagCode::BadAssignment, "type mismatch", Span::DUMMY)
            .with_label(Label::primary(Span::DUMMY, "expected logic [7:0]"))
            .with_note("types must be assignment compatible")
            .with_help("consider an explicit cast");
        assert_eq!(diag.labels.len(), 1);
        assert_eq!(diag.notes.len(), 1);
        assert_eq!(diag.help.len(), 1);
    }
}
