//! Diagnostic rendering backends for human-readable output.

use crate::diagnostic::Diagnostic;
use crate::label::LabelStyle;
use sable_source::SourceDb;

/// Trait for rendering diagnostics into formatted output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic, source_db: &SourceDb) -> String;
}

/// Renders diagnostics in a rustc-style terminal format.
///
/// Produces output like:
/// ```text
/// error[E009]: maximum instance depth of 128 exceeded
///   --> src/top.sv:10:5
///    |
/// 10 |     m u();
///    |     ^^^^^^
///    |
///    = note: ...
/// ```
pub struct TerminalRenderer;

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic, source_db: &SourceDb) -> String {
        let mut out = String::new();

        // Header line: severity[CODE]: message
        out.push_str(&format!(
            "{}[{}]: {}\n",
            diag.severity, diag.code, diag.message
        ));

        // Location line
        if !diag.primary_span.is_dummy() {
            let resolved = source_db.resolve_span(diag.primary_span);
            out.push_str(&format!("  --> {resolved}\n"));

            // Source line with underline
            let file = source_db.get_file(diag.primary_span.file);
            let (line, col) = file.line_col(diag.primary_span.start);
            let line_num = format!("{line}");
            let padding = " ".repeat(line_num.len());

            let line_content = get_source_line(&file.content, diag.primary_span.start);

            out.push_str(&format!("{padding} |\n"));
            out.push_str(&format!("{line_num} | {line_content}\n"));

            // Underline, clipped to the visible line
            let span_len = (diag.primary_span.end - diag.primary_span.start).max(1) as usize;
            let max_len = line_content.len().saturating_sub(col as usize - 1).max(1);
            let carets = "^".repeat(span_len.min(max_len));
            let col_padding = " ".repeat((col as usize).saturating_sub(1));

            let primary_msg = diag
                .labels
                .iter()
                .find(|l| l.style == LabelStyle::Primary)
                .map(|l| format!(" {}", l.message))
                .unwrap_or_default();

            out.push_str(&format!("{padding} | {col_padding}{carets}{primary_msg}\n"));
        }

        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }

        out
    }
}

/// Extracts the line of source code containing the given byte offset.
fn get_source_line(content: &str, byte_offset: u32) -> &str {
    let offset = (byte_offset as usize).min(content.len());
    let start = content[..offset].rfind('\n').map_or(0, |pos| pos + 1);
    let end = content[offset..]
        .find('\n')
        .map_or(content.len(), |pos| offset + pos);
    &content[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::DiagCode;
    use crate::label::Label;

    #[test]
    fn render_error_with_span() {
        let mut source_db = SourceDb::new();
        let file_id = source_db.add_source("test.sv", "logic [7:0] data\n".to_string());

        let span = sable_source::Span::new(file_id, 16, 17);
        let diag = Diagnostic::new(DiagCode::ExpectedToken, "expected ';'", span)
            .with_label(Label::primary(span, "expected ';' here"));

        let renderer = TerminalRenderer::new();
        let output = renderer.render(&diag, &source_db);

        assert!(output.contains("error[S001]: expected ';'"));
        assert!(output.contains("--> test.sv:1:17"));
        assert!(output.contains("logic [7:0] data"));
        assert!(output.contains("^"));
    }

    #[test]
    fn render_warning_with_notes() {
        let source_db = SourceDb::new();
        let diag = Diagnostic::new(
            DiagCode::DivideByZero,
            "division by zero",
            sable_source::Span::DUMMY,
        )
        .with_note("the result is entirely X");

        let renderer = TerminalRenderer::new();
        let output = renderer.render(&diag, &source_db);

        assert!(output.contains("warning[X003]: division by zero"));
        assert!(output.contains("= note: the result is entirely X"));
    }
}
