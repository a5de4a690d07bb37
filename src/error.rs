//! Error and diagnostic types for compilation and rendering

use std::fmt;

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::position::Position;

/// Category of a compile-time diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A `<%` block with no matching `%>`.
    UnterminatedBlock,
    /// An argument name failed identifier validation.
    InvalidIdentifier,
    /// The generated source failed to compile.
    CompilationFailure,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::UnterminatedBlock => "unterminated block",
            DiagnosticKind::InvalidIdentifier => "invalid identifier",
            DiagnosticKind::CompilationFailure => "compilation failure",
        }
    }
}

/// A compile-time failure with a best-effort template-relative position.
///
/// Positions from errors inside code blocks pass through the position
/// transposer, so lines are reliable while columns may be approximate.
/// `position` is `None` when no location could be inferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub position: Option<Position>,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        message: impl Into<String>,
        position: Option<Position>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            position,
        }
    }

    /// Format the diagnostic with template source context using ariadne.
    pub fn format(&self, source: &str, filename: &str) -> String {
        let offset = match self.position {
            Some(position) => offset_of(source, position),
            None => 0,
        };
        let end = (offset + 1).min(source.len());
        let span = offset..end.max(offset);

        let mut buf = Vec::new();
        let result = Report::build(ReportKind::Error, filename, span.start)
            .with_message(self.kind.as_str())
            .with_label(
                Label::new((filename, span))
                    .with_message(&self.message)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);
        match result {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(position) => write!(f, "{}: {}: {}", position, self.kind.as_str(), self.message),
            None => write!(f, "{}: {}", self.kind.as_str(), self.message),
        }
    }
}

impl std::error::Error for Diagnostic {}

/// Byte offset of a position within `source`, clamped to the end of input.
fn offset_of(source: &str, position: Position) -> usize {
    let mut line = 1u32;
    let mut column = 1u32;
    for (offset, ch) in source.char_indices() {
        if line == position.line && column == position.column {
            return offset;
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    source.len()
}

/// Why an argument name failed identifier validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("variable names must be one or more characters long")]
    Empty,
    #[error("variable name is too short")]
    EscapeOnly,
    #[error("variable names must start with either a letter or the underscore character")]
    IllegalStart,
    #[error("variable names must not contain spaces")]
    Space,
    #[error("variable name contains an illegal character at position {0}")]
    IllegalChar(usize),
    #[error("\"{0}\" is a keyword and cannot be used as a variable name")]
    ReservedWord(String),
}

/// A fault raised while executing a render unit.
///
/// Runtime faults carry no template position: only compile-time diagnostics
/// are translated back through the position transposer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("cannot convert {value} to {target}")]
    BadCast {
        value: String,
        target: &'static str,
    },
    #[error("argument index {0} is out of range")]
    ArgumentOutOfRange(i64),
    #[error("division by zero")]
    DivisionByZero,
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("'{function}' expects {expected} argument(s), found {found}")]
    WrongArity {
        function: String,
        expected: usize,
        found: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display_with_position() {
        let diag = Diagnostic::new(
            DiagnosticKind::UnterminatedBlock,
            "block opened with '<%' is never closed",
            Some(Position::new(2, 5)),
        );
        assert_eq!(
            diag.to_string(),
            "2:5: unterminated block: block opened with '<%' is never closed"
        );
    }

    #[test]
    fn test_diagnostic_display_without_position() {
        let diag = Diagnostic::new(DiagnosticKind::InvalidIdentifier, "bad name", None);
        assert_eq!(diag.to_string(), "invalid identifier: bad name");
    }

    #[test]
    fn test_offset_of() {
        let source = "ab\ncde\nf";
        assert_eq!(offset_of(source, Position::new(1, 1)), 0);
        assert_eq!(offset_of(source, Position::new(2, 1)), 3);
        assert_eq!(offset_of(source, Position::new(2, 3)), 5);
        assert_eq!(offset_of(source, Position::new(3, 1)), 7);
        // Past the end clamps to the input length
        assert_eq!(offset_of(source, Position::new(9, 9)), source.len());
    }

    #[test]
    fn test_format_includes_message_and_location() {
        let source = "line one\nline <% two";
        let diag = Diagnostic::new(
            DiagnosticKind::UnterminatedBlock,
            "block opened with '<%' is never closed",
            Some(Position::new(2, 6)),
        );
        let report = diag.format(source, "template");
        assert!(report.contains("unterminated block"));
        assert!(report.contains("never closed"));
    }

    #[test]
    fn test_identifier_error_messages() {
        assert_eq!(
            IdentifierError::ReservedWord("while".into()).to_string(),
            "\"while\" is a keyword and cannot be used as a variable name"
        );
        assert_eq!(
            IdentifierError::IllegalChar(3).to_string(),
            "variable name contains an illegal character at position 3"
        );
    }
}
