//! Parse diagnostics.
//!
//! Diagnostics carry a message, a span and an error code. [`ParseError`]
//! wraps one or more diagnostics produced during lexing or parsing. The
//! model layer turns a whole-unit [`ParseError`] into a protected
//! declaration instead of failing the load.

use std::fmt;

use armilla_core::Span;
use thiserror::Error;

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Unexpected character.
    E001,
    /// Unterminated character literal.
    E002,
    /// Unterminated protected region.
    E003,
    /// Unterminated pragma.
    E004,
    /// Malformed declaration.
    E100,
    /// Malformed equation.
    E101,
    /// Malformed expression.
    E102,
    /// Malformed diagram object.
    E103,
    /// Structural invariant broken by the parsed source.
    E200,
}

impl ErrorCode {
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "unexpected character",
            ErrorCode::E002 => "unterminated character literal",
            ErrorCode::E003 => "unterminated protected region",
            ErrorCode::E004 => "unterminated pragma",
            ErrorCode::E100 => "malformed declaration",
            ErrorCode::E101 => "malformed equation",
            ErrorCode::E102 => "malformed expression",
            ErrorCode::E103 => "malformed diagram object",
            ErrorCode::E200 => "structural invariant broken",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A single diagnostic with location information.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    message: String,
    code: ErrorCode,
    span: Span,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, code: ErrorCode, span: Span) -> Self {
        Self {
            message: message.into(),
            code,
            span,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn span(&self) -> Span {
        self.span
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error[{}]: {} at {}",
            self.code, self.message, self.span
        )
    }
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    match diagnostics {
        [] => String::new(),
        [first] => first.to_string(),
        [first, rest @ ..] => format!("{} (+{} more)", first, rest.len()),
    }
}

/// Error type for the parsing lifecycle; wraps one or more diagnostics.
#[derive(Debug, Error)]
#[error("{}", summarize(.diagnostics))]
pub struct ParseError {
    diagnostics: Vec<Diagnostic>,
}

impl ParseError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl From<Diagnostic> for ParseError {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            diagnostics: vec![diagnostic],
        }
    }
}

impl From<Vec<Diagnostic>> for ParseError {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_single() {
        let diag = Diagnostic::new("unexpected character", ErrorCode::E001, Span::new(4..5));
        let err: ParseError = diag.into();
        assert_eq!(err.to_string(), "error[E001]: unexpected character at 4..5");
    }

    #[test]
    fn test_parse_error_display_multiple() {
        let diags = vec![
            Diagnostic::new("first", ErrorCode::E001, Span::default()),
            Diagnostic::new("second", ErrorCode::E002, Span::default()),
        ];
        let err: ParseError = diags.into();
        assert_eq!(err.to_string(), "error[E001]: first at 0..0 (+1 more)");
    }
}
