//! Protected fragments and protection markups.
//!
//! Whenever the parser cannot structure a span, or the source explicitly
//! delimits a region to preserve verbatim, the model stores a
//! [`ProtectedItem`] carrying the exact original text. Rendering a tree that
//! contains one reproduces that text unchanged — this round-trip guarantee is
//! load-bearing for the whole model.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::span::Span;

/// Protection markups used by the serialization, written `{markup% text %markup}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Markup {
    /// Syntax error in a construct.
    Syntax,
    /// Syntax error in a variable declaration.
    Var,
    /// Syntax error in a group declaration.
    Group,
    /// Syntax error in a sensor declaration.
    Sensor,
    /// Syntax error in a constant declaration.
    Const,
    /// Syntax error in a type declaration.
    Type,
    /// Syntax error in a use directive.
    Use,
    /// Operator signature in an interface.
    Signature,
    /// User textual operator, or generic operator content.
    Text,
    /// User textual operator with a syntax error.
    SyntaxText,
    /// Empty body.
    Empty,
    /// Protected instance id.
    Inst,
    /// Operator expression.
    OpExpr,
    /// Iteration dimension.
    Dim,
}

impl Markup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Markup::Syntax => "syntax",
            Markup::Var => "var",
            Markup::Group => "group",
            Markup::Sensor => "sensor",
            Markup::Const => "const",
            Markup::Type => "type",
            Markup::Use => "use",
            Markup::Signature => "signature",
            Markup::Text => "text",
            Markup::SyntaxText => "syntax_text",
            Markup::Empty => "empty",
            Markup::Inst => "inst",
            Markup::OpExpr => "op_expr",
            Markup::Dim => "dim",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "syntax" => Markup::Syntax,
            "var" => Markup::Var,
            "group" => Markup::Group,
            "sensor" => Markup::Sensor,
            "const" => Markup::Const,
            "type" => Markup::Type,
            "use" => Markup::Use,
            "signature" => Markup::Signature,
            "text" => Markup::Text,
            "syntax_text" => Markup::SyntaxText,
            "empty" => Markup::Empty,
            "inst" => Markup::Inst,
            "op_expr" => Markup::OpExpr,
            "dim" => Markup::Dim,
            _ => return None,
        })
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a protected fragment came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectedOrigin {
    /// The source explicitly delimits the region with `{markup% ... %markup}`.
    /// Rendering re-emits the markup delimiters around the raw text.
    ExplicitMarkup,
    /// The parser could not structure the region. The raw text is the source
    /// span itself; rendering emits it verbatim, with no delimiters added.
    ParserFallback,
}

/// An opaque, span-preserving container for text the parser could not, or was
/// instructed not to, structure.
///
/// Protected fragments are leaves: never mutated, never partially re-parsed.
#[derive(Debug, Clone)]
pub struct ProtectedItem {
    data: String,
    markup: Markup,
    origin: ProtectedOrigin,
    span: Span,
}

impl ProtectedItem {
    /// A fragment explicitly protected in the source with the given markup.
    /// `data` is the text between the markup delimiters, exactly as written.
    pub fn from_markup(markup: Markup, data: impl Into<String>, span: Span) -> Self {
        Self {
            data: data.into(),
            markup,
            origin: ProtectedOrigin::ExplicitMarkup,
            span,
        }
    }

    /// A fragment the parser gave up on. `data` is the whole source span,
    /// exactly as written.
    pub fn from_fallback(markup: Markup, data: impl Into<String>, span: Span) -> Self {
        Self {
            data: data.into(),
            markup,
            origin: ProtectedOrigin::ParserFallback,
            span,
        }
    }

    /// The protected text, markup delimiters excluded.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Protection markup.
    pub fn markup(&self) -> Markup {
        self.markup
    }

    /// Check if the protected data carries the given markup.
    pub fn has_markup(&self, markup: Markup) -> bool {
        self.markup == markup
    }

    pub fn origin(&self) -> ProtectedOrigin {
        self.origin
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// True when the fragment preserves author-written text (`text` or
    /// `syntax_text` markup), as opposed to a span the parser gave up on.
    pub fn is_text(&self) -> bool {
        matches!(self.markup, Markup::Text | Markup::SyntaxText)
    }
}

impl fmt::Display for ProtectedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin {
            ProtectedOrigin::ExplicitMarkup => {
                write!(f, "{{{}%{}%{}}}", self.markup, self.data, self.markup)
            }
            ProtectedOrigin::ParserFallback => write!(f, "{}", self.data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_round_trip() {
        for markup in [
            Markup::Syntax,
            Markup::Var,
            Markup::Group,
            Markup::Sensor,
            Markup::Const,
            Markup::Type,
            Markup::Use,
            Markup::Signature,
            Markup::Text,
            Markup::SyntaxText,
            Markup::Empty,
            Markup::Inst,
            Markup::OpExpr,
            Markup::Dim,
        ] {
            assert_eq!(Markup::from_str(markup.as_str()), Some(markup));
        }
        assert_eq!(Markup::from_str("unknown"), None);
    }

    #[test]
    fn test_explicit_markup_renders_with_delimiters() {
        let item = ProtectedItem::from_markup(Markup::Syntax, " x = ; ", Span::new(0..7));
        assert_eq!(item.to_string(), "{syntax% x = ; %syntax}");
        assert!(!item.is_text());
    }

    #[test]
    fn test_fallback_renders_verbatim() {
        let raw = "node Broken (i: ) returns";
        let item = ProtectedItem::from_fallback(Markup::Syntax, raw, Span::new(0..raw.len()));
        assert_eq!(item.to_string(), raw);
    }

    #[test]
    fn test_is_text() {
        let item = ProtectedItem::from_markup(Markup::Text, "let o = i;", Span::default());
        assert!(item.is_text());
        assert!(item.has_markup(Markup::Text));
        assert!(!item.has_markup(Markup::Syntax));
    }

    #[test]
    fn test_round_trip_preserves_every_byte() {
        let data = "  weird \t bytes \u{00e9} %syntax-ish ";
        let item = ProtectedItem::from_markup(Markup::Text, data, Span::default());
        let rendered = item.to_string();
        assert_eq!(rendered, format!("{{text%{data}%text}}"));
        assert_eq!(item.data(), data);
    }
}
