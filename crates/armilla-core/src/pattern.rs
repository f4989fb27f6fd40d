//! Patterns, as used by `case` expressions and `activate ... when` branches.

use std::fmt;

use crate::identifier::{Ident, PathId};
use crate::markup::ProtectedItem;
use crate::numeric::{self, IntegerInfo};
use crate::span::Span;

/// A pattern node.
#[derive(Debug)]
pub struct Pattern {
    pub kind: PatternKind,
    pub span: Span,
}

/// The closed set of pattern variants.
#[derive(Debug)]
pub enum PatternKind {
    /// A path, e.g. an enum tag `M::On`.
    Path(PathId),
    /// A variant pattern `path _`, `path {}` or `path { id }`.
    Variant {
        path: PathId,
        capture: VariantCapture,
    },
    /// A character literal, source text kept verbatim (e.g. `'a'`).
    Char(String),
    /// An integer literal, with optional leading minus.
    Int { text: String, minus: bool },
    /// `true` or `false`.
    Bool(bool),
    /// `_`
    Underscore,
    /// `default`
    Default,
    /// A pattern that could not be structured.
    Protected(ProtectedItem),
}

/// The capture part of a variant pattern.
#[derive(Debug)]
pub enum VariantCapture {
    /// `path _`
    Underscore,
    /// `path {}`
    Empty,
    /// `path { id }`
    Capture(Ident),
}

impl Pattern {
    pub fn new(kind: PatternKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// For an integer pattern, the parsed integer description.
    pub fn as_integer(&self) -> Option<IntegerInfo> {
        match &self.kind {
            PatternKind::Int { text, minus } => numeric::parse_integer(text, *minus),
            _ => None,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PatternKind::Path(path) => write!(f, "{}", path),
            PatternKind::Variant { path, capture } => match capture {
                VariantCapture::Underscore => write!(f, "{} _", path),
                VariantCapture::Empty => write!(f, "{} {{ }}", path),
                VariantCapture::Capture(id) => write!(f, "{} {{ {} }}", path, id),
            },
            PatternKind::Char(text) => write!(f, "{}", text),
            PatternKind::Int { text, minus } => {
                if *minus {
                    write!(f, "-{}", text)
                } else {
                    write!(f, "{}", text)
                }
            }
            PatternKind::Bool(value) => write!(f, "{}", if *value { "true" } else { "false" }),
            PatternKind::Underscore => write!(f, "_"),
            PatternKind::Default => write!(f, "default"),
            PatternKind::Protected(item) => write!(f, "{}", item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Id;

    #[test]
    fn test_pattern_display() {
        let path = Pattern::new(
            PatternKind::Path(PathId::from_parts(&["M", "On"])),
            Span::default(),
        );
        assert_eq!(path.to_string(), "M::On");

        let wildcard = Pattern::new(PatternKind::Underscore, Span::default());
        assert_eq!(wildcard.to_string(), "_");

        let default = Pattern::new(PatternKind::Default, Span::default());
        assert_eq!(default.to_string(), "default");

        let int = Pattern::new(
            PatternKind::Int {
                text: "3".into(),
                minus: true,
            },
            Span::default(),
        );
        assert_eq!(int.to_string(), "-3");
    }

    #[test]
    fn test_variant_pattern_display() {
        let path = || PathId::from_parts(&["Opt", "Some"]);
        let underscore = Pattern::new(
            PatternKind::Variant {
                path: path(),
                capture: VariantCapture::Underscore,
            },
            Span::default(),
        );
        assert_eq!(underscore.to_string(), "Opt::Some _");

        let capture = Pattern::new(
            PatternKind::Variant {
                path: path(),
                capture: VariantCapture::Capture(Ident::new(Id::new("v"), Span::default())),
            },
            Span::default(),
        );
        assert_eq!(capture.to_string(), "Opt::Some { v }");
    }

    #[test]
    fn test_integer_pattern_value() {
        let int = Pattern::new(
            PatternKind::Int {
                text: "0x10".into(),
                minus: false,
            },
            Span::default(),
        );
        assert_eq!(int.as_integer().unwrap().value, 16);
    }
}
