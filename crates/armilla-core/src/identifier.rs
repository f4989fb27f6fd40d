//! Identifier management using string interning for efficient storage and comparison.
//!
//! This module provides the [`Id`] type with a string-interner based
//! representation, plus the composite identifier forms of the language:
//! [`Ident`] (an identifier occurrence in source, with pragmas), [`PathId`]
//! (a `P1::P2::id` path), [`ModulePath`] (a unit name) and [`Luid`] (a
//! locally-unique instance identifier, written `#name`).

use std::{
    fmt,
    sync::{Mutex, OnceLock},
};

use string_interner::{DefaultStringInterner, DefaultSymbol};

use crate::span::Span;

/// Global string interner for efficient identifier storage.
///
/// Uses `Mutex` for thread-safe access to the string interner.
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn interner() -> &'static Mutex<DefaultStringInterner> {
    INTERNER.get_or_init(|| Mutex::new(DefaultStringInterner::new()))
}

/// Efficient identifier type using string interning.
///
/// Two `Id`s created from the same text compare equal and share storage.
/// Equality of `Id`s is textual; node identity in the object model is by
/// reference, not by `Id` equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    /// Creates an `Id` from `&str`.
    pub fn new(name: &str) -> Self {
        let mut interner = interner().lock().expect("Failed to acquire interner lock");
        Self(interner.get_or_intern(name))
    }

    /// Resolve the identifier back to its string form.
    pub fn resolve(&self) -> String {
        let interner = interner().lock().expect("Failed to acquire interner lock");
        interner
            .resolve(self.0)
            .expect("Symbol should exist in interner")
            .to_string()
    }

    /// Check whether a string is a well-formed identifier: a letter followed
    /// by letters, digits or underscores.
    pub fn is_valid(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interner = interner().lock().expect("Failed to acquire interner lock");
        let str_value = interner
            .resolve(self.0)
            .expect("Symbol should exist in interner");
        write!(f, "{}", str_value)
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for Id {
    /// Allows direct comparison with string slices: `id == "string"`.
    fn eq(&self, other: &str) -> bool {
        let interner = interner().lock().expect("Failed to acquire interner lock");
        let self_str = interner
            .resolve(self.0)
            .expect("Symbol should exist in interner");
        self_str == other
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

/// A pragma attached to an identifier or declaration.
///
/// Pragmas carry tool-specific data through the model untouched, in the
/// textual form `#pragma key value#end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pragma {
    text: String,
}

impl Pragma {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Raw pragma text, markers included.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Extract `(key, value)` if the pragma is well formed, i.e.
    /// `#pragma key value#end`.
    pub fn key_value(&self) -> Option<(&str, &str)> {
        let body = self.text.strip_prefix("#pragma")?.strip_suffix("#end")?;
        let body = body.trim_start();
        let (key, value) = body.split_once(char::is_whitespace)?;
        if key.is_empty() {
            return None;
        }
        Some((key, value.trim()))
    }
}

impl fmt::Display for Pragma {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// An identifier occurrence in source text.
///
/// Carries the interned [`Id`], the source [`Span`], any attached pragmas,
/// and whether the occurrence is a *name* (written with a leading quote, as
/// in `last 'x`).
#[derive(Debug, Clone)]
pub struct Ident {
    id: Id,
    span: Span,
    pragmas: Vec<Pragma>,
    is_name: bool,
}

impl Ident {
    pub fn new(id: Id, span: Span) -> Self {
        Self {
            id,
            span,
            pragmas: Vec::new(),
            is_name: false,
        }
    }

    pub fn with_pragmas(mut self, pragmas: Vec<Pragma>) -> Self {
        self.pragmas = pragmas;
        self
    }

    pub fn as_name(mut self) -> Self {
        self.is_name = true;
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn pragmas(&self) -> &[Pragma] {
        &self.pragmas
    }

    /// True when the identifier is a name, written `'id`.
    pub fn is_name(&self) -> bool {
        self.is_name
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pragma in &self.pragmas {
            write!(f, "{} ", pragma)?;
        }
        if self.is_name {
            write!(f, "'")?;
        }
        write!(f, "{}", self.id)
    }
}

/// A path identifier, i.e. `P1::P2::id`.
#[derive(Debug, Clone)]
pub struct PathId {
    ids: Vec<Ident>,
    span: Span,
}

impl PathId {
    pub fn new(ids: Vec<Ident>, span: Span) -> Self {
        debug_assert!(!ids.is_empty(), "PathId must have at least one segment");
        Self { ids, span }
    }

    /// Build a path from plain strings, with a default span. Convenient for
    /// programmatic model construction.
    pub fn from_parts(parts: &[&str]) -> Self {
        let ids = parts
            .iter()
            .map(|p| Ident::new(Id::new(p), Span::default()))
            .collect();
        Self {
            ids,
            span: Span::default(),
        }
    }

    pub fn ids(&self) -> &[Ident] {
        &self.ids
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Full name, joining parts with `::`.
    pub fn full_name(&self) -> String {
        self.ids
            .iter()
            .map(|i| i.id().resolve())
            .collect::<Vec<_>>()
            .join("::")
    }

    /// Name part, the last segment of the path.
    pub fn name(&self) -> Id {
        self.ids.last().expect("PathId has at least one segment").id()
    }

    /// The leading segments, without the final name.
    pub fn path(&self) -> &[Ident] {
        &self.ids[..self.ids.len() - 1]
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for ident in &self.ids {
            if !first {
                write!(f, "::")?;
            }
            write!(f, "{}", ident)?;
            first = false;
        }
        Ok(())
    }
}

/// The name of a source unit, e.g. `Car::Control`.
///
/// Unit names are supplied out-of-band with the unit contents (the on-disk
/// form joins segments with `-`, as in `Car-Control.arm`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModulePath {
    ids: Vec<Id>,
}

impl ModulePath {
    pub fn new(ids: Vec<Id>) -> Self {
        Self { ids }
    }

    /// Parse a `::`-separated module path, e.g. `"Car::Control"`.
    pub fn parse(path: &str) -> Option<Self> {
        let ids: Vec<Id> = path
            .split("::")
            .map(str::trim)
            .map(|part| Id::is_valid(part).then(|| Id::new(part)))
            .collect::<Option<_>>()?;
        if ids.is_empty() {
            return None;
        }
        Some(Self { ids })
    }

    /// Parse a file stem in the `id{-id}` form, e.g. `"Car-Control"`.
    pub fn from_file_stem(stem: &str) -> Option<Self> {
        let ids: Vec<Id> = stem
            .split('-')
            .map(|part| Id::is_valid(part).then(|| Id::new(part)))
            .collect::<Option<_>>()?;
        if ids.is_empty() {
            return None;
        }
        Some(Self { ids })
    }

    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    /// Name part, the last segment.
    pub fn name(&self) -> Id {
        *self.ids.last().expect("ModulePath has at least one segment")
    }

    /// Full name, joining parts with `::`.
    pub fn full_name(&self) -> String {
        self.ids
            .iter()
            .map(|i| i.resolve())
            .collect::<Vec<_>>()
            .join("::")
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

/// A locally-unique instance identifier, written `#name` in source.
///
/// LUIDs cross-reference diagram objects and operator instances inside one
/// operator body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Luid(Id);

impl Luid {
    /// Create a LUID; a leading `#` is not kept.
    pub fn new(name: &str) -> Self {
        let name = name.strip_prefix('#').unwrap_or(name);
        Self(Id::new(name))
    }

    pub fn id(&self) -> Id {
        self.0
    }

    pub fn value(&self) -> String {
        self.0.resolve()
    }

    /// True when a LUID body is alphanumeric or `-` characters.
    pub fn is_valid(name: &str) -> bool {
        let name = name.strip_prefix('#').unwrap_or(name);
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}

impl fmt::Display for Luid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_interning() {
        let id1 = Id::new("Regulation");
        let id2 = Id::new("Regulation");
        let id3 = Id::new("Throttle");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
        assert_eq!(id1, "Regulation");
    }

    #[test]
    fn test_id_validity() {
        assert!(Id::is_valid("abc"));
        assert!(Id::is_valid("a1_b2"));
        assert!(!Id::is_valid("_abc"));
        assert!(!Id::is_valid("1abc"));
        assert!(!Id::is_valid(""));
        assert!(!Id::is_valid("a::b"));
    }

    #[test]
    fn test_pragma_key_value() {
        let pragma = Pragma::new("#pragma kcg expand#end");
        assert_eq!(pragma.key_value(), Some(("kcg", "expand")));

        let bad = Pragma::new("pragma kcg expand");
        assert_eq!(bad.key_value(), None);
    }

    #[test]
    fn test_ident_display_with_pragmas() {
        let ident = Ident::new(Id::new("x"), Span::default())
            .with_pragmas(vec![Pragma::new("#pragma cg probe#end")]);
        assert_eq!(ident.to_string(), "#pragma cg probe#end x");
    }

    #[test]
    fn test_ident_name_display() {
        let ident = Ident::new(Id::new("x"), Span::default()).as_name();
        assert_eq!(ident.to_string(), "'x");
    }

    #[test]
    fn test_path_id() {
        let path = PathId::from_parts(&["Car", "Control", "Regulation"]);
        assert_eq!(path.full_name(), "Car::Control::Regulation");
        assert_eq!(path.name(), "Regulation");
        assert_eq!(path.path().len(), 2);
        assert_eq!(path.to_string(), "Car::Control::Regulation");
    }

    #[test]
    fn test_module_path_parse() {
        let path = ModulePath::parse("Car::Control").unwrap();
        assert_eq!(path.full_name(), "Car::Control");
        assert_eq!(path.name(), "Control");

        assert!(ModulePath::parse("").is_none());
        assert!(ModulePath::parse("Car::").is_none());
    }

    #[test]
    fn test_module_path_from_file_stem() {
        let path = ModulePath::from_file_stem("Car-Control").unwrap();
        assert_eq!(path.full_name(), "Car::Control");

        assert!(ModulePath::from_file_stem("Car-").is_none());
    }

    #[test]
    fn test_luid() {
        let luid = Luid::new("#28");
        assert_eq!(luid.value(), "28");
        assert_eq!(luid.to_string(), "#28");

        let bare = Luid::new("my-block");
        assert_eq!(bare.to_string(), "#my-block");

        assert!(Luid::is_valid("#a-1"));
        assert!(!Luid::is_valid("#"));
        assert!(!Luid::is_valid("a b"));
    }
}

#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        /// Interning the same text twice yields equal ids resolving to the text.
        #[test]
        fn id_roundtrip(name in "[a-zA-Z][a-zA-Z0-9_]{0,24}") {
            let id = Id::new(&name);
            prop_assert_eq!(id.resolve(), name.clone());
            prop_assert_eq!(id, Id::new(&name));
        }
    }
}
