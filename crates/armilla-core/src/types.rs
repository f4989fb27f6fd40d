//! Type expressions and type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::expr::Expr;
use crate::identifier::{Ident, PathId};
use crate::markup::ProtectedItem;
use crate::span::Span;

/// Predefined types of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredefinedType {
    Bool,
    Char,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
}

impl PredefinedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredefinedType::Bool => "bool",
            PredefinedType::Char => "char",
            PredefinedType::Int8 => "int8",
            PredefinedType::Int16 => "int16",
            PredefinedType::Int32 => "int32",
            PredefinedType::Int64 => "int64",
            PredefinedType::Uint8 => "uint8",
            PredefinedType::Uint16 => "uint16",
            PredefinedType::Uint32 => "uint32",
            PredefinedType::Uint64 => "uint64",
            PredefinedType::Float32 => "float32",
            PredefinedType::Float64 => "float64",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "bool" => PredefinedType::Bool,
            "char" => PredefinedType::Char,
            "int8" => PredefinedType::Int8,
            "int16" => PredefinedType::Int16,
            "int32" => PredefinedType::Int32,
            "int64" => PredefinedType::Int64,
            "uint8" => PredefinedType::Uint8,
            "uint16" => PredefinedType::Uint16,
            "uint32" => PredefinedType::Uint32,
            "uint64" => PredefinedType::Uint64,
            "float32" => PredefinedType::Float32,
            "float64" => PredefinedType::Float64,
            _ => return None,
        })
    }
}

impl fmt::Display for PredefinedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Numeric kinds for generic type constraints (`where 'T numeric`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericKind {
    Numeric,
    Integer,
    Signed,
    Unsigned,
    Float,
}

impl NumericKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NumericKind::Numeric => "numeric",
            NumericKind::Integer => "integer",
            NumericKind::Signed => "signed",
            NumericKind::Unsigned => "unsigned",
            NumericKind::Float => "float",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "numeric" => NumericKind::Numeric,
            "integer" => NumericKind::Integer,
            "signed" => NumericKind::Signed,
            "unsigned" => NumericKind::Unsigned,
            "float" => NumericKind::Float,
            _ => return None,
        })
    }
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A type expression node.
#[derive(Debug)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

/// The closed set of type expression variants.
#[derive(Debug)]
pub enum TypeExprKind {
    /// A predefined type, e.g. `int32`.
    Predefined(PredefinedType),
    /// `signed <<expr>>` or `unsigned <<expr>>`.
    Sized { size: Box<Expr>, is_signed: bool },
    /// A path to a declared type, e.g. `M::t`.
    Alias(PathId),
    /// A type variable, e.g. `'T`.
    Variable(Ident),
    /// A structure type, e.g. `{x: int32, y: int32}`.
    Struct(Vec<StructField>),
    /// An array type, e.g. `int32 ^ 3`.
    Array {
        elem: Box<TypeExpr>,
        size: Box<Expr>,
    },
    /// A type expression that could not be structured.
    Protected(ProtectedItem),
}

impl TypeExpr {
    pub fn new(kind: TypeExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeExprKind::Predefined(predef) => write!(f, "{}", predef),
            TypeExprKind::Sized { size, is_signed } => {
                let kind = if *is_signed { "signed" } else { "unsigned" };
                write!(f, "{} <<{}>>", kind, size)
            }
            TypeExprKind::Alias(path) => write!(f, "{}", path),
            TypeExprKind::Variable(var) => write!(f, "{}", var),
            TypeExprKind::Struct(fields) => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field)?;
                }
                write!(f, "}}")
            }
            TypeExprKind::Array { elem, size } => write!(f, "{}^{}", elem, size),
            TypeExprKind::Protected(item) => write!(f, "{}", item),
        }
    }
}

/// A structure field, `id: type_expr`.
#[derive(Debug)]
pub struct StructField {
    pub name: Ident,
    pub ty: TypeExpr,
    pub span: Span,
}

impl fmt::Display for StructField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

/// The right-hand side of a type declaration.
#[derive(Debug)]
pub enum TypeDefinition {
    /// `type t = type_expr`
    Expr(TypeExpr),
    /// `type t = enum {A, B}`
    Enum { tags: Vec<Ident> },
    /// `type t = A { te } | B {}`
    Variant { cases: Vec<VariantCase> },
}

impl fmt::Display for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDefinition::Expr(te) => write!(f, "{}", te),
            TypeDefinition::Enum { tags } => {
                write!(f, "enum {{")?;
                for (i, tag) in tags.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", tag)?;
                }
                write!(f, "}}")
            }
            TypeDefinition::Variant { cases } => {
                for (i, case) in cases.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", case)?;
                }
                Ok(())
            }
        }
    }
}

/// One case of a variant type definition: `Tag { type_expr? }`.
#[derive(Debug)]
pub struct VariantCase {
    pub tag: Ident,
    pub ty: Option<TypeExpr>,
    pub span: Span,
}

impl fmt::Display for VariantCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ty {
            Some(te) if matches!(te.kind, TypeExprKind::Struct(_)) => {
                write!(f, "{} {}", self.tag, te)
            }
            Some(te) => write!(f, "{} {{ {} }}", self.tag, te),
            None => write!(f, "{} {{}}", self.tag),
        }
    }
}

/// A group type expression: a plain type or a positional-then-named list.
#[derive(Debug)]
pub struct GroupTypeExpr {
    pub kind: GroupTypeExprKind,
    pub span: Span,
}

#[derive(Debug)]
pub enum GroupTypeExprKind {
    /// A single type expression.
    Single(TypeExpr),
    /// `(t1, t2, n1: t3, n2: t4)` — positional items first, then named items.
    List {
        positional: Vec<GroupTypeExpr>,
        named: Vec<NamedGroupType>,
    },
}

impl GroupTypeExpr {
    pub fn new(kind: GroupTypeExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

impl fmt::Display for GroupTypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            GroupTypeExprKind::Single(te) => write!(f, "{}", te),
            GroupTypeExprKind::List { positional, named } => {
                write!(f, "(")?;
                let mut first = true;
                for item in positional {
                    if !first {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                    first = false;
                }
                for item in named {
                    if !first {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                    first = false;
                }
                write!(f, ")")
            }
        }
    }
}

/// A named item in a group type list: `id: group_type_expr`.
#[derive(Debug)]
pub struct NamedGroupType {
    pub name: Ident,
    pub ty: GroupTypeExpr,
    pub span: Span,
}

impl fmt::Display for NamedGroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Expr, ExprKind, Literal};
    use crate::identifier::Id;

    fn int_expr(text: &str) -> Expr {
        Expr::new(
            ExprKind::Literal(Literal::integer(text)),
            Span::default(),
        )
    }

    fn ident(name: &str) -> Ident {
        Ident::new(Id::new(name), Span::default())
    }

    #[test]
    fn test_predefined_round_trip() {
        for predef in [
            PredefinedType::Bool,
            PredefinedType::Char,
            PredefinedType::Int8,
            PredefinedType::Uint64,
            PredefinedType::Float32,
        ] {
            assert_eq!(PredefinedType::from_str(predef.as_str()), Some(predef));
        }
        assert_eq!(PredefinedType::from_str("int128"), None);
    }

    #[test]
    fn test_numeric_kind_round_trip() {
        assert_eq!(NumericKind::from_str("numeric"), Some(NumericKind::Numeric));
        assert_eq!(NumericKind::from_str("float"), Some(NumericKind::Float));
        assert_eq!(NumericKind::from_str("complex"), None);
    }

    #[test]
    fn test_array_type_display() {
        let ty = TypeExpr::new(
            TypeExprKind::Array {
                elem: Box::new(TypeExpr::new(
                    TypeExprKind::Predefined(PredefinedType::Int32),
                    Span::default(),
                )),
                size: Box::new(int_expr("3")),
            },
            Span::default(),
        );
        assert_eq!(ty.to_string(), "int32^3");
    }

    #[test]
    fn test_struct_type_display() {
        let ty = TypeExpr::new(
            TypeExprKind::Struct(vec![
                StructField {
                    name: ident("x"),
                    ty: TypeExpr::new(
                        TypeExprKind::Predefined(PredefinedType::Int32),
                        Span::default(),
                    ),
                    span: Span::default(),
                },
                StructField {
                    name: ident("y"),
                    ty: TypeExpr::new(
                        TypeExprKind::Predefined(PredefinedType::Float32),
                        Span::default(),
                    ),
                    span: Span::default(),
                },
            ]),
            Span::default(),
        );
        assert_eq!(ty.to_string(), "{x: int32, y: float32}");
    }

    #[test]
    fn test_enum_definition_display() {
        let def = TypeDefinition::Enum {
            tags: vec![ident("On"), ident("Off")],
        };
        assert_eq!(def.to_string(), "enum {On, Off}");
    }

    #[test]
    fn test_variant_definition_display() {
        let def = TypeDefinition::Variant {
            cases: vec![
                VariantCase {
                    tag: ident("Some"),
                    ty: Some(TypeExpr::new(
                        TypeExprKind::Predefined(PredefinedType::Int32),
                        Span::default(),
                    )),
                    span: Span::default(),
                },
                VariantCase {
                    tag: ident("None"),
                    ty: None,
                    span: Span::default(),
                },
            ],
        };
        assert_eq!(def.to_string(), "Some { int32 } | None {}");
    }

    #[test]
    fn test_group_type_list_display() {
        let gt = GroupTypeExpr::new(
            GroupTypeExprKind::List {
                positional: vec![GroupTypeExpr::new(
                    GroupTypeExprKind::Single(TypeExpr::new(
                        TypeExprKind::Predefined(PredefinedType::Int32),
                        Span::default(),
                    )),
                    Span::default(),
                )],
                named: vec![NamedGroupType {
                    name: ident("n"),
                    ty: GroupTypeExpr::new(
                        GroupTypeExprKind::Single(TypeExpr::new(
                            TypeExprKind::Predefined(PredefinedType::Bool),
                            Span::default(),
                        )),
                        Span::default(),
                    ),
                    span: Span::default(),
                }],
            },
            Span::default(),
        );
        assert_eq!(gt.to_string(), "(int32, n: bool)");
    }
}
