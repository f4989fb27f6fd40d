//! Operator references and operator expressions.
//!
//! An *operator reference* is what gets instantiated in an expression or a
//! diagram block: a path to a declared operator, a prefix primitive, or a
//! parenthesized operator expression (iterator, activation, restart, partial
//! application, n-ary or anonymous operator).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::equation::DataDef;
use crate::expr::{ClockExpr, Expr, GroupItem};
use crate::identifier::{Ident, PathId, Pragma};
use crate::markup::ProtectedItem;
use crate::scope::ScopeSection;
use crate::span::Span;
use crate::variable::VarDecl;

/// Prefix primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefixPrimitiveKind {
    Reverse,
    Pack,
    Flatten,
}

impl PrefixPrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrefixPrimitiveKind::Reverse => "reverse",
            PrefixPrimitiveKind::Pack => "pack",
            PrefixPrimitiveKind::Flatten => "flatten",
        }
    }
}

impl fmt::Display for PrefixPrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Iterator kinds: `map`, `fold`, `mapfold` and their indexed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IteratorKind {
    Map,
    Fold,
    Mapfold,
    Mapi,
    Foldi,
    Mapfoldi,
}

impl IteratorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IteratorKind::Map => "map",
            IteratorKind::Fold => "fold",
            IteratorKind::Mapfold => "mapfold",
            IteratorKind::Mapi => "mapi",
            IteratorKind::Foldi => "foldi",
            IteratorKind::Mapfoldi => "mapfoldi",
        }
    }
}

impl fmt::Display for IteratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// N-ary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NaryOp {
    Plus,
    Mult,
    Land,
    Lor,
    And,
    Or,
    Xor,
    Concat,
}

impl NaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            NaryOp::Plus => "+",
            NaryOp::Mult => "*",
            NaryOp::Land => "land",
            NaryOp::Lor => "lor",
            NaryOp::And => "and",
            NaryOp::Or => "or",
            NaryOp::Xor => "xor",
            NaryOp::Concat => "@",
        }
    }
}

impl fmt::Display for NaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The indices of a `transpose`; protected when syntactically incorrect.
#[derive(Debug)]
pub enum TransposeParams {
    Indices(Vec<u32>),
    Protected(ProtectedItem),
}

/// An operator reference with optional size parameters:
/// `prefix_op [<<sizes>>]`.
#[derive(Debug)]
pub struct OperatorRef {
    pub kind: OperatorRefKind,
    pub sizes: Vec<Expr>,
    pub span: Span,
}

/// The closed set of operator reference variants.
#[derive(Debug)]
pub enum OperatorRefKind {
    /// A call to a declared operator, e.g. `M::Filter`.
    Path {
        path: PathId,
        pragmas: Vec<Pragma>,
    },
    /// `reverse`, `pack` or `flatten`.
    Primitive(PrefixPrimitiveKind),
    /// `transpose {indices}`.
    Transpose(TransposeParams),
    /// A parenthesized operator expression `(op_expr)`.
    OpExpr(Box<OperatorExpr>),
}

impl OperatorRef {
    pub fn new(kind: OperatorRefKind, sizes: Vec<Expr>, span: Span) -> Self {
        Self { kind, sizes, span }
    }

    /// The called path when the reference is a plain path call.
    pub fn path(&self) -> Option<&PathId> {
        match &self.kind {
            OperatorRefKind::Path { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for OperatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            OperatorRefKind::Path { path, pragmas } => {
                for pragma in pragmas {
                    write!(f, "{} ", pragma)?;
                }
                write!(f, "{}", path)?;
            }
            OperatorRefKind::Primitive(kind) => write!(f, "{}", kind)?,
            OperatorRefKind::Transpose(params) => {
                write!(f, "transpose")?;
                match params {
                    TransposeParams::Indices(indices) => {
                        if !indices.is_empty() {
                            let list = indices
                                .iter()
                                .map(|i| i.to_string())
                                .collect::<Vec<_>>()
                                .join(", ");
                            write!(f, " {{{}}}", list)?;
                        }
                    }
                    TransposeParams::Protected(item) => write!(f, " {{{}}}", item)?,
                }
            }
            OperatorRefKind::OpExpr(op_expr) => write!(f, "({})", op_expr)?,
        }
        if !self.sizes.is_empty() {
            let sizes = self
                .sizes
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, " <<{}>>", sizes)?;
        }
        Ok(())
    }
}

/// An optional group item of a partial application: `_` or `[label:] expr`.
#[derive(Debug)]
pub enum OptGroupItem {
    Underscore,
    Item(GroupItem),
}

impl fmt::Display for OptGroupItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptGroupItem::Underscore => write!(f, "_"),
            OptGroupItem::Item(item) => write!(f, "{}", item),
        }
    }
}

/// An operator expression node.
#[derive(Debug)]
pub struct OperatorExpr {
    pub kind: OperatorExprKind,
    pub span: Span,
}

/// The closed set of operator expression variants.
#[derive(Debug)]
pub enum OperatorExprKind {
    /// `map op`, `fold op`, ...
    Iterator {
        kind: IteratorKind,
        operator: OperatorRef,
    },
    /// `activate op every clock_expr`
    ActivateClock {
        operator: OperatorRef,
        clock: ClockExpr,
    },
    /// `activate op every cond (last|default) expr`
    ActivateEvery {
        operator: OperatorRef,
        condition: Box<Expr>,
        is_last: bool,
        expr: Box<Expr>,
    },
    /// `restart op every cond`
    Restart {
        operator: OperatorRef,
        condition: Box<Expr>,
    },
    /// Partial application `op \ args`.
    Partial {
        operator: OperatorRef,
        args: Vec<OptGroupItem>,
    },
    /// An n-ary operator used as a block, e.g. `+`.
    NAry(NaryOp),
    /// `(node|function) id{, id} sections => expr`
    AnonymousWithExpr {
        is_node: bool,
        params: Vec<Ident>,
        sections: Vec<ScopeSection>,
        expr: Box<Expr>,
    },
    /// `(node|function) (inputs) returns (outputs) data_def`
    AnonymousWithDataDef {
        is_node: bool,
        inputs: Vec<VarDecl>,
        outputs: Vec<VarDecl>,
        data_def: Box<DataDef>,
    },
    /// An operator expression that could not be structured.
    Protected(ProtectedItem),
}

impl OperatorExpr {
    pub fn new(kind: OperatorExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

impl fmt::Display for OperatorExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            OperatorExprKind::Iterator { kind, operator } => write!(f, "{} {}", kind, operator),
            OperatorExprKind::ActivateClock { operator, clock } => {
                write!(f, "activate {} every {}", operator, clock)
            }
            OperatorExprKind::ActivateEvery {
                operator,
                condition,
                is_last,
                expr,
            } => {
                let kind = if *is_last { "last" } else { "default" };
                write!(f, "activate {} every {} {} {}", operator, condition, kind, expr)
            }
            OperatorExprKind::Restart {
                operator,
                condition,
            } => write!(f, "restart {} every {}", operator, condition),
            OperatorExprKind::Partial { operator, args } => {
                let args = args
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{} \\ {}", operator, args)
            }
            OperatorExprKind::NAry(op) => write!(f, "{}", op),
            OperatorExprKind::AnonymousWithExpr {
                is_node,
                params,
                sections,
                expr,
            } => {
                let kind = if *is_node { "node" } else { "function" };
                let params = params
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{} {}", kind, params)?;
                for section in sections {
                    write!(f, " {}", section)?;
                }
                write!(f, " => {}", expr)
            }
            OperatorExprKind::AnonymousWithDataDef {
                is_node,
                inputs,
                outputs,
                data_def,
            } => {
                let kind = if *is_node { "node" } else { "function" };
                let inputs = inputs
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                let outputs = outputs
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "{} ({}) returns ({}) {}", kind, inputs, outputs, data_def)
            }
            OperatorExprKind::Protected(item) => write!(f, "{}", item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ExprKind, Literal};
    use crate::identifier::Id;

    fn path_ref(name: &str) -> OperatorRef {
        OperatorRef::new(
            OperatorRefKind::Path {
                path: PathId::from_parts(&[name]),
                pragmas: Vec::new(),
            },
            Vec::new(),
            Span::default(),
        )
    }

    fn int(text: &str) -> Expr {
        Expr::new(ExprKind::Literal(Literal::integer(text)), Span::default())
    }

    #[test]
    fn test_path_call_with_sizes() {
        let mut op = path_ref("Filter");
        op.sizes = vec![int("3"), int("4")];
        assert_eq!(op.to_string(), "Filter <<3, 4>>");
    }

    #[test]
    fn test_primitive_display() {
        let op = OperatorRef::new(
            OperatorRefKind::Primitive(PrefixPrimitiveKind::Reverse),
            Vec::new(),
            Span::default(),
        );
        assert_eq!(op.to_string(), "reverse");
    }

    #[test]
    fn test_transpose_display() {
        let op = OperatorRef::new(
            OperatorRefKind::Transpose(TransposeParams::Indices(vec![2, 1])),
            Vec::new(),
            Span::default(),
        );
        assert_eq!(op.to_string(), "transpose {2, 1}");
    }

    #[test]
    fn test_iterator_display() {
        let op_expr = OperatorExpr::new(
            OperatorExprKind::Iterator {
                kind: IteratorKind::Map,
                operator: path_ref("Incr"),
            },
            Span::default(),
        );
        let op = OperatorRef::new(
            OperatorRefKind::OpExpr(Box::new(op_expr)),
            vec![int("8")],
            Span::default(),
        );
        assert_eq!(op.to_string(), "(map Incr) <<8>>");
    }

    #[test]
    fn test_restart_display() {
        let op_expr = OperatorExpr::new(
            OperatorExprKind::Restart {
                operator: path_ref("Ctl"),
                condition: Box::new(Expr::new(
                    ExprKind::Path(PathId::from_parts(&["reset"])),
                    Span::default(),
                )),
            },
            Span::default(),
        );
        assert_eq!(op_expr.to_string(), "restart Ctl every reset");
    }

    #[test]
    fn test_partial_display() {
        let op_expr = OperatorExpr::new(
            OperatorExprKind::Partial {
                operator: path_ref("Add"),
                args: vec![
                    OptGroupItem::Item(GroupItem::plain(int("1"))),
                    OptGroupItem::Underscore,
                ],
            },
            Span::default(),
        );
        assert_eq!(op_expr.to_string(), "Add \\ 1, _");
    }

    #[test]
    fn test_anonymous_with_expr_display() {
        let op_expr = OperatorExpr::new(
            OperatorExprKind::AnonymousWithExpr {
                is_node: false,
                params: vec![
                    Ident::new(Id::new("x"), Span::default()),
                    Ident::new(Id::new("y"), Span::default()),
                ],
                sections: Vec::new(),
                expr: Box::new(Expr::new(
                    ExprKind::Binary {
                        op: crate::expr::BinaryOp::Plus,
                        lhs: Box::new(Expr::new(
                            ExprKind::Path(PathId::from_parts(&["x"])),
                            Span::default(),
                        )),
                        rhs: Box::new(Expr::new(
                            ExprKind::Path(PathId::from_parts(&["y"])),
                            Span::default(),
                        )),
                    },
                    Span::default(),
                )),
            },
            Span::default(),
        );
        assert_eq!(op_expr.to_string(), "function x, y => x + y");
    }
}
