//! The `forward` iteration expression.

use std::fmt;

use crate::expr::Expr;
use crate::identifier::{Ident, Luid};
use crate::markup::ProtectedItem;
use crate::scope::ScopeSection;
use crate::span::Span;

/// Restart policy of a `forward`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardState {
    Nothing,
    Restart,
    Resume,
}

impl ForwardState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForwardState::Nothing => "",
            ForwardState::Restart => "restart",
            ForwardState::Resume => "resume",
        }
    }
}

/// The left-hand side of a dimension element: `id` or `[current_lhs]`.
#[derive(Debug)]
pub enum ForwardLhs {
    Id(Ident),
    Nested(Box<ForwardLhs>),
}

impl fmt::Display for ForwardLhs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardLhs::Id(id) => write!(f, "{}", id),
            ForwardLhs::Nested(inner) => write!(f, "[{}]", inner),
        }
    }
}

/// A dimension element: `current_lhs = expr;`.
#[derive(Debug)]
pub struct ForwardElement {
    pub lhs: ForwardLhs,
    pub expr: Expr,
    pub span: Span,
}

impl fmt::Display for ForwardElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {};", self.lhs, self.expr)
    }
}

/// The `with` part of a dimension: an index identifier or element bindings.
#[derive(Debug)]
pub enum ForwardWith {
    Index(Ident),
    Elements(Vec<ForwardElement>),
}

/// One dimension of a `forward`:
/// `<<expr>> [with (<<id>> | current_elt) {current_elt}]`.
#[derive(Debug)]
pub enum ForwardDim {
    Dim {
        expr: Expr,
        with: Option<ForwardWith>,
        span: Span,
    },
    /// A dimension that could not be structured.
    Protected(ProtectedItem),
}

impl fmt::Display for ForwardDim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardDim::Dim { expr, with, .. } => {
                write!(f, "<<{}>>", expr)?;
                match with {
                    Some(ForwardWith::Index(id)) => write!(f, " with <<{}>>", id),
                    Some(ForwardWith::Elements(elems)) => {
                        write!(f, " with")?;
                        for elem in elems {
                            write!(f, " {}", elem)?;
                        }
                        Ok(())
                    }
                    None => Ok(()),
                }
            }
            ForwardDim::Protected(item) => write!(f, "{}", item),
        }
    }
}

/// Last/default clause of a return item.
#[derive(Debug, Default)]
pub struct ForwardLastDefault {
    pub last: Option<Expr>,
    pub default: Option<Expr>,
}

impl ForwardLastDefault {
    pub fn is_empty(&self) -> bool {
        self.last.is_none() && self.default.is_none()
    }
}

impl fmt::Display for ForwardLastDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        if let Some(last) = &self.last {
            write!(f, "last = {}", last)?;
            first = false;
        }
        if let Some(default) = &self.default {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "default = {}", default)?;
        }
        Ok(())
    }
}

/// A return item of a `forward`.
#[derive(Debug)]
pub enum ForwardReturnItem {
    Item {
        id: Ident,
        clause: Option<ForwardLastDefault>,
    },
    /// A return item that could not be structured.
    Protected(ProtectedItem),
}

impl fmt::Display for ForwardReturnItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardReturnItem::Item { id, clause } => {
                write!(f, "{}", id)?;
                if let Some(clause) = clause {
                    if !clause.is_empty() {
                        write!(f, ": {}", clause)?;
                    }
                }
                Ok(())
            }
            ForwardReturnItem::Protected(item) => write!(f, "{}", item),
        }
    }
}

/// The body of a `forward`: `[unless expr] scope_sections [until expr]`.
#[derive(Debug)]
pub struct ForwardBody {
    pub sections: Vec<ScopeSection>,
    pub unless: Option<Expr>,
    pub until: Option<Expr>,
}

impl fmt::Display for ForwardBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(unless) = &self.unless {
            writeln!(f, "unless {}", unless)?;
        }
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", section)?;
        }
        if let Some(until) = &self.until {
            write!(f, "\nuntil {}", until)?;
        }
        Ok(())
    }
}

/// A `forward` iteration:
/// `forward [luid] [restart|resume] {dim}+ body returns (items)`.
#[derive(Debug)]
pub struct ForwardExpr {
    pub luid: Option<Luid>,
    pub state: ForwardState,
    pub dims: Vec<ForwardDim>,
    pub body: ForwardBody,
    pub returns: Vec<ForwardReturnItem>,
    pub span: Span,
}

impl fmt::Display for ForwardExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "forward")?;
        if let Some(luid) = &self.luid {
            write!(f, " {}", luid)?;
        }
        if self.state != ForwardState::Nothing {
            write!(f, " {}", self.state.as_str())?;
        }
        for dim in &self.dims {
            write!(f, "\n{}", dim)?;
        }
        write!(f, "\n{}", self.body)?;
        let returns = self
            .returns
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "\nreturns ({})", returns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ExprKind, Literal};
    use crate::identifier::{Id, PathId};

    fn ident(name: &str) -> Ident {
        Ident::new(Id::new(name), Span::default())
    }

    fn path_expr(name: &str) -> Expr {
        Expr::new(ExprKind::Path(PathId::from_parts(&[name])), Span::default())
    }

    fn int(text: &str) -> Expr {
        Expr::new(ExprKind::Literal(Literal::integer(text)), Span::default())
    }

    #[test]
    fn test_forward_display() {
        let fwd = ForwardExpr {
            luid: None,
            state: ForwardState::Restart,
            dims: vec![ForwardDim::Dim {
                expr: int("8"),
                with: Some(ForwardWith::Index(ident("i"))),
                span: Span::default(),
            }],
            body: ForwardBody {
                sections: Vec::new(),
                unless: None,
                until: Some(path_expr("done")),
            },
            returns: vec![ForwardReturnItem::Item {
                id: ident("acc"),
                clause: Some(ForwardLastDefault {
                    last: Some(int("0")),
                    default: None,
                }),
            }],
            span: Span::default(),
        };
        assert_eq!(
            fwd.to_string(),
            "forward restart\n<<8>> with <<i>>\n\nuntil done\nreturns (acc: last = 0)"
        );
    }

    #[test]
    fn test_forward_lhs_nesting() {
        let lhs = ForwardLhs::Nested(Box::new(ForwardLhs::Nested(Box::new(ForwardLhs::Id(
            ident("x"),
        )))));
        assert_eq!(lhs.to_string(), "[[x]]");
    }
}
