//! Variable declarations.

use std::fmt;

use crate::expr::{ClockExpr, Expr};
use crate::identifier::Ident;
use crate::markup::ProtectedItem;
use crate::span::Span;
use crate::types::GroupTypeExpr;

/// A variable declaration:
/// `[clock] [probe] id [: type] [when clock] [default = expr] [last = expr]`.
///
/// Used for operator parameters and `var` sections.
#[derive(Debug)]
pub struct VarDecl {
    pub id: Ident,
    pub is_clock: bool,
    pub is_probe: bool,
    pub ty: Option<GroupTypeExpr>,
    pub when: Option<ClockExpr>,
    pub default: Option<Expr>,
    pub last: Option<Expr>,
    pub span: Span,
}

impl VarDecl {
    /// A plain `id: type` declaration.
    pub fn typed(id: Ident, ty: GroupTypeExpr, span: Span) -> Self {
        Self {
            id,
            is_clock: false,
            is_probe: false,
            ty: Some(ty),
            when: None,
            default: None,
            last: None,
            span,
        }
    }
}

impl fmt::Display for VarDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clock {
            write!(f, "clock ")?;
        }
        if self.is_probe {
            write!(f, "probe ")?;
        }
        write!(f, "{}", self.id)?;
        if let Some(ty) = &self.ty {
            write!(f, ": {}", ty)?;
        }
        if let Some(when) = &self.when {
            write!(f, " when {}", when)?;
        }
        if let Some(default) = &self.default {
            write!(f, " default = {}", default)?;
        }
        if let Some(last) = &self.last {
            write!(f, " last = {}", last)?;
        }
        Ok(())
    }
}

/// A variable position in the tree: structured or protected.
#[derive(Debug)]
pub enum Variable {
    Decl(VarDecl),
    /// A variable declaration that could not be structured.
    Protected(ProtectedItem),
}

impl Variable {
    pub fn decl(&self) -> Option<&VarDecl> {
        match self {
            Variable::Decl(decl) => Some(decl),
            Variable::Protected(_) => None,
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, Variable::Protected(_))
    }

    pub fn into_decl(self) -> Option<VarDecl> {
        match self {
            Variable::Decl(decl) => Some(decl),
            Variable::Protected(_) => None,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Decl(decl) => write!(f, "{}", decl),
            Variable::Protected(item) => write!(f, "{}", item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ExprKind, Literal};
    use crate::identifier::Id;
    use crate::types::{GroupTypeExprKind, PredefinedType, TypeExpr, TypeExprKind};

    fn ident(name: &str) -> Ident {
        Ident::new(Id::new(name), Span::default())
    }

    fn int32() -> GroupTypeExpr {
        GroupTypeExpr::new(
            GroupTypeExprKind::Single(TypeExpr::new(
                TypeExprKind::Predefined(PredefinedType::Int32),
                Span::default(),
            )),
            Span::default(),
        )
    }

    #[test]
    fn test_typed_var_display() {
        let decl = VarDecl::typed(ident("speed"), int32(), Span::default());
        assert_eq!(decl.to_string(), "speed: int32");
    }

    #[test]
    fn test_full_var_display() {
        let mut decl = VarDecl::typed(ident("x"), int32(), Span::default());
        decl.is_clock = true;
        decl.default = Some(Expr::new(
            ExprKind::Literal(Literal::integer("0")),
            Span::default(),
        ));
        assert_eq!(decl.to_string(), "clock x: int32 default = 0");
    }
}
