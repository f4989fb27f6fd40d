//! Equations: plain flow definitions and definitions by case
//! (state machines, conditional and match activations).

use std::fmt;

use crate::expr::Expr;
use crate::identifier::{Ident, Luid};
use crate::markup::ProtectedItem;
use crate::pattern::Pattern;
use crate::scope::Scope;
use crate::span::Span;
use crate::statemachine::StateMachine;

/// One item of a left-hand side: a named flow or `_`.
#[derive(Debug)]
pub struct LhsItem {
    pub id: Option<Ident>,
    pub span: Span,
}

impl LhsItem {
    pub fn named(id: Ident) -> Self {
        let span = id.span();
        Self { id: Some(id), span }
    }

    pub fn underscore(span: Span) -> Self {
        Self { id: None, span }
    }

    pub fn is_underscore(&self) -> bool {
        self.id.is_none()
    }
}

impl fmt::Display for LhsItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}", id),
            None => write!(f, "_"),
        }
    }
}

/// An equation left-hand side:
/// `() | lhs_item {, lhs_item} [, ..]`.
#[derive(Debug, Default)]
pub struct Lhs {
    pub items: Vec<LhsItem>,
    pub is_partial: bool,
    pub span: Span,
}

impl Lhs {
    pub fn new(items: Vec<LhsItem>, span: Span) -> Self {
        Self {
            items,
            is_partial: false,
            span,
        }
    }
}

impl fmt::Display for Lhs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.items.is_empty() {
            return write!(f, "()");
        }
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        if self.is_partial {
            write!(f, ", ..")?;
        }
        Ok(())
    }
}

/// An equation node.
#[derive(Debug)]
pub struct Equation {
    pub kind: EquationKind,
    pub span: Span,
}

/// The closed set of equation variants.
#[derive(Debug)]
pub enum EquationKind {
    /// `lhs = expr;`
    Expr { lhs: Lhs, expr: Expr },
    /// A definition by case (state machine or activation).
    Def(DefByCase),
    /// An equation that could not be structured.
    Protected(ProtectedItem),
}

impl Equation {
    pub fn new(kind: EquationKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self.kind, EquationKind::Protected(_))
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EquationKind::Expr { lhs, expr } => write!(f, "{} = {};", lhs, expr),
            EquationKind::Def(def) => write!(f, "{}", def),
            EquationKind::Protected(item) => write!(f, "{}", item),
        }
    }
}

/// A definition by case: an optional left-hand side and name, and the case
/// construct itself.
#[derive(Debug)]
pub struct DefByCase {
    pub lhs: Option<Lhs>,
    pub name: Option<Luid>,
    pub case: DefByCaseKind,
    pub span: Span,
}

/// The case constructs.
#[derive(Debug)]
pub enum DefByCaseKind {
    /// `automaton`
    StateMachine(StateMachine),
    /// `activate ... if/elsif/else`
    ActivateIf(ActivateIf),
    /// `activate ... when ... match`
    ActivateWhen(ActivateWhen),
}

impl fmt::Display for DefByCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(lhs) = &self.lhs {
            write!(f, "{} : ", lhs)?;
        }
        let name = match &self.name {
            Some(luid) => format!(" {}", luid),
            None => String::new(),
        };
        match &self.case {
            DefByCaseKind::StateMachine(sm) => {
                write!(f, "automaton{}", name)?;
                if sm.items().is_empty() {
                    write!(f, ";")
                } else {
                    write!(f, "\n{};", sm)
                }
            }
            DefByCaseKind::ActivateIf(activate) => {
                write!(f, "activate{}\n{};", name, activate.activation)
            }
            DefByCaseKind::ActivateWhen(activate) => {
                write!(
                    f,
                    "activate{} when {} match\n{};",
                    name, activate.condition, activate
                )
            }
        }
    }
}

/// A data definition: a single equation or a scope.
///
/// Used by activation branches and anonymous operators.
#[derive(Debug)]
pub enum DataDef {
    Equation(Box<Equation>),
    Scope(Scope),
}

impl fmt::Display for DataDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataDef::Equation(eq) => write!(f, "{}", eq),
            DataDef::Scope(scope) => write!(f, "{}", scope),
        }
    }
}

/// A branch of an `if` activation: `data_def` or a nested activation.
#[derive(Debug)]
pub enum IfteBranch {
    DataDef(DataDef),
    Nested(Box<IfActivation>),
}

impl fmt::Display for IfteBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IfteBranch::DataDef(def) => write!(f, "{}", def),
            IfteBranch::Nested(activation) => write!(f, "{}", activation),
        }
    }
}

/// One branch of an `if` activation; `condition` is `None` for the final
/// `else` branch.
#[derive(Debug)]
pub struct IfActivationBranch {
    pub condition: Option<Expr>,
    pub branch: IfteBranch,
    pub span: Span,
}

/// `if expr then branch {elsif expr then branch} else branch`
///
/// Valid when there are at least two branches — the leading `if` and the
/// final `else` — and every middle branch has a condition.
#[derive(Debug)]
pub struct IfActivation {
    pub branches: Vec<IfActivationBranch>,
    pub span: Span,
}

impl IfActivation {
    pub fn is_valid(&self) -> bool {
        if self.branches.len() < 2 {
            return false;
        }
        if self.branches[0].condition.is_none() {
            return false;
        }
        if self.branches[self.branches.len() - 1].condition.is_some() {
            return false;
        }
        self.branches[1..self.branches.len() - 1]
            .iter()
            .all(|b| b.condition.is_some())
    }
}

impl fmt::Display for IfActivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, branch) in self.branches.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            match (&branch.condition, index) {
                (Some(cond), 0) => write!(f, "if {} then {}", cond, branch.branch)?,
                (Some(cond), _) => write!(f, "elsif {} then {}", cond, branch.branch)?,
                (None, _) => write!(f, "else {}", branch.branch)?,
            }
        }
        Ok(())
    }
}

/// An `activate ... if` definition.
#[derive(Debug)]
pub struct ActivateIf {
    pub activation: IfActivation,
}

/// One branch of an `activate ... when`: `| pattern : data_def`.
#[derive(Debug)]
pub struct ActivateWhenBranch {
    pub pattern: Pattern,
    pub data_def: DataDef,
    pub span: Span,
}

impl fmt::Display for ActivateWhenBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "| {} : {}", self.pattern, self.data_def)
    }
}

/// An `activate ... when expr match` definition. Valid when there is at
/// least one branch.
#[derive(Debug)]
pub struct ActivateWhen {
    pub condition: Expr,
    pub branches: Vec<ActivateWhenBranch>,
}

impl ActivateWhen {
    pub fn is_valid(&self) -> bool {
        !self.branches.is_empty()
    }
}

impl fmt::Display for ActivateWhen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, branch) in self.branches.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", branch)?;
        }
        Ok(())
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
    fn test_lhs_display() {
        let empty = Lhs::new(Vec::new(), Span::default());
        assert_eq!(empty.to_string(), "()");

        let mut lhs = Lhs::new(
            vec![
                LhsItem::named(ident("x")),
                LhsItem::underscore(Span::default()),
            ],
            Span::default(),
        );
        assert_eq!(lhs.to_string(), "x, _");

        lhs.is_partial = true;
        assert_eq!(lhs.to_string(), "x, _, ..");
    }

    #[test]
    fn test_expr_equation_display() {
        let eq = Equation::new(
            EquationKind::Expr {
                lhs: Lhs::new(vec![LhsItem::named(ident("o"))], Span::default()),
                expr: int("1"),
            },
            Span::default(),
        );
        assert_eq!(eq.to_string(), "o = 1;");
    }

    #[test]
    fn test_if_activation_validity() {
        let branch = |cond: Option<Expr>| IfActivationBranch {
            condition: cond,
            branch: IfteBranch::DataDef(DataDef::Equation(Box::new(Equation::new(
                EquationKind::Expr {
                    lhs: Lhs::new(vec![LhsItem::named(ident("o"))], Span::default()),
                    expr: int("0"),
                },
                Span::default(),
            )))),
            span: Span::default(),
        };

        let valid = IfActivation {
            branches: vec![branch(Some(path_expr("c"))), branch(None)],
            span: Span::default(),
        };
        assert!(valid.is_valid());
        assert_eq!(valid.to_string(), "if c then o = 0;\nelse o = 0;");

        let no_else = IfActivation {
            branches: vec![branch(Some(path_expr("c")))],
            span: Span::default(),
        };
        assert!(!no_else.is_valid());
    }
}
