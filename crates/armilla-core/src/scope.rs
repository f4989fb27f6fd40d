//! Scopes and scope sections.

use std::fmt;

use crate::diagram::Diagram;
use crate::equation::Equation;
use crate::expr::Expr;
use crate::identifier::Ident;
use crate::markup::ProtectedItem;
use crate::span::Span;
use crate::variable::Variable;

/// An emission: `flow {, flow} [if expr]`.
#[derive(Debug)]
pub struct EmissionBody {
    pub flows: Vec<Ident>,
    pub condition: Option<Expr>,
    pub span: Span,
}

impl fmt::Display for EmissionBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, flow) in self.flows.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", flow)?;
        }
        if let Some(condition) = &self.condition {
            write!(f, " if {}", condition)?;
        }
        Ok(())
    }
}

/// A named assume/guarantee expression: `id: expr`.
#[derive(Debug)]
pub struct FormalProperty {
    pub id: Ident,
    pub expr: Expr,
    pub span: Span,
}

impl fmt::Display for FormalProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.expr)
    }
}

/// The closed set of scope section variants.
#[derive(Debug)]
pub enum ScopeSection {
    /// `var {var_decl;}`
    Var { decls: Vec<Variable>, span: Span },
    /// `let {equation;}` — equations carry their own terminator.
    Let {
        equations: Vec<Equation>,
        span: Span,
    },
    /// `emit {emission_body;}`
    Emit {
        emissions: Vec<EmissionBody>,
        span: Span,
    },
    /// `assume {id: expr;}`
    Assume {
        properties: Vec<FormalProperty>,
        span: Span,
    },
    /// `guarantee {id: expr;}`
    Guarantee {
        properties: Vec<FormalProperty>,
        span: Span,
    },
    /// `diagram {object}` — the graphical dataflow form.
    Diagram(Diagram),
    /// A section that could not be structured.
    Protected(ProtectedItem),
}

impl ScopeSection {
    pub fn span(&self) -> Span {
        match self {
            ScopeSection::Var { span, .. }
            | ScopeSection::Let { span, .. }
            | ScopeSection::Emit { span, .. }
            | ScopeSection::Assume { span, .. }
            | ScopeSection::Guarantee { span, .. } => *span,
            ScopeSection::Diagram(diagram) => diagram.span(),
            ScopeSection::Protected(item) => item.span(),
        }
    }

    /// The section's diagram, when it is a diagram section.
    pub fn as_diagram(&self) -> Option<&Diagram> {
        match self {
            ScopeSection::Diagram(diagram) => Some(diagram),
            _ => None,
        }
    }

    fn write_section<T: fmt::Display>(
        f: &mut fmt::Formatter<'_>,
        keyword: &str,
        items: &[T],
        end: &str,
    ) -> fmt::Result {
        write!(f, "{}", keyword)?;
        for item in items {
            write!(f, "\n    {}{}", item, end)?;
        }
        Ok(())
    }
}

impl fmt::Display for ScopeSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeSection::Var { decls, .. } => Self::write_section(f, "var", decls, ";"),
            ScopeSection::Let { equations, .. } => Self::write_section(f, "let", equations, ""),
            ScopeSection::Emit { emissions, .. } => Self::write_section(f, "emit", emissions, ";"),
            ScopeSection::Assume { properties, .. } => {
                Self::write_section(f, "assume", properties, ";")
            }
            ScopeSection::Guarantee { properties, .. } => {
                Self::write_section(f, "guarantee", properties, ";")
            }
            ScopeSection::Diagram(diagram) => write!(f, "{}", diagram),
            ScopeSection::Protected(item) => write!(f, "{}", item),
        }
    }
}

/// A scope: `{ {scope_section} }`.
#[derive(Debug)]
pub struct Scope {
    pub sections: Vec<ScopeSection>,
    pub span: Span,
}

impl Scope {
    pub fn new(sections: Vec<ScopeSection>, span: Span) -> Self {
        Self { sections, span }
    }

    /// The diagrams of this scope, in section order.
    pub fn diagrams(&self) -> impl Iterator<Item = &Diagram> {
        self.sections.iter().filter_map(ScopeSection::as_diagram)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;
        for section in &self.sections {
            writeln!(f, "{}", section)?;
        }
        write!(f, "}}")
    }
}
