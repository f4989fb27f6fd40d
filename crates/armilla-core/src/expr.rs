//! Expression nodes.
//!
//! Expressions form a closed variant set; consumers discriminate by matching
//! on [`ExprKind`]. Two textually identical expressions at different
//! locations are distinct nodes — equality of nodes is by reference, never by
//! deep value comparison.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::forward::ForwardExpr;
use crate::identifier::{Ident, Luid, PathId};
use crate::markup::ProtectedItem;
use crate::numeric::{self, FloatInfo, IntegerInfo};
use crate::operator::OperatorRef;
use crate::pattern::Pattern;
use crate::span::Span;
use crate::types::TypeExpr;

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnaryOp {
    Minus,
    Plus,
    Lnot,
    Not,
    Pre,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Minus => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Lnot => "lnot",
            UnaryOp::Not => "not",
            UnaryOp::Pre => "pre",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Plus,
    Minus,
    Mult,
    Slash,
    Mod,
    // bitwise arithmetic
    Land,
    Lor,
    Lxor,
    Lsl,
    Lsr,
    // relational
    Equal,
    Diff,
    Lt,
    Gt,
    Leq,
    Geq,
    // boolean
    And,
    Or,
    Xor,
    // dataflow
    Arrow,
    Pre,
    Concat,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Mult => "*",
            BinaryOp::Slash => "/",
            BinaryOp::Mod => "mod",
            BinaryOp::Land => "land",
            BinaryOp::Lor => "lor",
            BinaryOp::Lxor => "lxor",
            BinaryOp::Lsl => "lsl",
            BinaryOp::Lsr => "lsr",
            BinaryOp::Equal => "=",
            BinaryOp::Diff => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Leq => "<=",
            BinaryOp::Geq => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Arrow => "->",
            BinaryOp::Pre => "pre",
            BinaryOp::Concat => "@",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Literal kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Bool,
    Char,
    Numeric,
}

/// A literal, keeping its exact source text.
///
/// Numeric values are classified lazily through [`Literal::as_integer`] and
/// [`Literal::as_float`].
#[derive(Debug, Clone)]
pub struct Literal {
    text: String,
    kind: LiteralKind,
}

impl Literal {
    pub fn new(text: impl Into<String>, kind: LiteralKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(if value { "true" } else { "false" }, LiteralKind::Bool)
    }

    pub fn character(text: impl Into<String>) -> Self {
        Self::new(text, LiteralKind::Char)
    }

    pub fn integer(text: impl Into<String>) -> Self {
        Self::new(text, LiteralKind::Numeric)
    }

    pub fn float(text: impl Into<String>) -> Self {
        Self::new(text, LiteralKind::Numeric)
    }

    /// Source text of the literal.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> LiteralKind {
        self.kind
    }

    pub fn is_bool(&self) -> bool {
        self.kind == LiteralKind::Bool
    }

    pub fn is_true(&self) -> bool {
        self.kind == LiteralKind::Bool && self.text == "true"
    }

    pub fn is_char(&self) -> bool {
        self.kind == LiteralKind::Char
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == LiteralKind::Numeric
    }

    pub fn is_integer(&self) -> bool {
        self.kind == LiteralKind::Numeric && numeric::is_integer(&self.text)
    }

    pub fn is_float(&self) -> bool {
        self.kind == LiteralKind::Numeric && numeric::is_float(&self.text)
    }

    /// Classify the literal as an integer, when it is one.
    pub fn as_integer(&self) -> Option<IntegerInfo> {
        if self.kind != LiteralKind::Numeric {
            return None;
        }
        numeric::parse_integer(&self.text, false)
    }

    /// Classify the literal as a float, when it is one.
    pub fn as_float(&self) -> Option<FloatInfo> {
        if self.kind != LiteralKind::Numeric {
            return None;
        }
        numeric::parse_float(&self.text, false)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Clock expressions: `id`, `not id` or `(id match pattern)`.
#[derive(Debug)]
pub struct ClockExpr {
    pub id: Ident,
    pub is_not: bool,
    pub pattern: Option<Pattern>,
    pub span: Span,
}

impl ClockExpr {
    pub fn ident(id: Ident, span: Span) -> Self {
        Self {
            id,
            is_not: false,
            pattern: None,
            span,
        }
    }

    pub fn not(id: Ident, span: Span) -> Self {
        Self {
            id,
            is_not: true,
            pattern: None,
            span,
        }
    }

    pub fn matching(id: Ident, pattern: Pattern, span: Span) -> Self {
        Self {
            id,
            is_not: false,
            pattern: Some(pattern),
            span,
        }
    }
}

impl fmt::Display for ClockExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pattern) = &self.pattern {
            write!(f, "({} match {})", self.id, pattern)
        } else if self.is_not {
            write!(f, "not {}", self.id)
        } else {
            write!(f, "{}", self.id)
        }
    }
}

/// An item of a group expression: `[label:] expr`.
#[derive(Debug)]
pub struct GroupItem {
    pub label: Option<Ident>,
    pub expr: Expr,
    pub span: Span,
}

impl GroupItem {
    pub fn plain(expr: Expr) -> Self {
        let span = expr.span;
        Self {
            label: None,
            expr,
            span,
        }
    }

    pub fn labeled(label: Ident, expr: Expr, span: Span) -> Self {
        Self {
            label: Some(label),
            expr,
            span,
        }
    }

    pub fn has_label(&self) -> bool {
        self.label.is_some()
    }
}

impl fmt::Display for GroupItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{}: {}", label, self.expr),
            None => write!(f, "{}", self.expr),
        }
    }
}

/// A group: an ordered list of (possibly labeled) expressions.
#[derive(Debug, Default)]
pub struct Group {
    pub items: Vec<GroupItem>,
}

impl Group {
    pub fn new(items: Vec<GroupItem>) -> Self {
        Self { items }
    }

    /// A group holding a single unlabeled expression.
    pub fn single(expr: Expr) -> Self {
        Self {
            items: vec![GroupItem::plain(expr)],
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}

/// One renaming of a group adaptation: `source[: [target]]`.
///
/// The source selects by name (`a`) or by position (`2`); the optional target
/// renames; a bare trailing colon (`a:`) is the shortcut for `a: a`.
#[derive(Debug)]
pub struct GroupRenaming {
    pub source: RenamingSource,
    pub renaming: Option<Ident>,
    pub is_shortcut: bool,
    pub span: Span,
}

/// The source side of a group renaming.
#[derive(Debug)]
pub enum RenamingSource {
    Name(Ident),
    Position(Literal),
}

impl GroupRenaming {
    pub fn is_by_name(&self) -> bool {
        matches!(self.source, RenamingSource::Name(_))
    }

    /// The effective target name of the renaming, when one can be named:
    /// the explicit renaming, or the source itself for by-name shortcuts and
    /// plain by-name selections.
    pub fn target_name(&self) -> Option<Ident> {
        if let Some(renaming) = &self.renaming {
            return Some(renaming.clone());
        }
        match &self.source {
            RenamingSource::Name(id) => Some(id.clone()),
            RenamingSource::Position(_) => None,
        }
    }
}

impl fmt::Display for GroupRenaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            RenamingSource::Name(id) => write!(f, "{}", id)?,
            RenamingSource::Position(lit) => write!(f, "{}", lit)?,
        }
        if let Some(renaming) = &self.renaming {
            write!(f, ": {}", renaming)?;
        } else if self.is_shortcut {
            write!(f, ":")?;
        }
        Ok(())
    }
}

/// A group adaptation: `.( renaming {, renaming} )`.
///
/// Adaptations re-group, rename or reorder a bundle of flows; they appear on
/// expressions and on diagram wire endpoints.
#[derive(Debug)]
pub struct GroupAdaptation {
    pub renamings: Vec<GroupRenaming>,
    pub span: Span,
}

impl fmt::Display for GroupAdaptation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".(")?;
        for (i, renaming) in self.renamings.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", renaming)?;
        }
        write!(f, ")")
    }
}

/// An index into a composite: a field label or an array index expression.
#[derive(Debug)]
pub enum LabelOrIndex {
    /// `.label`
    Label(Ident),
    /// `[expr]`
    Index(Expr),
}

impl fmt::Display for LabelOrIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelOrIndex::Label(id) => write!(f, ".{}", id),
            LabelOrIndex::Index(expr) => write!(f, "[{}]", expr),
        }
    }
}

/// A functional-update modifier: `{label_or_index}+ = expr`.
#[derive(Debug)]
pub struct Modifier {
    pub path: ModifierPath,
    pub expr: Expr,
    pub span: Span,
}

/// The access path of a modifier; protected when it could not be structured.
#[derive(Debug)]
pub enum ModifierPath {
    Accessors(Vec<LabelOrIndex>),
    Protected(ProtectedItem),
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            ModifierPath::Accessors(accessors) => {
                for accessor in accessors {
                    write!(f, "{}", accessor)?;
                }
            }
            ModifierPath::Protected(item) => write!(f, "{}", item)?,
        }
        write!(f, " = {}", self.expr)
    }
}

/// One branch of a `case` expression: `| pattern: expr`.
#[derive(Debug)]
pub struct CaseBranch {
    pub pattern: Pattern,
    pub expr: Expr,
    pub span: Span,
}

impl fmt::Display for CaseBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "| {}: {}", self.pattern, self.expr)
    }
}

/// A port reference inside a diagram: `#luid`, or `self` for the enclosing
/// recursive instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortRef {
    Luid(Luid),
    SelfRef,
}

impl PortRef {
    pub fn luid(&self) -> Option<Luid> {
        match self {
            PortRef::Luid(luid) => Some(*luid),
            PortRef::SelfRef => None,
        }
    }

    pub fn is_self(&self) -> bool {
        matches!(self, PortRef::SelfRef)
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortRef::Luid(luid) => write!(f, "{}", luid),
            PortRef::SelfRef => write!(f, "self"),
        }
    }
}

/// An expression node.
#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// The closed set of expression variants.
#[derive(Debug)]
pub enum ExprKind {
    /// A literal value.
    Literal(Literal),
    /// A path reference, e.g. `M::c`.
    Path(PathId),
    /// `last 'id`
    Last(Ident),
    /// A unary operation.
    Unary { op: UnaryOp, expr: Box<Expr> },
    /// A binary operation.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `expr when clock_expr`
    WhenClock {
        expr: Box<Expr>,
        clock: ClockExpr,
    },
    /// `expr when match path`
    WhenMatch { expr: Box<Expr>, path: PathId },
    /// `(expr :> type_expr)`
    Cast { expr: Box<Expr>, ty: TypeExpr },
    /// A parenthesized group `(g1, id: g2)`. Parentheses in source always
    /// build this node, so grouping survives re-rendering.
    Group(Group),
    /// Group creation `path group (expr)`.
    MkGroup { path: PathId, expr: Box<Expr> },
    /// Group adaptation `expr .(renamings)`.
    Adaptation {
        expr: Box<Expr>,
        adaptation: GroupAdaptation,
    },
    /// Static projection `expr[index]`.
    StaticProj { expr: Box<Expr>, index: Box<Expr> },
    /// Structure field access `expr.label`.
    StructProj { expr: Box<Expr>, label: Ident },
    /// Slice `expr[start .. end]`.
    Slice {
        expr: Box<Expr>,
        start: Box<Expr>,
        end: Box<Expr>,
    },
    /// Dynamic projection `(expr . accessors default expr)`.
    DynProj {
        expr: Box<Expr>,
        accessors: Vec<LabelOrIndex>,
        default: Box<Expr>,
    },
    /// Array repetition `expr ^ size`.
    MkArray { expr: Box<Expr>, size: Box<Expr> },
    /// Array construction `[group]`.
    MkArrayGroup(Group),
    /// Structure construction `{group} [: path]`.
    MkStruct {
        group: Group,
        ty: Option<PathId>,
    },
    /// Variant construction `path {group}`.
    MkVariant { tag: PathId, group: Group },
    /// Functional update `(expr with modifier {; modifier})`.
    MkCopy {
        expr: Box<Expr>,
        modifiers: Vec<Modifier>,
    },
    /// `if expr then expr else expr`
    Ifte {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    /// `(case expr of {| pattern: expr}+)`
    Case {
        expr: Box<Expr>,
        branches: Vec<CaseBranch>,
    },
    /// An operator instance call `operator [luid] (group)`.
    OperatorInstance {
        operator: OperatorRef,
        params: Group,
        luid: Option<Luid>,
    },
    /// A diagram port reference, `#luid` or `self`.
    Port(PortRef),
    /// `window <<size>> (params) (init)`
    Window {
        size: Box<Expr>,
        params: Group,
        init: Group,
    },
    /// `merge (group) {(group)}`
    Merge(Vec<Group>),
    /// An iteration over dimensions.
    Forward(Box<ForwardExpr>),
    /// An expression that could not be structured.
    Protected(ProtectedItem),
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// True when the expression is a protected fragment.
    pub fn is_protected(&self) -> bool {
        matches!(self.kind, ExprKind::Protected(_))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(lit) => write!(f, "{}", lit),
            ExprKind::Path(path) => write!(f, "{}", path),
            ExprKind::Last(id) => write!(f, "last {}", id),
            ExprKind::Unary { op, expr } => match op {
                UnaryOp::Minus | UnaryOp::Plus => write!(f, "{}{}", op, expr),
                _ => write!(f, "{} {}", op, expr),
            },
            ExprKind::Binary { op, lhs, rhs } => write!(f, "{} {} {}", lhs, op, rhs),
            ExprKind::WhenClock { expr, clock } => write!(f, "{} when {}", expr, clock),
            ExprKind::WhenMatch { expr, path } => write!(f, "{} when match {}", expr, path),
            ExprKind::Cast { expr, ty } => write!(f, "({} :> {})", expr, ty),
            ExprKind::Group(group) => write!(f, "({})", group),
            ExprKind::MkGroup { path, expr } => write!(f, "{} group ({})", path, expr),
            ExprKind::Adaptation { expr, adaptation } => write!(f, "{} {}", expr, adaptation),
            ExprKind::StaticProj { expr, index } => write!(f, "{}[{}]", expr, index),
            ExprKind::StructProj { expr, label } => write!(f, "{}.{}", expr, label),
            ExprKind::Slice { expr, start, end } => write!(f, "{}[{} .. {}]", expr, start, end),
            ExprKind::DynProj {
                expr,
                accessors,
                default,
            } => {
                write!(f, "({} . ", expr)?;
                for accessor in accessors {
                    write!(f, "{}", accessor)?;
                }
                write!(f, " default {})", default)
            }
            ExprKind::MkArray { expr, size } => write!(f, "{}^{}", expr, size),
            ExprKind::MkArrayGroup(group) => write!(f, "[{}]", group),
            ExprKind::MkStruct { group, ty } => {
                write!(f, "{{{}}}", group)?;
                if let Some(ty) = ty {
                    write!(f, " : {}", ty)?;
                }
                Ok(())
            }
            ExprKind::MkVariant { tag, group } => write!(f, "{} {{{}}}", tag, group),
            ExprKind::MkCopy { expr, modifiers } => {
                write!(f, "({} with ", expr)?;
                for (i, modifier) in modifiers.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", modifier)?;
                }
                write!(f, ")")
            }
            ExprKind::Ifte {
                cond,
                then_expr,
                else_expr,
            } => write!(f, "if {} then {} else {}", cond, then_expr, else_expr),
            ExprKind::Case { expr, branches } => {
                write!(f, "(case {} of", expr)?;
                for branch in branches {
                    write!(f, " {}", branch)?;
                }
                write!(f, ")")
            }
            ExprKind::OperatorInstance {
                operator,
                params,
                luid,
            } => {
                write!(f, "{}", operator)?;
                if let Some(luid) = luid {
                    write!(f, " {}", luid)?;
                }
                write!(f, " ({})", params)
            }
            ExprKind::Port(port) => write!(f, "{}", port),
            ExprKind::Window { size, params, init } => {
                write!(f, "window <<{}>> ({}) ({})", size, params, init)
            }
            ExprKind::Merge(groups) => {
                write!(f, "merge")?;
                for group in groups {
                    write!(f, " ({})", group)?;
                }
                Ok(())
            }
            ExprKind::Forward(forward) => write!(f, "{}", forward),
            ExprKind::Protected(item) => write!(f, "{}", item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Id;

    fn ident(name: &str) -> Ident {
        Ident::new(Id::new(name), Span::default())
    }

    fn path_expr(name: &str) -> Expr {
        Expr::new(
            ExprKind::Path(PathId::from_parts(&[name])),
            Span::default(),
        )
    }

    fn int(text: &str) -> Expr {
        Expr::new(ExprKind::Literal(Literal::integer(text)), Span::default())
    }

    #[test]
    fn test_literal_classification() {
        let lit = Literal::integer("8_ui16");
        assert!(lit.is_integer());
        assert!(!lit.is_float());
        let info = lit.as_integer().unwrap();
        assert_eq!(info.value, 8);
        assert!(!info.is_signed);
        assert_eq!(info.size, 16);

        let lit = Literal::float("2.5e-3_f64");
        assert!(lit.is_float());
        assert_eq!(lit.as_float().unwrap().size, 64);

        assert!(Literal::boolean(true).is_true());
    }

    #[test]
    fn test_binary_display() {
        let expr = Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Minus,
                lhs: Box::new(path_expr("CruiseSpeed")),
                rhs: Box::new(path_expr("CarSpeed")),
            },
            Span::default(),
        );
        assert_eq!(expr.to_string(), "CruiseSpeed - CarSpeed");
    }

    #[test]
    fn test_parens_are_group_nodes() {
        // (a + b) * c keeps its grouping because parentheses build Group nodes
        let sum = Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Plus,
                lhs: Box::new(path_expr("a")),
                rhs: Box::new(path_expr("b")),
            },
            Span::default(),
        );
        let grouped = Expr::new(ExprKind::Group(Group::single(sum)), Span::default());
        let product = Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Mult,
                lhs: Box::new(grouped),
                rhs: Box::new(path_expr("c")),
            },
            Span::default(),
        );
        assert_eq!(product.to_string(), "(a + b) * c");
    }

    #[test]
    fn test_ifte_display() {
        let expr = Expr::new(
            ExprKind::Ifte {
                cond: Box::new(path_expr("on")),
                then_expr: Box::new(int("1")),
                else_expr: Box::new(int("0")),
            },
            Span::default(),
        );
        assert_eq!(expr.to_string(), "if on then 1 else 0");
    }

    #[test]
    fn test_when_and_cast_display() {
        let when = Expr::new(
            ExprKind::WhenClock {
                expr: Box::new(path_expr("x")),
                clock: ClockExpr::not(ident("c"), Span::default()),
            },
            Span::default(),
        );
        assert_eq!(when.to_string(), "x when not c");

        let cast = Expr::new(
            ExprKind::Cast {
                expr: Box::new(path_expr("x")),
                ty: TypeExpr::new(
                    crate::types::TypeExprKind::Predefined(crate::types::PredefinedType::Float64),
                    Span::default(),
                ),
            },
            Span::default(),
        );
        assert_eq!(cast.to_string(), "(x :> float64)");
    }

    #[test]
    fn test_adaptation_display() {
        let adaptation = GroupAdaptation {
            renamings: vec![
                GroupRenaming {
                    source: RenamingSource::Name(ident("a")),
                    renaming: Some(ident("b")),
                    is_shortcut: false,
                    span: Span::default(),
                },
                GroupRenaming {
                    source: RenamingSource::Position(Literal::integer("2")),
                    renaming: None,
                    is_shortcut: false,
                    span: Span::default(),
                },
            ],
            span: Span::default(),
        };
        let expr = Expr::new(
            ExprKind::Adaptation {
                expr: Box::new(path_expr("bundle")),
                adaptation,
            },
            Span::default(),
        );
        assert_eq!(expr.to_string(), "bundle .(a: b, 2)");
    }

    #[test]
    fn test_case_display() {
        let expr = Expr::new(
            ExprKind::Case {
                expr: Box::new(path_expr("state")),
                branches: vec![
                    CaseBranch {
                        pattern: Pattern::new(
                            crate::pattern::PatternKind::Path(PathId::from_parts(&["On"])),
                            Span::default(),
                        ),
                        expr: int("1"),
                        span: Span::default(),
                    },
                    CaseBranch {
                        pattern: Pattern::new(
                            crate::pattern::PatternKind::Underscore,
                            Span::default(),
                        ),
                        expr: int("0"),
                        span: Span::default(),
                    },
                ],
            },
            Span::default(),
        );
        assert_eq!(expr.to_string(), "(case state of | On: 1 | _: 0)");
    }

    #[test]
    fn test_mk_copy_display() {
        let expr = Expr::new(
            ExprKind::MkCopy {
                expr: Box::new(path_expr("s")),
                modifiers: vec![Modifier {
                    path: ModifierPath::Accessors(vec![
                        LabelOrIndex::Label(ident("f")),
                        LabelOrIndex::Index(int("0")),
                    ]),
                    expr: int("5"),
                    span: Span::default(),
                }],
            },
            Span::default(),
        );
        assert_eq!(expr.to_string(), "(s with .f[0] = 5)");
    }

    #[test]
    fn test_port_display() {
        assert_eq!(PortRef::Luid(Luid::new("3")).to_string(), "#3");
        assert_eq!(PortRef::SelfRef.to_string(), "self");
    }

    #[test]
    fn test_merge_window_display() {
        let merge = Expr::new(
            ExprKind::Merge(vec![
                Group::single(path_expr("a")),
                Group::single(path_expr("b")),
            ]),
            Span::default(),
        );
        assert_eq!(merge.to_string(), "merge (a) (b)");

        let window = Expr::new(
            ExprKind::Window {
                size: Box::new(int("3")),
                params: Group::single(path_expr("x")),
                init: Group::single(int("0")),
            },
            Span::default(),
        );
        assert_eq!(window.to_string(), "window <<3>> (x) (0)");
    }
}
