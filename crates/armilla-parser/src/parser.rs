//! Parser for Armilla token streams.
//!
//! This module transforms a token stream from the [`lexer`](crate::lexer)
//! into the object model defined by `armilla-core`. The public entry points
//! are in the crate root; everything here works on the shared token-slice
//! input.
//!
//! Failure policy: a declaration or equation that cannot be structured is
//! captured verbatim as a protected fragment and parsing resumes at the next
//! synchronization point. The whole unit fails only when the lexer fails or
//! a structural invariant of the assembled module is broken.

use armilla_core::diagram::{
    BlockInstance, Connection, DefTarget, Diagram, DiagramObject, DiagramObjectKind,
    GroupOperation, Wire,
};
use armilla_core::equation::{
    ActivateIf, ActivateWhen, ActivateWhenBranch, DataDef, DefByCase, DefByCaseKind, Equation,
    EquationKind, IfActivation, IfActivationBranch, IfteBranch, Lhs, LhsItem,
};
use armilla_core::expr::PortRef;
use armilla_core::identifier::ModulePath;
use armilla_core::markup::{Markup, ProtectedItem};
use armilla_core::module::{
    ConstDecl, ConstraintVars, GlobalDecl, GlobalDeclKind, GroupDecl, Module, ModuleKind,
    Operator, OperatorBody, SensorDecl, Signature, TypeConstraint, TypeDecl, UseDirective,
};
use armilla_core::scope::{EmissionBody, FormalProperty, Scope, ScopeSection};
use armilla_core::span::Span;
use armilla_core::statemachine::{
    Arrow, ArrowTarget, Fork, ForkPriority, Identification, State, StateMachine,
    StateMachineItem, Target, Transition, TransitionDecl,
};
use armilla_core::types::{
    GroupTypeExpr, GroupTypeExprKind, NamedGroupType, NumericKind, PredefinedType, StructField,
    TypeDefinition, TypeExpr, TypeExprKind, VariantCase,
};
use armilla_core::variable::{VarDecl, Variable};

use crate::error::{Diagnostic, ErrorCode};
use crate::expr::{
    adaptation, clock_expr, expression, ident, luid, name_ident, operator_expr, operator_ref,
    path_id, pattern, protected,
};
use crate::stream::{
    Input, IResult, attempt, backtrack, cut, next_token, opt_sym, peek_next, sym, take_map,
    trivia0,
};
use crate::tokens::Token;

use winnow::Parser as _;
use winnow::error::ErrMode;
use winnow::stream::Stream;

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

fn is_decl_start(token: &Token<'_>) -> bool {
    matches!(
        token,
        Token::Use
            | Token::Type
            | Token::Const
            | Token::Sensor
            | Token::Group
            | Token::Inline
            | Token::Function
            | Token::Node
    )
}

/// Consume tokens up to the next synchronization point and return the exact
/// source text covered. Balanced parens, brackets and braces are skipped
/// over; the scan stops after a `;` at depth zero, before an unmatched
/// closer, or (when `stop_at_decl` is set) before a declaration keyword at
/// depth zero.
fn recover_raw(input: &mut Input<'_>, stop_at_decl: bool) -> IResult<Option<(String, Span)>> {
    trivia0.parse_next(input)?;
    let mut depth: u32 = 0;
    let mut start: Option<usize> = None;
    let mut end: usize = 0;
    loop {
        let Some(token) = peek_next(input)? else {
            break;
        };
        match &token.token {
            Token::LeftParen | Token::LeftBracket | Token::LeftBrace => depth += 1,
            Token::RightParen | Token::RightBracket | Token::RightBrace => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            token if depth == 0 && stop_at_decl && start.is_some() && is_decl_start(token) => {
                break;
            }
            _ => {}
        }
        let token = next_token(input)?;
        start.get_or_insert(token.span.start());
        end = token.span.end();
        if token.token == Token::Semicolon && depth == 0 {
            break;
        }
    }
    Ok(start.map(|s| {
        let span = Span::new(s..end);
        (input.state.source[s..end].to_string(), span)
    }))
}

/// Markup used for a protected declaration fallback, from its leading token.
fn fallback_markup(token: &Token<'_>) -> Markup {
    match token {
        Token::Type => Markup::Type,
        Token::Const => Markup::Const,
        Token::Sensor => Markup::Sensor,
        Token::Group => Markup::Group,
        Token::Use => Markup::Use,
        Token::Inline | Token::Function | Token::Node => Markup::SyntaxText,
        _ => Markup::Syntax,
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Parse a type expression.
pub(crate) fn type_expr(input: &mut Input<'_>) -> IResult<TypeExpr> {
    let next = peek_next(input)?.ok_or_else(|| backtrack("type expression"))?;
    let start = next.span;
    let mut ty = match &next.token {
        Token::Identifier(name) => {
            if let Some(predef) = PredefinedType::from_str(name) {
                next_token(input)?;
                TypeExpr::new(TypeExprKind::Predefined(predef), start)
            } else {
                let path = path_id(input)?;
                let span = path.span();
                TypeExpr::new(TypeExprKind::Alias(path), span)
            }
        }
        Token::Name(_) => {
            let var = name_ident(input)?;
            let span = var.span();
            TypeExpr::new(TypeExprKind::Variable(var), span)
        }
        Token::Signed | Token::Unsigned => {
            let is_signed = next.token == Token::Signed;
            next_token(input)?;
            sym(Token::SizeOpen, input)?;
            let size = expression(input)?;
            let close = sym(Token::SizeClose, input)?;
            TypeExpr::new(
                TypeExprKind::Sized {
                    size: Box::new(size),
                    is_signed,
                },
                start.union(close),
            )
        }
        Token::LeftBrace => {
            sym(Token::LeftBrace, input)?;
            let mut fields = Vec::new();
            loop {
                let name = ident(input)?;
                sym(Token::Colon, input)?;
                let field_ty = type_expr(input)?;
                let span = name.span().union(field_ty.span);
                fields.push(StructField {
                    name,
                    ty: field_ty,
                    span,
                });
                if opt_sym(Token::Comma, input)?.is_none() {
                    break;
                }
            }
            let close = sym(Token::RightBrace, input)?;
            TypeExpr::new(TypeExprKind::Struct(fields), start.union(close))
        }
        Token::Protected(..) => {
            let item = protected(input)?;
            let span = item.span();
            TypeExpr::new(TypeExprKind::Protected(item), span)
        }
        _ => return Err(backtrack("type expression")),
    };

    while opt_sym(Token::Caret, input)?.is_some() {
        let size = expression(input)?;
        let span = ty.span.union(size.span);
        ty = TypeExpr::new(
            TypeExprKind::Array {
                elem: Box::new(ty),
                size: Box::new(size),
            },
            span,
        );
    }
    Ok(ty)
}

/// Parse a group type expression: a plain type or `(t1, t2, n: t3)`.
pub(crate) fn group_type_expr(input: &mut Input<'_>) -> IResult<GroupTypeExpr> {
    if let Some(open) = opt_sym(Token::LeftParen, input)? {
        let mut positional = Vec::new();
        let mut named = Vec::new();
        loop {
            if let Some(item) = attempt(input, |input| {
                let name = ident(input)?;
                sym(Token::Colon, input)?;
                let ty = group_type_expr(input)?;
                let span = name.span().union(ty.span);
                Ok(NamedGroupType { name, ty, span })
            })? {
                named.push(item);
            } else {
                let item = group_type_expr(input)?;
                if !named.is_empty() {
                    return Err(cut("positional group type after a named one"));
                }
                positional.push(item);
            }
            if opt_sym(Token::Comma, input)?.is_none() {
                break;
            }
        }
        let close = sym(Token::RightParen, input)?;
        return Ok(GroupTypeExpr::new(
            GroupTypeExprKind::List { positional, named },
            open.union(close),
        ));
    }
    let ty = type_expr(input)?;
    let span = ty.span;
    Ok(GroupTypeExpr::new(GroupTypeExprKind::Single(ty), span))
}

fn type_definition(input: &mut Input<'_>) -> IResult<TypeDefinition> {
    if opt_sym(Token::Enum, input)?.is_some() {
        sym(Token::LeftBrace, input)?;
        let mut tags = vec![ident(input)?];
        while opt_sym(Token::Comma, input)?.is_some() {
            tags.push(ident(input)?);
        }
        sym(Token::RightBrace, input)?;
        return Ok(TypeDefinition::Enum { tags });
    }

    // variant definition: `Tag { [te] } | ...`
    if let Some(first) = attempt(input, variant_case)? {
        let mut cases = vec![first];
        while opt_sym(Token::Pipe, input)?.is_some() {
            cases.push(variant_case(input)?);
        }
        return Ok(TypeDefinition::Variant { cases });
    }

    Ok(TypeDefinition::Expr(type_expr(input)?))
}

fn variant_case(input: &mut Input<'_>) -> IResult<VariantCase> {
    let tag = ident(input)?;
    let open = sym(Token::LeftBrace, input)?;
    let ty = if matches!(peek_next(input)?, Some(t) if t.token == Token::RightBrace) {
        None
    } else {
        Some(type_expr(input)?)
    };
    let close = sym(Token::RightBrace, input)?;
    Ok(VariantCase {
        tag,
        ty,
        span: open.union(close),
    })
}

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

/// Parse one variable declaration, or a protected variable.
fn var_decl(input: &mut Input<'_>) -> IResult<Variable> {
    if let Some(item) = attempt(input, |input| {
        take_map(input, "protected variable", |t| match t.token {
            Token::Protected(markup, data) => {
                let markup = Markup::from_str(markup)?;
                (markup == Markup::Var).then(|| ProtectedItem::from_markup(markup, data, t.span))
            }
            _ => None,
        })
    })? {
        return Ok(Variable::Protected(item));
    }

    let is_clock = opt_sym(Token::Clock, input)?.is_some();
    let is_probe = opt_sym(Token::Probe, input)?.is_some();
    let id = ident(input)?;
    let mut span = id.span();
    let ty = if opt_sym(Token::Colon, input)?.is_some() {
        let ty = group_type_expr(input)?;
        span = span.union(ty.span);
        Some(ty)
    } else {
        None
    };
    let when = if opt_sym(Token::When, input)?.is_some() {
        let clock = clock_expr(input)?;
        span = span.union(clock.span);
        Some(clock)
    } else {
        None
    };
    let default = if attempt(input, |input| {
        sym(Token::Default, input)?;
        sym(Token::Equals, input)
    })?
    .is_some()
    {
        let expr = expression(input)?;
        span = span.union(expr.span);
        Some(expr)
    } else {
        None
    };
    let last = if attempt(input, |input| {
        sym(Token::Last, input)?;
        sym(Token::Equals, input)
    })?
    .is_some()
    {
        let expr = expression(input)?;
        span = span.union(expr.span);
        Some(expr)
    } else {
        None
    };
    Ok(Variable::Decl(VarDecl {
        id,
        is_clock,
        is_probe,
        ty,
        when,
        default,
        last,
        span,
    }))
}

/// Parse a `;`-separated variable declaration list, as used between the
/// parentheses of a signature. A trailing `;` is accepted.
pub(crate) fn var_decl_list(input: &mut Input<'_>) -> IResult<Vec<Variable>> {
    let mut decls = Vec::new();
    loop {
        if matches!(peek_next(input)?, Some(t) if t.token == Token::RightParen) {
            break;
        }
        decls.push(var_decl(input)?);
        if opt_sym(Token::Semicolon, input)?.is_none() {
            break;
        }
    }
    Ok(decls)
}

// ---------------------------------------------------------------------------
// Equations and definitions by case
// ---------------------------------------------------------------------------

fn lhs_item(input: &mut Input<'_>) -> IResult<LhsItem> {
    if let Some(span) = opt_sym(Token::Underscore, input)? {
        return Ok(LhsItem::underscore(span));
    }
    Ok(LhsItem::named(ident(input)?))
}

fn lhs(input: &mut Input<'_>) -> IResult<Lhs> {
    // `()` — empty left-hand side
    if let Some(open) = attempt(input, |input| {
        let open = sym(Token::LeftParen, input)?;
        let close = sym(Token::RightParen, input)?;
        Ok(open.union(close))
    })? {
        return Ok(Lhs::new(Vec::new(), open));
    }
    let first = lhs_item(input)?;
    let mut span = first.span;
    let mut items = vec![first];
    let mut is_partial = false;
    while opt_sym(Token::Comma, input)?.is_some() {
        if let Some(dots) = opt_sym(Token::DotDot, input)? {
            span = span.union(dots);
            is_partial = true;
            break;
        }
        let item = lhs_item(input)?;
        span = span.union(item.span);
        items.push(item);
    }
    let mut result = Lhs::new(items, span);
    result.is_partial = is_partial;
    Ok(result)
}

/// Parse an equation; malformed equations are captured as protected
/// fragments so one bad equation never fails its section.
fn equation_or_protected(input: &mut Input<'_>) -> IResult<Equation> {
    let checkpoint = input.checkpoint();
    match equation(input) {
        Ok(equation) => Ok(equation),
        Err(ErrMode::Backtrack(_)) | Err(ErrMode::Cut(_)) => {
            input.reset(&checkpoint);
            let Some((raw, span)) = recover_raw(input, true)? else {
                return Err(backtrack("equation"));
            };
            input.state.diagnostics.push(Diagnostic::new(
                ErrorCode::E101.description(),
                ErrorCode::E101,
                span,
            ));
            log::debug!(span = span.to_string(); "equation protected after parse failure");
            Ok(Equation::new(
                EquationKind::Protected(ProtectedItem::from_fallback(Markup::Syntax, raw, span)),
                span,
            ))
        }
        Err(e) => Err(e),
    }
}

fn equation(input: &mut Input<'_>) -> IResult<Equation> {
    if let Some(protected_eq) = attempt(input, |input| {
        let item = protected(input)?;
        let span = item.span();
        Ok(Equation::new(EquationKind::Protected(item), span))
    })? {
        return Ok(protected_eq);
    }

    if let Some(def) = attempt(input, def_by_case)? {
        let span = def.span;
        return Ok(Equation::new(EquationKind::Def(def), span));
    }

    let lhs = lhs(input)?;
    let lhs_span = lhs.span;
    sym(Token::Equals, input)?;
    let expr = expression(input)?;
    let close = sym(Token::Semicolon, input)?;
    Ok(Equation::new(
        EquationKind::Expr { lhs, expr },
        lhs_span.union(close),
    ))
}

fn def_by_case(input: &mut Input<'_>) -> IResult<DefByCase> {
    let lhs = attempt(input, |input| {
        let lhs = lhs(input)?;
        sym(Token::Colon, input)?;
        Ok(lhs)
    })?;
    let start = lhs.as_ref().map(|l| l.span);

    let next = peek_next(input)?.ok_or_else(|| backtrack("definition by case"))?;
    match next.token {
        Token::Automaton => {
            let kw = sym(Token::Automaton, input)?;
            let start = start.unwrap_or(kw);
            let name = attempt(input, luid)?;
            let mut items = Vec::new();
            loop {
                let Some(token) = peek_next(input)? else {
                    break;
                };
                match token.token {
                    Token::Initial | Token::State => items.push(StateMachineItem::State(
                        state(input)?,
                    )),
                    Token::Colon => items.push(StateMachineItem::Transition(
                        transition_decl(input)?,
                    )),
                    _ => break,
                }
            }
            // the terminator is part of the rendering; the last state's
            // transition may already carry the final semicolon
            let close = opt_sym(Token::Semicolon, input)?.unwrap_or(kw);
            let span = start.union(close);
            let machine = StateMachine::new(items, span).map_err(|error| {
                input.state.diagnostics.push(Diagnostic::new(
                    error.to_string(),
                    ErrorCode::E200,
                    span,
                ));
                cut("invalid state machine")
            })?;
            Ok(DefByCase {
                lhs,
                name,
                case: DefByCaseKind::StateMachine(machine),
                span,
            })
        }
        Token::Activate => {
            let kw = sym(Token::Activate, input)?;
            let start = start.unwrap_or(kw);
            let name = attempt(input, luid)?;
            if opt_sym(Token::When, input)?.is_some() {
                let condition = expression(input)?;
                sym(Token::Match, input)?;
                let mut branches = Vec::new();
                while opt_sym(Token::Pipe, input)?.is_some() {
                    let pattern = pattern(input)?;
                    sym(Token::Colon, input)?;
                    let data_def = data_def(input)?;
                    let span = pattern.span;
                    branches.push(ActivateWhenBranch {
                        pattern,
                        data_def,
                        span,
                    });
                }
                if branches.is_empty() {
                    return Err(cut("activate when needs at least one branch"));
                }
                let close = opt_sym(Token::Semicolon, input)?.unwrap_or(kw);
                let span = start.union(close);
                return Ok(DefByCase {
                    lhs,
                    name,
                    case: DefByCaseKind::ActivateWhen(ActivateWhen {
                        condition,
                        branches,
                    }),
                    span,
                });
            }
            let activation = if_activation(input)?;
            let close = opt_sym(Token::Semicolon, input)?.unwrap_or(kw);
            let span = start.union(close);
            Ok(DefByCase {
                lhs,
                name,
                case: DefByCaseKind::ActivateIf(ActivateIf { activation }),
                span,
            })
        }
        _ => Err(backtrack("definition by case")),
    }
}

/// Parse a data definition: a scope or a single equation.
pub(crate) fn data_def(input: &mut Input<'_>) -> IResult<DataDef> {
    if matches!(peek_next(input)?, Some(t) if t.token == Token::LeftBrace) {
        return Ok(DataDef::Scope(scope(input)?));
    }
    Ok(DataDef::Equation(Box::new(equation(input)?)))
}

fn if_activation(input: &mut Input<'_>) -> IResult<IfActivation> {
    let start = sym(Token::If, input)?;
    let mut branches = Vec::new();
    let condition = expression(input)?;
    sym(Token::Then, input)?;
    let first_span = start.union(condition.span);
    branches.push(IfActivationBranch {
        condition: Some(condition),
        branch: ifte_branch(input)?,
        span: first_span,
    });
    loop {
        if let Some(elsif) = opt_sym(Token::Elsif, input)? {
            let condition = expression(input)?;
            sym(Token::Then, input)?;
            let span = elsif.union(condition.span);
            branches.push(IfActivationBranch {
                condition: Some(condition),
                branch: ifte_branch(input)?,
                span,
            });
            continue;
        }
        let else_span = sym(Token::Else, input)?;
        branches.push(IfActivationBranch {
            condition: None,
            branch: ifte_branch(input)?,
            span: else_span,
        });
        break;
    }
    let span = branches
        .iter()
        .fold(start, |acc, branch| acc.union(branch.span));
    Ok(IfActivation { branches, span })
}

fn ifte_branch(input: &mut Input<'_>) -> IResult<IfteBranch> {
    if matches!(peek_next(input)?, Some(t) if t.token == Token::If) {
        return Ok(IfteBranch::Nested(Box::new(if_activation(input)?)));
    }
    Ok(IfteBranch::DataDef(data_def(input)?))
}

// ---------------------------------------------------------------------------
// State machines
// ---------------------------------------------------------------------------

fn identification(input: &mut Input<'_>) -> IResult<Identification> {
    let luid_part = attempt(input, luid)?;
    let id_part = attempt(input, ident)?;
    let identification = Identification {
        luid: luid_part,
        id: id_part,
    };
    if identification.is_undef() {
        return Err(backtrack("identification"));
    }
    Ok(identification)
}

fn state(input: &mut Input<'_>) -> IResult<State> {
    let initial = opt_sym(Token::Initial, input)?;
    let kw = sym(Token::State, input)?;
    let start = initial.unwrap_or(kw);
    let identification = identification(input)?;
    sym(Token::Colon, input)?;

    let mut strong_transitions = Vec::new();
    if opt_sym(Token::Unless, input)?.is_some() {
        strong_transitions = transitions(input)?;
    }
    let sections = scope_sections_until(input, &[Token::Until])?;
    let mut weak_transitions = Vec::new();
    if opt_sym(Token::Until, input)?.is_some() {
        weak_transitions = transitions(input)?;
    }

    let span = start; // state span starts at the keyword; body spans nest within
    Ok(State {
        identification,
        strong_transitions,
        sections,
        weak_transitions,
        is_initial: initial.is_some(),
        span,
    })
}

fn transitions(input: &mut Input<'_>) -> IResult<Vec<Transition>> {
    let mut transitions = Vec::new();
    loop {
        let Some(token) = peek_next(input)? else {
            break;
        };
        if !matches!(
            token.token,
            Token::If | Token::Restart | Token::Resume | Token::LeftBrace
        ) {
            break;
        }
        transitions.push(transition(input)?);
    }
    Ok(transitions)
}

fn transition(input: &mut Input<'_>) -> IResult<Transition> {
    let arrow = if opt_sym(Token::If, input)?.is_some() {
        guarded_arrow(input)?
    } else {
        arrow(input)?
    };
    let close = sym(Token::Semicolon, input)?;
    let span = arrow.span.union(close);
    Ok(Transition { arrow, span })
}

/// `( expr ) arrow` — the guard, then the arrow body.
fn guarded_arrow(input: &mut Input<'_>) -> IResult<Arrow> {
    let open = sym(Token::LeftParen, input)?;
    let guard = expression(input)?;
    sym(Token::RightParen, input)?;
    let mut arrow = arrow(input)?;
    arrow.guard = Some(guard);
    arrow.span = open.union(arrow.span);
    Ok(arrow)
}

/// `[scope] (target | fork)`
fn arrow(input: &mut Input<'_>) -> IResult<Arrow> {
    let action = if matches!(peek_next(input)?, Some(t) if t.token == Token::LeftBrace) {
        Some(scope(input)?)
    } else {
        None
    };
    let next = peek_next(input)?.ok_or_else(|| backtrack("arrow"))?;
    let start = next.span;
    let target = match next.token {
        Token::If | Token::Colon => ArrowTarget::Fork(fork(input)?),
        Token::Restart | Token::Resume => {
            let is_resume = opt_sym(Token::Resume, input)?.is_some();
            if !is_resume {
                sym(Token::Restart, input)?;
            }
            let identification = attempt(input, identification)?.unwrap_or_default();
            let target = Target {
                identification,
                is_resume,
            };
            ArrowTarget::Target(target)
        }
        _ => return Err(backtrack("arrow target")),
    };
    Ok(Arrow {
        guard: None,
        action,
        target,
        span: start,
    })
}

fn fork(input: &mut Input<'_>) -> IResult<Fork> {
    if opt_sym(Token::If, input)?.is_some() {
        // tree fork: `if guarded {elsif guarded} [else arrow] end`
        let if_arrow = guarded_arrow(input)?;
        let mut elsif_arrows = Vec::new();
        while opt_sym(Token::Elsif, input)?.is_some() {
            elsif_arrows.push(guarded_arrow(input)?);
        }
        let else_arrow = if opt_sym(Token::Else, input)?.is_some() {
            Some(Box::new(arrow(input)?))
        } else {
            None
        };
        sym(Token::End, input)?;
        return Ok(Fork::Tree {
            if_arrow: Box::new(if_arrow),
            elsif_arrows,
            else_arrow,
        });
    }

    // priority fork: `{:p: (if guarded | else arrow)} end`
    let mut forks = Vec::new();
    loop {
        if opt_sym(Token::End, input)?.is_some() {
            break;
        }
        sym(Token::Colon, input)?;
        let priority = take_map(input, "priority", |t| match t.token {
            Token::Integer(text) => text.parse::<i64>().ok(),
            _ => None,
        })?;
        sym(Token::Colon, input)?;
        let (arrow, is_if_arrow) = if opt_sym(Token::If, input)?.is_some() {
            (guarded_arrow(input)?, true)
        } else {
            sym(Token::Else, input)?;
            (arrow(input)?, false)
        };
        forks.push(ForkPriority {
            priority,
            arrow,
            is_if_arrow,
        });
    }
    if forks.is_empty() {
        return Err(cut("empty fork"));
    }
    Ok(Fork::Priority(forks))
}

/// A forward-declared transition at machine level:
/// `:p: [identification] (unless|until) transition`.
fn transition_decl(input: &mut Input<'_>) -> IResult<TransitionDecl> {
    let start = sym(Token::Colon, input)?;
    let priority = take_map(input, "priority", |t| match t.token {
        Token::Integer(text) => text.parse::<i64>().ok(),
        _ => None,
    })?;
    sym(Token::Colon, input)?;
    let identification = attempt(input, identification)?.unwrap_or_default();
    let is_strong = if opt_sym(Token::Unless, input)?.is_some() {
        true
    } else {
        sym(Token::Until, input)?;
        false
    };
    let transition = transition(input)?;
    let span = start.union(transition.span);
    Ok(TransitionDecl {
        priority,
        identification,
        is_strong,
        transition,
        span,
    })
}

// ---------------------------------------------------------------------------
// Scopes and sections
// ---------------------------------------------------------------------------

/// Parse a scope: `{ {scope_section} }`.
pub(crate) fn scope(input: &mut Input<'_>) -> IResult<Scope> {
    let open = sym(Token::LeftBrace, input)?;
    let sections = scope_sections_until(input, &[])?;
    let close = sym(Token::RightBrace, input)?;
    Ok(Scope::new(sections, open.union(close)))
}

fn is_section_start(token: &Token<'_>) -> bool {
    matches!(
        token,
        Token::Var
            | Token::Let
            | Token::Emit
            | Token::Assume
            | Token::Guarantee
            | Token::Diagram
            | Token::Protected(..)
    )
}

/// Parse scope sections until a non-section token or one of `stops`.
pub(crate) fn scope_sections_until(
    input: &mut Input<'_>,
    stops: &[Token<'static>],
) -> IResult<Vec<ScopeSection>> {
    let mut sections = Vec::new();
    loop {
        let Some(token) = peek_next(input)? else {
            break;
        };
        if stops.iter().any(|stop| token.token == *stop) || !is_section_start(&token.token) {
            break;
        }
        sections.push(scope_section(input)?);
    }
    Ok(sections)
}

fn scope_section(input: &mut Input<'_>) -> IResult<ScopeSection> {
    let next = peek_next(input)?.ok_or_else(|| backtrack("scope section"))?;
    match next.token {
        Token::Var => {
            let start = sym(Token::Var, input)?;
            let mut decls = Vec::new();
            let mut end = start;
            loop {
                let Some(decl) = attempt(input, var_decl)? else {
                    break;
                };
                end = sym(Token::Semicolon, input)?;
                decls.push(decl);
            }
            Ok(ScopeSection::Var {
                decls,
                span: start.union(end),
            })
        }
        Token::Let => {
            let start = sym(Token::Let, input)?;
            let mut equations = Vec::new();
            let mut end = start;
            loop {
                let Some(token) = peek_next(input)? else {
                    break;
                };
                if is_section_start(&token.token)
                    || matches!(
                        token.token,
                        Token::RightBrace
                            | Token::RightParen
                            | Token::Semicolon
                            | Token::Until
                            | Token::Initial
                            | Token::State
                    )
                {
                    break;
                }
                let equation = equation_or_protected(input)?;
                end = end.union(equation.span);
                equations.push(equation);
            }
            Ok(ScopeSection::Let {
                equations,
                span: start.union(end),
            })
        }
        Token::Emit => {
            let start = sym(Token::Emit, input)?;
            let mut emissions = Vec::new();
            let mut end = start;
            while let Some(emission) = attempt(input, emission_body)? {
                end = sym(Token::Semicolon, input)?;
                emissions.push(emission);
            }
            Ok(ScopeSection::Emit {
                emissions,
                span: start.union(end),
            })
        }
        Token::Assume | Token::Guarantee => {
            let is_assume = next.token == Token::Assume;
            let start = next_token(input)?.span;
            let mut properties = Vec::new();
            let mut end = start;
            while let Some(property) = attempt(input, formal_property)? {
                end = sym(Token::Semicolon, input)?;
                properties.push(property);
            }
            let span = start.union(end);
            Ok(if is_assume {
                ScopeSection::Assume { properties, span }
            } else {
                ScopeSection::Guarantee { properties, span }
            })
        }
        Token::Diagram => diagram_section(input),
        Token::Protected(..) => {
            let item = protected(input)?;
            Ok(ScopeSection::Protected(item))
        }
        _ => Err(backtrack("scope section")),
    }
}

fn emission_body(input: &mut Input<'_>) -> IResult<EmissionBody> {
    let first = ident(input)?;
    let mut span = first.span();
    let mut flows = vec![first];
    while opt_sym(Token::Comma, input)?.is_some() {
        let flow = ident(input)?;
        span = span.union(flow.span());
        flows.push(flow);
    }
    let condition = if opt_sym(Token::If, input)?.is_some() {
        let expr = expression(input)?;
        span = span.union(expr.span);
        Some(expr)
    } else {
        None
    };
    Ok(EmissionBody {
        flows,
        condition,
        span,
    })
}

fn formal_property(input: &mut Input<'_>) -> IResult<FormalProperty> {
    let id = ident(input)?;
    sym(Token::Colon, input)?;
    let expr = expression(input)?;
    let span = id.span().union(expr.span);
    Ok(FormalProperty { id, expr, span })
}

// ---------------------------------------------------------------------------
// Diagrams
// ---------------------------------------------------------------------------

fn diagram_section(input: &mut Input<'_>) -> IResult<ScopeSection> {
    let start = sym(Token::Diagram, input)?;
    let mut objects = Vec::new();
    let mut wires = Vec::new();
    let mut end = start;
    while matches!(peek_next(input)?, Some(t) if t.token == Token::LeftParen) {
        let (object, wire, close) = diagram_object(input)?;
        end = close;
        if let Some(object) = object {
            objects.push(object);
        }
        if let Some(wire) = wire {
            wires.push(wire);
        }
    }
    let span = start.union(end);
    let diagram = Diagram::new(objects, wires, span).map_err(|error| {
        input.state.diagnostics.push(Diagnostic::new(
            error.to_string(),
            ErrorCode::E200,
            span,
        ));
        cut("invalid diagram wiring")
    })?;
    Ok(ScopeSection::Diagram(diagram))
}

/// Parse one parenthesized diagram entry: an object or a wire.
#[allow(clippy::type_complexity)]
fn diagram_object(
    input: &mut Input<'_>,
) -> IResult<(Option<DiagramObject>, Option<Wire>, Span)> {
    let open = sym(Token::LeftParen, input)?;
    let object_luid = attempt(input, luid)?;

    let next = peek_next(input)?.ok_or_else(|| cut("diagram object"))?;
    match next.token {
        Token::Wire => {
            sym(Token::Wire, input)?;
            let source = connection(input)?;
            sym(Token::FatArrow, input)?;
            let mut targets = vec![connection(input)?];
            while opt_sym(Token::Comma, input)?.is_some() {
                targets.push(connection(input)?);
            }
            let close = sym(Token::RightParen, input)?;
            let wire = Wire {
                luid: object_luid,
                source,
                targets,
                span: open.union(close),
            };
            Ok((None, Some(wire), close))
        }
        _ => {
            let kind = diagram_object_kind(input)?;
            let close = sym(Token::RightParen, input)?;
            let object = DiagramObject::new(object_luid, kind, open.union(close));
            Ok((Some(object), None, close))
        }
    }
}

fn diagram_object_kind(input: &mut Input<'_>) -> IResult<DiagramObjectKind> {
    let next = peek_next(input)?.ok_or_else(|| cut("diagram object"))?;
    match next.token {
        Token::Expr => {
            sym(Token::Expr, input)?;
            Ok(DiagramObjectKind::Expr(expression(input)?))
        }
        Token::Def => {
            sym(Token::Def, input)?;
            if let Some(item) = attempt(input, protected)? {
                return Ok(DiagramObjectKind::Def(DefTarget::Protected(item)));
            }
            Ok(DiagramObjectKind::Def(DefTarget::Lhs(lhs(input)?)))
        }
        Token::Block => {
            sym(Token::Block, input)?;
            if let Some(item) = attempt(input, protected)? {
                return Ok(DiagramObjectKind::Block {
                    instance: BlockInstance::Protected(item),
                    instance_luid: None,
                });
            }
            sym(Token::LeftParen, input)?;
            let operator = if let Some(op_expr) = attempt(input, operator_expr)? {
                armilla_core::operator::OperatorRef::new(
                    armilla_core::operator::OperatorRefKind::OpExpr(Box::new(op_expr)),
                    Vec::new(),
                    Span::default(),
                )
            } else {
                operator_ref(input)?
            };
            sym(Token::RightParen, input)?;
            let instance_luid = attempt(input, luid)?;
            Ok(DiagramObjectKind::Block {
                instance: BlockInstance::Operator(operator),
                instance_luid,
            })
        }
        Token::Group => {
            sym(Token::Group, input)?;
            let operation = if opt_sym(Token::Byname, input)?.is_some() {
                GroupOperation::ByName
            } else if opt_sym(Token::Bypos, input)?.is_some() {
                GroupOperation::ByPos
            } else if attempt(input, |input| {
                sym(Token::LeftParen, input)?;
                sym(Token::RightParen, input)
            })?
            .is_some()
            {
                GroupOperation::Normalize
            } else {
                GroupOperation::NoOp
            };
            Ok(DiagramObjectKind::Bar(operation))
        }
        _ if is_section_start(&next.token) => {
            Ok(DiagramObjectKind::Section(scope_section(input)?))
        }
        _ => Err(cut("diagram object")),
    }
}

fn connection(input: &mut Input<'_>) -> IResult<Connection> {
    // `()` — open endpoint
    if let Some(span) = attempt(input, |input| {
        let open = sym(Token::LeftParen, input)?;
        let close = sym(Token::RightParen, input)?;
        Ok(open.union(close))
    })? {
        return Ok(Connection::open(span));
    }
    let (port, span) = if let Some(span) = opt_sym(Token::SelfKw, input)? {
        (PortRef::SelfRef, span)
    } else {
        let (luid, span) = crate::expr::spanned_luid(input)?;
        (PortRef::Luid(luid), span)
    };
    let mut connection = Connection::port(port, span);
    if let Some(adaptation) = attempt(input, adaptation)? {
        connection = connection.with_adaptation(adaptation);
    }
    Ok(connection)
}

// ---------------------------------------------------------------------------
// Global declarations
// ---------------------------------------------------------------------------

fn signature_head(input: &mut Input<'_>) -> IResult<Signature> {
    let inline = opt_sym(Token::Inline, input)?;
    let is_node = if opt_sym(Token::Node, input)?.is_some() {
        true
    } else {
        sym(Token::Function, input)?;
        false
    };
    let id = ident(input)?;
    let start = inline.unwrap_or_else(|| id.span());

    let mut sizes = Vec::new();
    if opt_sym(Token::SizeOpen, input)?.is_some() {
        sizes.push(ident(input)?);
        while opt_sym(Token::Comma, input)?.is_some() {
            sizes.push(ident(input)?);
        }
        sym(Token::SizeClose, input)?;
    }

    sym(Token::LeftParen, input)?;
    let inputs = var_decl_list(input)?;
    sym(Token::RightParen, input)?;
    sym(Token::Returns, input)?;
    sym(Token::LeftParen, input)?;
    let outputs = var_decl_list(input)?;
    let close = sym(Token::RightParen, input)?;

    let mut constraints = Vec::new();
    while opt_sym(Token::Where, input)?.is_some() {
        let vars = if let Some(item) = attempt(input, protected)? {
            ConstraintVars::Protected(item)
        } else {
            let mut vars = vec![name_ident(input)?];
            while opt_sym(Token::Comma, input)?.is_some() {
                vars.push(name_ident(input)?);
            }
            ConstraintVars::Vars(vars)
        };
        let kind = take_map(input, "numeric kind", |t| match t.token {
            Token::Identifier(name) => NumericKind::from_str(name),
            Token::Signed => Some(NumericKind::Signed),
            Token::Unsigned => Some(NumericKind::Unsigned),
            _ => None,
        })?;
        constraints.push(TypeConstraint {
            vars,
            kind,
            span: close,
        });
    }

    let specialization = if opt_sym(Token::Specialize, input)?.is_some() {
        Some(path_id(input)?)
    } else {
        None
    };

    Ok(Signature {
        id,
        is_node,
        is_inline: inline.is_some(),
        inputs,
        outputs,
        sizes,
        constraints,
        specialization,
        pragmas: Vec::new(),
        span: start.union(close),
    })
}

fn operator_decl(input: &mut Input<'_>, module_kind: ModuleKind) -> IResult<GlobalDecl> {
    let signature = signature_head(input)?;
    let start = signature.span;

    if module_kind == ModuleKind::Interface {
        let close = sym(Token::Semicolon, input)?;
        return Ok(GlobalDecl::new(
            GlobalDeclKind::Signature(signature),
            start.union(close),
        ));
    }

    let (body, end) = if let Some(close) = opt_sym(Token::Semicolon, input)? {
        (OperatorBody::None, close)
    } else if matches!(peek_next(input)?, Some(t) if t.token == Token::LeftBrace) {
        let scope = scope(input)?;
        let end = scope.span;
        (OperatorBody::Scope(scope), end)
    } else {
        let equation = equation(input)?;
        let end = equation.span;
        (OperatorBody::Equation(Box::new(equation)), end)
    };

    let span = start.union(end);
    Ok(GlobalDecl::new(
        GlobalDeclKind::Operator(Operator {
            signature,
            body,
            is_text: false,
            span,
        }),
        span,
    ))
}

fn declaration(input: &mut Input<'_>, module_kind: ModuleKind) -> IResult<GlobalDecl> {
    let next = peek_next(input)?.ok_or_else(|| backtrack("declaration"))?;
    let start = next.span;
    match next.token {
        Token::Use => {
            sym(Token::Use, input)?;
            let path = path_id(input)?;
            let alias = if opt_sym(Token::As, input)?.is_some() {
                Some(ident(input)?)
            } else {
                None
            };
            let close = sym(Token::Semicolon, input)?;
            let span = start.union(close);
            Ok(GlobalDecl::new(
                GlobalDeclKind::Use(UseDirective { path, alias, span }),
                span,
            ))
        }
        Token::Type => {
            sym(Token::Type, input)?;
            let id = ident(input)?;
            let definition = if opt_sym(Token::Equals, input)?.is_some() {
                Some(type_definition(input)?)
            } else {
                None
            };
            let close = sym(Token::Semicolon, input)?;
            let span = start.union(close);
            Ok(GlobalDecl::new(
                GlobalDeclKind::Type(TypeDecl {
                    id,
                    definition,
                    span,
                }),
                span,
            ))
        }
        Token::Const => {
            sym(Token::Const, input)?;
            let id = ident(input)?;
            sym(Token::Colon, input)?;
            let ty = type_expr(input)?;
            let value = if opt_sym(Token::Equals, input)?.is_some() {
                Some(expression(input)?)
            } else {
                None
            };
            let close = sym(Token::Semicolon, input)?;
            let span = start.union(close);
            Ok(GlobalDecl::new(
                GlobalDeclKind::Const(ConstDecl {
                    id,
                    ty,
                    value,
                    span,
                }),
                span,
            ))
        }
        Token::Sensor => {
            sym(Token::Sensor, input)?;
            let id = ident(input)?;
            sym(Token::Colon, input)?;
            let ty = type_expr(input)?;
            let close = sym(Token::Semicolon, input)?;
            let span = start.union(close);
            Ok(GlobalDecl::new(
                GlobalDeclKind::Sensor(SensorDecl { id, ty, span }),
                span,
            ))
        }
        Token::Group => {
            sym(Token::Group, input)?;
            let id = ident(input)?;
            sym(Token::Equals, input)?;
            let ty = group_type_expr(input)?;
            let close = sym(Token::Semicolon, input)?;
            let span = start.union(close);
            Ok(GlobalDecl::new(
                GlobalDeclKind::Group(GroupDecl { id, ty, span }),
                span,
            ))
        }
        Token::Inline | Token::Function | Token::Node => operator_decl(input, module_kind),
        Token::Protected(..) => {
            let item = protected(input)?;
            let span = item.span();
            Ok(GlobalDecl::new(GlobalDeclKind::Protected(item), span))
        }
        _ => Err(backtrack("declaration")),
    }
}

/// Parse all global declarations of a unit, protecting the ones that fail.
fn global_decls(input: &mut Input<'_>, module_kind: ModuleKind) -> IResult<Vec<GlobalDecl>> {
    let mut decls = Vec::new();
    loop {
        trivia0.parse_next(input)?;
        let Some(next) = peek_next(input)? else {
            break;
        };
        let leading = next.token.clone();
        let checkpoint = input.checkpoint();
        match declaration(input, module_kind) {
            Ok(decl) => decls.push(decl),
            Err(ErrMode::Backtrack(_)) | Err(ErrMode::Cut(_)) => {
                input.reset(&checkpoint);
                let Some((raw, span)) = recover_raw(input, true)? else {
                    // no progress possible; drop one token and continue
                    next_token(input)?;
                    continue;
                };
                input.state.diagnostics.push(Diagnostic::new(
                    ErrorCode::E100.description(),
                    ErrorCode::E100,
                    span,
                ));
                log::debug!(span = span.to_string(); "declaration protected after parse failure");
                decls.push(GlobalDecl::new(
                    GlobalDeclKind::Protected(ProtectedItem::from_fallback(
                        fallback_markup(&leading),
                        raw,
                        span,
                    )),
                    span,
                ));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(decls)
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// Standalone-equation entry for the crate root.
pub(crate) fn equation_standalone(input: &mut Input<'_>) -> IResult<Equation> {
    equation(input)
}

/// Standalone-declaration entry for the crate root.
pub(crate) fn declaration_standalone(
    input: &mut Input<'_>,
    module_kind: ModuleKind,
) -> IResult<GlobalDecl> {
    declaration(input, module_kind)
}

/// Standalone-section entry for the crate root.
pub(crate) fn scope_section_standalone(input: &mut Input<'_>) -> IResult<ScopeSection> {
    scope_section(input)
}

/// Parse a whole source unit into a [`Module`].
pub(crate) fn parse_unit(
    kind: ModuleKind,
    name: ModulePath,
    source: &str,
) -> Result<(Module, Vec<Diagnostic>), crate::error::ParseError> {
    let tokens = crate::lexer::tokenize(source)?;
    let mut input = Input {
        input: crate::stream::Tokens::new(&tokens),
        state: crate::stream::ParseState {
            source,
            diagnostics: Vec::new(),
        },
    };

    let decls = match global_decls(&mut input, kind) {
        Ok(decls) => decls,
        Err(_) => {
            // parsing never hard-fails; recovery above consumes everything
            Vec::new()
        }
    };

    let span = Span::new(0..source.len());
    let module = Module::new(kind, name, decls, span).map_err(|error| {
        crate::error::ParseError::from(Diagnostic::new(
            error.to_string(),
            ErrorCode::E200,
            span,
        ))
    })?;
    log::debug!(
        module = module.full_path(),
        declarations = module.declarations().len();
        "unit parsed"
    );
    Ok((module, input.state.diagnostics))
}

