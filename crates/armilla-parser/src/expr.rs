//! Expression parsing.
//!
//! Precedence, loosest to tightest: `->`, boolean (`or`-class), boolean
//! (`and`-class), `when`, comparisons, additive (`+ - @`), multiplicative
//! (`* / mod lsl lsr`), array repetition (`^`), unary, postfix projections.
//! Parentheses always build [`ExprKind::Group`] nodes, so grouping survives
//! re-rendering.

use armilla_core::expr::{
    BinaryOp, CaseBranch, ClockExpr, Expr, ExprKind, Group, GroupAdaptation, GroupItem,
    GroupRenaming, LabelOrIndex, Literal, Modifier, ModifierPath, PortRef, RenamingSource, UnaryOp,
};
use armilla_core::identifier::{Ident, Id, Luid, PathId, Pragma};
use armilla_core::markup::{Markup, ProtectedItem};
use armilla_core::operator::{
    IteratorKind, NaryOp, OperatorExpr, OperatorExprKind, OperatorRef, OperatorRefKind,
    OptGroupItem, PrefixPrimitiveKind, TransposeParams,
};
use armilla_core::pattern::{Pattern, PatternKind, VariantCapture};
use armilla_core::span::Span;

use crate::stream::{Input, IResult, attempt, backtrack, cut, next_token, opt_sym, peek_next, sym, take_map};
use crate::tokens::Token;

/// Parse pragmas preceding an identifier.
fn pragmas(input: &mut Input<'_>) -> IResult<Vec<Pragma>> {
    let mut pragmas = Vec::new();
    while let Some(pragma) = attempt(input, |input| {
        take_map(input, "pragma", |t| match t.token {
            Token::Pragma(text) => Some(Pragma::new(text)),
            _ => None,
        })
    })? {
        pragmas.push(pragma);
    }
    Ok(pragmas)
}

/// Parse an identifier, with leading pragmas.
pub(crate) fn ident(input: &mut Input<'_>) -> IResult<Ident> {
    let pragmas = pragmas(input)?;
    let ident = take_map(input, "identifier", |t| match t.token {
        Token::Identifier(name) => Some(Ident::new(Id::new(name), t.span)),
        _ => None,
    })?;
    Ok(ident.with_pragmas(pragmas))
}

/// Parse a `'name`.
pub(crate) fn name_ident(input: &mut Input<'_>) -> IResult<Ident> {
    take_map(input, "name", |t| match t.token {
        Token::Name(name) => Some(Ident::new(Id::new(name), t.span).as_name()),
        _ => None,
    })
}

/// Parse a path identifier: `id {:: id}`.
pub(crate) fn path_id(input: &mut Input<'_>) -> IResult<PathId> {
    let first = ident(input)?;
    let mut span = first.span();
    let mut ids = vec![first];
    while opt_sym(Token::DoubleColon, input)?.is_some() {
        let next = ident(input)?;
        span = span.union(next.span());
        ids.push(next);
    }
    Ok(PathId::new(ids, span))
}

/// Parse a `#luid`.
pub(crate) fn luid(input: &mut Input<'_>) -> IResult<Luid> {
    take_map(input, "luid", |t| match t.token {
        Token::Luid(name) => Some(Luid::new(name)),
        _ => None,
    })
}

pub(crate) fn spanned_luid(input: &mut Input<'_>) -> IResult<(Luid, Span)> {
    take_map(input, "luid", |t| match t.token {
        Token::Luid(name) => Some((Luid::new(name), t.span)),
        _ => None,
    })
}

/// Parse a protected region token.
pub(crate) fn protected(input: &mut Input<'_>) -> IResult<ProtectedItem> {
    take_map(input, "protected region", |t| match t.token {
        Token::Protected(markup, data) => {
            let markup = Markup::from_str(markup)?;
            Some(ProtectedItem::from_markup(markup, data, t.span))
        }
        _ => None,
    })
}

/// Parse a pattern.
pub(crate) fn pattern(input: &mut Input<'_>) -> IResult<Pattern> {
    let next = peek_next(input)?.ok_or_else(|| backtrack("pattern"))?;
    let span = next.span;
    match &next.token {
        Token::Identifier(_) => {
            let path = path_id(input)?;
            let mut span = path.span();
            // variant pattern: `path _`, `path {}`, `path { id }`
            if let Some(under) = opt_sym(Token::Underscore, input)? {
                span = span.union(under);
                return Ok(Pattern::new(
                    PatternKind::Variant {
                        path,
                        capture: VariantCapture::Underscore,
                    },
                    span,
                ));
            }
            if opt_sym(Token::LeftBrace, input)?.is_some() {
                let capture = match attempt(input, ident)? {
                    Some(id) => VariantCapture::Capture(id),
                    None => VariantCapture::Empty,
                };
                let close = sym(Token::RightBrace, input)?;
                span = span.union(close);
                return Ok(Pattern::new(PatternKind::Variant { path, capture }, span));
            }
            Ok(Pattern::new(PatternKind::Path(path), span))
        }
        Token::CharLiteral(text) => {
            let text = text.to_string();
            next_token(input)?;
            Ok(Pattern::new(PatternKind::Char(text), span))
        }
        Token::Integer(text) => {
            let text = text.to_string();
            next_token(input)?;
            Ok(Pattern::new(
                PatternKind::Int { text, minus: false },
                span,
            ))
        }
        Token::Minus => {
            let start = sym(Token::Minus, input)?;
            let (text, end) = take_map(input, "integer", |t| match t.token {
                Token::Integer(text) => Some((text.to_string(), t.span)),
                _ => None,
            })?;
            Ok(Pattern::new(
                PatternKind::Int { text, minus: true },
                start.union(end),
            ))
        }
        Token::True => {
            let span = sym(Token::True, input)?;
            Ok(Pattern::new(PatternKind::Bool(true), span))
        }
        Token::False => {
            let span = sym(Token::False, input)?;
            Ok(Pattern::new(PatternKind::Bool(false), span))
        }
        Token::Underscore => {
            let span = sym(Token::Underscore, input)?;
            Ok(Pattern::new(PatternKind::Underscore, span))
        }
        Token::Default => {
            let span = sym(Token::Default, input)?;
            Ok(Pattern::new(PatternKind::Default, span))
        }
        Token::Protected(..) => {
            let item = protected(input)?;
            let span = item.span();
            Ok(Pattern::new(PatternKind::Protected(item), span))
        }
        _ => Err(backtrack("pattern")),
    }
}

/// Parse a clock expression: `id`, `not id` or `(id match pattern)`.
pub(crate) fn clock_expr(input: &mut Input<'_>) -> IResult<ClockExpr> {
    if let Some(not_span) = opt_sym(Token::Not, input)? {
        let id = ident(input)?;
        let span = not_span.union(id.span());
        return Ok(ClockExpr::not(id, span));
    }
    if let Some(open) = opt_sym(Token::LeftParen, input)? {
        let id = ident(input)?;
        sym(Token::Match, input)?;
        let pattern = pattern(input)?;
        let close = sym(Token::RightParen, input)?;
        return Ok(ClockExpr::matching(id, pattern, open.union(close)));
    }
    let id = ident(input)?;
    let span = id.span();
    Ok(ClockExpr::ident(id, span))
}

/// Parse a group: `[item {, item}]`, item = `[id:] expr`.
pub(crate) fn group(input: &mut Input<'_>) -> IResult<Group> {
    let mut items = Vec::new();
    // empty group, whatever delimiter encloses it
    if matches!(
        peek_next(input)?,
        Some(t) if matches!(
            t.token,
            Token::RightParen | Token::RightBrace | Token::RightBracket
        )
    ) {
        return Ok(Group::new(items));
    }
    loop {
        items.push(group_item(input)?);
        if opt_sym(Token::Comma, input)?.is_none() {
            break;
        }
    }
    Ok(Group::new(items))
}

fn group_item(input: &mut Input<'_>) -> IResult<GroupItem> {
    if let Some(item) = attempt(input, |input| {
        let label = ident(input)?;
        sym(Token::Colon, input)?;
        let expr = expression(input)?;
        let span = label.span().union(expr.span);
        Ok(GroupItem::labeled(label, expr, span))
    })? {
        return Ok(item);
    }
    Ok(GroupItem::plain(expression(input)?))
}

/// Parse a group adaptation: `.( renaming {, renaming} )`.
pub(crate) fn adaptation(input: &mut Input<'_>) -> IResult<GroupAdaptation> {
    let start = sym(Token::Dot, input)?;
    sym(Token::LeftParen, input)?;
    let mut renamings = Vec::new();
    if !matches!(peek_next(input)?, Some(t) if t.token == Token::RightParen) {
        loop {
            renamings.push(renaming(input)?);
            if opt_sym(Token::Comma, input)?.is_none() {
                break;
            }
        }
    }
    let close = sym(Token::RightParen, input)?;
    Ok(GroupAdaptation {
        renamings,
        span: start.union(close),
    })
}

fn renaming(input: &mut Input<'_>) -> IResult<GroupRenaming> {
    let (source, mut span) = if let Some(id) = attempt(input, ident)? {
        let span = id.span();
        (RenamingSource::Name(id), span)
    } else {
        let (text, span) = take_map(input, "renaming index", |t| match t.token {
            Token::Integer(text) => Some((text.to_string(), t.span)),
            _ => None,
        })?;
        (RenamingSource::Position(Literal::integer(text)), span)
    };
    let mut renaming = None;
    let mut is_shortcut = false;
    if let Some(colon) = opt_sym(Token::Colon, input)? {
        span = span.union(colon);
        if let Some(target) = attempt(input, ident)? {
            span = span.union(target.span());
            renaming = Some(target);
        } else {
            is_shortcut = true;
        }
    }
    Ok(GroupRenaming {
        source,
        renaming,
        is_shortcut,
        span,
    })
}

/// Parse size parameters: `<<expr {, expr}>>`.
fn sizes(input: &mut Input<'_>) -> IResult<Vec<Expr>> {
    if opt_sym(Token::SizeOpen, input)?.is_none() {
        return Ok(Vec::new());
    }
    let mut sizes = Vec::new();
    loop {
        sizes.push(expression(input)?);
        if opt_sym(Token::Comma, input)?.is_none() {
            break;
        }
    }
    sym(Token::SizeClose, input)?;
    Ok(sizes)
}

fn iterator_kind(token: &Token<'_>) -> Option<IteratorKind> {
    Some(match token {
        Token::Map => IteratorKind::Map,
        Token::Fold => IteratorKind::Fold,
        Token::Mapfold => IteratorKind::Mapfold,
        Token::Mapi => IteratorKind::Mapi,
        Token::Foldi => IteratorKind::Foldi,
        Token::Mapfoldi => IteratorKind::Mapfoldi,
        _ => return None,
    })
}

fn nary_op(token: &Token<'_>) -> Option<NaryOp> {
    Some(match token {
        Token::Plus => NaryOp::Plus,
        Token::Star => NaryOp::Mult,
        Token::Land => NaryOp::Land,
        Token::Lor => NaryOp::Lor,
        Token::And => NaryOp::And,
        Token::Or => NaryOp::Or,
        Token::Xor => NaryOp::Xor,
        Token::At => NaryOp::Concat,
        _ => return None,
    })
}

fn primitive_kind(token: &Token<'_>) -> Option<PrefixPrimitiveKind> {
    Some(match token {
        Token::Reverse => PrefixPrimitiveKind::Reverse,
        Token::Pack => PrefixPrimitiveKind::Pack,
        Token::Flatten => PrefixPrimitiveKind::Flatten,
        _ => return None,
    })
}

/// Parse an operator reference: `path | primitive | (op_expr)`, with
/// optional size parameters.
pub(crate) fn operator_ref(input: &mut Input<'_>) -> IResult<OperatorRef> {
    let next = peek_next(input)?.ok_or_else(|| backtrack("operator"))?;
    let start = next.span;
    let kind = if let Some(primitive) = primitive_kind(&next.token) {
        next_token(input)?;
        OperatorRefKind::Primitive(primitive)
    } else if next.token == Token::Transpose {
        sym(Token::Transpose, input)?;
        let params = if opt_sym(Token::LeftBrace, input)?.is_some() {
            let mut indices = Vec::new();
            loop {
                let index = take_map(input, "transpose index", |t| match t.token {
                    Token::Integer(text) => text.parse::<u32>().ok(),
                    _ => None,
                })?;
                indices.push(index);
                if opt_sym(Token::Comma, input)?.is_none() {
                    break;
                }
            }
            sym(Token::RightBrace, input)?;
            TransposeParams::Indices(indices)
        } else {
            TransposeParams::Indices(Vec::new())
        };
        OperatorRefKind::Transpose(params)
    } else if next.token == Token::LeftParen {
        sym(Token::LeftParen, input)?;
        let op_expr = operator_expr(input)?;
        sym(Token::RightParen, input)?;
        OperatorRefKind::OpExpr(Box::new(op_expr))
    } else {
        let pragmas = pragmas(input)?;
        let path = path_id(input)?;
        OperatorRefKind::Path { path, pragmas }
    };
    let sizes = sizes(input)?;
    let span = sizes
        .last()
        .map(|s| start.union(s.span))
        .unwrap_or(start);
    Ok(OperatorRef::new(kind, sizes, span))
}

/// Parse an operator expression: iterator, activation, restart, partial
/// application, n-ary or anonymous operator.
pub(crate) fn operator_expr(input: &mut Input<'_>) -> IResult<OperatorExpr> {
    let next = peek_next(input)?.ok_or_else(|| backtrack("operator expression"))?;
    let start = next.span;

    if let Some(kind) = iterator_kind(&next.token) {
        next_token(input)?;
        let operator = operator_ref(input)?;
        let span = start.union(operator.span);
        return Ok(OperatorExpr::new(
            OperatorExprKind::Iterator { kind, operator },
            span,
        ));
    }

    if next.token == Token::Activate {
        sym(Token::Activate, input)?;
        let operator = operator_ref(input)?;
        sym(Token::Every, input)?;
        // `activate op every cond (last|default) e` or a clock expression
        if let Some(result) = attempt(input, |input| {
            let condition = expression(input)?;
            let is_last = if opt_sym(Token::Last, input)?.is_some() {
                true
            } else {
                sym(Token::Default, input)?;
                false
            };
            let expr = expression(input)?;
            Ok((condition, is_last, expr))
        })? {
            let (condition, is_last, expr) = result;
            let span = start.union(expr.span);
            return Ok(OperatorExpr::new(
                OperatorExprKind::ActivateEvery {
                    operator,
                    condition: Box::new(condition),
                    is_last,
                    expr: Box::new(expr),
                },
                span,
            ));
        }
        let clock = clock_expr(input)?;
        let span = start.union(clock.span);
        return Ok(OperatorExpr::new(
            OperatorExprKind::ActivateClock { operator, clock },
            span,
        ));
    }

    if next.token == Token::Restart {
        sym(Token::Restart, input)?;
        let operator = operator_ref(input)?;
        sym(Token::Every, input)?;
        let condition = expression(input)?;
        let span = start.union(condition.span);
        return Ok(OperatorExpr::new(
            OperatorExprKind::Restart {
                operator,
                condition: Box::new(condition),
            },
            span,
        ));
    }

    if next.token == Token::Function || next.token == Token::Node {
        return anonymous_operator(input);
    }

    if let Some(protected) = attempt(input, |input| {
        take_map(input, "protected op expr", |t| match t.token {
            Token::Protected(markup, data) => {
                let markup = Markup::from_str(markup)?;
                matches!(markup, Markup::OpExpr | Markup::Text | Markup::SyntaxText)
                    .then(|| ProtectedItem::from_markup(markup, data, t.span))
            }
            _ => None,
        })
    })? {
        let span = protected.span();
        return Ok(OperatorExpr::new(
            OperatorExprKind::Protected(protected),
            span,
        ));
    }

    // `op \ args` partial application, or a bare n-ary token
    if let Some(op) = nary_op(&next.token) {
        let span = next_token(input)?.span;
        return Ok(OperatorExpr::new(OperatorExprKind::NAry(op), span));
    }

    let operator = operator_ref(input)?;
    sym(Token::Backslash, input)?;
    let mut args = Vec::new();
    loop {
        if opt_sym(Token::Underscore, input)?.is_some() {
            args.push(OptGroupItem::Underscore);
        } else {
            args.push(OptGroupItem::Item(group_item(input)?));
        }
        if opt_sym(Token::Comma, input)?.is_none() {
            break;
        }
    }
    let span = start; // sized by the operator; args spans live on the items
    Ok(OperatorExpr::new(
        OperatorExprKind::Partial {
            operator,
            args,
        },
        span,
    ))
}

fn anonymous_operator(input: &mut Input<'_>) -> IResult<OperatorExpr> {
    let (is_node, start) = if let Some(span) = opt_sym(Token::Node, input)? {
        (true, span)
    } else {
        (false, sym(Token::Function, input)?)
    };

    if matches!(peek_next(input)?, Some(t) if t.token == Token::LeftParen) {
        // `(inputs) returns (outputs) data_def`
        sym(Token::LeftParen, input)?;
        let inputs = crate::parser::var_decl_list(input)?;
        sym(Token::RightParen, input)?;
        sym(Token::Returns, input)?;
        sym(Token::LeftParen, input)?;
        let outputs = crate::parser::var_decl_list(input)?;
        sym(Token::RightParen, input)?;
        let data_def = crate::parser::data_def(input)?;
        return Ok(OperatorExpr::new(
            OperatorExprKind::AnonymousWithDataDef {
                is_node,
                inputs: inputs.into_iter().filter_map(|v| v.into_decl()).collect(),
                outputs: outputs.into_iter().filter_map(|v| v.into_decl()).collect(),
                data_def: Box::new(data_def),
            },
            start,
        ));
    }

    // `id {, id} sections => expr`
    let mut params = vec![ident(input)?];
    while opt_sym(Token::Comma, input)?.is_some() {
        params.push(ident(input)?);
    }
    let sections = crate::parser::scope_sections_until(input, &[Token::FatArrow])?;
    sym(Token::FatArrow, input)?;
    let expr = expression(input)?;
    let span = start.union(expr.span);
    Ok(OperatorExpr::new(
        OperatorExprKind::AnonymousWithExpr {
            is_node,
            params,
            sections,
            expr: Box::new(expr),
        },
        span,
    ))
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    let span = lhs.span.union(rhs.span);
    Expr::new(
        ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        span,
    )
}

/// Parse an expression.
pub(crate) fn expression(input: &mut Input<'_>) -> IResult<Expr> {
    arrow_level(input)
}

fn arrow_level(input: &mut Input<'_>) -> IResult<Expr> {
    let mut lhs = or_level(input)?;
    while opt_sym(Token::Arrow, input)?.is_some() {
        let rhs = or_level(input)?;
        lhs = binary(BinaryOp::Arrow, lhs, rhs);
    }
    Ok(lhs)
}

fn or_level(input: &mut Input<'_>) -> IResult<Expr> {
    let mut lhs = and_level(input)?;
    loop {
        let op = match peek_next(input)?.map(|t| &t.token) {
            Some(Token::Or) => BinaryOp::Or,
            Some(Token::Xor) => BinaryOp::Xor,
            Some(Token::Lor) => BinaryOp::Lor,
            Some(Token::Lxor) => BinaryOp::Lxor,
            _ => break,
        };
        next_token(input)?;
        let rhs = and_level(input)?;
        lhs = binary(op, lhs, rhs);
    }
    Ok(lhs)
}

fn and_level(input: &mut Input<'_>) -> IResult<Expr> {
    let mut lhs = when_level(input)?;
    loop {
        let op = match peek_next(input)?.map(|t| &t.token) {
            Some(Token::And) => BinaryOp::And,
            Some(Token::Land) => BinaryOp::Land,
            _ => break,
        };
        next_token(input)?;
        let rhs = when_level(input)?;
        lhs = binary(op, lhs, rhs);
    }
    Ok(lhs)
}

fn when_level(input: &mut Input<'_>) -> IResult<Expr> {
    let mut lhs = cmp_level(input)?;
    while opt_sym(Token::When, input)?.is_some() {
        if opt_sym(Token::Match, input)?.is_some() {
            let path = path_id(input)?;
            let span = lhs.span.union(path.span());
            lhs = Expr::new(
                ExprKind::WhenMatch {
                    expr: Box::new(lhs),
                    path,
                },
                span,
            );
        } else {
            let clock = clock_expr(input)?;
            let span = lhs.span.union(clock.span);
            lhs = Expr::new(
                ExprKind::WhenClock {
                    expr: Box::new(lhs),
                    clock,
                },
                span,
            );
        }
    }
    Ok(lhs)
}

fn cmp_level(input: &mut Input<'_>) -> IResult<Expr> {
    let mut lhs = add_level(input)?;
    loop {
        let op = match peek_next(input)?.map(|t| &t.token) {
            Some(Token::Equals) => BinaryOp::Equal,
            Some(Token::Diff) => BinaryOp::Diff,
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Leq) => BinaryOp::Leq,
            Some(Token::Geq) => BinaryOp::Geq,
            _ => break,
        };
        next_token(input)?;
        let rhs = add_level(input)?;
        lhs = binary(op, lhs, rhs);
    }
    Ok(lhs)
}

fn add_level(input: &mut Input<'_>) -> IResult<Expr> {
    let mut lhs = mul_level(input)?;
    loop {
        let op = match peek_next(input)?.map(|t| &t.token) {
            Some(Token::Plus) => BinaryOp::Plus,
            Some(Token::Minus) => BinaryOp::Minus,
            Some(Token::At) => BinaryOp::Concat,
            _ => break,
        };
        next_token(input)?;
        let rhs = mul_level(input)?;
        lhs = binary(op, lhs, rhs);
    }
    Ok(lhs)
}

fn mul_level(input: &mut Input<'_>) -> IResult<Expr> {
    let mut lhs = pow_level(input)?;
    loop {
        let op = match peek_next(input)?.map(|t| &t.token) {
            Some(Token::Star) => BinaryOp::Mult,
            Some(Token::Slash) => BinaryOp::Slash,
            Some(Token::Mod) => BinaryOp::Mod,
            Some(Token::Lsl) => BinaryOp::Lsl,
            Some(Token::Lsr) => BinaryOp::Lsr,
            _ => break,
        };
        next_token(input)?;
        let rhs = pow_level(input)?;
        lhs = binary(op, lhs, rhs);
    }
    Ok(lhs)
}

fn pow_level(input: &mut Input<'_>) -> IResult<Expr> {
    let mut lhs = unary_level(input)?;
    while opt_sym(Token::Caret, input)?.is_some() {
        let rhs = unary_level(input)?;
        let span = lhs.span.union(rhs.span);
        lhs = Expr::new(
            ExprKind::MkArray {
                expr: Box::new(lhs),
                size: Box::new(rhs),
            },
            span,
        );
    }
    Ok(lhs)
}

fn unary_level(input: &mut Input<'_>) -> IResult<Expr> {
    let op = match peek_next(input)?.map(|t| (&t.token, t.span)) {
        Some((Token::Minus, span)) => Some((UnaryOp::Minus, span)),
        Some((Token::Plus, span)) => Some((UnaryOp::Plus, span)),
        Some((Token::Not, span)) => Some((UnaryOp::Not, span)),
        Some((Token::Lnot, span)) => Some((UnaryOp::Lnot, span)),
        Some((Token::Pre, span)) => Some((UnaryOp::Pre, span)),
        _ => None,
    };
    if let Some((op, span)) = op {
        next_token(input)?;
        let expr = unary_level(input)?;
        let span = span.union(expr.span);
        return Ok(Expr::new(
            ExprKind::Unary {
                op,
                expr: Box::new(expr),
            },
            span,
        ));
    }
    postfix_level(input)
}

fn postfix_level(input: &mut Input<'_>) -> IResult<Expr> {
    let mut expr = atom(input)?;
    loop {
        // `.(...)` adaptation or `.label` projection
        if let Some(adapted) = attempt(input, |input| {
            let adaptation = adaptation(input)?;
            Ok(adaptation)
        })? {
            let span = expr.span.union(adapted.span);
            expr = Expr::new(
                ExprKind::Adaptation {
                    expr: Box::new(expr),
                    adaptation: adapted,
                },
                span,
            );
            continue;
        }
        if let Some(label) = attempt(input, |input| {
            sym(Token::Dot, input)?;
            ident(input)
        })? {
            let span = expr.span.union(label.span());
            expr = Expr::new(
                ExprKind::StructProj {
                    expr: Box::new(expr),
                    label,
                },
                span,
            );
            continue;
        }
        // `[i]` projection or `[i .. j]` slice
        if let Some(projected) = attempt(input, |input| {
            sym(Token::LeftBracket, input)?;
            let index = expression(input)?;
            if opt_sym(Token::DotDot, input)?.is_some() {
                let end = expression(input)?;
                let close = sym(Token::RightBracket, input)?;
                Ok((Some(end), index, close))
            } else {
                let close = sym(Token::RightBracket, input)?;
                Ok((None, index, close))
            }
        })? {
            let (slice_end, index, close) = projected;
            let span = expr.span.union(close);
            expr = match slice_end {
                Some(end) => Expr::new(
                    ExprKind::Slice {
                        expr: Box::new(expr),
                        start: Box::new(index),
                        end: Box::new(end),
                    },
                    span,
                ),
                None => Expr::new(
                    ExprKind::StaticProj {
                        expr: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                ),
            };
            continue;
        }
        break;
    }
    Ok(expr)
}

fn atom(input: &mut Input<'_>) -> IResult<Expr> {
    let next = peek_next(input)?.ok_or_else(|| backtrack("expression"))?;
    let span = next.span;
    match &next.token {
        Token::Integer(text) => {
            let lit = Literal::integer(*text);
            next_token(input)?;
            Ok(Expr::new(ExprKind::Literal(lit), span))
        }
        Token::Float(text) => {
            let lit = Literal::float(*text);
            next_token(input)?;
            Ok(Expr::new(ExprKind::Literal(lit), span))
        }
        Token::CharLiteral(text) => {
            let lit = Literal::character(*text);
            next_token(input)?;
            Ok(Expr::new(ExprKind::Literal(lit), span))
        }
        Token::True => {
            sym(Token::True, input)?;
            Ok(Expr::new(ExprKind::Literal(Literal::boolean(true)), span))
        }
        Token::False => {
            sym(Token::False, input)?;
            Ok(Expr::new(ExprKind::Literal(Literal::boolean(false)), span))
        }
        Token::Luid(_) => {
            let (port, span) = spanned_luid(input)?;
            Ok(Expr::new(ExprKind::Port(PortRef::Luid(port)), span))
        }
        Token::SelfKw => {
            let span = sym(Token::SelfKw, input)?;
            Ok(Expr::new(ExprKind::Port(PortRef::SelfRef), span))
        }
        Token::Last => {
            let start = sym(Token::Last, input)?;
            let name = name_ident(input)?;
            let span = start.union(name.span());
            Ok(Expr::new(ExprKind::Last(name), span))
        }
        Token::Protected(..) => {
            let item = protected(input)?;
            let span = item.span();
            Ok(Expr::new(ExprKind::Protected(item), span))
        }
        Token::If => ifte(input),
        Token::Window => window(input),
        Token::Merge => merge(input),
        Token::LeftParen => paren_expr(input),
        Token::LeftBracket => {
            let start = sym(Token::LeftBracket, input)?;
            let group = group(input)?;
            let close = sym(Token::RightBracket, input)?;
            Ok(Expr::new(
                ExprKind::MkArrayGroup(group),
                start.union(close),
            ))
        }
        Token::LeftBrace => {
            let start = sym(Token::LeftBrace, input)?;
            let group = group(input)?;
            let close = sym(Token::RightBrace, input)?;
            let mut span = start.union(close);
            let ty = if opt_sym(Token::Colon, input)?.is_some() {
                let path = path_id(input)?;
                span = span.union(path.span());
                Some(path)
            } else {
                None
            };
            Ok(Expr::new(ExprKind::MkStruct { group, ty }, span))
        }
        Token::Reverse | Token::Pack | Token::Flatten | Token::Transpose => {
            operator_instance(input)
        }
        Token::Identifier(_) | Token::Pragma(_) => path_or_instance(input),
        _ => Err(backtrack("expression")),
    }
}

fn ifte(input: &mut Input<'_>) -> IResult<Expr> {
    let start = sym(Token::If, input)?;
    let cond = expression(input)?;
    sym(Token::Then, input)?;
    let then_expr = expression(input)?;
    sym(Token::Else, input)?;
    let else_expr = expression(input)?;
    let span = start.union(else_expr.span);
    Ok(Expr::new(
        ExprKind::Ifte {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        },
        span,
    ))
}

fn window(input: &mut Input<'_>) -> IResult<Expr> {
    let start = sym(Token::Window, input)?;
    sym(Token::SizeOpen, input)?;
    let size = expression(input)?;
    sym(Token::SizeClose, input)?;
    sym(Token::LeftParen, input)?;
    let params = group(input)?;
    sym(Token::RightParen, input)?;
    sym(Token::LeftParen, input)?;
    let init = group(input)?;
    let close = sym(Token::RightParen, input)?;
    Ok(Expr::new(
        ExprKind::Window {
            size: Box::new(size),
            params,
            init,
        },
        start.union(close),
    ))
}

fn merge(input: &mut Input<'_>) -> IResult<Expr> {
    let start = sym(Token::Merge, input)?;
    let mut groups = Vec::new();
    let mut span = start;
    while let Some(opened) = opt_sym(Token::LeftParen, input)? {
        let _ = opened;
        let group = group(input)?;
        let close = sym(Token::RightParen, input)?;
        span = span.union(close);
        groups.push(group);
    }
    if groups.is_empty() {
        return Err(cut("merge needs at least one group"));
    }
    Ok(Expr::new(ExprKind::Merge(groups), span))
}

/// An operator instance whose operator part starts at the current token:
/// `operator [luid] (group)`.
fn operator_instance(input: &mut Input<'_>) -> IResult<Expr> {
    let operator = operator_ref(input)?;
    let start = operator.span;
    let instance_luid = attempt(input, luid)?;
    sym(Token::LeftParen, input)?;
    let params = group(input)?;
    let close = sym(Token::RightParen, input)?;
    Ok(Expr::new(
        ExprKind::OperatorInstance {
            operator,
            params,
            luid: instance_luid,
        },
        start.union(close),
    ))
}

/// A path atom: a plain path reference, a variant or group construction, or
/// an operator instance call.
fn path_or_instance(input: &mut Input<'_>) -> IResult<Expr> {
    let pragmas = pragmas(input)?;
    let path = path_id(input)?;
    let path_span = path.span();

    // `path group (expr)` — group creation
    if opt_sym(Token::Group, input)?.is_some() {
        sym(Token::LeftParen, input)?;
        let expr = expression(input)?;
        let close = sym(Token::RightParen, input)?;
        return Ok(Expr::new(
            ExprKind::MkGroup {
                path,
                expr: Box::new(expr),
            },
            path_span.union(close),
        ));
    }

    // `path {group}` — variant construction
    if let Some(result) = attempt(input, |input| {
        sym(Token::LeftBrace, input)?;
        let group = group(input)?;
        let close = sym(Token::RightBrace, input)?;
        Ok((group, close))
    })? {
        let (group, close) = result;
        return Ok(Expr::new(
            ExprKind::MkVariant { tag: path, group },
            path_span.union(close),
        ));
    }

    // `path [<<sizes>>] [luid] (group)` — operator instance
    if let Some(expr) = attempt(input, |input| {
        let sizes = sizes(input)?;
        let instance_luid = attempt(input, luid)?;
        sym(Token::LeftParen, input)?;
        let params = group(input)?;
        let close = sym(Token::RightParen, input)?;
        let operator = OperatorRef::new(
            OperatorRefKind::Path {
                path: path_id_clone(&path),
                pragmas: pragmas.clone(),
            },
            sizes,
            path_span,
        );
        Ok(Expr::new(
            ExprKind::OperatorInstance {
                operator,
                params,
                luid: instance_luid,
            },
            path_span.union(close),
        ))
    })? {
        return Ok(expr);
    }

    Ok(Expr::new(ExprKind::Path(path), path_span))
}

fn path_id_clone(path: &PathId) -> PathId {
    PathId::new(path.ids().to_vec(), path.span())
}

fn case_expr(input: &mut Input<'_>, open: Span) -> IResult<Expr> {
    sym(Token::Case, input)?;
    let scrutinee = expression(input)?;
    sym(Token::Of, input)?;
    let mut branches = Vec::new();
    loop {
        if opt_sym(Token::Pipe, input)?.is_none() {
            break;
        }
        let pattern = pattern(input)?;
        sym(Token::Colon, input)?;
        let expr = expression(input)?;
        let span = pattern.span.union(expr.span);
        branches.push(CaseBranch {
            pattern,
            expr,
            span,
        });
    }
    if branches.is_empty() {
        return Err(cut("case needs at least one branch"));
    }
    let close = sym(Token::RightParen, input)?;
    Ok(Expr::new(
        ExprKind::Case {
            expr: Box::new(scrutinee),
            branches,
        },
        open.union(close),
    ))
}

/// Dispatch the constructs introduced by `(`.
fn paren_expr(input: &mut Input<'_>) -> IResult<Expr> {
    let open = sym(Token::LeftParen, input)?;

    if matches!(peek_next(input)?, Some(t) if t.token == Token::Case) {
        return case_expr(input, open);
    }

    // `(op_expr) [sizes] [luid] (group)` — operator instance
    if let Some(expr) = attempt(input, |input| {
        let op_expr = operator_expr(input)?;
        let op_span = op_expr.span;
        sym(Token::RightParen, input)?;
        let sizes = sizes(input)?;
        let instance_luid = attempt(input, luid)?;
        sym(Token::LeftParen, input)?;
        let params = group(input)?;
        let close = sym(Token::RightParen, input)?;
        let operator = OperatorRef::new(
            OperatorRefKind::OpExpr(Box::new(op_expr)),
            sizes,
            open.union(op_span),
        );
        Ok(Expr::new(
            ExprKind::OperatorInstance {
                operator,
                params,
                luid: instance_luid,
            },
            open.union(close),
        ))
    })? {
        return Ok(expr);
    }

    // expression-headed forms: cast, functional update, dynamic projection
    if let Some(expr) = attempt(input, |input| {
        let head = expression(input)?;
        let next = peek_next(input)?.ok_or_else(|| backtrack("paren expression"))?;
        match next.token {
            Token::CastOp => {
                sym(Token::CastOp, input)?;
                let ty = crate::parser::type_expr(input)?;
                let close = sym(Token::RightParen, input)?;
                Ok(Expr::new(
                    ExprKind::Cast {
                        expr: Box::new(head),
                        ty,
                    },
                    open.union(close),
                ))
            }
            Token::With => {
                sym(Token::With, input)?;
                let mut modifiers = Vec::new();
                loop {
                    modifiers.push(modifier(input)?);
                    if opt_sym(Token::Semicolon, input)?.is_none() {
                        break;
                    }
                    // allow an optional trailing semicolon
                    if matches!(peek_next(input)?, Some(t) if t.token == Token::RightParen) {
                        break;
                    }
                }
                let close = sym(Token::RightParen, input)?;
                Ok(Expr::new(
                    ExprKind::MkCopy {
                        expr: Box::new(head),
                        modifiers,
                    },
                    open.union(close),
                ))
            }
            Token::Dot => {
                sym(Token::Dot, input)?;
                let accessors = accessors(input)?;
                sym(Token::Default, input)?;
                let default = expression(input)?;
                let close = sym(Token::RightParen, input)?;
                Ok(Expr::new(
                    ExprKind::DynProj {
                        expr: Box::new(head),
                        accessors,
                        default: Box::new(default),
                    },
                    open.union(close),
                ))
            }
            _ => Err(backtrack("paren expression")),
        }
    })? {
        return Ok(expr);
    }

    // otherwise a (possibly empty, possibly labeled) group
    let group = group(input)?;
    let close = sym(Token::RightParen, input)?;
    Ok(Expr::new(ExprKind::Group(group), open.union(close)))
}

fn accessors(input: &mut Input<'_>) -> IResult<Vec<LabelOrIndex>> {
    let mut accessors = Vec::new();
    loop {
        if let Some(label) = attempt(input, |input| {
            sym(Token::Dot, input)?;
            ident(input)
        })? {
            accessors.push(LabelOrIndex::Label(label));
            continue;
        }
        if let Some(index) = attempt(input, |input| {
            sym(Token::LeftBracket, input)?;
            let index = expression(input)?;
            sym(Token::RightBracket, input)?;
            Ok(index)
        })? {
            accessors.push(LabelOrIndex::Index(index));
            continue;
        }
        break;
    }
    if accessors.is_empty() {
        return Err(backtrack("accessor"));
    }
    Ok(accessors)
}

fn modifier(input: &mut Input<'_>) -> IResult<Modifier> {
    if let Some(item) = attempt(input, protected)? {
        sym(Token::Equals, input)?;
        let expr = expression(input)?;
        let span = item.span().union(expr.span);
        return Ok(Modifier {
            path: ModifierPath::Protected(item),
            expr,
            span,
        });
    }
    let accessors = accessors(input)?;
    sym(Token::Equals, input)?;
    let expr = expression(input)?;
    let span = expr.span;
    Ok(Modifier {
        path: ModifierPath::Accessors(accessors),
        expr,
        span,
    })
}
