//! Token-stream plumbing shared by the parser modules.

use winnow::{
    Parser as _,
    combinator::repeat,
    error::{ContextError, ErrMode},
    stream::{Stateful, Stream, TokenSlice},
    token::any,
};

use armilla_core::Span;

use crate::error::Diagnostic;
use crate::tokens::{PositionedToken, Token};

/// Context type for parser errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Context {
    /// Description of what is currently being parsed.
    Label(&'static str),
}

/// State threaded through the parse: the source buffer (for protected
/// fallbacks, which need the exact original bytes) and the diagnostics
/// recorded by recovery.
#[derive(Debug, Clone)]
pub(crate) struct ParseState<'src> {
    pub(crate) source: &'src str,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

pub(crate) type Tokens<'src> = TokenSlice<'src, PositionedToken<'src>>;
pub(crate) type Input<'src> = Stateful<Tokens<'src>, ParseState<'src>>;
pub(crate) type IResult<O> = std::result::Result<O, ErrMode<ContextError<Context>>>;

/// Skip whitespace, newlines and comments.
pub(crate) fn trivia0(input: &mut Input<'_>) -> IResult<()> {
    repeat(
        0..,
        any.verify(|token: &PositionedToken<'_>| token.token.is_trivia())
            .void(),
    )
    .parse_next(input)
}

/// Skip trivia, then match one specific token, returning its span.
pub(crate) fn sym(expected: Token<'static>, input: &mut Input<'_>) -> IResult<Span> {
    trivia0.parse_next(input)?;
    any.verify_map(|token: &PositionedToken<'_>| (token.token == expected).then_some(token.span))
        .context(Context::Label("token"))
        .parse_next(input)
}

/// Try to match one specific token; resets the input when it is absent.
pub(crate) fn opt_sym(expected: Token<'static>, input: &mut Input<'_>) -> IResult<Option<Span>> {
    let checkpoint = input.checkpoint();
    match sym(expected, input) {
        Ok(span) => Ok(Some(span)),
        Err(ErrMode::Backtrack(_)) => {
            input.reset(&checkpoint);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Peek the next meaningful token without consuming anything.
pub(crate) fn peek_next<'src>(
    input: &mut Input<'src>,
) -> IResult<Option<&'src PositionedToken<'src>>> {
    let checkpoint = input.checkpoint();
    trivia0.parse_next(input)?;
    let result = match any::<_, ErrMode<ContextError<Context>>>.parse_next(input) {
        Ok(token) => Some(token),
        Err(ErrMode::Backtrack(_)) => None,
        Err(e) => return Err(e),
    };
    input.reset(&checkpoint);
    Ok(result)
}

/// Skip trivia, then consume the next token whatever it is.
pub(crate) fn next_token<'src>(
    input: &mut Input<'src>,
) -> IResult<&'src PositionedToken<'src>> {
    trivia0.parse_next(input)?;
    any.parse_next(input)
}

/// Run a sub-parser, resetting the input if it backtracks.
pub(crate) fn attempt<'src, O>(
    input: &mut Input<'src>,
    f: impl FnOnce(&mut Input<'src>) -> IResult<O>,
) -> IResult<Option<O>> {
    let checkpoint = input.checkpoint();
    match f(input) {
        Ok(value) => Ok(Some(value)),
        Err(ErrMode::Backtrack(_)) => {
            input.reset(&checkpoint);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Skip trivia, then consume the next token through a mapping function,
/// resetting the input when the function rejects it.
pub(crate) fn take_map<'src, O>(
    input: &mut Input<'src>,
    label: &'static str,
    f: impl Fn(&'src PositionedToken<'src>) -> Option<O>,
) -> IResult<O> {
    let checkpoint = input.checkpoint();
    trivia0.parse_next(input)?;
    match any::<_, ErrMode<ContextError<Context>>>.parse_next(input) {
        Ok(token) => match f(token) {
            Some(value) => Ok(value),
            None => {
                input.reset(&checkpoint);
                Err(backtrack(label))
            }
        },
        Err(_) => {
            input.reset(&checkpoint);
            Err(backtrack(label))
        }
    }
}

/// A backtrack error with a label.
pub(crate) fn backtrack(label: &'static str) -> ErrMode<ContextError<Context>> {
    let mut error = ContextError::new();
    error.push(Context::Label(label));
    ErrMode::Backtrack(error)
}

/// A cut error with a label: the current construct is malformed and outer
/// alternatives must not be tried.
pub(crate) fn cut(label: &'static str) -> ErrMode<ContextError<Context>> {
    let mut error = ContextError::new();
    error.push(Context::Label(label));
    ErrMode::Cut(error)
}
