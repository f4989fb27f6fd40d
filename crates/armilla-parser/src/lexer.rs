//! Lexical analyzer for Armilla source text.
//!
//! The lexer converts source text into a stream of [`Token`]s for parsing.
//! It handles whitespace, `--` comments, numeric literals with width
//! suffixes, `{markup% ... %markup}` protected regions and `#pragma`
//! markers. The public entry point is [`tokenize`], which performs
//! error-recovering lexical analysis and collects all diagnostics in a
//! single pass.

use winnow::{
    Parser as _,
    combinator::{alt, cut_err, not, opt, preceded, terminated},
    error::{AddContext, ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stream},
    token::{literal, none_of, one_of, take_until, take_while},
};

use armilla_core::Span;

use crate::{
    error::{Diagnostic, ErrorCode, ParseError},
    tokens::{PositionedToken, Token, keyword},
};

/// Rich diagnostic information for lexer errors, attached to winnow errors
/// via `.context()`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LexerDiagnostic {
    code: ErrorCode,
    message: &'static str,
    /// The error span covers from `start` to the error position.
    start: usize,
}

type Input<'a> = LocatingSlice<&'a str>;
type IResult<O> = ModalResult<O, ContextError<LexerDiagnostic>>;

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Parse an identifier or keyword.
fn identifier<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let word = (
        one_of(is_ident_start),
        take_while(0.., is_ident_continue),
    )
        .take()
        .parse_next(input)?;
    Ok(keyword(word).unwrap_or(Token::Identifier(word)))
}

/// Parse a `'name` or a character literal `'c'`.
fn name_or_char<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let checkpoint = input.checkpoint();
    '\''.parse_next(input)?;

    // character literal: 'c'
    let char_attempt: IResult<(char, char)> =
        (none_of(['\'', '\n']), '\'').parse_next(input);
    match char_attempt {
        Ok(_) => {
            let end = input.current_token_start();
            input.reset(&checkpoint);
            let start = input.current_token_start();
            let text = input.next_slice(end - start);
            return Ok(Token::CharLiteral(text));
        }
        Err(ErrMode::Backtrack(_)) => {
            input.reset(&checkpoint);
            '\''.parse_next(input)?;
        }
        Err(e) => return Err(e),
    }

    // otherwise a name: 'ident
    let word = (
        one_of(is_ident_start),
        take_while(0.., is_ident_continue),
    )
        .take()
        .parse_next(input)
        .map_err(|e: ErrMode<ContextError<LexerDiagnostic>>| {
            e.map(|ctx| {
                ctx.add_context(
                    input,
                    &input.checkpoint(),
                    LexerDiagnostic {
                        code: ErrorCode::E002,
                        message: "expected a character literal or a name after `'`",
                        start: input.current_token_start().saturating_sub(1),
                    },
                )
            })
        })?;
    Ok(Token::Name(word))
}

/// Parse a `#pragma ... #end` marker or a `#luid`.
fn pragma_or_luid<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let checkpoint = input.checkpoint();
    let pragma_attempt: IResult<&str> = preceded(
        literal("#pragma"),
        (take_until(0.., "#end"), literal("#end")).take(),
    )
    .parse_next(input);
    match pragma_attempt {
        Ok(_) => {
            let end = input.current_token_start();
            input.reset(&checkpoint);
            let start = input.current_token_start();
            let text = input.next_slice(end - start);
            return Ok(Token::Pragma(text));
        }
        Err(ErrMode::Backtrack(_)) => input.reset(&checkpoint),
        Err(e) => return Err(e),
    }

    preceded(
        '#',
        take_while(1.., |c: char| {
            c.is_ascii_alphanumeric() || c == '_' || c == '-'
        }),
    )
    .map(Token::Luid)
    .parse_next(input)
}

/// Parse a `{markup% ... %markup}` protected region, or a plain `{`.
fn protected_or_brace<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let checkpoint = input.checkpoint();
    let region_start = input.current_token_start();
    '{'.parse_next(input)?;

    let header: IResult<&str> = terminated(
        take_while(1.., |c: char| c.is_ascii_lowercase() || c == '_'),
        '%',
    )
    .parse_next(input);
    let markup = match header {
        // only the known markup vocabulary opens a protected region
        Ok(markup) if armilla_core::Markup::from_str(markup).is_some() => markup,
        Ok(_) | Err(ErrMode::Backtrack(_)) => {
            input.reset(&checkpoint);
            '{'.parse_next(input)?;
            return Ok(Token::LeftBrace);
        }
        Err(e) => return Err(e),
    };

    // committed to a protected region: the closing marker must exist
    let end_marker = format!("%{}}}", markup);
    let data = cut_err(terminated(
        take_until(0.., end_marker.as_str()),
        literal(end_marker.as_str()),
    ))
    .context(LexerDiagnostic {
        code: ErrorCode::E003,
        message: "unterminated protected region",
        start: region_start,
    })
    .parse_next(input)?;
    Ok(Token::Protected(markup, data))
}

/// Parse a numeric literal: integer (decimal or based, with optional width
/// suffix) or float (with optional exponent and width suffix).
fn numeric<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let checkpoint = input.checkpoint();
    let start = input.current_token_start();

    // based integers: 0b..., 0o..., 0x...
    let based: IResult<&str> = alt((
        preceded(literal("0b"), take_while(1.., |c: char| c.is_digit(2))).take(),
        preceded(literal("0o"), take_while(1.., |c: char| c.is_digit(8))).take(),
        preceded(
            literal("0x"),
            take_while(1.., |c: char| c.is_ascii_hexdigit()),
        )
        .take(),
    ))
    .parse_next(input);
    if based.is_ok() {
        let _ = opt(int_suffix).parse_next(input)?;
        let end = input.current_token_start();
        input.reset(&checkpoint);
        return Ok(Token::Integer(input.next_slice(end - start)));
    }

    take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;

    // a '.' not followed by another '.' makes it a float
    let dot = opt(terminated('.', not(literal(".")))).parse_next(input)?;
    let is_float = if dot.is_some() {
        take_while(0.., |c: char| c.is_ascii_digit()).parse_next(input)?;
        let _ = opt((
            one_of(['e', 'E']),
            opt(one_of(['+', '-'])),
            take_while(1.., |c: char| c.is_ascii_digit()),
        ))
        .parse_next(input)?;
        let _ = opt(float_suffix).parse_next(input)?;
        true
    } else {
        let _ = opt(int_suffix).parse_next(input)?;
        false
    };

    let end = input.current_token_start();
    input.reset(&checkpoint);
    let text = input.next_slice(end - start);
    Ok(if is_float {
        Token::Float(text)
    } else {
        Token::Integer(text)
    })
}

fn int_suffix<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    (
        alt((literal("_ui"), literal("_i"))),
        alt((literal("8"), literal("16"), literal("32"), literal("64"))),
    )
        .take()
        .parse_next(input)
}

fn float_suffix<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    (literal("_f"), alt((literal("32"), literal("64"))))
        .take()
        .parse_next(input)
}

/// Parse a line comment starting with `--`.
fn line_comment<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    preceded(literal("--"), take_while(0.., |c| c != '\n'))
        .map(Token::LineComment)
        .parse_next(input)
}

/// Parse multi-character operators (order matters - longest first).
fn multi_char_operator<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    alt((
        alt((
            literal("::").value(Token::DoubleColon),
            literal(":>").value(Token::CastOp),
            literal("->").value(Token::Arrow),
            literal("=>").value(Token::FatArrow),
            literal("<<").value(Token::SizeOpen),
        )),
        alt((
            literal(">>").value(Token::SizeClose),
            literal("<>").value(Token::Diff),
            literal("<=").value(Token::Leq),
            literal(">=").value(Token::Geq),
            literal("..").value(Token::DotDot),
        )),
    ))
    .parse_next(input)
}

/// Parse single character tokens.
fn single_char_token<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    alt((
        alt((
            '('.value(Token::LeftParen),
            ')'.value(Token::RightParen),
            '}'.value(Token::RightBrace),
            '['.value(Token::LeftBracket),
            ']'.value(Token::RightBracket),
            ','.value(Token::Comma),
            ';'.value(Token::Semicolon),
        )),
        alt((
            ':'.value(Token::Colon),
            '='.value(Token::Equals),
            '|'.value(Token::Pipe),
            '_'.value(Token::Underscore),
            '<'.value(Token::Lt),
            '>'.value(Token::Gt),
        )),
        alt((
            '+'.value(Token::Plus),
            '-'.value(Token::Minus),
            '*'.value(Token::Star),
            '/'.value(Token::Slash),
            '@'.value(Token::At),
            '^'.value(Token::Caret),
            '\\'.value(Token::Backslash),
            '.'.value(Token::Dot),
        )),
    ))
    .parse_next(input)
}

/// Parse whitespace (spaces, tabs, etc. but not newlines).
fn whitespace<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    take_while(1.., |c: char| c.is_whitespace() && c != '\n')
        .value(Token::Whitespace)
        .parse_next(input)
}

/// Parse newline.
fn newline<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    '\n'.value(Token::Newline).parse_next(input)
}

/// Parse a single token with position tracking.
fn positioned_token<'a>(input: &mut Input<'a>) -> IResult<PositionedToken<'a>> {
    let start_pos = input.current_token_start();

    let token = alt((
        alt((
            line_comment,       // must come before '-'
            multi_char_operator, // must come before single char operators
            numeric,            // must come before '.'
            identifier,
            name_or_char,
        )),
        alt((
            pragma_or_luid,
            protected_or_brace, // must come before '{'
            single_char_token,
            newline,
            whitespace,
        )),
    ))
    .parse_next(input)?;

    let end_pos = input.current_token_start();
    let span = Span::new(start_pos..end_pos);

    Ok(PositionedToken::new(token, span))
}

/// Lexer that accumulates tokens and diagnostics during tokenization.
struct Lexer<'a> {
    tokens: Vec<PositionedToken<'a>>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    fn new() -> Self {
        Self {
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Tokenize the input, collecting tokens and errors.
    fn tokenize(&mut self, mut input: Input<'a>) {
        while !input.is_empty() {
            match positioned_token(&mut input) {
                Ok(token) => {
                    self.tokens.push(token);
                }
                Err(e) => {
                    let error_pos = input.current_token_start();
                    self.diagnostics.push(Self::convert_err_mode(e, error_pos));
                    // skip one character and resume
                    if !input.is_empty() {
                        input.next_token();
                    }
                }
            }
        }
    }

    fn finish(self) -> Result<Vec<PositionedToken<'a>>, ParseError> {
        if self.diagnostics.is_empty() {
            Ok(self.tokens)
        } else {
            Err(ParseError::new(self.diagnostics))
        }
    }

    /// Convert an ErrMode and error position to a Diagnostic.
    ///
    /// Extracts [`LexerDiagnostic`] from the error context for rich error
    /// info; falls back to E001 (unexpected character) otherwise.
    fn convert_err_mode(
        err: ErrMode<ContextError<LexerDiagnostic>>,
        error_pos: usize,
    ) -> Diagnostic {
        let context_error = match err {
            ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx,
            ErrMode::Incomplete(_) => ContextError::new(),
        };

        if let Some(LexerDiagnostic {
            code,
            message,
            start,
        }) = context_error.context().next()
        {
            let span = Span::new(*start..error_pos);
            return Diagnostic::new(*message, *code, span);
        }

        let span = Span::new(error_pos..error_pos.saturating_add(1));
        Diagnostic::new(
            ErrorCode::E001.description(),
            ErrorCode::E001,
            span,
        )
    }
}

/// Parse tokens from a string input, collecting multiple errors.
///
/// Attempts to recover from errors and continue tokenizing, collecting all
/// errors encountered in a single pass.
pub fn tokenize(input: &str) -> Result<Vec<PositionedToken<'_>>, ParseError> {
    let located_input = LocatingSlice::new(input);
    let mut lexer = Lexer::new();
    lexer.tokenize(located_input);
    lexer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_single_token(input: &str, expected: Token<'_>) {
        let mut located_input = LocatingSlice::new(input);
        let result = positioned_token(&mut located_input);
        assert!(result.is_ok(), "Failed to lex: {}", input);
        assert_eq!(result.unwrap().token, expected);
    }

    #[test]
    fn test_keywords() {
        test_single_token("diagram", Token::Diagram);
        test_single_token("automaton", Token::Automaton);
        test_single_token("function", Token::Function);
        test_single_token("node", Token::Node);
        test_single_token("unless", Token::Unless);
        test_single_token("until", Token::Until);
        test_single_token("wire", Token::Wire);
        test_single_token("self", Token::SelfKw);
    }

    #[test]
    fn test_keyword_word_boundaries() {
        test_single_token("nodes", Token::Identifier("nodes"));
        test_single_token("statex", Token::Identifier("statex"));
        test_single_token("pre_x", Token::Identifier("pre_x"));
    }

    #[test]
    fn test_identifiers() {
        test_single_token("hello", Token::Identifier("hello"));
        test_single_token("var123", Token::Identifier("var123"));
        test_single_token("CamelCase", Token::Identifier("CamelCase"));
    }

    #[test]
    fn test_names_and_chars() {
        test_single_token("'T", Token::Name("T"));
        test_single_token("'abc", Token::Name("abc"));
        test_single_token("'a'", Token::CharLiteral("'a'"));
        test_single_token("'0'", Token::CharLiteral("'0'"));
    }

    #[test]
    fn test_luid_and_pragma() {
        test_single_token("#28", Token::Luid("28"));
        test_single_token("#my-block", Token::Luid("my-block"));
        test_single_token(
            "#pragma kcg expand#end",
            Token::Pragma("#pragma kcg expand#end"),
        );
    }

    #[test]
    fn test_integers() {
        test_single_token("42", Token::Integer("42"));
        test_single_token("8_ui16", Token::Integer("8_ui16"));
        test_single_token("5_i64", Token::Integer("5_i64"));
        test_single_token("0xff", Token::Integer("0xff"));
        test_single_token("0b101", Token::Integer("0b101"));
        test_single_token("0o17", Token::Integer("0o17"));
    }

    #[test]
    fn test_floats() {
        test_single_token("1.5", Token::Float("1.5"));
        test_single_token("2.5e-3", Token::Float("2.5e-3"));
        test_single_token("1.0_f64", Token::Float("1.0_f64"));
        test_single_token("5.", Token::Float("5."));
    }

    #[test]
    fn test_slice_range_is_not_a_float() {
        let tokens = tokenize("1..2").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| &t.token).collect();
        assert_eq!(
            kinds,
            vec![&Token::Integer("1"), &Token::DotDot, &Token::Integer("2")]
        );
    }

    #[test]
    fn test_operators() {
        test_single_token("::", Token::DoubleColon);
        test_single_token(":>", Token::CastOp);
        test_single_token("->", Token::Arrow);
        test_single_token("=>", Token::FatArrow);
        test_single_token("<<", Token::SizeOpen);
        test_single_token(">>", Token::SizeClose);
        test_single_token("<>", Token::Diff);
        test_single_token("<=", Token::Leq);
        test_single_token(">=", Token::Geq);
        test_single_token("..", Token::DotDot);
        test_single_token("^", Token::Caret);
        test_single_token("\\", Token::Backslash);
        test_single_token("@", Token::At);
    }

    #[test]
    fn test_protected_regions() {
        test_single_token(
            "{syntax% x = ; %syntax}",
            Token::Protected("syntax", " x = ; "),
        );
        test_single_token(
            "{text%let o = i;%text}",
            Token::Protected("text", "let o = i;"),
        );
        // a plain brace is still a brace
        test_single_token("{x: int32}", Token::LeftBrace);
    }

    #[test]
    fn test_unterminated_protected_region_fails() {
        let result = tokenize("{syntax% abc");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.diagnostics()[0].code(), ErrorCode::E003);
    }

    #[test]
    fn test_comments() {
        test_single_token("-- a comment", Token::LineComment(" a comment"));
        test_single_token("--", Token::LineComment(""));
    }

    #[test]
    fn test_full_lexing() {
        let input = "const c: int32 = 5;";
        let tokens = tokenize(input).unwrap();
        let kinds: Vec<_> = tokens
            .iter()
            .filter(|t| !t.token.is_trivia())
            .map(|t| &t.token)
            .collect();
        assert_eq!(
            kinds,
            vec![
                &Token::Const,
                &Token::Identifier("c"),
                &Token::Colon,
                &Token::Identifier("int32"),
                &Token::Equals,
                &Token::Integer("5"),
                &Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_span_tracking() {
        let tokens = tokenize("let x").unwrap();
        assert_eq!(tokens[0].span.start(), 0);
        assert_eq!(tokens[0].span.end(), 3);
        assert_eq!(tokens[1].span.start(), 3);
        assert_eq!(tokens[1].span.end(), 4);
        assert_eq!(tokens[2].span.start(), 4);
        assert_eq!(tokens[2].span.end(), 5);
    }

    #[test]
    fn test_spans_tile_the_input() {
        let input = "node N (i: int32) returns (o: int32)\n{\nlet\n    o = i;\n}";
        let tokens = tokenize(input).unwrap();
        let mut pos = 0;
        for token in &tokens {
            assert_eq!(token.span.start(), pos, "gap before {:?}", token.token);
            pos = token.span.end();
        }
        assert_eq!(pos, input.len());
    }

    #[test]
    fn test_unexpected_character() {
        let result = tokenize("a ? b");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.diagnostics()[0].code(), ErrorCode::E001);
    }
}
