//! # Armilla Parser
//!
//! Parser for the Armilla dataflow language. This crate provides the
//! pipeline from source text to the object model of `armilla-core`.
//!
//! ## Usage
//!
//! ```
//! use armilla_core::identifier::ModulePath;
//! use armilla_parser::{ParseError, module_body};
//!
//! fn main() -> Result<(), ParseError> {
//!     let source = "\
//! function Add (a: int32; b: int32) returns (o: int32)
//!   o = a + b;";
//!     let name = ModulePath::parse("Math").unwrap();
//!     let unit = module_body(&name, source)?;
//!     assert_eq!(unit.module.declarations().len(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Failure policy
//!
//! A declaration or equation that cannot be structured is preserved verbatim
//! as a protected fragment, with a diagnostic recorded; the unit itself still
//! parses. The whole unit fails only when lexing fails or the assembled
//! module breaks a structural invariant (e.g. duplicate declarations) — and
//! the model layer turns that failure into a whole-unit protected
//! declaration rather than aborting.

mod error;
mod expr;
mod lexer;
mod parser;
#[cfg(test)]
mod parser_tests;
mod stream;
mod tokens;

pub use error::{Diagnostic, ErrorCode, ParseError};

use armilla_core::equation::Equation;
use armilla_core::expr::Expr;
use armilla_core::identifier::ModulePath;
use armilla_core::module::{GlobalDecl, Module, ModuleKind};
use armilla_core::scope::ScopeSection;

use stream::{Input, ParseState, Tokens};
use winnow::Parser as _;
use winnow::stream::Stream;

/// The result of structuring one source unit: the module plus the
/// diagnostics recorded while recovering malformed regions.
#[derive(Debug)]
pub struct ParsedUnit {
    pub module: Module,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a module body (implementation unit).
///
/// The module path is supplied out-of-band; the source contains only
/// declarations.
pub fn module_body(name: &ModulePath, source: &str) -> Result<ParsedUnit, ParseError> {
    let (module, diagnostics) = parser::parse_unit(ModuleKind::Body, name.clone(), source)?;
    Ok(ParsedUnit {
        module,
        diagnostics,
    })
}

/// Parse a module interface (signatures only).
pub fn module_interface(name: &ModulePath, source: &str) -> Result<ParsedUnit, ParseError> {
    let (module, diagnostics) =
        parser::parse_unit(ModuleKind::Interface, name.clone(), source)?;
    Ok(ParsedUnit {
        module,
        diagnostics,
    })
}

fn standalone<O>(
    source: &str,
    code: ErrorCode,
    f: impl FnOnce(&mut Input<'_>) -> stream::IResult<O>,
) -> Result<O, ParseError> {
    let tokens = lexer::tokenize(source)?;
    let mut input = Input {
        input: Tokens::new(&tokens),
        state: ParseState {
            source,
            diagnostics: Vec::new(),
        },
    };
    let parsed = f(&mut input).map_err(|_| {
        ParseError::from(Diagnostic::new(
            code.description(),
            code,
            armilla_core::Span::new(0..source.len()),
        ))
    })?;
    // only trivia may remain
    stream::trivia0
        .parse_next(&mut input)
        .ok();
    if input.input.iter_offsets().next().is_some() {
        return Err(ParseError::from(Diagnostic::new(
            "trailing input after construct",
            code,
            armilla_core::Span::new(0..source.len()),
        )));
    }
    Ok(parsed)
}

/// Parse a standalone expression.
pub fn expression(source: &str) -> Result<Expr, ParseError> {
    standalone(source, ErrorCode::E102, expr::expression)
}

/// Parse a standalone equation.
pub fn equation(source: &str) -> Result<Equation, ParseError> {
    standalone(source, ErrorCode::E101, parser::equation_standalone)
}

/// Parse a standalone global declaration, in module-body context.
pub fn declaration(source: &str) -> Result<GlobalDecl, ParseError> {
    standalone(source, ErrorCode::E100, |input| {
        parser::declaration_standalone(input, ModuleKind::Body)
    })
}

/// Parse a standalone scope section.
pub fn scope_section(source: &str) -> Result<ScopeSection, ParseError> {
    standalone(source, ErrorCode::E100, parser::scope_section_standalone)
}
