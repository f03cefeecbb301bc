//! Parser for XCNL expressions, statements and annotations.
//!
//! Tokenizing is done with logos; parsing is hand-written recursive descent
//! with precedence climbing for binary operators. All expressions are
//! allocated into a caller-supplied [`ExprArena`].

mod builder;
mod error;
mod lexer;
mod parser;

pub use builder::ProgramBuilder;
pub use error::{ParseError, ParseErrorKind};
pub use lexer::{lex, Token, TokenKind};
pub use parser::Parser;

use xcnl_ir::{ExprArena, ExprId, FuncCall, Statement, StringInterner};

/// Parse `source` as exactly one expression.
pub fn parse_expression(
    source: &str,
    arena: &mut ExprArena,
    interner: &StringInterner,
) -> Result<ExprId, ParseError> {
    let mut parser = Parser::new(source, arena, interner)?;
    let id = parser.parse_expr()?;
    parser.finish()?;
    Ok(id)
}

/// Parse `source` as a `;`-separated statement list.
pub fn parse_statements(
    source: &str,
    arena: &mut ExprArena,
    interner: &StringInterner,
) -> Result<Vec<Statement>, ParseError> {
    Parser::new(source, arena, interner)?.parse_statements()
}

/// Parse `source` as exactly one call, e.g. `xcomp.Arg.Buf("f32", "x")`.
pub fn parse_call(
    source: &str,
    arena: &mut ExprArena,
    interner: &StringInterner,
) -> Result<FuncCall, ParseError> {
    let mut parser = Parser::new(source, arena, interner)?;
    let call = parser.parse_call()?;
    parser.finish()?;
    Ok(call)
}
