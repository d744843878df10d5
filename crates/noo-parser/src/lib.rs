//! Parser combinators (C2), type grammar (C3), and Pratt-style expression
//! grammar (C4) for Noolang, producing `noo-ast` values directly.
//!
//! Grounded on `mesh-parser::parser::{expressions, items}` for the
//! precedence-climbing technique and lookahead-based disambiguation; see
//! SPEC_FULL.md §10.1 for why this crate builds `noo-ast` enums directly
//! rather than a `rowan` lossless syntax tree the teacher uses.

mod cursor;
pub mod error;
mod parser;

pub use cursor::Cursor;
pub use error::ParseError;

use noo_ast::Program;
use noo_lexer::{Lexer, Token};

/// Parses a complete program from source text: lexes, then drives the
/// top-level statement sequence (§6 `parse(tokens) → Program`).
pub fn parse_source(source: &str) -> Result<Program, ParseError> {
    let tokens = Lexer::tokenize(source)?;
    parse_tokens(&tokens)
}

/// Parses a complete program from an already-lexed token stream.
pub fn parse_tokens(tokens: &[Token]) -> Result<Program, ParseError> {
    let mut cur = Cursor::new(tokens);
    parser::parse_program(&mut cur)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_empty_program() {
        let program = parse_source("").unwrap();
        assert!(program.statements.is_empty());
    }

    #[test]
    fn only_semicolons_is_empty_program() {
        let program = parse_source(";;;").unwrap();
        assert!(program.statements.is_empty());
    }

    #[test]
    fn leftover_tokens_error() {
        let err = parse_source("1 2 3 (").unwrap_err();
        assert!(err.message.contains("expected"));
    }
}
