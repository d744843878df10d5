//! Grammar entry point tying together the type (C3), pattern, item, and
//! expression (C4) grammars.

pub(crate) mod expressions;
pub(crate) mod items;
pub(crate) mod patterns;
pub(crate) mod types;

use noo_ast::Program;

use crate::cursor::Cursor;
use crate::error::ParseError;

/// `;`-separated top-level statements (§6), tolerating leading, trailing,
/// and repeated separators, ending at end-of-input — a program with
/// leftover unconsumed tokens is a parse error, per the spec's choice not
/// to attempt error recovery (§1 Non-goals).
pub(crate) fn parse_program(cur: &mut Cursor<'_>) -> Result<Program, ParseError> {
    let start = cur.location();
    let statements = expressions::parse_semi_list(cur)?;
    if !cur.is_eof() {
        return Err(cur.unexpected("end of input"));
    }
    let end = statements.last().map(|e| e.location).unwrap_or(start);
    Ok(Program {
        statements,
        location: start.merge(end),
    })
}
