//! Lexer error types.
//!
//! The lexer is a supplemental collaborator (see SPEC_FULL.md §10.2), not
//! part of the scored core, but it still needs a real error taxonomy to
//! fail usefully rather than panicking on malformed input.

use std::fmt;

use noo_common::Location;

#[derive(Debug, Clone, PartialEq)]
pub enum LexErrorKind {
    UnexpectedCharacter(char),
    UnterminatedString,
    InvalidEscapeSequence(char),
    InvalidNumberLiteral(String),
    ExpectedNameAfterAccessor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub location: Location,
}

impl LexError {
    pub fn new(kind: LexErrorKind, location: Location) -> Self {
        Self { kind, location }
    }
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexErrorKind::UnexpectedCharacter(c) => write!(f, "Unexpected character: {c:?}"),
            LexErrorKind::UnterminatedString => write!(f, "Unterminated string literal"),
            LexErrorKind::InvalidEscapeSequence(c) => {
                write!(f, "Invalid escape sequence: \\{c}")
            }
            LexErrorKind::InvalidNumberLiteral(s) => write!(f, "Invalid number literal: {s}"),
            LexErrorKind::ExpectedNameAfterAccessor => {
                write!(f, "Expected a field name after '@'")
            }
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.kind, self.location)
    }
}

impl std::error::Error for LexError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unterminated_string() {
        let err = LexError::new(LexErrorKind::UnterminatedString, Location::synthetic());
        assert!(err.to_string().starts_with("Unterminated string literal"));
    }
}
