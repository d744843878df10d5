//! Parser error type.

use std::fmt;

use noo_common::Location;

/// A parse failure: a message, the location it occurred at, and
/// (optionally) a second location relevant to the failure — e.g. the
/// opening brace a missing closer was expected to match.
///
/// Grounded on `mesh-parser::error::ParseError`'s `message`/`span`/
/// `related` shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub location: Location,
    pub related: Option<(String, Location)>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, location: Location) -> Self {
        Self {
            message: message.into(),
            location,
            related: None,
        }
    }

    pub fn with_related(
        message: impl Into<String>,
        location: Location,
        related_message: impl Into<String>,
        related_location: Location,
    ) -> Self {
        Self {
            message: message.into(),
            location,
            related: Some((related_message.into(), related_location)),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parse error: {} at line {}",
            self.message,
            self.location.line()
        )
    }
}

impl std::error::Error for ParseError {}

impl From<noo_lexer::LexError> for ParseError {
    fn from(err: noo_lexer::LexError) -> Self {
        ParseError::new(err.kind.to_string(), err.location)
    }
}
