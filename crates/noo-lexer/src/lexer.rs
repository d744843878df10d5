use noo_common::{LineIndex, Location};

use crate::error::{LexError, LexErrorKind};
use crate::token::{Token, TokenKind, KEYWORDS, OPERATOR_CHARS, OPERATORS, PUNCTUATION};

/// Scans Noolang source text into the token stream the parser consumes.
///
/// Line comments start with `#` and run to end of line; they are emitted
/// as `TokenKind::Comment` tokens (kept, rather than silently dropped, so
/// a future pretty-printer could round-trip them — the parser's
/// combinators simply skip over `Comment` tokens when looking for the
/// next significant one).
pub struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
    line_index: LineIndex,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            line_index: LineIndex::new(),
        }
    }

    pub fn tokenize(source: &'src str) -> Result<Vec<Token>, LexError> {
        let mut lexer = Self::new(source);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token()?;
            let is_eof = tok.is_eof();
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek_byte(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_byte_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance_byte(&mut self) -> Option<u8> {
        let b = self.peek_byte()?;
        self.pos += 1;
        self.line_index.advance(b);
        Some(b)
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek_byte() {
            if b == b' ' || b == b'\t' || b == b'\r' || b == b'\n' {
                self.advance_byte();
            } else {
                break;
            }
        }
    }

    fn remaining(&self) -> &'src str {
        std::str::from_utf8(&self.source[self.pos..]).unwrap_or("")
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        let start = self.line_index.position();

        let Some(b) = self.peek_byte() else {
            return Ok(Token::new(TokenKind::Eof, Location::at(start), ""));
        };

        if b == b'#' {
            return Ok(self.lex_comment(start));
        }
        if b == b'"' {
            return self.lex_string(start);
        }
        if b.is_ascii_digit() {
            return self.lex_number(start);
        }
        if b == b'@' {
            return self.lex_accessor(start);
        }
        if b == b'_' || b.is_ascii_alphabetic() {
            return Ok(self.lex_word(start));
        }
        if PUNCTUATION.contains(&(b as char)) {
            self.advance_byte();
            let end = self.line_index.position();
            return Ok(Token::new(
                TokenKind::Punctuation(b as char),
                Location::new(start, end),
                (b as char).to_string(),
            ));
        }
        if OPERATOR_CHARS.contains(&(b as char)) {
            return Ok(self.lex_operator(start));
        }

        let ch = self.remaining().chars().next().unwrap_or(b as char);
        self.advance_byte();
        Err(LexError::new(
            LexErrorKind::UnexpectedCharacter(ch),
            Location::at(start),
        ))
    }

    fn lex_comment(&mut self, start: noo_common::Position) -> Token {
        while let Some(b) = self.peek_byte() {
            if b == b'\n' {
                break;
            }
            self.advance_byte();
        }
        let end = self.line_index.position();
        Token::new(TokenKind::Comment, Location::new(start, end), "")
    }

    fn lex_string(&mut self, start: noo_common::Position) -> Result<Token, LexError> {
        self.advance_byte(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek_byte() {
                None => {
                    return Err(LexError::new(
                        LexErrorKind::UnterminatedString,
                        Location::new(start, self.line_index.position()),
                    ))
                }
                Some(b'"') => {
                    self.advance_byte();
                    break;
                }
                Some(b'\\') => {
                    self.advance_byte();
                    let esc_pos = self.line_index.position();
                    match self.advance_byte() {
                        Some(b'n') => value.push('\n'),
                        Some(b't') => value.push('\t'),
                        Some(b'r') => value.push('\r'),
                        Some(b'\\') => value.push('\\'),
                        Some(b'"') => value.push('"'),
                        Some(other) => {
                            return Err(LexError::new(
                                LexErrorKind::InvalidEscapeSequence(other as char),
                                Location::at(esc_pos),
                            ))
                        }
                        None => {
                            return Err(LexError::new(
                                LexErrorKind::UnterminatedString,
                                Location::at(esc_pos),
                            ))
                        }
                    }
                }
                Some(_) => {
                    // Preserve multi-byte UTF-8 sequences verbatim.
                    let ch_start = self.pos;
                    let ch = self.remaining().chars().next().unwrap();
                    for _ in 0..ch.len_utf8() {
                        self.advance_byte();
                    }
                    value.push_str(
                        std::str::from_utf8(&self.source[ch_start..self.pos]).unwrap_or(""),
                    );
                }
            }
        }
        let end = self.line_index.position();
        let text = value.clone();
        Ok(Token::new(
            TokenKind::Str(value),
            Location::new(start, end),
            text,
        ))
    }

    fn lex_number(&mut self, start: noo_common::Position) -> Result<Token, LexError> {
        let begin = self.pos;
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
            self.advance_byte();
        }
        if self.peek_byte() == Some(b'.') && matches!(self.peek_byte_at(1), Some(b) if b.is_ascii_digit())
        {
            self.advance_byte();
            while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
                self.advance_byte();
            }
        }
        // A further `.` immediately after digits (e.g. "1.2.3") is a
        // malformed literal rather than two tokens.
        if self.peek_byte() == Some(b'.') {
            self.advance_byte();
            while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit() || b == b'.') {
                self.advance_byte();
            }
            let text = std::str::from_utf8(&self.source[begin..self.pos])
                .unwrap_or("")
                .to_string();
            return Err(LexError::new(
                LexErrorKind::InvalidNumberLiteral(text),
                Location::new(start, self.line_index.position()),
            ));
        }
        let text = std::str::from_utf8(&self.source[begin..self.pos])
            .unwrap_or("")
            .to_string();
        let value: f64 = text
            .parse()
            .map_err(|_| LexError::new(LexErrorKind::InvalidNumberLiteral(text.clone()), start.into()))?;
        let end = self.line_index.position();
        Ok(Token::new(
            TokenKind::Number(value),
            Location::new(start, end),
            text,
        ))
    }

    fn lex_accessor(&mut self, start: noo_common::Position) -> Result<Token, LexError> {
        self.advance_byte(); // '@'
        let begin = self.pos;
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.advance_byte();
        }
        if begin == self.pos {
            return Err(LexError::new(
                LexErrorKind::ExpectedNameAfterAccessor,
                Location::at(start),
            ));
        }
        let name = std::str::from_utf8(&self.source[begin..self.pos])
            .unwrap_or("")
            .to_string();
        // The safe-access marker `?` is part of the accessor token itself
        // when adjacent, e.g. `@name?`; the parser reads it back off `text`.
        let safe = self.peek_byte() == Some(b'?');
        if safe {
            self.advance_byte();
        }
        let end = self.line_index.position();
        let text = if safe {
            format!("@{name}?")
        } else {
            format!("@{name}")
        };
        Ok(Token::new(
            TokenKind::Accessor(name),
            Location::new(start, end),
            text,
        ))
    }

    fn lex_word(&mut self, start: noo_common::Position) -> Token {
        let begin = self.pos;
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.advance_byte();
        }
        let text = std::str::from_utf8(&self.source[begin..self.pos])
            .unwrap_or("")
            .to_string();
        let end = self.line_index.position();
        let location = Location::new(start, end);
        if KEYWORDS.contains(&text.as_str()) {
            Token::new(TokenKind::Keyword(text.clone()), location, text)
        } else {
            Token::new(TokenKind::Identifier(text.clone()), location, text)
        }
    }

    fn lex_operator(&mut self, start: noo_common::Position) -> Token {
        let remaining = self.remaining();
        for op in OPERATORS {
            if remaining.starts_with(op) {
                for _ in 0..op.len() {
                    self.advance_byte();
                }
                let end = self.line_index.position();
                return Token::new(
                    TokenKind::Operator(op.to_string()),
                    Location::new(start, end),
                    op.to_string(),
                );
            }
        }
        // Unreachable in practice: OPERATORS covers every byte in
        // OPERATOR_CHARS as a single-character fallback.
        let b = self.advance_byte().unwrap();
        let end = self.line_index.position();
        Token::new(
            TokenKind::Operator((b as char).to_string()),
            Location::new(start, end),
            (b as char).to_string(),
        )
    }
}

impl From<noo_common::Position> for Location {
    fn from(pos: noo_common::Position) -> Self {
        Location::at(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_arithmetic() {
        let ks = kinds("1 + 2");
        assert_eq!(
            ks,
            vec![
                TokenKind::Number(1.0),
                TokenKind::Operator("+".into()),
                TokenKind::Number(2.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_string_with_escapes() {
        let ks = kinds(r#""a\nb""#);
        assert_eq!(ks[0], TokenKind::Str("a\nb".to_string()));
    }

    #[test]
    fn unterminated_string_errors() {
        let err = Lexer::tokenize("\"abc").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
    }

    #[test]
    fn lexes_keywords_vs_identifiers() {
        let ks = kinds("if x then y else z");
        assert_eq!(ks[0], TokenKind::Keyword("if".into()));
        assert_eq!(ks[1], TokenKind::Identifier("x".into()));
    }

    #[test]
    fn maximal_munch_on_operators() {
        let ks = kinds("a |? b |> c <| d");
        assert!(ks.contains(&TokenKind::Operator("|?".into())));
        assert!(ks.contains(&TokenKind::Operator("|>".into())));
        assert!(ks.contains(&TokenKind::Operator("<|".into())));
    }

    #[test]
    fn lexes_accessor() {
        let ks = kinds("@name");
        assert_eq!(ks[0], TokenKind::Accessor("name".into()));
    }

    #[test]
    fn lexes_safe_accessor_marker_into_text() {
        let tokens = Lexer::tokenize("@name?").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Accessor("name".into()));
        assert_eq!(tokens[0].text, "@name?");
    }

    #[test]
    fn adjacent_minus_has_zero_gap_location() {
        let tokens = Lexer::tokenize("-123").unwrap();
        let minus = &tokens[0];
        let number = &tokens[1];
        assert_eq!(minus.location.end, number.location.start);
    }

    #[test]
    fn spaced_minus_has_gap() {
        let tokens = Lexer::tokenize("- 123").unwrap();
        let minus = &tokens[0];
        let number = &tokens[1];
        assert_ne!(minus.location.end, number.location.start);
    }

    #[test]
    fn invalid_number_literal_errors() {
        let err = Lexer::tokenize("1.2.3").unwrap_err();
        assert!(matches!(err.kind, LexErrorKind::InvalidNumberLiteral(_)));
    }

    #[test]
    fn comment_to_end_of_line() {
        let ks = kinds("1 # comment\n+ 2");
        assert_eq!(ks[0], TokenKind::Number(1.0));
        assert_eq!(ks[1], TokenKind::Comment);
        assert_eq!(ks[2], TokenKind::Operator("+".into()));
    }
}
