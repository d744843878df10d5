//! Token cursor and parser-combinator primitives (C2).
//!
//! `mesh-parser`'s own parser works directly over a token slice with a
//! position index rather than a combinator-object type (its `expr_bp`
//! Pratt loop and `items.rs`'s recursive-descent item parsers both take
//! `&mut Parser`), so `Cursor` follows that shape: a plain struct with a
//! `pos` cursor, `peek`/`bump`/checkpoint-restore primitives, and free
//! functions (`many`, `sepBy`, `optional`, `choice`, …) that take a
//! parsing closure rather than a boxed combinator value. That avoids the
//! `Box<dyn Fn>` plumbing a literal combinator-object design would need
//! while keeping the same vocabulary the grammar is specified in (§4.2).

use noo_common::Location;
use noo_lexer::{Token, TokenKind};

use crate::error::ParseError;

pub type PResult<T> = Result<T, ParseError>;

/// A cursor over a token slice. Comments are filtered out up front —
/// nothing in the grammar ever needs to see one.
pub struct Cursor<'a> {
    tokens: Vec<&'a Token>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        let tokens = tokens
            .iter()
            .filter(|t| !matches!(t.kind, TokenKind::Comment))
            .collect();
        Self { tokens, pos: 0 }
    }

    pub fn checkpoint(&self) -> usize {
        self.pos
    }

    pub fn restore(&mut self, checkpoint: usize) {
        self.pos = checkpoint;
    }

    pub fn peek(&self) -> &'a Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub fn peek_at(&self, offset: usize) -> &'a Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        self.tokens[idx]
    }

    pub fn is_eof(&self) -> bool {
        self.peek().is_eof()
    }

    pub fn location(&self) -> Location {
        self.peek().location
    }

    fn bump(&mut self) -> &'a Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    /// Consumes the current token, requiring it be `Identifier`.
    pub fn identifier(&mut self) -> PResult<(String, Location)> {
        let tok = self.peek();
        match tok.identifier_name() {
            Some(name) => {
                let name = name.to_string();
                let loc = tok.location;
                self.bump();
                Ok((name, loc))
            }
            None => Err(self.unexpected("an identifier")),
        }
    }

    pub fn keyword(&mut self, word: &str) -> PResult<Location> {
        if self.peek().is_keyword(word) {
            let loc = self.peek().location;
            self.bump();
            Ok(loc)
        } else {
            Err(self.unexpected(&format!("'{word}'")))
        }
    }

    pub fn eat_keyword(&mut self, word: &str) -> Option<Location> {
        if self.peek().is_keyword(word) {
            let loc = self.peek().location;
            self.bump();
            Some(loc)
        } else {
            None
        }
    }

    pub fn operator(&mut self, op: &str) -> PResult<Location> {
        if self.peek().is_operator(op) {
            let loc = self.peek().location;
            self.bump();
            Ok(loc)
        } else {
            Err(self.unexpected(&format!("'{op}'")))
        }
    }

    pub fn eat_operator(&mut self, op: &str) -> Option<Location> {
        if self.peek().is_operator(op) {
            let loc = self.peek().location;
            self.bump();
            Some(loc)
        } else {
            None
        }
    }

    pub fn punctuation(&mut self, ch: char) -> PResult<Location> {
        if self.peek().is_punctuation(ch) {
            let loc = self.peek().location;
            self.bump();
            Ok(loc)
        } else {
            Err(self.unexpected(&format!("'{ch}'")))
        }
    }

    pub fn eat_punctuation(&mut self, ch: char) -> Option<Location> {
        if self.peek().is_punctuation(ch) {
            let loc = self.peek().location;
            self.bump();
            Some(loc)
        } else {
            None
        }
    }

    pub fn number(&mut self) -> PResult<(f64, Location)> {
        let tok = self.peek();
        match tok.kind {
            TokenKind::Number(n) => {
                let loc = tok.location;
                self.bump();
                Ok((n, loc))
            }
            _ => Err(self.unexpected("a number")),
        }
    }

    pub fn string(&mut self) -> PResult<(String, Location)> {
        let tok = self.peek();
        match &tok.kind {
            TokenKind::Str(s) => {
                let s = s.clone();
                let loc = tok.location;
                self.bump();
                Ok((s, loc))
            }
            _ => Err(self.unexpected("a string literal")),
        }
    }

    pub fn accessor(&mut self) -> PResult<(String, bool, Location)> {
        let tok = self.peek();
        match &tok.kind {
            TokenKind::Accessor(name) => {
                let name = name.clone();
                let safe = tok.text.ends_with('?');
                let loc = tok.location;
                self.bump();
                Ok((name, safe, loc))
            }
            _ => Err(self.unexpected("an accessor")),
        }
    }

    pub fn unexpected(&self, expected: &str) -> ParseError {
        let tok = self.peek();
        if tok.is_eof() {
            ParseError::new(format!("expected {expected}, found end of input"), tok.location)
        } else {
            ParseError::new(
                format!("expected {expected}, found '{}'", tok.text),
                tok.location,
            )
        }
    }
}

/// `many(p)` — zero or more, backtracking on the first failure.
pub fn many<'a, T>(
    cur: &mut Cursor<'a>,
    mut elem: impl FnMut(&mut Cursor<'a>) -> PResult<T>,
) -> Vec<T> {
    let mut out = Vec::new();
    loop {
        let save = cur.checkpoint();
        match elem(cur) {
            Ok(v) => out.push(v),
            Err(_) => {
                cur.restore(save);
                break;
            }
        }
    }
    out
}

/// `many1(p)` — one or more; fails if zero are found.
pub fn many1<'a, T>(
    cur: &mut Cursor<'a>,
    mut elem: impl FnMut(&mut Cursor<'a>) -> PResult<T>,
) -> PResult<Vec<T>> {
    let first = elem(cur)?;
    let mut out = vec![first];
    out.extend(many(cur, elem));
    Ok(out)
}

/// `sepBy(p, sep)` — zero or more `p` separated by the punctuation `sep`,
/// tolerating a trailing separator.
pub fn sep_by<'a, T>(
    cur: &mut Cursor<'a>,
    sep: char,
    mut elem: impl FnMut(&mut Cursor<'a>) -> PResult<T>,
) -> PResult<Vec<T>> {
    let mut out = Vec::new();
    let save = cur.checkpoint();
    let first = match elem(cur) {
        Ok(v) => v,
        Err(_) => {
            cur.restore(save);
            return Ok(out);
        }
    };
    out.push(first);
    while cur.eat_punctuation(sep).is_some() {
        let save = cur.checkpoint();
        match elem(cur) {
            Ok(v) => out.push(v),
            Err(_) => {
                cur.restore(save);
                break;
            }
        }
    }
    Ok(out)
}

/// `optional(p)` — `Some(_)` on success, `None` (with the cursor rewound)
/// on failure.
pub fn optional<'a, T>(
    cur: &mut Cursor<'a>,
    p: impl FnOnce(&mut Cursor<'a>) -> PResult<T>,
) -> Option<T> {
    let save = cur.checkpoint();
    match p(cur) {
        Ok(v) => Some(v),
        Err(_) => {
            cur.restore(save);
            None
        }
    }
}

/// `choice(&[p1, p2, …])` — the first alternative that succeeds; the
/// furthest-progressing error is reported if all fail.
pub fn choice<'a, T>(
    cur: &mut Cursor<'a>,
    parsers: &[&dyn Fn(&mut Cursor<'a>) -> PResult<T>],
) -> PResult<T> {
    let mut best_err: Option<ParseError> = None;
    for p in parsers {
        let save = cur.checkpoint();
        match p(cur) {
            Ok(v) => return Ok(v),
            Err(e) => {
                cur.restore(save);
                best_err = Some(e);
            }
        }
    }
    Err(best_err.unwrap_or_else(|| cur.unexpected("one of several alternatives")))
}

/// `map(p, f)` — transforms a successful parse's result.
pub fn map<'a, T, U>(r: PResult<T>, f: impl FnOnce(T) -> U) -> PResult<U> {
    r.map(f)
}

/// `lazy(f)` — defers evaluation of a parser thunk until called; Rust's
/// ordinary recursive functions already give the grammar's mutually
/// recursive productions (expressions calling into types calling back
/// into expressions for effect bodies, patterns calling expressions for
/// guards, …) the laziness they need, so this is a thin identity wrapper
/// kept for parity with the grammar's own vocabulary (§4.2).
pub fn lazy<'a, T>(f: impl FnOnce(&mut Cursor<'a>) -> PResult<T>, cur: &mut Cursor<'a>) -> PResult<T> {
    f(cur)
}

#[cfg(test)]
mod tests {
    use super::*;
    use noo_lexer::Lexer;

    fn cursor_tokens(src: &str) -> Vec<Token> {
        Lexer::tokenize(src).unwrap()
    }

    #[test]
    fn sep_by_collects_and_allows_trailing_separator() {
        let tokens = cursor_tokens("1, 2, 3,");
        let mut cur = Cursor::new(&tokens);
        let nums = sep_by(&mut cur, ',', |c| c.number().map(|(n, _)| n)).unwrap();
        assert_eq!(nums, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn many_backtracks_on_failure_without_consuming() {
        let tokens = cursor_tokens("1 2 x");
        let mut cur = Cursor::new(&tokens);
        let nums = many(&mut cur, |c| c.number().map(|(n, _)| n));
        assert_eq!(nums, vec![1.0, 2.0]);
        assert!(cur.identifier().is_ok());
    }

    #[test]
    fn optional_rewinds_cursor() {
        let tokens = cursor_tokens("abc");
        let mut cur = Cursor::new(&tokens);
        let got = optional(&mut cur, |c| c.number().map(|(n, _)| n));
        assert!(got.is_none());
        assert!(cur.identifier().is_ok());
    }
}
