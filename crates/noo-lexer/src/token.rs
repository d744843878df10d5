use noo_common::Location;

/// The fixed set of token kinds the parser consumes (§6).
///
/// Keywords, operators, and punctuation carry their literal text rather
/// than a separate enum of variants, since the parser's combinators
/// (`keyword("if")`, `punctuation('(')`, …) match on the text directly —
/// mirroring a `Parser<T>` that matches tokens structurally rather than
/// through a closed keyword enum.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Number(f64),
    Str(String),
    Keyword(String),
    Operator(String),
    Punctuation(char),
    Accessor(String),
    Comment,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
    /// Raw source text for the token, used by the parser for adjacency
    /// checks (unary-minus lexical adjacency, §4.4).
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, location: Location, text: impl Into<String>) -> Self {
        Self {
            kind,
            location,
            text: text.into(),
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        matches!(&self.kind, TokenKind::Keyword(w) if w == word)
    }

    pub fn is_operator(&self, op: &str) -> bool {
        matches!(&self.kind, TokenKind::Operator(o) if o == op)
    }

    pub fn is_punctuation(&self, ch: char) -> bool {
        matches!(&self.kind, TokenKind::Punctuation(c) if *c == ch)
    }

    pub fn identifier_name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(name) => Some(name),
            _ => None,
        }
    }
}

pub const KEYWORDS: &[&str] = &[
    "fn",
    "if",
    "then",
    "else",
    "match",
    "with",
    "where",
    "mut",
    "import",
    "variant",
    "type",
    "constraint",
    "implement",
    "given",
    "is",
    "has",
    "field",
    "of",
    "and",
    "or",
    "true",
    "false",
];

/// Multi-character operators, ordered longest-first so the lexer's maximal
/// munch always prefers `|?`/`|>` over the shorter `|`, `==` over `=`, etc.
pub const OPERATORS: &[&str] = &[
    "|?", "|>", "<|", "->", "=>", "<=", ">=", "==", "!=", "+", "-", "*", "/", "%", "<", ">", "|",
    "$", "=", "!",
];

pub const PUNCTUATION: &[char] = &['(', ')', '{', '}', '[', ']', ',', ';', ':'];

/// Every byte that can start or appear inside an operator token, used by
/// the lexer to decide whether to enter `lex_operator`.
pub const OPERATOR_CHARS: &[char] =
    &['+', '-', '*', '/', '%', '<', '>', '=', '!', '|', '$'];
