//! Pattern grammar for `match` arms and destructuring targets (§3.3
//! `PatternKind`).

use noo_ast::{Pattern, PatternKind};
use noo_common::Location;

use crate::cursor::{sep_by, Cursor, PResult};

pub fn parse_pattern(cur: &mut Cursor<'_>) -> PResult<Pattern> {
    let tok = cur.peek();
    let loc = tok.location;

    if let Some(name) = tok.identifier_name() {
        if name == "_" {
            cur.identifier()?;
            return Ok(Pattern::new(PatternKind::Wildcard, loc));
        }
        if is_upper(name) {
            let (name, loc) = cur.identifier()?;
            let mut args = Vec::new();
            while pattern_atom_can_start(cur) {
                args.push(parse_pattern_atom(cur)?);
            }
            let end = args.last().map(|p: &Pattern| p.location).unwrap_or(loc);
            return Ok(Pattern::new(
                PatternKind::Constructor(name, args),
                loc.merge(end),
            ));
        }
        let (name, loc) = cur.identifier()?;
        return Ok(Pattern::new(PatternKind::Variable(name), loc));
    }

    parse_pattern_atom(cur)
}

fn pattern_atom_can_start(cur: &Cursor<'_>) -> bool {
    let tok = cur.peek();
    tok.identifier_name().is_some()
        || matches!(tok.kind, noo_lexer::TokenKind::Number(_))
        || matches!(tok.kind, noo_lexer::TokenKind::Str(_))
        || tok.is_punctuation('(')
        || tok.is_punctuation('{')
}

/// A pattern atom: anything that can appear as a constructor argument
/// without needing parens to disambiguate from the next argument.
fn parse_pattern_atom(cur: &mut Cursor<'_>) -> PResult<Pattern> {
    let tok = cur.peek();
    let loc = tok.location;

    if let Ok((n, loc)) = cur.number() {
        return Ok(Pattern::new(PatternKind::Number(n), loc));
    }
    if let Ok((s, loc)) = cur.string() {
        return Ok(Pattern::new(PatternKind::Str(s), loc));
    }
    if let Some(name) = cur.peek().identifier_name().map(str::to_string) {
        if name == "_" {
            cur.identifier()?;
            return Ok(Pattern::new(PatternKind::Wildcard, loc));
        }
        if is_upper(&name) {
            let (name, loc) = cur.identifier()?;
            return Ok(Pattern::new(PatternKind::Constructor(name, Vec::new()), loc));
        }
        let (name, loc) = cur.identifier()?;
        return Ok(Pattern::new(PatternKind::Variable(name), loc));
    }
    if cur.eat_punctuation('(').is_some() {
        let inner = parse_pattern(cur)?;
        cur.punctuation(')')?;
        return Ok(inner);
    }
    if cur.eat_punctuation('{').is_some() {
        return parse_brace_pattern(cur, loc);
    }
    Err(cur.unexpected("a pattern"))
}

fn is_upper(name: &str) -> bool {
    name.chars().next().map(char::is_uppercase).unwrap_or(false)
}

enum BraceField {
    Named(String, Pattern),
    Positional(Pattern),
}

fn parse_brace_pattern(cur: &mut Cursor<'_>, open: Location) -> PResult<Pattern> {
    if let Some(close) = cur.eat_punctuation('}') {
        return Ok(Pattern::new(PatternKind::Tuple(Vec::new()), open.merge(close)));
    }
    let fields = sep_by(cur, ',', |c| -> PResult<BraceField> {
        if let Some((name, safe, loc)) = crate::cursor::optional(c, |c2| c2.accessor()) {
            if safe {
                return Err(crate::error::ParseError::new(
                    "field name cannot use the safe marker in a pattern",
                    loc,
                ));
            }
            let pat = parse_pattern(c)?;
            Ok(BraceField::Named(name, pat))
        } else {
            Ok(BraceField::Positional(parse_pattern(c)?))
        }
    })?;
    let close = cur.punctuation('}')?;
    let loc = open.merge(close);

    let all_named = fields.iter().all(|f| matches!(f, BraceField::Named(_, _)));
    if all_named {
        let fields = fields
            .into_iter()
            .map(|f| match f {
                BraceField::Named(n, p) => (n, p),
                BraceField::Positional(_) => unreachable!(),
            })
            .collect();
        Ok(Pattern::new(PatternKind::Record(fields), loc))
    } else {
        let elems = fields
            .into_iter()
            .map(|f| match f {
                BraceField::Positional(p) => p,
                BraceField::Named(_, _) => unreachable!("mixed brace pattern fields"),
            })
            .collect();
        Ok(Pattern::new(PatternKind::Tuple(elems), loc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noo_lexer::Lexer;

    fn pat_of(src: &str) -> Pattern {
        let tokens = Lexer::tokenize(src).unwrap();
        let mut cur = Cursor::new(&tokens);
        parse_pattern(&mut cur).unwrap()
    }

    #[test]
    fn parses_wildcard() {
        assert_eq!(pat_of("_").kind, PatternKind::Wildcard);
    }

    #[test]
    fn parses_constructor_with_args() {
        let pat = pat_of("Some x");
        match pat.kind {
            PatternKind::Constructor(name, args) => {
                assert_eq!(name, "Some");
                assert_eq!(args.len(), 1);
            }
            other => panic!("unexpected pattern {other:?}"),
        }
    }

    #[test]
    fn parses_nullary_constructor() {
        let pat = pat_of("None");
        assert_eq!(pat.kind, PatternKind::Constructor("None".into(), vec![]));
    }

    #[test]
    fn parses_tuple_pattern() {
        let pat = pat_of("{x, y}");
        match pat.kind {
            PatternKind::Tuple(elems) => assert_eq!(elems.len(), 2),
            other => panic!("unexpected pattern {other:?}"),
        }
    }
}
