//! Type grammar (§4.3): `funcType := atom ('->' funcType)? effects?`.
//!
//! Grounded on `mesh-parser::parser::items::parse_type`, generalized from
//! Mesh's narrower primitive/generic-name grammar to include record/tuple
//! shapes, variant applications, and the effect-row suffix §4.3 adds.

use std::collections::BTreeMap;

use noo_ast::{Constraint, Effect, Primitive, RecordStructure, Type};

use crate::cursor::{sep_by, Cursor, PResult};

/// Entry point: a full type, including its effect-row suffix if present.
/// Effects bind to the outermost function type only (§4.3) — nested arrow
/// legs are parsed without looking for `!effect` themselves.
pub fn parse_type(cur: &mut Cursor<'_>) -> PResult<Type> {
    let ty = parse_arrow_chain(cur)?;
    if cur.peek().is_operator("!") {
        let loc = cur.location();
        let effects = parse_effects(cur)?;
        return match ty {
            Type::Function {
                params,
                ret,
                constraints,
                ..
            } => Ok(Type::Function {
                params,
                ret,
                effects,
                constraints,
            }),
            _ => Err(cur_err(
                "effects can only be attached to a function type".into(),
                loc,
            )),
        };
    }
    Ok(ty)
}

fn parse_effects(cur: &mut Cursor<'_>) -> PResult<noo_ast::EffectSet> {
    let mut set = noo_ast::EffectSet::new();
    loop {
        if cur.eat_operator("!").is_none() {
            break;
        }
        let (name, loc) = cur.identifier()?;
        match Effect::from_name(&name) {
            Some(e) => {
                set.insert(e);
            }
            None => return Err(cur_err(format!("unknown effect '{name}'"), loc)),
        }
        if !cur.peek().is_operator("!") {
            break;
        }
    }
    if set.is_empty() {
        return Err(cur.unexpected("an effect name after '!'"));
    }
    Ok(set)
}

fn cur_err(message: String, location: noo_common::Location) -> crate::error::ParseError {
    crate::error::ParseError::new(message, location)
}

fn parse_arrow_chain(cur: &mut Cursor<'_>) -> PResult<Type> {
    let lhs = parse_atom(cur)?;
    if cur.eat_operator("->").is_some() {
        let rhs = parse_arrow_chain(cur)?;
        Ok(Type::function(vec![lhs], rhs, noo_ast::EffectSet::new()))
    } else {
        Ok(lhs)
    }
}

pub(crate) fn atom_can_start(cur: &Cursor<'_>) -> bool {
    let tok = cur.peek();
    tok.identifier_name().is_some() || tok.is_punctuation('{') || tok.is_punctuation('(')
}

/// Like `atom_can_start`, but excludes `(`/`{` — used where a bare type
/// name is immediately followed by a parenthesised block that belongs to
/// the surrounding grammar, not to the type itself.
fn name_atom_can_start(cur: &Cursor<'_>) -> bool {
    cur.peek().identifier_name().is_some()
}

/// Parses the target type right after `implement Trait`. An implement
/// target only ever needs its constructor name for the exact-type-name
/// lookup (§5), so unlike `parse_atom` it never consumes a parenthesised
/// group as an argument — otherwise `implement Functor Option (fmap = …)`
/// would try to parse the functions block itself as a type argument to
/// `Option`, the same way `Float`/`Bool` already avoid by being
/// zero-arg primitives.
pub(crate) fn parse_implement_target(cur: &mut Cursor<'_>) -> PResult<Type> {
    let (name, _) = try_identifier(cur).ok_or_else(|| cur.unexpected("a type"))?;
    if let Some(prim) = Primitive::from_name(&name) {
        if prim == Primitive::List {
            if name_atom_can_start(cur) {
                let elem = parse_atom(cur)?;
                return Ok(Type::list(elem));
            }
            return Ok(Type::bare_list());
        }
        return Ok(Type::Primitive(prim));
    }
    if name == "Tuple" {
        let mut elems = Vec::new();
        while name_atom_can_start(cur) {
            elems.push(parse_atom(cur)?);
        }
        if elems.is_empty() {
            return Err(cur.unexpected("at least one element type after 'Tuple'"));
        }
        return Ok(Type::tuple(elems));
    }
    if is_upper(&name) {
        let mut args = Vec::new();
        while name_atom_can_start(cur) {
            args.push(parse_atom(cur)?);
        }
        return Ok(Type::variant(name, args));
    }
    Ok(Type::variable(name))
}

pub(crate) fn parse_atom(cur: &mut Cursor<'_>) -> PResult<Type> {
    if let Some((name, _)) = try_identifier(cur) {
        if let Some(prim) = Primitive::from_name(&name) {
            if prim == Primitive::List {
                if atom_can_start(cur) {
                    let elem = parse_atom(cur)?;
                    return Ok(Type::list(elem));
                }
                return Ok(Type::bare_list());
            }
            return Ok(Type::Primitive(prim));
        }
        if name == "Tuple" {
            let mut elems = Vec::new();
            while atom_can_start(cur) {
                elems.push(parse_atom(cur)?);
            }
            if elems.is_empty() {
                return Err(cur.unexpected("at least one element type after 'Tuple'"));
            }
            return Ok(Type::tuple(elems));
        }
        if is_upper(&name) {
            let mut args = Vec::new();
            while atom_can_start(cur) {
                args.push(parse_atom(cur)?);
            }
            return Ok(Type::variant(name, args));
        }
        return Ok(Type::variable(name));
    }

    if cur.eat_punctuation('(').is_some() {
        let inner = parse_type(cur)?;
        cur.punctuation(')')?;
        return Ok(inner);
    }

    if cur.eat_punctuation('{').is_some() {
        return parse_brace_type(cur);
    }

    Err(cur.unexpected("a type"))
}

fn try_identifier(cur: &mut Cursor<'_>) -> Option<(String, noo_common::Location)> {
    let tok = cur.peek();
    let name = tok.identifier_name()?.to_string();
    let loc = tok.location;
    cur.identifier().ok();
    Some((name, loc))
}

fn is_upper(name: &str) -> bool {
    name.chars().next().map(char::is_uppercase).unwrap_or(false)
}

enum BraceField {
    Named(String, Type),
    Positional(Type),
}

fn parse_brace_type(cur: &mut Cursor<'_>) -> PResult<Type> {
    if cur.eat_punctuation('}').is_some() {
        return Ok(Type::unit());
    }
    let fields = sep_by(cur, ',', |c| -> PResult<BraceField> {
        if let Some((name, safe, loc)) = crate::cursor::optional(c, |c2| c2.accessor()) {
            if safe {
                return Err(cur_err("field name cannot use the safe marker here".into(), loc));
            }
            let ty = parse_type(c)?;
            Ok(BraceField::Named(name, ty))
        } else {
            Ok(BraceField::Positional(parse_type(c)?))
        }
    })?;
    cur.punctuation('}')?;

    let all_named = fields.iter().all(|f| matches!(f, BraceField::Named(_, _)));
    let all_positional = fields
        .iter()
        .all(|f| matches!(f, BraceField::Positional(_)));

    if fields.is_empty() {
        Ok(Type::unit())
    } else if all_named {
        let mut map = BTreeMap::new();
        for f in fields {
            if let BraceField::Named(name, ty) = f {
                map.insert(name, ty);
            }
        }
        Ok(Type::record(map))
    } else if all_positional {
        let elems = fields
            .into_iter()
            .map(|f| match f {
                BraceField::Positional(t) => t,
                BraceField::Named(_, _) => unreachable!(),
            })
            .collect();
        Ok(Type::tuple(elems))
    } else {
        Err(cur.unexpected("either all-named or all-positional fields, not a mix"))
    }
}

/// `a implements T`, `a is Name`, `a has {...}`, combined with `and`/`or`
/// and parenthesised for grouping (§3.2 `Constraint`, §4.3 `given`
/// clauses).
pub fn parse_constraint(cur: &mut Cursor<'_>) -> PResult<Constraint> {
    parse_constraint_or(cur)
}

fn parse_constraint_or(cur: &mut Cursor<'_>) -> PResult<Constraint> {
    let mut lhs = parse_constraint_and(cur)?;
    while cur.eat_keyword("or").is_some() {
        let rhs = parse_constraint_and(cur)?;
        lhs = Constraint::Or(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_constraint_and(cur: &mut Cursor<'_>) -> PResult<Constraint> {
    let mut lhs = parse_constraint_atom(cur)?;
    while cur.eat_keyword("and").is_some() {
        let rhs = parse_constraint_atom(cur)?;
        lhs = Constraint::And(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_constraint_atom(cur: &mut Cursor<'_>) -> PResult<Constraint> {
    if cur.eat_punctuation('(').is_some() {
        let inner = parse_constraint_or(cur)?;
        cur.punctuation(')')?;
        return Ok(Constraint::Paren(Box::new(inner)));
    }
    let (var, _) = cur.identifier()?;
    // `implements` is not a reserved lexer keyword (§6's keyword list omits
    // it) — it only carries grammatical meaning directly after a
    // constraint variable, so it's matched here as plain identifier text.
    if let Some(ident) = cur.peek().identifier_name() {
        if ident == "implements" {
            cur.identifier()?;
            let (trait_name, _) = cur.identifier()?;
            return Ok(Constraint::Implements(var, trait_name));
        }
    }
    if cur.eat_keyword("is").is_some() {
        let (name, _) = cur.identifier()?;
        return Ok(Constraint::Is(var, name));
    }
    if cur.eat_keyword("has").is_some() {
        // `a has field "name" of type T` — string-named single-field form.
        if cur.eat_keyword("field").is_some() {
            let (field, _) = cur.string()?;
            cur.keyword("of")?;
            cur.keyword("type")?;
            let ty = parse_type(cur)?;
            return Ok(Constraint::HasField(var, field, ty));
        }
        cur.punctuation('{')?;
        if cur.eat_punctuation('}').is_some() {
            return Ok(Constraint::Has(
                var,
                RecordStructure {
                    fields: BTreeMap::new(),
                },
            ));
        }
        // `a has {@f T}` — a single-field shortcut is HasField; a
        // multi-field body is the general Has(RecordStructure) form.
        let fields = sep_by(cur, ',', |c| -> PResult<(String, Type)> {
            let (name, safe, loc) = c.accessor()?;
            if safe {
                return Err(cur_err("field name cannot use the safe marker here".into(), loc));
            }
            let ty = parse_type(c)?;
            Ok((name, ty))
        })?;
        cur.punctuation('}')?;
        if fields.len() == 1 {
            let (field, ty) = fields.into_iter().next().unwrap();
            return Ok(Constraint::HasField(var, field, ty));
        }
        let mut map = BTreeMap::new();
        for (name, ty) in fields {
            map.insert(name, ty);
        }
        return Ok(Constraint::Has(var, RecordStructure { fields: map }));
    }
    Err(cur.unexpected("'implements', 'is', or 'has' after a constraint variable"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use noo_lexer::{Lexer, Token};

    fn ty_of(src: &str) -> Type {
        let tokens: Vec<Token> = Lexer::tokenize(src).unwrap();
        let mut cur = Cursor::new(&tokens);
        parse_type(&mut cur).unwrap()
    }

    #[test]
    fn parses_arrow_type_right_assoc() {
        let ty = ty_of("Float -> Float -> Float");
        match ty {
            Type::Function { params, ret, .. } => {
                assert_eq!(params, vec![Type::float()]);
                assert!(matches!(*ret, Type::Function { .. }));
            }
            _ => panic!("expected function type"),
        }
    }

    #[test]
    fn parses_list_of_elem() {
        let ty = ty_of("List Float");
        assert_eq!(ty, Type::list(Type::float()));
    }

    #[test]
    fn parses_bare_list() {
        let ty = ty_of("List");
        assert_eq!(ty, Type::bare_list());
    }

    #[test]
    fn parses_record_type() {
        let ty = ty_of("{@name String, @age Float}");
        match ty {
            Type::Record(fields) => {
                assert_eq!(fields.get("name"), Some(&Type::string()));
                assert_eq!(fields.get("age"), Some(&Type::float()));
            }
            _ => panic!("expected record type"),
        }
    }

    #[test]
    fn parses_effects_on_outer_function() {
        let ty = ty_of("Float -> Float !log !state");
        match ty {
            Type::Function { effects, .. } => {
                assert!(effects.contains(&Effect::Log));
                assert!(effects.contains(&Effect::State));
            }
            _ => panic!("expected function type"),
        }
    }

    #[test]
    fn parses_variant_application() {
        let ty = ty_of("Option Float");
        assert_eq!(ty, Type::variant("Option", vec![Type::float()]));
    }

    #[test]
    fn parses_given_constraint() {
        let tokens = Lexer::tokenize("a implements Show").unwrap();
        let mut cur = Cursor::new(&tokens);
        let c = parse_constraint(&mut cur).unwrap();
        assert_eq!(c, Constraint::Implements("a".into(), "Show".into()));
    }
}
