//! Declaration parsers: `variant`, `type`, `constraint`, `implement` (§4.4,
//! §4.6-§4.7). Grounded on `mesh-parser::parser::items`'s per-keyword
//! dispatch shape, generalized from Mesh's `fn`/`module`/`struct` trio to
//! Noolang's trait/ADT declaration forms.

use noo_ast::{Expr, ExprKind, Type, VariantCtorDef};

use crate::cursor::{Cursor, PResult};
use crate::parser::expressions::{parse_expr, skip_semicolons};
use crate::parser::types::{atom_can_start, parse_atom, parse_constraint, parse_implement_target, parse_type};

/// `variant Name params… = Ctor args… | Ctor args… | …`
pub fn parse_variant(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let start = cur.keyword("variant")?;
    let (name, _) = cur.identifier()?;
    let params = parse_lowercase_params(cur);
    cur.operator("=")?;
    let variants = parse_ctor_alternatives(cur)?;
    let end = variants
        .last()
        .map(|v: &VariantCtorDef| v.location)
        .unwrap_or(start);
    Ok(Expr::new(
        ExprKind::TypeDefinition {
            name,
            params,
            variants,
        },
        start.merge(end),
    ))
}

/// `type Name params… = TypeExpr`. When the right-hand side is a `|`
/// separated list of constructor alternatives it desugars into the same
/// `TypeDefinition` an equivalent `variant` declaration would produce —
/// `noo-ast::Type` has no dedicated union variant, and the ADT form
/// already is exactly a tagged sum type, so "unions" from the prose
/// description are represented that way. A single alternative (no `|`)
/// is instead a plain type alias (`UserDefinedType`), covering the
/// record/tuple shapes the description also names.
pub fn parse_user_type(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let start = cur.keyword("type")?;
    let (name, _) = cur.identifier()?;
    let params = parse_lowercase_params(cur);
    cur.operator("=")?;

    let save = cur.checkpoint();
    if let Some(first) = try_parse_ctor_alt(cur) {
        if cur.peek().is_operator("|") {
            let mut variants = vec![first];
            while cur.eat_operator("|").is_some() {
                let ctor = parse_ctor_alt(cur)?;
                variants.push(ctor);
            }
            let end = variants.last().unwrap().location;
            return Ok(Expr::new(
                ExprKind::TypeDefinition {
                    name,
                    params,
                    variants,
                },
                start.merge(end),
            ));
        }
    }
    cur.restore(save);

    let body = parse_type(cur)?;
    Ok(Expr::new(
        ExprKind::UserDefinedType { name, params, body },
        start,
    ))
}

/// `constraint Name params… ( funcName : type ; funcName : type ; … )`
pub fn parse_constraint_def(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let start = cur.keyword("constraint")?;
    let (name, _) = cur.identifier()?;
    let type_params = parse_lowercase_params(cur);
    cur.punctuation('(')?;
    let mut functions = Vec::new();
    skip_semicolons(cur);
    while !cur.peek().is_punctuation(')') {
        let (fn_name, _) = cur.identifier()?;
        cur.punctuation(':')?;
        let ty = parse_type(cur)?;
        functions.push((fn_name, ty));
        let had_sep = cur.eat_punctuation(';').is_some();
        skip_semicolons(cur);
        if !had_sep {
            break;
        }
    }
    let end = cur.punctuation(')')?;
    Ok(Expr::new(
        ExprKind::ConstraintDefinition {
            name,
            type_params,
            functions,
        },
        start.merge(end),
    ))
}

/// `implement Trait TypeExpr [given G] ( funcName = value ; … )`
pub fn parse_implement(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let start = cur.keyword("implement")?;
    let (trait_name, _) = cur.identifier()?;
    let for_type = parse_implement_target(cur)?;
    let given = if cur.eat_keyword("given").is_some() {
        Some(parse_constraint(cur)?)
    } else {
        None
    };
    cur.punctuation('(')?;
    let mut functions = Vec::new();
    skip_semicolons(cur);
    while !cur.peek().is_punctuation(')') {
        let (fn_name, _) = cur.identifier()?;
        cur.operator("=")?;
        let value = parse_expr(cur)?;
        functions.push((fn_name, value));
        let had_sep = cur.eat_punctuation(';').is_some();
        skip_semicolons(cur);
        if !had_sep {
            break;
        }
    }
    let end = cur.punctuation(')')?;
    Ok(Expr::new(
        ExprKind::ImplementDefinition {
            trait_name,
            for_type,
            given,
            functions,
        },
        start.merge(end),
    ))
}

/// Zero or more lowercase type-parameter names following a declaration's
/// head name, stopping at `=`.
fn parse_lowercase_params(cur: &mut Cursor<'_>) -> Vec<String> {
    let mut params = Vec::new();
    while let Some(name) = cur.peek().identifier_name() {
        if name.chars().next().map(char::is_uppercase).unwrap_or(false) {
            break;
        }
        let (name, _) = cur.identifier().expect("checked above");
        params.push(name);
    }
    params
}

fn try_parse_ctor_alt(cur: &mut Cursor<'_>) -> Option<VariantCtorDef> {
    let save = cur.checkpoint();
    match parse_ctor_alt(cur) {
        Ok(v) => Some(v),
        Err(_) => {
            cur.restore(save);
            None
        }
    }
}

fn parse_ctor_alt(cur: &mut Cursor<'_>) -> PResult<VariantCtorDef> {
    let tok = cur.peek();
    let name = match tok.identifier_name() {
        Some(n) if n.chars().next().map(char::is_uppercase).unwrap_or(false) => n.to_string(),
        _ => return Err(cur.unexpected("a constructor name")),
    };
    let loc = tok.location;
    cur.identifier()?;
    let mut args = Vec::new();
    while atom_can_start(cur) && !cur.peek().is_operator("|") {
        args.push(parse_atom(cur)?);
    }
    let end = args.last().map(|t: &Type| type_loc_fallback(t, loc)).unwrap_or(loc);
    Ok(VariantCtorDef {
        name,
        location: loc.merge(end),
        args,
    })
}

/// `Type` carries no location of its own; constructor-argument spans
/// collapse to the constructor name's location since nothing downstream
/// needs a tighter span for argument type lists.
fn type_loc_fallback(_ty: &Type, ctor_loc: noo_common::Location) -> noo_common::Location {
    ctor_loc
}

fn parse_ctor_alternatives(cur: &mut Cursor<'_>) -> PResult<Vec<VariantCtorDef>> {
    let mut out = vec![parse_ctor_alt(cur)?];
    while cur.eat_operator("|").is_some() {
        out.push(parse_ctor_alt(cur)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use noo_lexer::Lexer;

    fn expr_of(src: &str) -> Expr {
        let tokens = Lexer::tokenize(src).unwrap();
        let mut cur = Cursor::new(&tokens);
        crate::parser::expressions::parse_expr(&mut cur).unwrap()
    }

    #[test]
    fn parses_variant_adt() {
        let e = expr_of("variant Option a = Some a | None");
        match e.kind {
            ExprKind::TypeDefinition { name, params, variants } => {
                assert_eq!(name, "Option");
                assert_eq!(params, vec!["a".to_string()]);
                assert_eq!(variants.len(), 2);
                assert_eq!(variants[0].name, "Some");
                assert_eq!(variants[0].args.len(), 1);
                assert_eq!(variants[1].name, "None");
                assert!(variants[1].args.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_type_alias_record() {
        let e = expr_of("type Point = {@x Float, @y Float}");
        match e.kind {
            ExprKind::UserDefinedType { name, body, .. } => {
                assert_eq!(name, "Point");
                assert!(matches!(body, Type::Record(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_type_union_desugars_to_type_definition() {
        let e = expr_of("type Shape = Circle Float | Square Float");
        match e.kind {
            ExprKind::TypeDefinition { name, variants, .. } => {
                assert_eq!(name, "Shape");
                assert_eq!(variants.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_constraint_definition() {
        let e = expr_of("constraint Show a (show : a -> String)");
        match e.kind {
            ExprKind::ConstraintDefinition { name, functions, .. } => {
                assert_eq!(name, "Show");
                assert_eq!(functions.len(), 1);
                assert_eq!(functions[0].0, "show");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_implement_definition_with_given() {
        let e = expr_of(
            "implement Show List given a implements Show (show = fn xs => \"list\")",
        );
        match e.kind {
            ExprKind::ImplementDefinition {
                trait_name,
                given,
                functions,
                ..
            } => {
                assert_eq!(trait_name, "Show");
                assert!(given.is_some());
                assert_eq!(functions.len(), 1);
                assert_eq!(functions[0].0, "show");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_implement_definition_without_given() {
        let e = expr_of("implement Show Float (show = fn x => \"f\")");
        match e.kind {
            ExprKind::ImplementDefinition { given, .. } => assert!(given.is_none()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
