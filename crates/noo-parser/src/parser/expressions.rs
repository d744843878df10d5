//! Pratt-style precedence climbing for expressions (§4.4, C4).
//!
//! Grounded on `mesh-parser::parser::expressions`'s `expr_bp`/`lhs`
//! structure, but written as a cascade of one-function-per-precedence-level
//! calls rather than a single binding-power loop — Noolang's precedence
//! chain mixes several special-shaped productions (the `$`/`|>`/`|?`
//! operators each need their own associativity and, for `|>`/`<|`, their
//! own AST node) that don't fit one generic binding-power table as cleanly
//! as the teacher's token-only operator grammar does. `mesh-parser`'s own
//! lookahead-based disambiguation technique (`parse_map_literal`'s
//! retroactive decision between a block and a map literal, `parse_closure`'s
//! trailing-annotation handling) is reused directly for the
//! record/tuple/unit/destructuring decision and the lambda annotation hoist
//! below.

use noo_ast::{BinOp, Expr, ExprKind, MatchCase, Param, PipeOp, Type};
use noo_common::Location;

use crate::cursor::{many, optional, sep_by, Cursor, PResult};
use crate::parser::items;
use crate::parser::patterns::parse_pattern;
use crate::parser::types::{parse_constraint, parse_type};

/// Full expression grammar, including the loosest `;` sequence level.
/// Used wherever a single `Expr` value is required inside an already
/// delimited context (parenthesised groups, list/record/tuple elements,
/// `if` conditions) where a bare `;` can only mean the sequence operator,
/// never a statement separator.
pub fn parse_expr(cur: &mut Cursor<'_>) -> PResult<Expr> {
    parse_where_wrapped(cur, parse_sequence)
}

/// One item in a `;`-separated statement list (top-level program, `where`
/// defs, `implement`/`constraint` bodies use their own separators):
/// everything below the sequence level, so the list's own `;` separators
/// are never swallowed as a `Sequence` binary node.
pub fn parse_statement(cur: &mut Cursor<'_>) -> PResult<Expr> {
    parse_where_wrapped(cur, parse_dollar)
}

/// `expr where (defs)` wraps whatever `inner` parsed, if a `where` keyword
/// immediately follows it (§3.3 `Where`).
fn parse_where_wrapped(
    cur: &mut Cursor<'_>,
    inner: fn(&mut Cursor<'_>) -> PResult<Expr>,
) -> PResult<Expr> {
    let body = inner(cur)?;
    if cur.eat_keyword("where").is_some() {
        cur.punctuation('(')?;
        let defs = parse_semi_list(cur)?;
        let close = cur.punctuation(')')?;
        let loc = body.location.merge(close);
        return Ok(Expr::new(
            ExprKind::Where {
                body: Box::new(body),
                defs,
            },
            loc,
        ));
    }
    Ok(body)
}

/// `;`-separated list of statements, tolerating a trailing separator and
/// (at the top level) zero statements.
pub(crate) fn parse_semi_list(cur: &mut Cursor<'_>) -> PResult<Vec<Expr>> {
    let mut out = Vec::new();
    skip_semicolons(cur);
    while !cur.is_eof() && !cur.peek().is_punctuation(')') {
        out.push(parse_statement(cur)?);
        let had_sep = cur.eat_punctuation(';').is_some();
        skip_semicolons(cur);
        if !had_sep {
            break;
        }
    }
    Ok(out)
}

pub(crate) fn skip_semicolons(cur: &mut Cursor<'_>) {
    while cur.eat_punctuation(';').is_some() {}
}

// ── Precedence ladder (loosest to tightest) ────────────────────────────

fn parse_sequence(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let mut lhs = parse_dollar(cur)?;
    loop {
        let save = cur.checkpoint();
        if cur.eat_punctuation(';').is_none() {
            break;
        }
        match parse_dollar(cur) {
            Ok(rhs) => lhs = mk_binary(BinOp::Sequence, lhs, rhs),
            Err(_) => {
                cur.restore(save);
                break;
            }
        }
    }
    Ok(lhs)
}

/// `$` — right-associative, lowest-precedence application.
fn parse_dollar(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let lhs = parse_thrush(cur)?;
    if cur.eat_operator("$").is_some() {
        let rhs = parse_dollar(cur)?;
        return Ok(mk_binary(BinOp::Dollar, lhs, rhs));
    }
    Ok(lhs)
}

/// `|` / `|?` — thrush and safe thrush, left-associative.
fn parse_thrush(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let mut lhs = parse_pipeline(cur)?;
    loop {
        let op = if cur.peek().is_operator("|?") {
            BinOp::SafeThrush
        } else if cur.peek().is_operator("|") {
            BinOp::Thrush
        } else {
            break;
        };
        cur.operator(op.symbol())?;
        let rhs = parse_pipeline(cur)?;
        lhs = mk_binary(op, lhs, rhs);
    }
    Ok(lhs)
}

/// `|>` / `<|` — pipeline, left-associative, collected into a `Pipeline`
/// node rather than nested `Binary`s (§3.3, §4.8: "pipelines become
/// `Pipeline` nodes and compose the step types from left to right").
fn parse_pipeline(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let first = parse_comparison(cur)?;
    let mut steps = vec![first];
    let mut operators = Vec::new();
    loop {
        let op = if cur.eat_operator("|>").is_some() {
            PipeOp::Forward
        } else if cur.eat_operator("<|").is_some() {
            PipeOp::Backward
        } else {
            break;
        };
        operators.push(op);
        steps.push(parse_comparison(cur)?);
    }
    if operators.is_empty() {
        return Ok(steps.into_iter().next().unwrap());
    }
    let loc = steps[0].location.merge(steps.last().unwrap().location);
    Ok(Expr::new(ExprKind::Pipeline { steps, operators }, loc))
}

fn parse_comparison(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let mut lhs = parse_additive(cur)?;
    loop {
        const OPS: &[(&str, BinOp)] = &[
            ("<=", BinOp::Le),
            (">=", BinOp::Ge),
            ("==", BinOp::Eq),
            ("!=", BinOp::Ne),
            ("<", BinOp::Lt),
            (">", BinOp::Gt),
        ];
        let Some((_, op)) = OPS.iter().find(|(sym, _)| cur.peek().is_operator(sym)) else {
            break;
        };
        cur.operator(op.symbol())?;
        let rhs = parse_additive(cur)?;
        lhs = mk_binary(*op, lhs, rhs);
    }
    Ok(lhs)
}

fn parse_additive(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let mut lhs = parse_multiplicative(cur)?;
    loop {
        let op = if cur.peek().is_operator("+") {
            BinOp::Add
        } else if cur.peek().is_operator("-") {
            BinOp::Sub
        } else {
            break;
        };
        cur.operator(op.symbol())?;
        let rhs = parse_multiplicative(cur)?;
        lhs = mk_binary(op, lhs, rhs);
    }
    Ok(lhs)
}

fn parse_multiplicative(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let mut lhs = parse_application(cur)?;
    loop {
        let op = if cur.peek().is_operator("*") {
            BinOp::Mul
        } else if cur.peek().is_operator("/") {
            BinOp::Div
        } else if cur.peek().is_operator("%") {
            BinOp::Mod
        } else {
            break;
        };
        cur.operator(op.symbol())?;
        let rhs = parse_application(cur)?;
        lhs = mk_binary(op, lhs, rhs);
    }
    Ok(lhs)
}

/// Application by juxtaposition: `f a b` ≡ apply `f` to `a`, then to `b`.
/// Backtracks on the first argument that fails to parse (`many`), so a
/// trailing binary operator (e.g. the `-` in `f - 1`, non-adjacent to a
/// number) is correctly left for `parse_additive` above rather than
/// misread as another argument.
fn parse_application(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let func = parse_unary(cur)?;
    let args = many(cur, parse_unary);
    if args.is_empty() {
        return Ok(func);
    }
    let loc = func.location.merge(args.last().unwrap().location);
    Ok(Expr::new(
        ExprKind::Application {
            func: Box::new(func),
            args,
        },
        loc,
    ))
}

/// Unary minus, ONLY when the `-` token is lexically adjacent (zero
/// whitespace) to a following number literal — `-123` is the literal
/// negative 123, a single token run collapsed at parse time. Any other
/// placement of `-` (adjacent to a non-number, or separated by
/// whitespace) falls through to `parse_postfix_annotation`/primary, so
/// that a genuinely binary `-` is left for `parse_additive` to consume
/// and a malformed one (`- 123` with no left operand) surfaces as a
/// primary-parse error rather than being silently absorbed here.
fn parse_unary(cur: &mut Cursor<'_>) -> PResult<Expr> {
    if cur.peek().is_operator("-") {
        let minus_loc = cur.location();
        let next = cur.peek_at(1);
        let adjacent = minus_loc.end == next.location.start;
        if adjacent {
            if let noo_lexer::TokenKind::Number(n) = next.kind {
                cur.operator("-")?;
                let (_, num_loc) = cur.number()?;
                return Ok(Expr::new(ExprKind::Number(-n), minus_loc.merge(num_loc)));
            }
        }
    }
    parse_postfix_annotation(cur)
}

/// Postfix `: type [given constr]` (§4.4). Binds to the immediately
/// preceding primary, tighter than application and the unary-minus
/// adjacency check — this is what lets a parenthesised lambda body like
/// `fn x => (x + 1) : Float -> Float` annotate the *whole* grouped
/// expression (a single primary) while `f x : Int` annotates only `x`.
fn parse_postfix_annotation(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let expr = parse_primary(cur)?;
    if cur.peek().is_punctuation(':') {
        let colon_loc = cur.punctuation(':')?;
        let ty = parse_type(cur)?;
        if cur.eat_keyword("given").is_some() {
            let given = parse_constraint(cur)?;
            let loc = expr.location.merge(colon_loc);
            return Ok(Expr::new(
                ExprKind::Constrained {
                    expr: Box::new(expr),
                    ty,
                    given,
                },
                loc,
            ));
        }
        let loc = expr.location.merge(colon_loc);
        return Ok(Expr::new(
            ExprKind::Typed {
                expr: Box::new(expr),
                ty,
            },
            loc,
        ));
    }
    Ok(expr)
}

fn mk_binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    let loc = left.location.merge(right.location);
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        loc,
    )
}

// ── Primary dispatch (§4.4) ─────────────────────────────────────────────

fn parse_primary(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let tok = cur.peek();
    let loc = tok.location;

    if matches!(tok.kind, noo_lexer::TokenKind::Number(_)) {
        let (n, loc) = cur.number()?;
        return Ok(Expr::new(ExprKind::Number(n), loc));
    }
    if matches!(tok.kind, noo_lexer::TokenKind::Str(_)) {
        let (s, loc) = cur.string()?;
        return Ok(Expr::new(ExprKind::Str(s), loc));
    }
    if matches!(tok.kind, noo_lexer::TokenKind::Accessor(_)) {
        let (field, safe, loc) = cur.accessor()?;
        return Ok(Expr::new(ExprKind::Accessor { field, safe }, loc));
    }
    if tok.is_keyword("true") {
        cur.keyword("true")?;
        return Ok(Expr::new(ExprKind::Variable("True".into()), loc));
    }
    if tok.is_keyword("false") {
        cur.keyword("false")?;
        return Ok(Expr::new(ExprKind::Variable("False".into()), loc));
    }
    if tok.is_keyword("fn") {
        return parse_lambda(cur);
    }
    if tok.is_keyword("if") {
        return parse_if(cur);
    }
    if tok.is_keyword("match") {
        return parse_match(cur);
    }
    if tok.is_keyword("import") {
        return parse_import(cur);
    }
    if tok.is_keyword("variant") {
        return items::parse_variant(cur);
    }
    if tok.is_keyword("type") {
        return items::parse_user_type(cur);
    }
    if tok.is_keyword("constraint") {
        return items::parse_constraint_def(cur);
    }
    if tok.is_keyword("implement") {
        return items::parse_implement(cur);
    }
    if tok.is_keyword("mut") {
        return parse_mut(cur);
    }
    if tok.identifier_name().is_some() {
        return parse_identifier_or_definition(cur);
    }
    if tok.is_punctuation('[') {
        return parse_list(cur);
    }
    if tok.is_punctuation('{') {
        if let Some(result) = try_parse_destructuring(cur) {
            return result;
        }
        return parse_brace_expr(cur);
    }
    if tok.is_punctuation('(') {
        return parse_paren_group(cur);
    }

    Err(cur.unexpected("an expression"))
}

fn parse_identifier_or_definition(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let (name, loc) = cur.identifier()?;
    if cur.peek().is_operator("=") {
        cur.operator("=")?;
        let value = parse_dollar(cur)?;
        let end = value.location;
        return Ok(Expr::new(
            ExprKind::Definition {
                name,
                value: Box::new(value),
            },
            loc.merge(end),
        ));
    }
    Ok(Expr::new(ExprKind::Variable(name), loc))
}

/// `mut name = value` or (when `!` is lexically adjacent to `mut`)
/// `mut! name = value`.
fn parse_mut(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let mut_loc = cur.keyword("mut")?;
    let next = cur.peek();
    let is_mutation = next.is_operator("!") && mut_loc.end == next.location.start;
    if is_mutation {
        cur.operator("!")?;
        let (name, _) = cur.identifier()?;
        cur.operator("=")?;
        let value = parse_dollar(cur)?;
        let end = value.location;
        return Ok(Expr::new(
            ExprKind::Mutation {
                name,
                value: Box::new(value),
            },
            mut_loc.merge(end),
        ));
    }
    let (name, _) = cur.identifier()?;
    cur.operator("=")?;
    let value = parse_dollar(cur)?;
    let end = value.location;
    Ok(Expr::new(
        ExprKind::MutableDefinition {
            name,
            value: Box::new(value),
        },
        mut_loc.merge(end),
    ))
}

fn parse_import(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let start = cur.keyword("import")?;
    let (path, end) = cur.string()?;
    Ok(Expr::new(ExprKind::Import { path }, start.merge(end)))
}

fn parse_lambda(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let start = cur.keyword("fn")?;
    let mut params = Vec::new();
    while !cur.peek().is_operator("=>") {
        let (name, loc) = cur.identifier()?;
        params.push(Param { name, location: loc });
    }
    cur.operator("=>")?;
    let body = parse_statement(cur)?;
    let body_loc = body.location;

    // Hoist a whole-body `: FunctionType` annotation onto the lambda
    // itself (§4.4): only triggers when the body's outermost node IS the
    // annotation (nothing else was combined with it at a looser
    // precedence level), which is how a parenthesised body like
    // `(x + 1) : Float -> Float` ends up annotating the entire function.
    let (body, annotation) = match body.kind {
        ExprKind::Typed { expr, ty } if matches!(ty, Type::Function { .. }) => (*expr, Some(ty)),
        other => (Expr::new(other, body_loc), None),
    };

    let loc = start.merge(body.location);
    Ok(Expr::new(
        ExprKind::Function {
            params,
            body: Box::new(body),
            annotation,
        },
        loc,
    ))
}

fn parse_if(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let start = cur.keyword("if")?;
    let cond = parse_statement(cur)?;
    cur.keyword("then")?;
    let then_branch = parse_statement(cur)?;
    cur.keyword("else")?;
    let else_branch = parse_statement(cur)?;
    let loc = start.merge(else_branch.location);
    Ok(Expr::new(
        ExprKind::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        },
        loc,
    ))
}

fn parse_match(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let start = cur.keyword("match")?;
    let scrutinee = parse_statement(cur)?;
    cur.keyword("with")?;
    cur.punctuation('(')?;
    let mut cases = Vec::new();
    skip_semicolons(cur);
    while !cur.peek().is_punctuation(')') {
        let pattern = parse_pattern(cur)?;
        cur.operator("=>")?;
        let body = parse_statement(cur)?;
        cases.push(MatchCase { pattern, body });
        let had_sep = cur.eat_punctuation(';').is_some();
        skip_semicolons(cur);
        if !had_sep {
            break;
        }
    }
    let close = cur.punctuation(')')?;
    Ok(Expr::new(
        ExprKind::Match {
            scrutinee: Box::new(scrutinee),
            cases,
        },
        start.merge(close),
    ))
}

fn parse_list(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let start = cur.punctuation('[')?;
    let elements = sep_by(cur, ',', parse_expr)?;
    let end = cur.punctuation(']')?;
    Ok(Expr::new(ExprKind::List(elements), start.merge(end)))
}

fn parse_paren_group(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let start = cur.punctuation('(')?;
    if let Some(end) = cur.eat_punctuation(')') {
        return Ok(Expr::new(ExprKind::Unit, start.merge(end)));
    }
    let inner = parse_expr(cur)?;
    let end = cur.punctuation(')')?;
    // Re-location to cover the parens themselves.
    Ok(Expr::new(inner.kind, start.merge(end)))
}

enum BraceField {
    Named(String, Expr),
    Positional(Expr),
}

/// `{@name expr, …}` → Record, `{expr, …}` → Tuple, `{}` → Unit. Mixing
/// named and positional fields is a parse error attributed to the first
/// offending token (§3.5, §4.4).
fn parse_brace_expr(cur: &mut Cursor<'_>) -> PResult<Expr> {
    let start = cur.punctuation('{')?;
    if let Some(end) = cur.eat_punctuation('}') {
        return Ok(Expr::new(ExprKind::Unit, start.merge(end)));
    }
    let mut saw_named = false;
    let mut saw_positional = false;
    let mut first_violation: Option<Location> = None;
    let fields = sep_by(cur, ',', |c| -> PResult<BraceField> {
        if let Some((name, safe, aloc)) = optional(c, |c2| c2.accessor()) {
            if safe {
                return Err(crate::error::ParseError::new(
                    "field name cannot use the safe marker here",
                    aloc,
                ));
            }
            let value = parse_expr(c)?;
            if saw_positional && first_violation.is_none() {
                first_violation = Some(aloc);
            }
            saw_named = true;
            Ok(BraceField::Named(name, value))
        } else {
            let start_loc = c.location();
            let value = parse_expr(c)?;
            if saw_named && first_violation.is_none() {
                first_violation = Some(start_loc);
            }
            saw_positional = true;
            Ok(BraceField::Positional(value))
        }
    })?;
    let end = cur.punctuation('}')?;

    if let Some(loc) = first_violation {
        return Err(crate::error::ParseError::new(
            "cannot mix named and positional fields in a record/tuple literal",
            loc,
        ));
    }

    if fields.is_empty() {
        return Ok(Expr::new(ExprKind::Unit, start.merge(end)));
    }
    if saw_named {
        let named = fields
            .into_iter()
            .map(|f| match f {
                BraceField::Named(n, e) => (n, e),
                BraceField::Positional(_) => unreachable!(),
            })
            .collect();
        Ok(Expr::new(ExprKind::Record(named), start.merge(end)))
    } else {
        let positional = fields
            .into_iter()
            .map(|f| match f {
                BraceField::Positional(e) => e,
                BraceField::Named(_, _) => unreachable!(),
            })
            .collect();
        Ok(Expr::new(ExprKind::Tuple(positional), start.merge(end)))
    }
}

/// Speculatively parses `{ names… } = value` (positional tuple
/// destructuring) or `{ @field name, … } = value` (record destructuring).
/// Returns `None` (cursor rewound) if the brace body isn't a flat name
/// list followed by `=`, letting the caller fall back to the ordinary
/// record/tuple/unit literal parse (§4.4: "a `{ … }` followed by `=` at
/// the matching close brace parses as a destructuring pattern").
fn try_parse_destructuring(cur: &mut Cursor<'_>) -> Option<PResult<Expr>> {
    let save = cur.checkpoint();
    let start = cur.peek().location;
    if cur.eat_punctuation('{').is_none() {
        return None;
    }

    enum Field {
        Named(String, String),
        Positional(String),
    }

    let parsed: PResult<Vec<Field>> = sep_by(cur, ',', |c| -> PResult<Field> {
        if let Some((field, safe, loc)) = optional(c, |c2| c2.accessor()) {
            if safe {
                return Err(c.unexpected("a field name without the safe marker"));
            }
            let (local, _) = c.identifier().map_err(|_| {
                crate::error::ParseError::new("expected a bound name after field", loc)
            })?;
            Ok(Field::Named(field, local))
        } else {
            let (name, _) = c.identifier()?;
            Ok(Field::Positional(name))
        }
    });
    let fields = match parsed {
        Ok(f) => f,
        Err(_) => {
            cur.restore(save);
            return None;
        }
    };
    if cur.eat_punctuation('}').is_none() || !cur.peek().is_operator("=") {
        cur.restore(save);
        return None;
    }
    cur.operator("=").ok();
    let value = match parse_dollar(cur) {
        Ok(v) => v,
        Err(e) => return Some(Err(e)),
    };
    let loc = start.merge(value.location);

    let all_named = fields.iter().all(|f| matches!(f, Field::Named(_, _)));
    let all_positional = fields.iter().all(|f| matches!(f, Field::Positional(_)));
    if fields.is_empty() || all_positional {
        let names = fields
            .into_iter()
            .map(|f| match f {
                Field::Positional(n) => n,
                Field::Named(_, _) => unreachable!(),
            })
            .collect();
        Some(Ok(Expr::new(
            ExprKind::TupleDestructuring {
                names,
                value: Box::new(value),
            },
            loc,
        )))
    } else if all_named {
        let mapped = fields
            .into_iter()
            .map(|f| match f {
                Field::Named(field, local) => (field, local),
                Field::Positional(_) => unreachable!(),
            })
            .collect();
        Some(Ok(Expr::new(
            ExprKind::RecordDestructuring {
                fields: mapped,
                value: Box::new(value),
            },
            loc,
        )))
    } else {
        Some(Err(crate::error::ParseError::new(
            "cannot mix named and positional fields in a destructuring pattern",
            start,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noo_lexer::Lexer;

    fn expr_of(src: &str) -> Expr {
        let tokens = Lexer::tokenize(src).unwrap();
        let mut cur = Cursor::new(&tokens);
        parse_expr(&mut cur).unwrap()
    }

    #[test]
    fn parses_arithmetic_precedence() {
        let e = expr_of("1 + 2 * 3");
        match e.kind {
            ExprKind::Binary { op: BinOp::Add, right, .. } => {
                assert!(matches!(right.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_application_juxtaposition() {
        let e = expr_of("f 1 2");
        match e.kind {
            ExprKind::Application { args, .. } => assert_eq!(args.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn adjacent_minus_is_negative_literal() {
        let e = expr_of("-123");
        assert_eq!(e.kind, ExprKind::Number(-123.0));
    }

    #[test]
    fn spaced_minus_is_binary_with_missing_lhs_error() {
        let tokens = Lexer::tokenize("- 123").unwrap();
        let mut cur = Cursor::new(&tokens);
        assert!(parse_expr(&mut cur).is_err());
    }

    #[test]
    fn dollar_is_right_associative() {
        let e = expr_of("f $ g $ x");
        match e.kind {
            ExprKind::Binary { op: BinOp::Dollar, right, .. } => {
                assert!(matches!(right.kind, ExprKind::Binary { op: BinOp::Dollar, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn pipeline_collects_into_pipeline_node() {
        let e = expr_of("x |> f |> g");
        match e.kind {
            ExprKind::Pipeline { steps, operators } => {
                assert_eq!(steps.len(), 3);
                assert_eq!(operators.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn record_literal_all_named() {
        let e = expr_of(r#"{@name "Alice", @age 30}"#);
        assert!(matches!(e.kind, ExprKind::Record(_)));
    }

    #[test]
    fn tuple_literal_all_positional() {
        let e = expr_of("{1, 2, 3}");
        match e.kind {
            ExprKind::Tuple(elems) => assert_eq!(elems.len(), 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_braces_is_unit() {
        let e = expr_of("{}");
        assert_eq!(e.kind, ExprKind::Unit);
    }

    #[test]
    fn mixed_fields_is_parse_error() {
        let tokens = Lexer::tokenize(r#"{@name "Alice", 30}"#).unwrap();
        let mut cur = Cursor::new(&tokens);
        assert!(parse_expr(&mut cur).is_err());
    }

    #[test]
    fn tuple_destructuring_detected_by_trailing_equals() {
        let e = expr_of("{a, b} = {1, 2}");
        match e.kind {
            ExprKind::TupleDestructuring { names, .. } => {
                assert_eq!(names, vec!["a".to_string(), "b".to_string()])
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn record_destructuring_detected_by_trailing_equals() {
        let e = expr_of(r#"{@name n} = {@name "Alice"}"#);
        match e.kind {
            ExprKind::RecordDestructuring { fields, .. } => {
                assert_eq!(fields, vec![("name".to_string(), "n".to_string())])
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn definition_parses_name_equals_value() {
        let e = expr_of("x = 1 + 2");
        assert!(matches!(e.kind, ExprKind::Definition { .. }));
    }

    #[test]
    fn lambda_hoists_whole_body_function_annotation() {
        let e = expr_of("fn x => (x + 1) : Float -> Float");
        match e.kind {
            ExprKind::Function { annotation, body, .. } => {
                assert!(annotation.is_some());
                assert!(!matches!(body.kind, ExprKind::Typed { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn lambda_without_whole_body_annotation_keeps_typed_on_subexpr() {
        let e = expr_of("fn x => x + 1 : Float");
        match e.kind {
            ExprKind::Function { annotation, body, .. } => {
                assert!(annotation.is_none());
                match body.kind {
                    ExprKind::Binary { right, .. } => {
                        assert!(matches!(right.kind, ExprKind::Typed { .. }));
                    }
                    other => panic!("unexpected body {other:?}"),
                }
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn match_expression_parses_cases() {
        let e = expr_of("match Some 1 with (Some x => x; None => 0)");
        match e.kind {
            ExprKind::Match { cases, .. } => assert_eq!(cases.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn where_expression_binds_defs() {
        let e = expr_of("result where (result = x + 1; x = 2)");
        match e.kind {
            ExprKind::Where { defs, .. } => assert_eq!(defs.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn true_false_are_constructor_variables() {
        assert_eq!(expr_of("true").kind, ExprKind::Variable("True".into()));
        assert_eq!(expr_of("false").kind, ExprKind::Variable("False".into()));
    }

    #[test]
    fn accessor_is_safe_when_marked() {
        let e = expr_of("@name?");
        match e.kind {
            ExprKind::Accessor { field, safe } => {
                assert_eq!(field, "name");
                assert!(safe);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
