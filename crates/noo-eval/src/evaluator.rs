//! The tree-walking evaluator (C9, §4.9): one function per `ExprKind`,
//! mirroring the inferencer's own exhaustive match over the same enum
//! (`noo_typeck::infer::infer_expr`) so the two passes stay easy to read
//! side by side.

use std::collections::BTreeMap;
use std::rc::Rc;

use noo_ast::{BinOp, Expr, ExprKind, MatchCase, PipeOp, Pattern, PatternKind, Program};
use noo_common::Location;

use crate::env::Env;
use crate::error::RuntimeError;
use crate::traits::Traits;
use crate::value::{BuiltinFn, Closure, Value};

/// Evaluates a whole program: every statement runs in source order in one
/// shared top-level scope (§5: "statements in a program are processed
/// strictly in source order"), and the value of the last statement is the
/// program's result. An empty program evaluates to `Unit` (§8 boundary
/// behaviour: "Empty input → empty program, type Unit").
pub fn evaluate_program(program: &Program, env: &Env, traits: &Traits) -> Result<Value, RuntimeError> {
    let mut last = Value::Unit;
    for stmt in &program.statements {
        last = evaluate_expr(stmt, env, traits)?;
    }
    Ok(last)
}

/// Evaluates a sequence of `where`-block definitions into `env` in order,
/// the same rule `evaluate_program` uses for top-level statements.
fn evaluate_defs(defs: &[Expr], env: &Env, traits: &Traits) -> Result<(), RuntimeError> {
    for def in defs {
        evaluate_expr(def, env, traits)?;
    }
    Ok(())
}

pub fn evaluate_expr(expr: &Expr, env: &Env, traits: &Traits) -> Result<Value, RuntimeError> {
    let loc = expr.location;
    match &expr.kind {
        ExprKind::Number(n) => Ok(Value::Number(*n)),
        ExprKind::Str(s) => Ok(Value::String(s.clone())),
        ExprKind::Unit => Ok(Value::Unit),

        ExprKind::Variable(name) => {
            if let Some(v) = env.lookup(name) {
                return Ok(v);
            }
            if traits.is_trait_function(name) {
                return Ok(Value::TraitFunction(name.clone()));
            }
            Err(RuntimeError::UndefinedVariable {
                name: name.clone(),
                location: loc,
            })
        }

        ExprKind::Accessor { field, safe } => Ok(accessor_value(field.clone(), *safe, loc)),

        ExprKind::List(items) => {
            let values = items
                .iter()
                .map(|i| evaluate_expr(i, env, traits))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(values))
        }

        ExprKind::Tuple(items) => {
            let values = items
                .iter()
                .map(|i| evaluate_expr(i, env, traits))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Tuple(values))
        }

        ExprKind::Record(fields) => {
            let mut map = BTreeMap::new();
            for (name, value_expr) in fields {
                map.insert(name.clone(), evaluate_expr(value_expr, env, traits)?);
            }
            Ok(Value::Record(map))
        }

        ExprKind::Function { params, body, .. } => Ok(Value::Closure(Rc::new(Closure {
            params: params.clone(),
            body: (**body).clone(),
            captured_env: env.clone(),
        }))),

        ExprKind::Application { func, args } => evaluate_application(func, args, loc, env, traits),

        ExprKind::Binary { op, left, right } => evaluate_binary(*op, left, right, loc, env, traits),

        ExprKind::Pipeline { steps, operators } => evaluate_pipeline(steps, operators, env, traits),

        ExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let c = evaluate_expr(cond, env, traits)?;
            if c.is_truthy() {
                evaluate_expr(then_branch, env, traits)
            } else {
                evaluate_expr(else_branch, env, traits)
            }
        }

        ExprKind::Match { scrutinee, cases } => {
            let value = evaluate_expr(scrutinee, env, traits)?;
            evaluate_match(&value, cases, env, traits, loc)
        }

        ExprKind::Where { body, defs } => {
            let scope = env.child();
            evaluate_defs(defs, &scope, traits)?;
            evaluate_expr(body, &scope, traits)
        }

        ExprKind::Definition { name, value } => {
            let v = evaluate_expr(value, env, traits)?;
            env.define(name.clone(), v);
            Ok(Value::Unit)
        }

        ExprKind::MutableDefinition { name, value } => {
            let v = evaluate_expr(value, env, traits)?;
            env.define_mutable(name.clone(), v);
            Ok(Value::Unit)
        }

        ExprKind::Mutation { name, value } => {
            let v = evaluate_expr(value, env, traits)?;
            env.mutate(name, v, loc)?;
            Ok(Value::Unit)
        }

        ExprKind::TupleDestructuring { names, value } => {
            let v = evaluate_expr(value, env, traits)?;
            match v {
                Value::Tuple(items) => {
                    for (name, item) in names.iter().zip(items) {
                        env.define(name.clone(), item);
                    }
                    Ok(Value::Unit)
                }
                other => Err(RuntimeError::NotAFunction {
                    found: other.type_name(),
                    location: loc,
                }),
            }
        }

        ExprKind::RecordDestructuring { fields, value } => {
            let v = evaluate_expr(value, env, traits)?;
            match v {
                Value::Record(map) => {
                    for (field, local) in fields {
                        let bound = map.get(field).cloned().ok_or_else(|| RuntimeError::MissingField {
                            field: field.clone(),
                            found: "Record".to_string(),
                            location: loc,
                        })?;
                        env.define(local.clone(), bound);
                    }
                    Ok(Value::Unit)
                }
                other => Err(RuntimeError::MissingField {
                    field: fields.first().map(|(f, _)| f.clone()).unwrap_or_default(),
                    found: other.type_name(),
                    location: loc,
                }),
            }
        }

        ExprKind::Typed { expr: inner, .. } | ExprKind::Constrained { expr: inner, .. } => {
            evaluate_expr(inner, env, traits)
        }

        ExprKind::Import { .. } => {
            // Import resolution (reading and inlining another module's
            // program) happens upstream of the evaluator, in the pipeline
            // glue that resolves `import` before handing a program to
            // `evaluate_program` (§9: no file I/O happens in the core). A
            // residual `Import` node reaching here has nothing to load.
            Ok(Value::Unit)
        }

        ExprKind::TypeDefinition { variants, .. } => {
            for ctor in variants {
                register_constructor(ctor, env);
            }
            Ok(Value::Unit)
        }

        ExprKind::UserDefinedType { .. } => Ok(Value::Unit),

        ExprKind::ConstraintDefinition { name, functions, .. } => {
            let func_names: Vec<String> = functions.iter().map(|(n, _)| n.clone()).collect();
            traits.register_trait(name, &func_names);
            Ok(Value::Unit)
        }

        ExprKind::ImplementDefinition {
            trait_name,
            for_type,
            functions,
            ..
        } => {
            let type_name = for_type
                .type_name()
                .expect("implement target is a concrete type once type-checked");
            for (func_name, body) in functions {
                let value = evaluate_expr(body, env, traits)?;
                traits.register_implementation(trait_name, &type_name, func_name, value);
            }
            Ok(Value::Unit)
        }
    }
}

fn accessor_value(field: String, safe: bool, location: Location) -> Value {
    Value::Builtin(Rc::new(BuiltinFn {
        name: format!("@{field}"),
        arity: 1,
        func: Box::new(move |args: &[Value], _traits: &Traits, _loc: Location| match &args[0] {
            Value::Record(fields) => match fields.get(&field) {
                Some(v) => {
                    if safe {
                        Ok(Value::Constructor("Some".to_string(), vec![v.clone()]))
                    } else {
                        Ok(v.clone())
                    }
                }
                None => {
                    if safe {
                        Ok(Value::Constructor("None".to_string(), Vec::new()))
                    } else {
                        Err(RuntimeError::MissingField {
                            field: field.clone(),
                            found: "Record".to_string(),
                            location,
                        })
                    }
                }
            },
            other => Err(RuntimeError::MissingField {
                field: field.clone(),
                found: other.type_name(),
                location,
            }),
        }),
    }))
}

fn register_constructor(ctor: &noo_ast::VariantCtorDef, env: &Env) {
    if ctor.args.is_empty() {
        env.define(ctor.name.clone(), Value::Constructor(ctor.name.clone(), Vec::new()));
        return;
    }
    let name = ctor.name.clone();
    let arity = ctor.args.len();
    env.define(
        ctor.name.clone(),
        Value::Builtin(Rc::new(BuiltinFn {
            name: name.clone(),
            arity,
            func: Box::new(move |args: &[Value], _traits: &Traits, _loc: Location| {
                Ok(Value::Constructor(name.clone(), args.to_vec()))
            }),
        })),
    );
}

fn evaluate_application(func: &Expr, args: &[Expr], location: Location, env: &Env, traits: &Traits) -> Result<Value, RuntimeError> {
    if let ExprKind::Variable(name) = &func.kind {
        if env.lookup(name).is_none() && traits.is_trait_function(name) {
            let arg_values = args
                .iter()
                .map(|a| evaluate_expr(a, env, traits))
                .collect::<Result<Vec<_>, _>>()?;
            return dispatch_trait_function(name, &arg_values, location, traits);
        }
    }
    let func_value = evaluate_expr(func, env, traits)?;
    let arg_values = args
        .iter()
        .map(|a| evaluate_expr(a, env, traits))
        .collect::<Result<Vec<_>, _>>()?;
    call_value(&func_value, &arg_values, location, traits)
}

fn dispatch_trait_function(name: &str, args: &[Value], location: Location, traits: &Traits) -> Result<Value, RuntimeError> {
    let first = args.first().ok_or(RuntimeError::ArityMismatch {
        expected: 1,
        found: 0,
        location,
    })?;
    let implementation = traits.resolve(name, &first.type_name(), location)?;
    call_value(&implementation, args, location, traits)
}

/// Applies a callable `Value` to `args`, curried: an under-supply of
/// arguments returns a residual closure/builtin, an exact supply evaluates
/// the body, and an over-supply applies the result to the remaining
/// arguments (§4.9: "apply closures by extending their captured env with
/// fresh bindings").
pub fn call_value(func: &Value, args: &[Value], location: Location, traits: &Traits) -> Result<Value, RuntimeError> {
    match func {
        Value::TraitFunction(name) => dispatch_trait_function(name, args, location, traits),
        Value::Closure(c) => call_closure(c, args, location, traits),
        Value::Builtin(b) => call_builtin(b, args, location, traits),
        other => Err(RuntimeError::NotAFunction {
            found: other.type_name(),
            location,
        }),
    }
}

fn call_closure(c: &Rc<Closure>, args: &[Value], location: Location, traits: &Traits) -> Result<Value, RuntimeError> {
    use std::cmp::Ordering;
    match args.len().cmp(&c.params.len()) {
        Ordering::Less => {
            let call_env = c.captured_env.child();
            for (p, a) in c.params.iter().zip(args) {
                call_env.define(p.name.clone(), a.clone());
            }
            let remaining = c.params[args.len()..].to_vec();
            Ok(Value::Closure(Rc::new(Closure {
                params: remaining,
                body: c.body.clone(),
                captured_env: call_env,
            })))
        }
        Ordering::Equal => {
            let call_env = c.captured_env.child();
            for (p, a) in c.params.iter().zip(args) {
                call_env.define(p.name.clone(), a.clone());
            }
            evaluate_expr(&c.body, &call_env, traits)
        }
        Ordering::Greater => {
            let (now, rest) = args.split_at(c.params.len());
            let result = call_closure(c, now, location, traits)?;
            call_value(&result, rest, location, traits)
        }
    }
}

fn call_builtin(b: &Rc<BuiltinFn>, args: &[Value], location: Location, traits: &Traits) -> Result<Value, RuntimeError> {
    use std::cmp::Ordering;
    match args.len().cmp(&b.arity) {
        Ordering::Less => {
            let captured: Vec<Value> = args.to_vec();
            let remaining = b.arity - args.len();
            let name = b.name.clone();
            let inner = Rc::clone(b);
            Ok(Value::Builtin(Rc::new(BuiltinFn {
                name,
                arity: remaining,
                func: Box::new(move |more: &[Value], traits: &Traits, loc: Location| {
                    let mut all = captured.clone();
                    all.extend_from_slice(more);
                    (inner.func)(&all, traits, loc)
                }),
            })))
        }
        Ordering::Equal => (b.func)(args, traits, location),
        Ordering::Greater => {
            let (now, rest) = args.split_at(b.arity);
            let result = (b.func)(now, traits, location)?;
            call_value(&result, rest, location, traits)
        }
    }
}

fn evaluate_binary(op: BinOp, left: &Expr, right: &Expr, loc: Location, env: &Env, traits: &Traits) -> Result<Value, RuntimeError> {
    match op {
        BinOp::Sequence => {
            evaluate_expr(left, env, traits)?;
            evaluate_expr(right, env, traits)
        }
        BinOp::Thrush => {
            let l = evaluate_expr(left, env, traits)?;
            let r = evaluate_expr(right, env, traits)?;
            call_value(&r, &[l], loc, traits)
        }
        BinOp::Dollar => {
            let f = evaluate_expr(left, env, traits)?;
            let a = evaluate_expr(right, env, traits)?;
            call_value(&f, &[a], loc, traits)
        }
        BinOp::SafeThrush => {
            let l = evaluate_expr(left, env, traits)?;
            match &l {
                Value::Constructor(_, inner) if inner.is_empty() => Ok(l.clone()),
                Value::Constructor(name, inner) if inner.len() == 1 => {
                    let r = evaluate_expr(right, env, traits)?;
                    let mapped = call_value(&r, &[inner[0].clone()], loc, traits)?;
                    Ok(Value::Constructor(name.clone(), vec![mapped]))
                }
                _ => {
                    let r = evaluate_expr(right, env, traits)?;
                    call_value(&r, &[l], loc, traits)
                }
            }
        }
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
            let l = evaluate_expr(left, env, traits)?;
            let r = evaluate_expr(right, env, traits)?;
            arithmetic(op, l, r, loc)
        }
        BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
            let l = evaluate_expr(left, env, traits)?;
            let r = evaluate_expr(right, env, traits)?;
            compare(op, &l, &r, loc)
        }
        BinOp::Eq => {
            let l = evaluate_expr(left, env, traits)?;
            let r = evaluate_expr(right, env, traits)?;
            Ok(Value::bool(values_equal(&l, &r)))
        }
        BinOp::Ne => {
            let l = evaluate_expr(left, env, traits)?;
            let r = evaluate_expr(right, env, traits)?;
            Ok(Value::bool(!values_equal(&l, &r)))
        }
    }
}

fn arithmetic(op: BinOp, l: Value, r: Value, loc: Location) -> Result<Value, RuntimeError> {
    if op == BinOp::Add {
        if let (Value::String(a), Value::String(b)) = (&l, &r) {
            return Ok(Value::String(format!("{a}{b}")));
        }
    }
    let (a, b) = (number_operand(&l, loc)?, number_operand(&r, loc)?);
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        BinOp::Mod => a % b,
        _ => unreachable!("non-arithmetic op routed to arithmetic()"),
    };
    Ok(Value::Number(result))
}

fn number_operand(v: &Value, loc: Location) -> Result<f64, RuntimeError> {
    match v {
        Value::Number(n) => Ok(*n),
        other => Err(RuntimeError::NotAFunction {
            found: other.type_name(),
            location: loc,
        }),
    }
}

fn compare(op: BinOp, l: &Value, r: &Value, loc: Location) -> Result<Value, RuntimeError> {
    let ordering = match (l, r) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => a.partial_cmp(b),
        _ => {
            return Err(RuntimeError::NotAFunction {
                found: l.type_name(),
                location: loc,
            })
        }
    };
    let ordering = ordering.ok_or(RuntimeError::NotAFunction {
        found: l.type_name(),
        location: loc,
    })?;
    let result = match op {
        BinOp::Lt => ordering.is_lt(),
        BinOp::Gt => ordering.is_gt(),
        BinOp::Le => ordering.is_le(),
        BinOp::Ge => ordering.is_ge(),
        _ => unreachable!("non-comparison op routed to compare()"),
    };
    Ok(Value::bool(result))
}

/// Structural equality (§6 `==`/`!=`). Functions are never equal to one
/// another except by identity, matching that they carry no `Eq`-style
/// trait obligation in the stdlib.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Unit, Value::Unit) => true,
        (Value::Constructor(n1, a1), Value::Constructor(n2, a2)) => {
            n1 == n2 && a1.len() == a2.len() && a1.iter().zip(a2).all(|(x, y)| values_equal(x, y))
        }
        (Value::List(xs), Value::List(ys)) => xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y)),
        (Value::Tuple(xs), Value::Tuple(ys)) => xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y)),
        (Value::Record(xs), Value::Record(ys)) => {
            xs.len() == ys.len() && xs.iter().all(|(k, v)| ys.get(k).is_some_and(|w| values_equal(v, w)))
        }
        (Value::Closure(x), Value::Closure(y)) => Rc::ptr_eq(x, y),
        (Value::Builtin(x), Value::Builtin(y)) => Rc::ptr_eq(x, y),
        (Value::TraitFunction(x), Value::TraitFunction(y)) => x == y,
        _ => false,
    }
}

fn evaluate_pipeline(steps: &[Expr], operators: &[PipeOp], env: &Env, traits: &Traits) -> Result<Value, RuntimeError> {
    let mut steps_iter = steps.iter();
    let first = steps_iter.next().expect("a pipeline has at least one step");
    let mut acc = evaluate_expr(first, env, traits)?;
    for (op, step) in operators.iter().zip(steps_iter) {
        let next = evaluate_expr(step, env, traits)?;
        acc = match op {
            PipeOp::Forward => call_value(&next, &[acc], step.location, traits)?,
            PipeOp::Backward => call_value(&acc, &[next], step.location, traits)?,
        };
    }
    Ok(acc)
}

fn evaluate_match(value: &Value, cases: &[MatchCase], env: &Env, traits: &Traits, loc: Location) -> Result<Value, RuntimeError> {
    for case in cases {
        let scope = env.child();
        if match_pattern(&case.pattern, value, &scope) {
            return evaluate_expr(&case.body, &scope, traits);
        }
    }
    Err(RuntimeError::NonExhaustiveMatch {
        scrutinee: value.type_name(),
        location: loc,
    })
}

/// Matches `value` against `pattern`, binding any pattern variables into
/// `scope` as a side effect. Returns whether the match succeeded; a failed
/// match may have partially bound `scope`, which is fine because callers
/// discard `scope` on failure (§4.9: "the first matching pattern binds its
/// variables").
fn match_pattern(pattern: &Pattern, value: &Value, scope: &Env) -> bool {
    match (&pattern.kind, value) {
        (PatternKind::Wildcard, _) => true,
        (PatternKind::Variable(name), v) => {
            scope.define(name.clone(), v.clone());
            true
        }
        (PatternKind::Number(n), Value::Number(v)) => n == v,
        (PatternKind::Str(s), Value::String(v)) => s == v,
        (PatternKind::Constructor(name, subpatterns), Value::Constructor(ctor_name, args)) => {
            name == ctor_name
                && subpatterns.len() == args.len()
                && subpatterns.iter().zip(args).all(|(p, a)| match_pattern(p, a, scope))
        }
        (PatternKind::Tuple(subpatterns), Value::Tuple(items)) => {
            subpatterns.len() == items.len() && subpatterns.iter().zip(items).all(|(p, v)| match_pattern(p, v, scope))
        }
        (PatternKind::Record(fields), Value::Record(map)) => fields.iter().all(|(field, p)| match map.get(field) {
            Some(v) => match_pattern(p, v, scope),
            None => false,
        }),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noo_parser::parse_source;

    fn eval_src(src: &str) -> Result<Value, RuntimeError> {
        let program = parse_source(src).expect("parse succeeds");
        let env = Env::new();
        crate::builtins::initialize_builtins(&env);
        let traits = Traits::new();
        evaluate_program(&program, &env, &traits)
    }

    #[test]
    fn scenario_1_arithmetic() {
        let v = eval_src("1 + 2").unwrap();
        assert!(matches!(v, Value::Number(n) if n == 3.0));
    }

    #[test]
    fn scenario_2_string_concat() {
        let v = eval_src("\"hello\" + \" world\"").unwrap();
        assert!(matches!(v, Value::String(s) if s == "hello world"));
    }

    #[test]
    fn scenario_4_let_polymorphism_value() {
        let v = eval_src("id = fn x => x; id \"hi\"").unwrap();
        assert!(matches!(v, Value::String(s) if s == "hi"));
    }

    #[test]
    fn scenario_5_map_over_list() {
        let v = eval_src("map (fn x => x + 1) [1, 2, 3]").unwrap();
        match v {
            Value::List(items) => {
                let nums: Vec<f64> = items
                    .into_iter()
                    .map(|i| match i {
                        Value::Number(n) => n,
                        _ => panic!("expected Number"),
                    })
                    .collect();
                assert_eq!(nums, vec![2.0, 3.0, 4.0]);
            }
            other => panic!("expected List, got {other}"),
        }
    }

    #[test]
    fn scenario_6_trait_constraint_collapse() {
        let v = eval_src(
            "constraint Show a (show : a -> String); implement Show Float (show = toString); show 42",
        )
        .unwrap();
        assert!(matches!(v, Value::String(s) if s == "42"));
    }

    #[test]
    fn scenario_7_ambiguous_trait_call_is_a_runtime_error() {
        let err = eval_src(
            "constraint P a (d : a -> String); constraint R a (d : a -> String); implement P Float (d = toString); implement R Float (d = toString); d 42",
        )
        .unwrap_err();
        assert!(matches!(err, RuntimeError::Ambiguous { .. }));
    }

    #[test]
    fn scenario_8_match_on_option() {
        let v = eval_src(
            "variant Option a = Some a | None; match Some 1 with (Some x => x + 1; None => 0)",
        )
        .unwrap();
        assert!(matches!(v, Value::Number(n) if n == 2.0));
    }

    #[test]
    fn scenario_9_accessor_application() {
        let v = eval_src("(fn obj => @name obj) {@name \"Alice\"}").unwrap();
        assert!(matches!(v, Value::String(s) if s == "Alice"));
    }

    #[test]
    fn scenario_10_safe_thrush_on_some_and_none() {
        let some = eval_src("variant Option a = Some a | None; Ok 5 |? (fn x => x * 2)")
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(&some, Value::Constructor(name, args) if name == "Ok" && matches!(args[0], Value::Number(n) if n == 10.0)));

        let none = eval_src("variant Option a = Some a | None; None |? (fn x => x * 2)").unwrap();
        assert!(matches!(none, Value::Constructor(name, args) if name == "None" && args.is_empty()));
    }

    #[test]
    fn if_branches_on_constructors() {
        let v = eval_src("if True then 1 else 2").unwrap();
        assert!(matches!(v, Value::Number(n) if n == 1.0));
    }

    #[test]
    fn where_binds_sequential_defs() {
        let v = eval_src("x + 1 where (x = 41)").unwrap();
        assert!(matches!(v, Value::Number(n) if n == 42.0));
    }

    #[test]
    fn mutation_is_visible_after_update() {
        let v = eval_src("mut counter = 0; mut! counter = counter + 1; counter").unwrap();
        assert!(matches!(v, Value::Number(n) if n == 1.0));
    }

    #[test]
    fn accessor_safe_access_on_missing_field_is_none() {
        let v = eval_src("@missing? {@name \"Alice\"}").unwrap();
        assert!(matches!(v, Value::Constructor(name, args) if name == "None" && args.is_empty()));
    }

    #[test]
    fn non_exhaustive_match_is_a_runtime_error() {
        let err = eval_src("match 1 with (2 => 0)").unwrap_err();
        assert!(matches!(err, RuntimeError::NonExhaustiveMatch { .. }));
    }
}
