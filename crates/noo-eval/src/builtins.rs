//! Native combinators and boolean constants mirroring the names
//! `noo_typeck::builtins::initialize_builtins` seeds into the type
//! environment (`True`, `False`, `compose`, `map`, `filter`, `reduce`,
//! `toString`), bound here to real runtime behaviour instead of type
//! schemes. Installed into the root `Env` before any user or stdlib
//! source runs, the runtime half of §4.8/§9's bootstrap.

use std::rc::Rc;

use crate::env::Env;
use crate::error::RuntimeError;
use crate::evaluator::call_value;
use crate::value::{BuiltinFn, Value};

pub fn initialize_builtins(env: &Env) {
    env.define("True", Value::bool(true));
    env.define("False", Value::bool(false));

    env.define("compose", Value::Builtin(Rc::new(BuiltinFn {
        name: "compose".to_string(),
        arity: 3,
        func: Box::new(|args, traits, loc| {
            let inner = call_value(&args[1], &[args[2].clone()], loc, traits)?;
            call_value(&args[0], &[inner], loc, traits)
        }),
    })));

    env.define("map", Value::Builtin(Rc::new(BuiltinFn {
        name: "map".to_string(),
        arity: 2,
        func: Box::new(|args, traits, loc| {
            let f = &args[0];
            let list = as_list(&args[1], loc)?;
            let mapped = list
                .iter()
                .map(|v| call_value(f, &[v.clone()], loc, traits))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(mapped))
        }),
    })));

    env.define("filter", Value::Builtin(Rc::new(BuiltinFn {
        name: "filter".to_string(),
        arity: 2,
        func: Box::new(|args, traits, loc| {
            let f = &args[0];
            let list = as_list(&args[1], loc)?;
            let mut kept = Vec::new();
            for v in list {
                if call_value(f, &[v.clone()], loc, traits)?.is_truthy() {
                    kept.push(v.clone());
                }
            }
            Ok(Value::List(kept))
        }),
    })));

    env.define("reduce", Value::Builtin(Rc::new(BuiltinFn {
        name: "reduce".to_string(),
        arity: 3,
        func: Box::new(|args, traits, loc| {
            let f = &args[0];
            let list = as_list(&args[2], loc)?;
            let mut acc = args[1].clone();
            for v in list {
                acc = call_value(f, &[acc, v.clone()], loc, traits)?;
            }
            Ok(acc)
        }),
    })));

    env.define("toString", Value::Builtin(Rc::new(BuiltinFn {
        name: "toString".to_string(),
        arity: 1,
        func: Box::new(|args, _traits, _loc| Ok(Value::String(display_value(&args[0])))),
    })));
}

fn as_list(v: &Value, location: noo_common::Location) -> Result<&Vec<Value>, RuntimeError> {
    match v {
        Value::List(items) => Ok(items),
        other => Err(RuntimeError::NotAFunction {
            found: other.type_name(),
            location,
        }),
    }
}

/// `toString`'s rendering: unquoted for strings (unlike `Value`'s own
/// `Display`, which quotes them for debug-style printing of aggregates).
fn display_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Traits;

    #[test]
    fn installs_expected_names() {
        let env = Env::new();
        initialize_builtins(&env);
        for name in ["True", "False", "compose", "map", "filter", "reduce", "toString"] {
            assert!(env.lookup(name).is_some(), "missing builtin {name}");
        }
    }

    #[test]
    fn map_applies_function_elementwise() {
        let env = Env::new();
        initialize_builtins(&env);
        let traits = Traits::new();
        let f = env.lookup("map").unwrap();
        let double = Value::Builtin(Rc::new(BuiltinFn {
            name: "double".to_string(),
            arity: 1,
            func: Box::new(|args, _t, _l| match &args[0] {
                Value::Number(n) => Ok(Value::Number(n * 2.0)),
                other => Ok(other.clone()),
            }),
        }));
        let list = Value::List(vec![Value::Number(1.0), Value::Number(2.0)]);
        let result = call_value(&f, &[double, list], noo_common::Location::synthetic(), &traits).unwrap();
        match result {
            Value::List(items) => assert!(matches!(items[0], Value::Number(n) if n == 2.0)),
            other => panic!("expected List, got {other}"),
        }
    }

    #[test]
    fn to_string_renders_numbers_and_strings() {
        let env = Env::new();
        initialize_builtins(&env);
        let traits = Traits::new();
        let f = env.lookup("toString").unwrap();
        let rendered = call_value(&f, &[Value::Number(42.0)], noo_common::Location::synthetic(), &traits).unwrap();
        assert!(matches!(rendered, Value::String(s) if s == "42"));
    }
}
