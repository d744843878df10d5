//! Tagged runtime values (§3.4), grounded in
//! `examples/other_examples/85ea6333_cpond8-sutra__src-runtime.rs.rs`'s
//! `Value` enum shape (a `Lambda` variant carrying `params`/`body`/
//! `captured_env`, a `type_name` helper used for dispatch).

use std::fmt;
use std::rc::Rc;

use noo_ast::{Expr, Param};
use noo_common::Location;

use crate::env::Env;
use crate::traits::Traits;

/// A Noolang runtime value. `Closure` captures its defining environment by
/// `Rc` so closing over a `where`-scope is cheap to clone into every call.
#[derive(Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Constructor(String, Vec<Value>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Record(std::collections::BTreeMap<String, Value>),
    Closure(Rc<Closure>),
    Builtin(Rc<BuiltinFn>),
    /// A bare reference to a trait function (`show`, `map` from a user
    /// `constraint`) passed around as a value before it has an argument to
    /// dispatch on, e.g. `xs |> map show`. Resolved against the first
    /// argument's runtime type at the point it is finally applied.
    TraitFunction(String),
    Unit,
}

pub struct Closure {
    pub params: Vec<Param>,
    pub body: Expr,
    pub captured_env: Env,
}

/// A native combinator (`compose`, `map`, `filter`, `reduce`, `toString`,
/// field accessors, variant constructors). Takes the already-evaluated
/// argument list plus the ambient `Traits` table and a call-site
/// `Location`, so combinators that apply a user-supplied function
/// internally (`map`'s callback, `compose`'s two functions) can call back
/// into `call_value` for trait dispatch and located errors the same way
/// the evaluator's own `Application` handling does.
pub struct BuiltinFn {
    pub name: String,
    pub arity: usize,
    pub func: Box<dyn Fn(&[Value], &Traits, Location) -> Result<Value, crate::error::RuntimeError>>,
}

impl Value {
    pub fn bool(b: bool) -> Value {
        if b {
            Value::Constructor("True".to_string(), Vec::new())
        } else {
            Value::Constructor("False".to_string(), Vec::new())
        }
    }

    pub fn is_truthy(&self) -> bool {
        matches!(self, Value::Constructor(name, _) if name == "True")
    }

    /// `getTypeName` applied to a runtime value (§4.7/§4.9): the key trait
    /// dispatch looks implementations up by.
    pub fn type_name(&self) -> String {
        match self {
            Value::Number(_) => "Float".to_string(),
            Value::String(_) => "String".to_string(),
            Value::Constructor(name, _) => name.clone(),
            Value::List(_) => "List".to_string(),
            Value::Tuple(_) => "Tuple".to_string(),
            Value::Record(_) => "Record".to_string(),
            Value::Closure(_) | Value::Builtin(_) | Value::TraitFunction(_) => "Function".to_string(),
            Value::Unit => "Unit".to_string(),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Constructor(name, args) if args.is_empty() => write!(f, "{name}"),
            Value::Constructor(name, args) => {
                write!(f, "{name}")?;
                for a in args {
                    write!(f, " {a}")?;
                }
                Ok(())
            }
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Tuple(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
            Value::Record(fields) => {
                write!(f, "{{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "@{k} {v}")?;
                }
                write!(f, "}}")
            }
            Value::Closure(_) => write!(f, "<closure>"),
            Value::Builtin(b) => write!(f, "<builtin {}>", b.name),
            Value::TraitFunction(name) => write!(f, "<trait fn {name}>"),
            Value::Unit => write!(f, "{{}}"),
        }
    }
}
