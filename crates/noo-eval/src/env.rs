//! Persistent, linked environment (§3.6: "Evaluator environments are
//! immutable persistent maps; mutable definitions use a cell whose scoped
//! lifetime equals the enclosing `where` or top-level sequence").
//!
//! Grounded in `noo-typeck::env::TypeEnv`'s scope-stack shape, reworked
//! from an owned `Vec<scope>` into an `Rc`-linked chain so a `Closure`
//! can capture "the environment at this point" cheaply (clone of an
//! `Rc`) without copying every enclosing scope's bindings, matching
//! `examples/other_examples/85ea6333_cpond8-sutra__src-runtime.rs.rs`'s
//! `Lambda.captured_env` capture-at-creation idea.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::RuntimeError;
use crate::value::Value;

enum Slot {
    Immutable(Value),
    Mutable(RefCell<Value>),
}

struct Scope {
    parent: Option<Env>,
    bindings: RefCell<FxHashMap<String, Slot>>,
}

/// Cheap to clone: an `Rc` handle to a scope, which itself may chain to a
/// parent scope.
#[derive(Clone)]
pub struct Env(Rc<Scope>);

impl Env {
    pub fn new() -> Self {
        Env(Rc::new(Scope {
            parent: None,
            bindings: RefCell::new(FxHashMap::default()),
        }))
    }

    pub fn child(&self) -> Self {
        Env(Rc::new(Scope {
            parent: Some(self.clone()),
            bindings: RefCell::new(FxHashMap::default()),
        }))
    }

    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0
            .bindings
            .borrow_mut()
            .insert(name.into(), Slot::Immutable(value));
    }

    pub fn define_mutable(&self, name: impl Into<String>, value: Value) {
        self.0
            .bindings
            .borrow_mut()
            .insert(name.into(), Slot::Mutable(RefCell::new(value)));
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut current = self.clone();
        loop {
            if let Some(slot) = current.0.bindings.borrow().get(name) {
                return Some(match slot {
                    Slot::Immutable(v) => v.clone(),
                    Slot::Mutable(cell) => cell.borrow().clone(),
                });
            }
            match current.0.parent.clone() {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// `mut! name = value` (§4.9): `name` must already be bound to a
    /// mutable slot somewhere in the chain.
    pub fn mutate(&self, name: &str, value: Value, location: noo_common::Location) -> Result<(), RuntimeError> {
        let mut current = self.clone();
        loop {
            if let Some(slot) = current.0.bindings.borrow().get(name) {
                return match slot {
                    Slot::Mutable(cell) => {
                        *cell.borrow_mut() = value;
                        Ok(())
                    }
                    Slot::Immutable(_) => Err(RuntimeError::NotMutable {
                        name: name.to_string(),
                        location,
                    }),
                };
            }
            match current.0.parent.clone() {
                Some(parent) => current = parent,
                None => {
                    return Err(RuntimeError::UndefinedVariable {
                        name: name.to_string(),
                        location,
                    })
                }
            }
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_scope_shadows_outer() {
        let root = Env::new();
        root.define("x", Value::Number(1.0));
        let child = root.child();
        child.define("x", Value::Number(2.0));
        assert!(matches!(child.lookup("x"), Some(Value::Number(n)) if n == 2.0));
        assert!(matches!(root.lookup("x"), Some(Value::Number(n)) if n == 1.0));
    }

    #[test]
    fn child_sees_parent_bindings() {
        let root = Env::new();
        root.define("y", Value::Number(1.0));
        let child = root.child();
        assert!(matches!(child.lookup("y"), Some(Value::Number(n)) if n == 1.0));
    }

    #[test]
    fn mutation_updates_in_place_and_is_visible_to_children() {
        let root = Env::new();
        root.define_mutable("counter", Value::Number(0.0));
        let child = root.child();
        root.mutate("counter", Value::Number(5.0), noo_common::Location::synthetic())
            .unwrap();
        assert!(matches!(child.lookup("counter"), Some(Value::Number(n)) if n == 5.0));
    }

    #[test]
    fn mutating_immutable_binding_is_an_error() {
        let root = Env::new();
        root.define("z", Value::Number(0.0));
        let err = root
            .mutate("z", Value::Number(1.0), noo_common::Location::synthetic())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::NotMutable { .. }));
    }
}
