//! Runtime trait table (§4.7, §4.9, §9: "the evaluator borrows [the
//! registry] read-mostly... passed by shared reference to the evaluator").
//!
//! Mirrors `noo_typeck::traits::TraitRegistry`'s shape — `function_traits`
//! reverse index plus a `(trait, type) -> implementation` map — but keyed
//! and valued for the runtime: implementations are evaluated `Value`s
//! (closures), not AST expressions, and lookup happens by a value's
//! `type_name()` rather than an inferred `Type`. The inferencer already
//! rejects ambiguous/undefined trait calls before the evaluator ever runs,
//! so `resolve` here is a defensive re-check rather than the primary guard.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use noo_common::Location;

use crate::error::RuntimeError;
use crate::value::Value;

#[derive(Default)]
struct Table {
    // trait_name -> type_name -> func_name -> value
    implementations: FxHashMap<String, FxHashMap<String, FxHashMap<String, Value>>>,
    function_traits: FxHashMap<String, FxHashSet<String>>,
}

/// Cheap to clone: an `Rc<RefCell<_>>` handle shared by every scope's
/// evaluation, the same way `Env` shares its bindings.
#[derive(Clone, Default)]
pub struct Traits(Rc<RefCell<Table>>);

impl Traits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_trait(&self, trait_name: &str, function_names: &[String]) {
        let mut table = self.0.borrow_mut();
        table
            .implementations
            .entry(trait_name.to_string())
            .or_default();
        for func_name in function_names {
            table
                .function_traits
                .entry(func_name.clone())
                .or_default()
                .insert(trait_name.to_string());
        }
    }

    pub fn register_implementation(
        &self,
        trait_name: &str,
        type_name: &str,
        func_name: &str,
        value: Value,
    ) {
        self.0
            .borrow_mut()
            .implementations
            .entry(trait_name.to_string())
            .or_default()
            .entry(type_name.to_string())
            .or_default()
            .insert(func_name.to_string(), value);
    }

    pub fn is_trait_function(&self, name: &str) -> bool {
        self.0.borrow().function_traits.contains_key(name)
    }

    fn has_implementation(&self, trait_name: &str, type_name: &str, func_name: &str) -> bool {
        self.0
            .borrow()
            .implementations
            .get(trait_name)
            .and_then(|m| m.get(type_name))
            .map(|fns| fns.contains_key(func_name))
            .unwrap_or(false)
    }

    /// `resolveTraitFunction(name, typeName)` at runtime: dispatch by the
    /// first argument's concrete `type_name()`, the same index the
    /// typechecker's `function_traits` map maintains.
    pub fn resolve(&self, func_name: &str, type_name: &str, location: Location) -> Result<Value, RuntimeError> {
        let table = self.0.borrow();
        let traits = table.function_traits.get(func_name).cloned().unwrap_or_default();
        drop(table);

        let mut candidates: Vec<&str> = traits
            .iter()
            .filter(|t| self.has_implementation(t, type_name, func_name))
            .map(|t| t.as_str())
            .collect();
        candidates.sort();

        if candidates.len() > 1 {
            return Err(RuntimeError::Ambiguous {
                func_name: func_name.to_string(),
                type_name: type_name.to_string(),
                traits: candidates.into_iter().map(str::to_string).collect(),
                location,
            });
        }
        let trait_name = candidates.into_iter().next().ok_or_else(|| RuntimeError::NoImplementation {
            trait_name: traits.iter().next().cloned().unwrap_or_else(|| func_name.to_string()),
            type_name: type_name.to_string(),
            location,
        })?;
        let table = self.0.borrow();
        Ok(table.implementations[trait_name][type_name][func_name].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> Location {
        Location::synthetic()
    }

    #[test]
    fn resolves_single_implementation() {
        let traits = Traits::new();
        traits.register_trait("Show", &["show".to_string()]);
        traits.register_implementation("Show", "Float", "show", Value::String("x".into()));
        let v = traits.resolve("show", "Float", loc()).unwrap();
        assert!(matches!(v, Value::String(s) if s == "x"));
    }

    #[test]
    fn ambiguous_when_two_traits_implement_same_function_for_same_type() {
        let traits = Traits::new();
        traits.register_trait("P", &["d".to_string()]);
        traits.register_trait("R", &["d".to_string()]);
        traits.register_implementation("P", "Float", "d", Value::String("p".into()));
        traits.register_implementation("R", "Float", "d", Value::String("r".into()));
        let err = traits.resolve("d", "Float", loc()).unwrap_err();
        assert!(matches!(err, RuntimeError::Ambiguous { .. }));
    }

    #[test]
    fn missing_implementation_is_an_error() {
        let traits = Traits::new();
        traits.register_trait("Show", &["show".to_string()]);
        let err = traits.resolve("show", "Bool", loc()).unwrap_err();
        assert!(matches!(err, RuntimeError::NoImplementation { .. }));
    }
}
