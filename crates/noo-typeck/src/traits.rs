//! Trait registry (C7, §4.7).
//!
//! Grounded in `mesh-typeck::traits`'s `TraitDef`/`ImplDef`/`TraitRegistry`
//! shape and its `find_method_traits` ambiguity check, reworked from the
//! teacher's structural-unification impl lookup to the spec's
//! exact-type-name-keyed lookup (§5: "Trait implementations are searched
//! by exact type name — no subtype or coercion search is performed"). The
//! teacher's synthetic `impl Into<B> for A` auto-generation on `From`
//! registration has no counterpart here — Noolang has no `From`/`Into`.

use rustc_hash::{FxHashMap, FxHashSet};

use noo_ast::{Constraint, Expr, ExprKind, Type};
use noo_common::Location;

use crate::error::TraitError;

#[derive(Debug, Clone)]
pub struct TraitDefinition {
    pub name: String,
    pub type_param: String,
    /// funcName -> declared signature, with `type_param` left as a free
    /// variable (instantiated per implementation).
    pub functions: FxHashMap<String, Type>,
}

#[derive(Debug, Clone)]
pub struct TraitImplementation {
    pub type_name: String,
    pub functions: FxHashMap<String, Expr>,
    pub given: Option<Constraint>,
}

/// What `resolveTraitFunction` returns on success (§4.7).
#[derive(Debug, Clone)]
pub struct ResolvedTraitFunction {
    pub trait_name: String,
    pub type_name: String,
    pub value: Expr,
}

#[derive(Default)]
pub struct TraitRegistry {
    definitions: FxHashMap<String, TraitDefinition>,
    implementations: FxHashMap<String, FxHashMap<String, TraitImplementation>>,
    function_traits: FxHashMap<String, FxHashSet<String>>,
}

impl TraitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn definition(&self, trait_name: &str) -> Option<&TraitDefinition> {
        self.definitions.get(trait_name)
    }

    pub fn add_trait_definition(&mut self, def: TraitDefinition) {
        for func_name in def.functions.keys() {
            self.function_traits
                .entry(func_name.clone())
                .or_default()
                .insert(def.name.clone());
        }
        self.implementations
            .entry(def.name.clone())
            .or_insert_with(FxHashMap::default);
        self.definitions.insert(def.name.clone(), def);
    }

    /// Validates the implementation against its trait's declared
    /// functions, checking lambda-value arity (variable references cannot
    /// be validated structurally and are accepted as-is per §4.7), then
    /// registers it — or fails with `TraitError`.
    pub fn add_trait_implementation(
        &mut self,
        trait_name: &str,
        impl_def: TraitImplementation,
        location: Location,
    ) -> Result<(), TraitError> {
        let def = self
            .definitions
            .get(trait_name)
            .ok_or_else(|| TraitError::UndefinedTrait {
                trait_name: trait_name.to_string(),
                location,
            })?
            .clone();

        for (func_name, value) in &impl_def.functions {
            let sig = def.functions.get(func_name).ok_or_else(|| {
                TraitError::UndefinedTraitFunction {
                    trait_name: trait_name.to_string(),
                    func_name: func_name.clone(),
                    location,
                }
            })?;
            if let ExprKind::Function { params, .. } = &value.kind {
                let expected = match sig {
                    Type::Function { params, .. } => params.len(),
                    _ => 1,
                };
                if params.len() != expected {
                    return Err(TraitError::ArityMismatch {
                        trait_name: trait_name.to_string(),
                        func_name: func_name.clone(),
                        expected,
                        found: params.len(),
                        location,
                    });
                }
            }
        }

        let slot = self
            .implementations
            .entry(trait_name.to_string())
            .or_insert_with(FxHashMap::default);
        if slot.contains_key(&impl_def.type_name) {
            return Err(TraitError::DuplicateImplementation {
                trait_name: trait_name.to_string(),
                type_name: impl_def.type_name.clone(),
                location,
            });
        }
        slot.insert(impl_def.type_name.clone(), impl_def);
        Ok(())
    }

    pub fn is_trait_function(&self, name: &str) -> bool {
        self.function_traits.contains_key(name)
    }

    pub fn has_implementation(&self, trait_name: &str, type_name: &str) -> bool {
        self.implementations
            .get(trait_name)
            .map(|m| m.contains_key(type_name))
            .unwrap_or(false)
    }

    /// `resolveTraitFunction(name, argTypes)` (§4.7): the concrete type
    /// name comes from the first argument via `getTypeName`. Ambiguous
    /// when more than one trait declaring `name` has an implementation
    /// for `type_name` — this is the "conflicting functions" safety
    /// property (§8-P6).
    pub fn resolve_trait_function(
        &self,
        name: &str,
        type_name: &str,
        location: Location,
    ) -> Result<ResolvedTraitFunction, TraitError> {
        let traits = self
            .function_traits
            .get(name)
            .cloned()
            .unwrap_or_default();

        let mut candidates: Vec<&str> = traits
            .iter()
            .filter(|t| self.has_implementation(t, type_name))
            .map(|t| t.as_str())
            .collect();
        candidates.sort();

        if candidates.len() > 1 {
            return Err(TraitError::Ambiguous {
                func_name: name.to_string(),
                type_name: type_name.to_string(),
                traits: candidates.into_iter().map(str::to_string).collect(),
                location,
            });
        }
        let trait_name = candidates.into_iter().next().ok_or_else(|| TraitError::NoImplementation {
            trait_name: traits.iter().next().cloned().unwrap_or_else(|| name.to_string()),
            type_name: type_name.to_string(),
            location,
        })?;
        let value = self.implementations[trait_name][type_name]
            .functions
            .get(name)
            .cloned()
            .expect("candidate implementation contains the function by construction");
        Ok(ResolvedTraitFunction {
            trait_name: trait_name.to_string(),
            type_name: type_name.to_string(),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noo_common::Location;

    fn loc() -> Location {
        Location::synthetic()
    }

    fn lambda(params: usize) -> Expr {
        Expr::new(
            ExprKind::Function {
                params: (0..params)
                    .map(|i| noo_ast::Param {
                        name: format!("p{i}"),
                        location: loc(),
                    })
                    .collect(),
                body: Box::new(Expr::new(ExprKind::Str("x".into()), loc())),
                annotation: None,
            },
            loc(),
        )
    }

    fn show_def() -> TraitDefinition {
        let mut functions = FxHashMap::default();
        functions.insert(
            "show".to_string(),
            Type::function(vec![Type::variable("a")], Type::string(), noo_ast::EffectSet::new()),
        );
        TraitDefinition {
            name: "Show".into(),
            type_param: "a".into(),
            functions,
        }
    }

    #[test]
    fn registers_and_resolves_single_implementation() {
        let mut reg = TraitRegistry::new();
        reg.add_trait_definition(show_def());
        let mut functions = FxHashMap::default();
        functions.insert("show".to_string(), lambda(1));
        reg.add_trait_implementation(
            "Show",
            TraitImplementation {
                type_name: "Float".into(),
                functions,
                given: None,
            },
            loc(),
        )
        .unwrap();
        let resolved = reg.resolve_trait_function("show", "Float", loc()).unwrap();
        assert_eq!(resolved.trait_name, "Show");
    }

    #[test]
    fn duplicate_implementation_rejected() {
        let mut reg = TraitRegistry::new();
        reg.add_trait_definition(show_def());
        let mut functions = FxHashMap::default();
        functions.insert("show".to_string(), lambda(1));
        reg.add_trait_implementation(
            "Show",
            TraitImplementation {
                type_name: "Float".into(),
                functions: functions.clone(),
                given: None,
            },
            loc(),
        )
        .unwrap();
        let err = reg
            .add_trait_implementation(
                "Show",
                TraitImplementation {
                    type_name: "Float".into(),
                    functions,
                    given: None,
                },
                loc(),
            )
            .unwrap_err();
        assert!(matches!(err, TraitError::DuplicateImplementation { .. }));
    }

    #[test]
    fn ambiguous_when_two_traits_implement_same_function_for_same_type() {
        let mut reg = TraitRegistry::new();
        let mut p = show_def();
        p.name = "P".into();
        let mut r = show_def();
        r.name = "R".into();
        reg.add_trait_definition(p);
        reg.add_trait_definition(r);
        let mut functions = FxHashMap::default();
        functions.insert("show".to_string(), lambda(1));
        reg.add_trait_implementation(
            "P",
            TraitImplementation {
                type_name: "Float".into(),
                functions: functions.clone(),
                given: None,
            },
            loc(),
        )
        .unwrap();
        reg.add_trait_implementation(
            "R",
            TraitImplementation {
                type_name: "Float".into(),
                functions,
                given: None,
            },
            loc(),
        )
        .unwrap();
        let err = reg.resolve_trait_function("show", "Float", loc()).unwrap_err();
        assert!(matches!(err, TraitError::Ambiguous { .. }));
    }

    #[test]
    fn disjoint_types_do_not_conflict() {
        let mut reg = TraitRegistry::new();
        let mut p = show_def();
        p.name = "P".into();
        let mut r = show_def();
        r.name = "R".into();
        reg.add_trait_definition(p);
        reg.add_trait_definition(r);
        let mut functions = FxHashMap::default();
        functions.insert("show".to_string(), lambda(1));
        reg.add_trait_implementation(
            "P",
            TraitImplementation {
                type_name: "Float".into(),
                functions: functions.clone(),
                given: None,
            },
            loc(),
        )
        .unwrap();
        reg.add_trait_implementation(
            "R",
            TraitImplementation {
                type_name: "String".into(),
                functions,
                given: None,
            },
            loc(),
        )
        .unwrap();
        assert!(reg.resolve_trait_function("show", "Float", loc()).is_ok());
        assert!(reg.resolve_trait_function("show", "String", loc()).is_ok());
    }

    #[test]
    fn arity_mismatch_rejected() {
        let mut reg = TraitRegistry::new();
        reg.add_trait_definition(show_def());
        let mut functions = FxHashMap::default();
        functions.insert("show".to_string(), lambda(2));
        let err = reg
            .add_trait_implementation(
                "Show",
                TraitImplementation {
                    type_name: "Float".into(),
                    functions,
                    given: None,
                },
                loc(),
            )
            .unwrap_err();
        assert!(matches!(err, TraitError::ArityMismatch { .. }));
    }
}
