//! Unifier (C6, §4.6).
//!
//! Grounded in `mesh-typeck::unify::InferCtx`'s overall shape (`resolve`
//! before comparing, occurs check, per-variant structural cases) but
//! backed by a plain substitution map instead of `ena` (see `subst.rs`
//! and DESIGN.md).

use noo_ast::{constraints_equal, types_equal, Constraint, Type};
use noo_common::Location;

use crate::error::{InferError, TypeError, UnifyHint};
use crate::subst::{constraint_vars, free_vars, occurs_check, substitute, Substitution};
use crate::traits::TraitRegistry;

/// `unify(t1, t2, state[, loc, ctx]) -> state'` (§4.6): mutates `sub`
/// monotonically, discharging any constraints a newly bound variable
/// carried against the concrete type it's bound to.
pub fn unify(
    t1: &Type,
    t2: &Type,
    sub: &mut Substitution,
    registry: &TraitRegistry,
    location: Location,
    hint: Option<UnifyHint>,
) -> Result<(), InferError> {
    let r1 = substitute(t1, sub);
    let r2 = substitute(t2, sub);

    if types_equal(&r1, &r2) {
        return Ok(());
    }

    match (&r1, &r2) {
        (Type::Variable(v), _) => bind_var(&v.name, &r1, &r2, sub, registry, location, hint),
        (_, Type::Variable(v)) => bind_var(&v.name, &r2, &r1, sub, registry, location, hint),

        (Type::Constrained(b1, c1), Type::Constrained(b2, c2)) => {
            unify(b1, b2, sub, registry, location, hint)?;
            let base = substitute(b1, sub);
            for (key, constraints) in c1.iter().chain(c2.iter()) {
                for c in constraints {
                    if base.type_name().is_some() && !matches!(base, Type::Variable(_)) {
                        discharge_constraint(c, &base, sub, registry, location)?;
                    } else {
                        let _ = key;
                    }
                }
            }
            Ok(())
        }
        (Type::Constrained(base, constraints), other) | (other, Type::Constrained(base, constraints)) => {
            unify_constrained_with_concrete(base, constraints, other, sub, registry, location, hint)
        }

        (Type::Primitive(a), Type::Primitive(b)) => {
            if a == b {
                Ok(())
            } else {
                mismatch(&r1, &r2, hint, location)
            }
        }
        (Type::Unit, Type::Unit) => Ok(()),
        (Type::Unknown, _) | (_, Type::Unknown) => Ok(()),

        (Type::List(e1), Type::List(e2)) => unify(e1, e2, sub, registry, location, hint),

        (Type::Tuple(a), Type::Tuple(b)) => {
            if a.len() != b.len() {
                return Err(TypeError::ArityMismatch {
                    expected: a.len(),
                    found: b.len(),
                    location,
                }
                .into());
            }
            for (x, y) in a.iter().zip(b.iter()) {
                unify(x, y, sub, registry, location, hint)?;
            }
            Ok(())
        }

        (Type::Record(a), Type::Record(b)) => {
            for (key, ty) in a {
                match b.get(key) {
                    Some(other_ty) => unify(ty, other_ty, sub, registry, location, hint)?,
                    None => {
                        return Err(TypeError::MissingField {
                            field: key.clone(),
                            record: r2.clone(),
                            location,
                        }
                        .into())
                    }
                }
            }
            Ok(())
        }

        (Type::Variant(n1, a1), Type::Variant(n2, a2)) => {
            if n1 != n2 || a1.len() != a2.len() {
                return mismatch(&r1, &r2, hint, location);
            }
            for (x, y) in a1.iter().zip(a2.iter()) {
                unify(x, y, sub, registry, location, hint)?;
            }
            Ok(())
        }

        (
            Type::Function {
                params: p1,
                ret: ret1,
                constraints: c1,
                ..
            },
            Type::Function {
                params: p2,
                ret: ret2,
                constraints: c2,
                ..
            },
        ) => {
            if p1.len() != p2.len() {
                return Err(TypeError::ArityMismatch {
                    expected: p1.len(),
                    found: p2.len(),
                    location,
                }
                .into());
            }
            propagate_fn_constraints(c1, p1, ret1);
            propagate_fn_constraints(c2, p2, ret2);
            for (x, y) in p1.iter().zip(p2.iter()) {
                unify(x, y, sub, registry, location, Some(UnifyHint::FunctionApplication))?;
            }
            unify(ret1, ret2, sub, registry, location, hint)
        }

        _ => mismatch(&r1, &r2, hint, location),
    }
}

fn mismatch(expected: &Type, found: &Type, hint: Option<UnifyHint>, location: Location) -> Result<(), InferError> {
    Err(TypeError::Mismatch {
        expected: expected.clone(),
        found: found.clone(),
        hint,
        location,
    }
    .into())
}

/// Pushes a function type's own declared `given` constraints onto the
/// bags of its parameter/return variables that share the constraint's
/// name, so ordinary variable-binding discharge (in `bind_var`) picks
/// them up once that parameter is unified with a concrete argument
/// (§4.6 step 5: "propagate function-level constraints onto
/// parameter/return type variables before child unification").
fn propagate_fn_constraints(constraints: &Option<Vec<Constraint>>, params: &[Type], ret: &Type) {
    let Some(constraints) = constraints else {
        return;
    };
    for c in constraints {
        for var_name in constraint_vars(c) {
            for p in params {
                if let Type::Variable(tv) = p {
                    if tv.name == var_name {
                        tv.push_constraint(c.clone());
                    }
                }
            }
            if let Type::Variable(tv) = ret {
                if tv.name == var_name {
                    tv.push_constraint(c.clone());
                }
            }
        }
    }
}

fn bind_var(
    name: &str,
    var_ty: &Type,
    other: &Type,
    sub: &mut Substitution,
    registry: &TraitRegistry,
    location: Location,
    hint: Option<UnifyHint>,
) -> Result<(), InferError> {
    let Type::Variable(v) = var_ty else {
        unreachable!("bind_var is only called with a Variable on the left");
    };

    if let Type::Variable(other_v) = other {
        if v.name == other_v.name {
            return Ok(());
        }
        for c in v.constraints_snapshot() {
            let renamed = crate::subst::rename_constraint(&c, &v.name, &other_v.name);
            if !other_v
                .constraints_snapshot()
                .iter()
                .any(|existing| constraints_equal(existing, &renamed))
            {
                other_v.push_constraint(renamed);
            }
        }
        sub.insert(name.to_string(), other.clone());
        return Ok(());
    }

    if occurs_check(name, other, sub) {
        return Err(TypeError::OccursCheck {
            var: name.to_string(),
            ty: other.clone(),
            location,
        }
        .into());
    }

    let constraints = v.constraints_snapshot();
    sub.insert(name.to_string(), other.clone());
    for c in constraints {
        discharge_constraint(&c, other, sub, registry, location)?;
    }
    let _ = hint;
    Ok(())
}

/// Discharges a single collected constraint against a (now known)
/// concrete type, per §4.6 step 4's per-constraint-kind rules.
pub fn discharge_constraint(
    c: &Constraint,
    concrete: &Type,
    sub: &mut Substitution,
    registry: &TraitRegistry,
    location: Location,
) -> Result<(), InferError> {
    match c {
        Constraint::HasField(_, field, field_ty) => match concrete {
            Type::Record(fields) => match fields.get(field) {
                Some(actual) => unify(actual, field_ty, sub, registry, location, Some(UnifyHint::PatternMatching)),
                None => Err(TypeError::MissingField {
                    field: field.clone(),
                    record: concrete.clone(),
                    location,
                }
                .into()),
            },
            _ => Err(TypeError::NotARecord {
                ty: concrete.clone(),
                location,
            }
            .into()),
        },
        Constraint::Has(_, structure) => match concrete {
            Type::Record(fields) => {
                let mut missing = Vec::new();
                for (name, ty) in &structure.fields {
                    match fields.get(name) {
                        Some(actual) => unify(actual, ty, sub, registry, location, Some(UnifyHint::PatternMatching))?,
                        None => missing.push(name.clone()),
                    }
                }
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(TypeError::StructuralMismatch {
                        message: format!("record is missing field(s): {}", missing.join(", ")),
                        location,
                    }
                    .into())
                }
            }
            _ => Err(TypeError::NotARecord {
                ty: concrete.clone(),
                location,
            }
            .into()),
        },
        Constraint::Is(_, name) => match concrete {
            Type::Primitive(_) => Ok(()),
            _ => Err(TypeError::LegacyIsConstraint {
                name: name.clone(),
                ty: concrete.clone(),
                location,
            }
            .into()),
        },
        Constraint::Implements(_, trait_name) => {
            let type_name = concrete.type_name().ok_or_else(|| TypeError::StructuralMismatch {
                message: format!("cannot determine a type name for {concrete} to check trait {trait_name}"),
                location,
            })?;
            if registry.has_implementation(trait_name, &type_name) {
                Ok(())
            } else {
                Err(crate::error::TraitError::NoImplementation {
                    trait_name: trait_name.clone(),
                    type_name,
                    location,
                }
                .into())
            }
        }
        Constraint::And(l, r) => {
            discharge_constraint(l, concrete, sub, registry, location)?;
            discharge_constraint(r, concrete, sub, registry, location)
        }
        Constraint::Or(l, r) => {
            if discharge_constraint(l, concrete, sub, registry, location).is_ok() {
                Ok(())
            } else {
                discharge_constraint(r, concrete, sub, registry, location)
            }
        }
        Constraint::Paren(inner) => discharge_constraint(inner, concrete, sub, registry, location),
    }
}

/// `unifyConstrainedWithConcrete` (§4.6 step 6): `base` is typically a
/// bare variable carrying a `given`-clause obligation (an explicit
/// annotation, not one discovered through ordinary unification). Unify
/// the base first, then discharge each of the wrapper's named
/// obligations against the now-resolved concrete type.
fn unify_constrained_with_concrete(
    base: &Type,
    constraints: &std::collections::BTreeMap<String, Vec<Constraint>>,
    concrete: &Type,
    sub: &mut Substitution,
    registry: &TraitRegistry,
    location: Location,
    hint: Option<UnifyHint>,
) -> Result<(), InferError> {
    unify(base, concrete, sub, registry, location, hint)?;
    let resolved = substitute(concrete, sub);
    for (_, cs) in constraints {
        for c in cs {
            discharge_constraint(c, &resolved, sub, registry, location)?;
        }
    }
    Ok(())
}

/// Constraint collapse (§4.8 "central insight", §8-P5): rewrite a
/// `Constrained` type whose every obligation is now satisfied by its
/// base type back down to the bare base type.
pub fn collapse_constraints(ty: &Type, sub: &Substitution, registry: &TraitRegistry) -> Type {
    let resolved = substitute(ty, sub);
    match &resolved {
        Type::Constrained(base, constraints) => {
            let all_satisfied = constraints.values().flatten().all(|c| {
                discharge_constraint(c, base, &mut sub.clone(), registry, Location::synthetic()).is_ok()
            });
            if all_satisfied {
                (**base).clone()
            } else {
                resolved
            }
        }
        _ => resolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noo_ast::EffectSet;

    #[test]
    fn unify_binds_variable_to_concrete() {
        let mut sub = Substitution::default();
        let registry = TraitRegistry::new();
        unify(
            &Type::variable("a"),
            &Type::float(),
            &mut sub,
            &registry,
            Location::synthetic(),
            None,
        )
        .unwrap();
        assert_eq!(substitute(&Type::variable("a"), &sub), Type::float());
    }

    #[test]
    fn unify_is_symmetric_in_outcome() {
        let registry = TraitRegistry::new();
        let mut sub1 = Substitution::default();
        unify(&Type::variable("a"), &Type::float(), &mut sub1, &registry, Location::synthetic(), None).unwrap();
        let mut sub2 = Substitution::default();
        unify(&Type::float(), &Type::variable("a"), &mut sub2, &registry, Location::synthetic(), None).unwrap();
        assert_eq!(
            substitute(&Type::variable("a"), &sub1),
            substitute(&Type::variable("a"), &sub2)
        );
    }

    #[test]
    fn unify_occurs_check_fails() {
        let mut sub = Substitution::default();
        let registry = TraitRegistry::new();
        let err = unify(
            &Type::variable("a"),
            &Type::list(Type::variable("a")),
            &mut sub,
            &registry,
            Location::synthetic(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, InferError::Type(TypeError::OccursCheck { .. })));
    }

    #[test]
    fn unify_discharges_has_field_against_record() {
        let mut sub = Substitution::default();
        let registry = TraitRegistry::new();
        let a = Type::variable("a");
        if let Type::Variable(v) = &a {
            v.push_constraint(Constraint::HasField("a".into(), "name".into(), Type::variable("b")));
        }
        let mut fields = std::collections::BTreeMap::new();
        fields.insert("name".to_string(), Type::string());
        unify(&a, &Type::Record(fields), &mut sub, &registry, Location::synthetic(), None).unwrap();
        assert_eq!(substitute(&Type::variable("b"), &sub), Type::string());
    }

    #[test]
    fn unify_function_arity_mismatch() {
        let mut sub = Substitution::default();
        let registry = TraitRegistry::new();
        let f1 = Type::function(vec![Type::float()], Type::float(), EffectSet::new());
        let f2 = Type::function(vec![Type::float(), Type::float()], Type::float(), EffectSet::new());
        let err = unify(&f1, &f2, &mut sub, &registry, Location::synthetic(), None).unwrap_err();
        assert!(matches!(err, InferError::Type(TypeError::ArityMismatch { .. })));
    }

    #[test]
    fn unify_implements_fails_without_impl() {
        let mut sub = Substitution::default();
        let registry = TraitRegistry::new();
        let a = Type::variable("a");
        if let Type::Variable(v) = &a {
            v.push_constraint(Constraint::Implements("a".into(), "Show".into()));
        }
        let err = unify(&a, &Type::float(), &mut sub, &registry, Location::synthetic(), None).unwrap_err();
        assert!(matches!(err, InferError::Trait(crate::error::TraitError::NoImplementation { .. })));
    }
}
