//! Substitution and fresh-variable helpers (C5, §4.5).
//!
//! Grounded in `mesh-typeck::unify::InferCtx`'s `resolve`/`occurs_in` shape,
//! backed by a plain `FxHashMap<VarName, Type>` instead of `ena`'s
//! union-find table (see DESIGN.md for the rationale): §4.6/§8-P2 describe
//! substitution idempotence at a fixpoint, a property of repeated map
//! application rather than of union-find path compression.

use rustc_hash::{FxHashMap, FxHashSet};

use noo_ast::{Constraint, Type, TypeVar};

/// `substitution: Map<VarName, Type>` (§4.8 state). Insertion is
/// monotonic — once a variable is bound it is never rebound to a
/// different type, only ever read back through [`substitute`].
pub type Substitution = FxHashMap<String, Type>;

/// `substitute(type, sub)` (§4.5): walks the type graph, resolving
/// `Variable`s through `sub` with a seen-set guarding against cycles.
pub fn substitute(ty: &Type, sub: &Substitution) -> Type {
    substitute_seen(ty, sub, &mut FxHashSet::default())
}

fn substitute_seen(ty: &Type, sub: &Substitution, seen: &mut FxHashSet<String>) -> Type {
    match ty {
        Type::Variable(v) => {
            if seen.contains(&v.name) {
                return ty.clone();
            }
            match sub.get(&v.name) {
                Some(bound) => {
                    seen.insert(v.name.clone());
                    let resolved = substitute_seen(bound, sub, seen);
                    seen.remove(&v.name);
                    resolved
                }
                None => ty.clone(),
            }
        }
        Type::Function {
            params,
            ret,
            effects,
            constraints,
        } => Type::Function {
            params: params.iter().map(|p| substitute_seen(p, sub, seen)).collect(),
            ret: Box::new(substitute_seen(ret, sub, seen)),
            effects: effects.clone(),
            constraints: constraints.as_ref().map(|cs| {
                cs.iter()
                    .map(|c| substitute_constraint(c, sub, seen))
                    .collect()
            }),
        },
        Type::List(elem) => Type::List(Box::new(substitute_seen(elem, sub, seen))),
        Type::Tuple(elems) => {
            Type::Tuple(elems.iter().map(|e| substitute_seen(e, sub, seen)).collect())
        }
        Type::Record(fields) => Type::Record(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), substitute_seen(v, sub, seen)))
                .collect(),
        ),
        Type::Variant(name, args) => Type::Variant(
            name.clone(),
            args.iter().map(|a| substitute_seen(a, sub, seen)).collect(),
        ),
        Type::Constrained(base, constraints) => {
            let new_base = substitute_seen(base, sub, seen);
            let new_constraints = constraints
                .iter()
                .map(|(k, cs)| {
                    let new_key = substitute_seen(&Type::variable(k.clone()), sub, seen)
                        .type_name()
                        .unwrap_or_else(|| k.clone());
                    (
                        new_key,
                        cs.iter().map(|c| substitute_constraint(c, sub, seen)).collect(),
                    )
                })
                .collect();
            Type::constrained(new_base, new_constraints)
        }
        Type::Primitive(_) | Type::Unit | Type::Unknown => ty.clone(),
    }
}

fn substitute_constraint(c: &Constraint, sub: &Substitution, seen: &mut FxHashSet<String>) -> Constraint {
    match c {
        Constraint::Is(v, name) => Constraint::Is(resolved_name(v, sub, seen), name.clone()),
        Constraint::HasField(v, field, ty) => Constraint::HasField(
            resolved_name(v, sub, seen),
            field.clone(),
            substitute_seen(ty, sub, seen),
        ),
        Constraint::Has(v, structure) => Constraint::Has(
            resolved_name(v, sub, seen),
            noo_ast::RecordStructure {
                fields: structure
                    .fields
                    .iter()
                    .map(|(k, t)| (k.clone(), substitute_seen(t, sub, seen)))
                    .collect(),
            },
        ),
        Constraint::Implements(v, trait_name) => {
            Constraint::Implements(resolved_name(v, sub, seen), trait_name.clone())
        }
        Constraint::And(l, r) => Constraint::And(
            Box::new(substitute_constraint(l, sub, seen)),
            Box::new(substitute_constraint(r, sub, seen)),
        ),
        Constraint::Or(l, r) => Constraint::Or(
            Box::new(substitute_constraint(l, sub, seen)),
            Box::new(substitute_constraint(r, sub, seen)),
        ),
        Constraint::Paren(inner) => Constraint::Paren(Box::new(substitute_constraint(inner, sub, seen))),
    }
}

/// If `v` resolves to a bare variable through `sub`, the constraint now
/// belongs to that variable's name; if it resolves to a concrete type the
/// name is left as-is (the constraint is about to be discharged by the
/// caller, which looks the concrete type up directly).
fn resolved_name(v: &str, sub: &Substitution, seen: &mut FxHashSet<String>) -> String {
    match substitute_seen(&Type::variable(v.to_string()), sub, seen) {
        Type::Variable(tv) => tv.name,
        _ => v.to_string(),
    }
}

/// Free type-variable names in `ty` after resolving through `sub`.
pub fn free_vars(ty: &Type, sub: &Substitution) -> FxHashSet<String> {
    let resolved = substitute(ty, sub);
    let mut out = FxHashSet::default();
    collect_free_vars(&resolved, &mut out);
    out
}

fn collect_free_vars(ty: &Type, out: &mut FxHashSet<String>) {
    match ty {
        Type::Variable(v) => {
            out.insert(v.name.clone());
        }
        Type::Function { params, ret, .. } => {
            for p in params {
                collect_free_vars(p, out);
            }
            collect_free_vars(ret, out);
        }
        Type::List(elem) => collect_free_vars(elem, out),
        Type::Tuple(elems) => {
            for e in elems {
                collect_free_vars(e, out);
            }
        }
        Type::Record(fields) => {
            for v in fields.values() {
                collect_free_vars(v, out);
            }
        }
        Type::Variant(_, args) => {
            for a in args {
                collect_free_vars(a, out);
            }
        }
        Type::Constrained(base, _) => collect_free_vars(base, out),
        Type::Primitive(_) | Type::Unit | Type::Unknown => {}
    }
}

/// Occurs check (§9, §4.6 step 4): does `var_name` appear free in `ty`
/// once `ty` is resolved through `sub`?
pub fn occurs_check(var_name: &str, ty: &Type, sub: &Substitution) -> bool {
    free_vars(ty, sub).contains(var_name)
}

/// All variable names `c` refers to (single name for the leaf
/// constraints, both sides recursively for `And`/`Or`/`Paren`).
pub fn constraint_vars(c: &Constraint) -> Vec<String> {
    match c {
        Constraint::Is(v, _) | Constraint::HasField(v, _, _) | Constraint::Has(v, _) | Constraint::Implements(v, _) => {
            vec![v.clone()]
        }
        Constraint::And(l, r) | Constraint::Or(l, r) => {
            let mut out = constraint_vars(l);
            out.extend(constraint_vars(r));
            out
        }
        Constraint::Paren(inner) => constraint_vars(inner),
    }
}

/// Rewrites every occurrence of `from` inside `c` to `to` — used when a
/// fresh name is assigned to a variable during instantiation.
pub fn rename_constraint(c: &Constraint, from: &str, to: &str) -> Constraint {
    let r = |v: &str| if v == from { to.to_string() } else { v.to_string() };
    match c {
        Constraint::Is(v, name) => Constraint::Is(r(v), name.clone()),
        Constraint::HasField(v, field, ty) => Constraint::HasField(r(v), field.clone(), ty.clone()),
        Constraint::Has(v, structure) => Constraint::Has(r(v), structure.clone()),
        Constraint::Implements(v, trait_name) => Constraint::Implements(r(v), trait_name.clone()),
        Constraint::And(l, r2) => Constraint::And(
            Box::new(rename_constraint(l, from, to)),
            Box::new(rename_constraint(r2, from, to)),
        ),
        Constraint::Or(l, r2) => Constraint::Or(
            Box::new(rename_constraint(l, from, to)),
            Box::new(rename_constraint(r2, from, to)),
        ),
        Constraint::Paren(inner) => Constraint::Paren(Box::new(rename_constraint(inner, from, to))),
    }
}

/// Fresh-name generation (§4.5): `α0, α1, …` from a counter.
#[derive(Default)]
pub struct FreshVars {
    counter: u64,
}

impl FreshVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_name(&mut self) -> String {
        let n = self.counter;
        self.counter += 1;
        format!("α{n}")
    }

    pub fn fresh(&mut self) -> TypeVar {
        TypeVar::new(self.next_name())
    }

    pub fn fresh_type(&mut self) -> Type {
        Type::Variable(self.fresh())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitute_resolves_chain() {
        let mut sub = Substitution::default();
        sub.insert("a".into(), Type::variable("b"));
        sub.insert("b".into(), Type::float());
        assert_eq!(substitute(&Type::variable("a"), &sub), Type::float());
    }

    #[test]
    fn substitute_is_idempotent_at_fixpoint() {
        let mut sub = Substitution::default();
        sub.insert("a".into(), Type::list(Type::variable("b")));
        sub.insert("b".into(), Type::float());
        let once = substitute(&Type::variable("a"), &sub);
        let twice = substitute(&once, &sub);
        assert_eq!(once, twice);
    }

    #[test]
    fn occurs_check_detects_self_reference() {
        let mut sub = Substitution::default();
        sub.insert("a".into(), Type::list(Type::variable("b")));
        assert!(occurs_check("b", &Type::variable("a"), &sub));
        assert!(!occurs_check("c", &Type::variable("a"), &sub));
    }

    #[test]
    fn fresh_vars_are_distinct() {
        let mut fv = FreshVars::new();
        let a = fv.next_name();
        let b = fv.next_name();
        assert_ne!(a, b);
    }
}
