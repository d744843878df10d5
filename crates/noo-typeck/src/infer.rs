//! Type inferencer (C8, §4.8).
//!
//! Grounded in `mesh-typeck::infer`'s function-per-expression-kind shape
//! (`infer_binary`/`infer_call`/`infer_if`/`infer_closure`/`infer_block`/
//! `infer_pattern`/`infer_case`/`infer_field_access`/`infer_list_literal`),
//! reworked onto `noo-ast`'s richer variant set and the spec's own per-kind
//! rules (§4.8).

use std::collections::BTreeMap;

use noo_ast::{
    constraints_equal, BinOp, Constraint, Effect, EffectSet, Expr, ExprKind, Pattern, PatternKind, PipeOp, Primitive,
    Program, Scheme, Type, TypeVar,
};
use noo_common::Location;

use crate::builtins::initialize_builtins;
use crate::env::{EnvEntry, TypeEnv};
use crate::error::{InferError, TypeError, UnifyHint};
use crate::subst::{constraint_vars, free_vars, rename_constraint, substitute, FreshVars, Substitution};
use crate::traits::{TraitDefinition, TraitImplementation, TraitRegistry};
use crate::unify::unify;

/// `{environment, substitution, counter, traitRegistry}` (§4.8 state).
pub struct InferState {
    pub env: TypeEnv,
    pub sub: Substitution,
    pub fresh: FreshVars,
    pub registry: TraitRegistry,
}

impl InferState {
    /// `initializeBuiltins` (§4.8/§9): an empty state seeded with
    /// primitives and the native combinators. `loadStdlib` (the bundled
    /// Option/Result/Show/Monad/Functor program) is applied by the
    /// `noolang` crate, which owns the embedded stdlib source.
    pub fn new() -> Self {
        let mut env = TypeEnv::new();
        initialize_builtins(&mut env);
        Self {
            env,
            sub: Substitution::default(),
            fresh: FreshVars::new(),
            registry: TraitRegistry::new(),
        }
    }
}

impl Default for InferState {
    fn default() -> Self {
        Self::new()
    }
}

/// `typeExpression(expr, state) -> {type, effects, state'}` (§4.8).
#[derive(Debug, Clone)]
pub struct Typed {
    pub ty: Type,
    pub effects: EffectSet,
}

/// Types every statement of a program in source order, typing the
/// bundled stdlib the same way as user code would (§4.8, §9).
pub fn infer_program(program: &Program, state: &mut InferState) -> Result<Type, InferError> {
    let mut result = Type::unit();
    for stmt in &program.statements {
        result = infer_expr(stmt, state)?.ty;
    }
    Ok(result)
}

/// Builds a fresh, independent `TypeVar` per distinct name found while
/// walking a parsed annotation, so repeated occurrences of the same
/// variable (e.g. both legs of `a -> a given a implements Show`) share one
/// interior-mutable constraint bag — matching the scheme-instantiation
/// sharing described in §9, applied here to a concrete (non-generalised)
/// annotation instead of a stored scheme.
fn intern(ty: &Type) -> Type {
    let mut mapping: std::collections::HashMap<String, TypeVar> = std::collections::HashMap::new();
    intern_rec(ty, &mut mapping)
}

fn intern_rec(ty: &Type, mapping: &mut std::collections::HashMap<String, TypeVar>) -> Type {
    match ty {
        Type::Variable(v) => {
            let shared = mapping
                .entry(v.name.clone())
                .or_insert_with(|| TypeVar::with_constraints(v.name.clone(), v.constraints_snapshot()))
                .clone();
            Type::Variable(shared)
        }
        Type::Function {
            params,
            ret,
            effects,
            constraints,
        } => {
            let params: Vec<Type> = params.iter().map(|p| intern_rec(p, mapping)).collect();
            let ret = Box::new(intern_rec(ret, mapping));
            if let Some(cs) = constraints {
                for c in cs {
                    if let Some(name) = c.type_var_name() {
                        if let Some(tv) = mapping.get(name) {
                            tv.push_constraint(c.clone());
                        }
                    }
                }
            }
            Type::Function {
                params,
                ret,
                effects: effects.clone(),
                constraints: constraints.clone(),
            }
        }
        Type::List(elem) => Type::List(Box::new(intern_rec(elem, mapping))),
        Type::Tuple(elems) => Type::Tuple(elems.iter().map(|e| intern_rec(e, mapping)).collect()),
        Type::Record(fields) => Type::Record(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), intern_rec(v, mapping)))
                .collect(),
        ),
        Type::Variant(name, args) => {
            Type::Variant(name.clone(), args.iter().map(|a| intern_rec(a, mapping)).collect())
        }
        Type::Constrained(base, constraints) => Type::constrained(
            intern_rec(base, mapping),
            constraints.clone(),
        ),
        Type::Primitive(_) | Type::Unit | Type::Unknown => ty.clone(),
    }
}

/// `instantiate(scheme)` (§4.5/§4.8): renames every quantified variable to
/// a fresh one, sharing a single fresh `TypeVar` across every occurrence
/// of the same original name within this one instantiation so a
/// `given`-clause obligation discovered (or declared) on one occurrence is
/// visible at every other occurrence.
pub fn instantiate(scheme: &Scheme, fresh: &mut FreshVars) -> Type {
    let mut mapping: std::collections::HashMap<String, TypeVar> = std::collections::HashMap::new();
    instantiate_rec(&scheme.ty, &scheme.quantified, &mut mapping, fresh)
}

fn instantiate_rec(
    ty: &Type,
    quantified: &[String],
    mapping: &mut std::collections::HashMap<String, TypeVar>,
    fresh: &mut FreshVars,
) -> Type {
    match ty {
        Type::Variable(v) => {
            if !quantified.iter().any(|q| q == &v.name) {
                return ty.clone();
            }
            if let Some(existing) = mapping.get(&v.name) {
                return Type::Variable(existing.clone());
            }
            let fresh_name = fresh.next_name();
            let renamed: Vec<Constraint> = v
                .constraints_snapshot()
                .iter()
                .map(|c| rename_constraint(c, &v.name, &fresh_name))
                .collect();
            let tv = TypeVar::with_constraints(fresh_name, renamed);
            mapping.insert(v.name.clone(), tv.clone());
            Type::Variable(tv)
        }
        Type::Function {
            params,
            ret,
            effects,
            constraints,
        } => {
            let params: Vec<Type> = params
                .iter()
                .map(|p| instantiate_rec(p, quantified, mapping, fresh))
                .collect();
            let ret = Box::new(instantiate_rec(ret, quantified, mapping, fresh));
            let new_constraints = constraints.as_ref().map(|cs| {
                cs.iter()
                    .map(|c| rename_via_mapping(c, mapping))
                    .collect::<Vec<_>>()
            });
            // Push each declared constraint onto the shared fresh var's own
            // bag so ordinary unification discharge (bind_var) sees it.
            if let Some(cs) = constraints {
                for c in cs {
                    if let Some(old_name) = c.type_var_name() {
                        if let Some(tv) = mapping.get(old_name) {
                            let renamed = rename_constraint(c, old_name, &tv.name);
                            tv.push_constraint(renamed);
                        }
                    }
                }
            }
            Type::Function {
                params,
                ret,
                effects: effects.clone(),
                constraints: new_constraints,
            }
        }
        Type::List(elem) => Type::List(Box::new(instantiate_rec(elem, quantified, mapping, fresh))),
        Type::Tuple(elems) => Type::Tuple(
            elems
                .iter()
                .map(|e| instantiate_rec(e, quantified, mapping, fresh))
                .collect(),
        ),
        Type::Record(fields) => Type::Record(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), instantiate_rec(v, quantified, mapping, fresh)))
                .collect(),
        ),
        Type::Variant(name, args) => Type::Variant(
            name.clone(),
            args.iter()
                .map(|a| instantiate_rec(a, quantified, mapping, fresh))
                .collect(),
        ),
        Type::Constrained(base, constraints) => {
            let new_base = instantiate_rec(base, quantified, mapping, fresh);
            let new_map = constraints
                .iter()
                .map(|(k, cs)| {
                    let new_key = mapping.get(k).map(|tv| tv.name.clone()).unwrap_or_else(|| k.clone());
                    (new_key, cs.iter().map(|c| rename_via_mapping(c, mapping)).collect())
                })
                .collect();
            Type::constrained(new_base, new_map)
        }
        Type::Primitive(_) | Type::Unit | Type::Unknown => ty.clone(),
    }
}

fn rename_via_mapping(c: &Constraint, mapping: &std::collections::HashMap<String, TypeVar>) -> Constraint {
    match c {
        Constraint::Is(v, name) => Constraint::Is(mapped_name(v, mapping), name.clone()),
        Constraint::HasField(v, field, ty) => Constraint::HasField(mapped_name(v, mapping), field.clone(), ty.clone()),
        Constraint::Has(v, structure) => Constraint::Has(mapped_name(v, mapping), structure.clone()),
        Constraint::Implements(v, trait_name) => Constraint::Implements(mapped_name(v, mapping), trait_name.clone()),
        Constraint::And(l, r) => Constraint::And(
            Box::new(rename_via_mapping(l, mapping)),
            Box::new(rename_via_mapping(r, mapping)),
        ),
        Constraint::Or(l, r) => Constraint::Or(
            Box::new(rename_via_mapping(l, mapping)),
            Box::new(rename_via_mapping(r, mapping)),
        ),
        Constraint::Paren(inner) => Constraint::Paren(Box::new(rename_via_mapping(inner, mapping))),
    }
}

fn mapped_name(v: &str, mapping: &std::collections::HashMap<String, TypeVar>) -> String {
    mapping.get(v).map(|tv| tv.name.clone()).unwrap_or_else(|| v.to_string())
}

/// `generalize` (§4.8, §9): quantify every free variable of `ty` that is
/// not also free in the surrounding environment.
pub fn generalize(ty: &Type, env: &TypeEnv, sub: &Substitution) -> Scheme {
    let ty_free = free_vars(ty, sub);
    let env_free = env.free_vars(sub);
    let mut quantified: Vec<String> = ty_free.difference(&env_free).cloned().collect();
    quantified.sort();
    Scheme {
        quantified,
        ty: substitute(ty, sub),
    }
}

/// Collects the still-live constraint bags of any bare `Variable`s in
/// `types`, deduplicated — used to surface discoveries made through
/// ordinary unification back onto a function type's displayed `given`
/// clause (§4.8 scenario 9).
fn surface_constraints(types: &[&Type]) -> Vec<Constraint> {
    let mut out: Vec<Constraint> = Vec::new();
    for t in types {
        if let Type::Variable(v) = t {
            for c in v.constraints_snapshot() {
                if !out.iter().any(|e| constraints_equal(e, &c)) {
                    out.push(c);
                }
            }
        }
    }
    out
}

pub fn infer_expr(expr: &Expr, state: &mut InferState) -> Result<Typed, InferError> {
    let loc = expr.location;
    match &expr.kind {
        ExprKind::Number(_) => Ok(Typed {
            ty: Type::float(),
            effects: EffectSet::new(),
        }),
        ExprKind::Str(_) => Ok(Typed {
            ty: Type::string(),
            effects: EffectSet::new(),
        }),
        ExprKind::Unit => Ok(Typed {
            ty: Type::unit(),
            effects: EffectSet::new(),
        }),

        ExprKind::Variable(name) => {
            let entry = state
                .env
                .lookup(name)
                .ok_or_else(|| TypeError::UndefinedVariable {
                    name: name.clone(),
                    location: loc,
                })?
                .clone();
            let ty = instantiate(&entry.scheme, &mut state.fresh);
            Ok(Typed {
                ty,
                effects: EffectSet::new(),
            })
        }

        ExprKind::Accessor { field, safe } => {
            let a = state.fresh.fresh();
            let b = state.fresh.fresh_type();
            let constraint = Constraint::HasField(a.name.clone(), field.clone(), b.clone());
            a.push_constraint(constraint.clone());
            let ret_ty = if *safe {
                Type::variant("Option", vec![b.clone()])
            } else {
                b.clone()
            };
            let ty = Type::function_with_constraints(
                vec![Type::Variable(a)],
                ret_ty,
                EffectSet::new(),
                vec![constraint],
            );
            Ok(Typed {
                ty,
                effects: EffectSet::new(),
            })
        }

        ExprKind::List(elems) => {
            let mut effects = EffectSet::new();
            let mut elem_ty: Option<Type> = None;
            for e in elems {
                let t = infer_expr(e, state)?;
                effects.extend(t.effects.iter().copied());
                match &elem_ty {
                    None => elem_ty = Some(t.ty),
                    Some(existing) => {
                        unify(existing, &t.ty, &mut state.sub, &state.registry, e.location, None)?;
                    }
                }
            }
            let elem_ty = elem_ty
                .map(|t| substitute(&t, &state.sub))
                .unwrap_or_else(|| state.fresh.fresh_type());
            Ok(Typed {
                ty: Type::list(elem_ty),
                effects,
            })
        }

        ExprKind::Tuple(elems) => {
            let mut effects = EffectSet::new();
            let mut tys = Vec::new();
            for e in elems {
                let t = infer_expr(e, state)?;
                effects.extend(t.effects.iter().copied());
                tys.push(t.ty);
            }
            Ok(Typed {
                ty: Type::tuple(tys),
                effects,
            })
        }

        ExprKind::Record(fields) => {
            let mut effects = EffectSet::new();
            let mut map = BTreeMap::new();
            for (name, value) in fields {
                let t = infer_expr(value, state)?;
                effects.extend(t.effects.iter().copied());
                map.insert(name.clone(), t.ty);
            }
            Ok(Typed {
                ty: Type::record(map),
                effects,
            })
        }

        ExprKind::Function { params, body, annotation } => infer_function_literal(params, body, annotation.as_ref(), state),

        ExprKind::Application { func, args } => infer_application(func, args, loc, state),

        ExprKind::Binary { op, left, right } => infer_binary(*op, left, right, loc, state),

        ExprKind::Pipeline { steps, operators } => infer_pipeline(steps, operators, state),

        ExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let cond_t = infer_expr(cond, state)?;
            unify(&cond_t.ty, &Type::bool(), &mut state.sub, &state.registry, cond.location, Some(UnifyHint::IfBranches))
                .map_err(|_| {
                    InferError::Type(TypeError::ConditionNotBool {
                        found: substitute(&cond_t.ty, &state.sub),
                        location: cond.location,
                    })
                })?;
            let then_t = infer_expr(then_branch, state)?;
            let else_t = infer_expr(else_branch, state)?;
            unify(
                &then_t.ty,
                &else_t.ty,
                &mut state.sub,
                &state.registry,
                loc,
                Some(UnifyHint::IfBranches),
            )?;
            let mut effects = cond_t.effects;
            effects.extend(then_t.effects);
            effects.extend(else_t.effects);
            Ok(Typed {
                ty: substitute(&then_t.ty, &state.sub),
                effects,
            })
        }

        ExprKind::Match { scrutinee, cases } => {
            let scrut_t = infer_expr(scrutinee, state)?;
            let mut effects = scrut_t.effects;
            let mut result_ty: Option<Type> = None;
            for case in cases {
                state.env.push_scope();
                infer_pattern(&case.pattern, &scrut_t.ty, state)?;
                let body_t = infer_expr(&case.body, state)?;
                state.env.pop_scope();
                effects.extend(body_t.effects);
                match &result_ty {
                    None => result_ty = Some(body_t.ty),
                    Some(existing) => unify(
                        existing,
                        &body_t.ty,
                        &mut state.sub,
                        &state.registry,
                        case.body.location,
                        Some(UnifyHint::PatternMatching),
                    )?,
                }
            }
            let ty = result_ty
                .map(|t| substitute(&t, &state.sub))
                .unwrap_or_else(Type::unit);
            Ok(Typed { ty, effects })
        }

        ExprKind::Where { body, defs } => {
            state.env.push_scope();
            let mut effects = EffectSet::new();
            for def in defs {
                let t = infer_expr(def, state)?;
                effects.extend(t.effects);
            }
            let body_t = infer_expr(body, state);
            state.env.pop_scope();
            let body_t = body_t?;
            effects.extend(body_t.effects);
            Ok(Typed {
                ty: body_t.ty,
                effects,
            })
        }

        ExprKind::Definition { name, value } => {
            let value_t = infer_expr(value, state)?;
            let scheme = generalize(&value_t.ty, &state.env, &state.sub);
            state.env.define(name.clone(), EnvEntry::immutable(scheme));
            Ok(Typed {
                ty: Type::unit(),
                effects: value_t.effects,
            })
        }

        ExprKind::MutableDefinition { name, value } => {
            let value_t = infer_expr(value, state)?;
            let resolved = substitute(&value_t.ty, &state.sub);
            state
                .env
                .define(name.clone(), EnvEntry::mutable(Scheme::mono(resolved)));
            Ok(Typed {
                ty: Type::unit(),
                effects: value_t.effects,
            })
        }

        ExprKind::Mutation { name, value } => {
            let entry = state
                .env
                .lookup(name)
                .ok_or_else(|| TypeError::UndefinedVariable {
                    name: name.clone(),
                    location: loc,
                })?
                .clone();
            if !entry.mutable {
                return Err(TypeError::StructuralMismatch {
                    message: format!("cannot mutate immutable binding '{name}'"),
                    location: loc,
                }
                .into());
            }
            let value_t = infer_expr(value, state)?;
            unify(&value_t.ty, &entry.scheme.ty, &mut state.sub, &state.registry, loc, None)?;
            Ok(Typed {
                ty: Type::unit(),
                effects: value_t.effects,
            })
        }

        ExprKind::TupleDestructuring { names, value } => {
            let value_t = infer_expr(value, state)?;
            let resolved = substitute(&value_t.ty, &state.sub);
            match &resolved {
                Type::Tuple(elems) if elems.len() == names.len() => {
                    for (name, ty) in names.iter().zip(elems.iter()) {
                        state
                            .env
                            .define(name.clone(), EnvEntry::immutable(Scheme::mono(ty.clone())));
                    }
                }
                Type::Tuple(elems) => {
                    return Err(TypeError::ArityMismatch {
                        expected: names.len(),
                        found: elems.len(),
                        location: loc,
                    }
                    .into())
                }
                other => {
                    return Err(TypeError::Mismatch {
                        expected: Type::tuple(names.iter().map(|_| Type::Unknown).collect()),
                        found: other.clone(),
                        hint: Some(UnifyHint::PatternMatching),
                        location: loc,
                    }
                    .into())
                }
            }
            Ok(Typed {
                ty: Type::unit(),
                effects: value_t.effects,
            })
        }

        ExprKind::RecordDestructuring { fields, value } => {
            let value_t = infer_expr(value, state)?;
            let resolved = substitute(&value_t.ty, &state.sub);
            match &resolved {
                Type::Record(record_fields) => {
                    for (field_name, local_name) in fields {
                        let ty = record_fields.get(field_name).cloned().ok_or_else(|| TypeError::MissingField {
                            field: field_name.clone(),
                            record: resolved.clone(),
                            location: loc,
                        })?;
                        state
                            .env
                            .define(local_name.clone(), EnvEntry::immutable(Scheme::mono(ty)));
                    }
                }
                other => {
                    return Err(TypeError::NotARecord {
                        ty: other.clone(),
                        location: loc,
                    }
                    .into())
                }
            }
            Ok(Typed {
                ty: Type::unit(),
                effects: value_t.effects,
            })
        }

        ExprKind::Typed { expr: inner, ty } => {
            let inner_t = infer_expr(inner, state)?;
            let annotated = intern(ty);
            unify(&inner_t.ty, &annotated, &mut state.sub, &state.registry, loc, None)?;
            Ok(Typed {
                ty: substitute(&annotated, &state.sub),
                effects: inner_t.effects,
            })
        }

        ExprKind::Constrained { expr: inner, ty, given } => {
            let inner_t = infer_expr(inner, state)?;
            let annotated = intern(ty);
            for var_name in constraint_vars(given) {
                push_onto_named_var(&annotated, &var_name, given);
            }
            unify(&inner_t.ty, &annotated, &mut state.sub, &state.registry, loc, None)?;
            let mut map: BTreeMap<String, Vec<Constraint>> = BTreeMap::new();
            for var_name in constraint_vars(given) {
                map.entry(var_name).or_default().push(given.clone());
            }
            let wrapped = Type::constrained(substitute(&annotated, &state.sub), map);
            let collapsed = crate::unify::collapse_constraints(&wrapped, &state.sub, &state.registry);
            Ok(Typed {
                ty: collapsed,
                effects: inner_t.effects,
            })
        }

        ExprKind::Import { .. } => Ok(Typed {
            ty: state.fresh.fresh_type(),
            effects: {
                let mut e = EffectSet::new();
                e.insert(Effect::Read);
                e
            },
        }),

        ExprKind::TypeDefinition { name, params, variants } => {
            for ctor in variants {
                let result_ty = Type::variant(name.clone(), params.iter().map(|p| Type::variable(p.clone())).collect());
                let ctor_ty = if ctor.args.is_empty() {
                    result_ty
                } else {
                    Type::function(ctor.args.clone(), result_ty, EffectSet::new())
                };
                state.env.define(
                    ctor.name.clone(),
                    EnvEntry::immutable(Scheme {
                        quantified: params.clone(),
                        ty: ctor_ty,
                    }),
                );
            }
            Ok(Typed {
                ty: Type::unit(),
                effects: EffectSet::new(),
            })
        }

        ExprKind::UserDefinedType { name, params, body } => {
            state.env.define(
                name.clone(),
                EnvEntry::immutable(Scheme {
                    quantified: params.clone(),
                    ty: intern(body),
                }),
            );
            Ok(Typed {
                ty: Type::unit(),
                effects: EffectSet::new(),
            })
        }

        ExprKind::ConstraintDefinition {
            name,
            type_params,
            functions,
        } => {
            let type_param = type_params.first().cloned().unwrap_or_else(|| "a".to_string());
            let mut fn_map = rustc_hash::FxHashMap::default();
            for (fn_name, ty) in functions {
                fn_map.insert(fn_name.clone(), intern(ty));
            }
            state.registry.add_trait_definition(TraitDefinition {
                name: name.clone(),
                type_param: type_param.clone(),
                functions: fn_map.clone(),
            });
            for (fn_name, ty) in &fn_map {
                let constrained_ty = attach_implements(ty, &type_param, name);
                state.env.define(
                    fn_name.clone(),
                    EnvEntry::immutable(Scheme {
                        quantified: vec![type_param.clone()],
                        ty: constrained_ty,
                    }),
                );
            }
            Ok(Typed {
                ty: Type::unit(),
                effects: EffectSet::new(),
            })
        }

        ExprKind::ImplementDefinition {
            trait_name,
            for_type,
            given,
            functions,
        } => {
            let for_type = intern(for_type);
            let type_name = for_type
                .type_name()
                .ok_or_else(|| TypeError::StructuralMismatch {
                    message: format!("cannot determine a concrete type name for trait implementation of {trait_name}"),
                    location: loc,
                })?;

            let def = state
                .registry
                .definition(trait_name)
                .cloned()
                .ok_or_else(|| crate::error::TraitError::UndefinedTrait {
                    trait_name: trait_name.clone(),
                    location: loc,
                })?;

            let mut effects = EffectSet::new();
            let mut fn_exprs = rustc_hash::FxHashMap::default();
            for (fn_name, value) in functions {
                let sig = def.functions.get(fn_name).ok_or_else(|| crate::error::TraitError::UndefinedTraitFunction {
                    trait_name: trait_name.clone(),
                    func_name: fn_name.clone(),
                    location: loc,
                })?;
                let mut expected = substitute(sig, &state.sub);
                let mut sub_for_type_param = Substitution::default();
                sub_for_type_param.insert(def.type_param.clone(), for_type.clone());
                expected = crate::subst::substitute(&expected, &sub_for_type_param);

                let value_t = infer_expr(value, state)?;
                effects.extend(value_t.effects);
                unify(&value_t.ty, &expected, &mut state.sub, &state.registry, value.location, None)?;
                fn_exprs.insert(fn_name.clone(), value.clone());
            }

            state
                .registry
                .add_trait_implementation(
                    trait_name,
                    TraitImplementation {
                        type_name,
                        functions: fn_exprs,
                        given: given.clone(),
                    },
                    loc,
                )?;

            Ok(Typed {
                ty: Type::unit(),
                effects,
            })
        }
    }
}

/// Attaches `Implements(type_param, trait_name)` onto the shared fresh
/// occurrence of `type_param` within `ty` (§4.8: "register each
/// trait-function name as an environment entry whose type is the declared
/// signature with the type parameter quantified and an `Implements(v,
/// Trait)` constraint attached").
fn attach_implements(ty: &Type, type_param: &str, trait_name: &str) -> Type {
    let interned = intern(ty);
    let constraint = Constraint::Implements(type_param.to_string(), trait_name.to_string());
    push_onto_named_var(&interned, type_param, &constraint);
    match &interned {
        Type::Function {
            params,
            ret,
            effects,
            constraints,
        } => {
            let mut cs = constraints.clone().unwrap_or_default();
            if !cs.iter().any(|c| constraints_equal(c, &constraint)) {
                cs.push(constraint);
            }
            Type::Function {
                params: params.clone(),
                ret: ret.clone(),
                effects: effects.clone(),
                constraints: Some(cs),
            }
        }
        _ => interned,
    }
}

fn push_onto_named_var(ty: &Type, name: &str, c: &Constraint) {
    match ty {
        Type::Variable(v) if v.name == name => v.push_constraint(c.clone()),
        Type::Function { params, ret, .. } => {
            for p in params {
                push_onto_named_var(p, name, c);
            }
            push_onto_named_var(ret, name, c);
        }
        Type::List(e) => push_onto_named_var(e, name, c),
        Type::Tuple(es) => {
            for e in es {
                push_onto_named_var(e, name, c);
            }
        }
        Type::Record(fields) => {
            for v in fields.values() {
                push_onto_named_var(v, name, c);
            }
        }
        Type::Variant(_, args) => {
            for a in args {
                push_onto_named_var(a, name, c);
            }
        }
        Type::Constrained(base, _) => push_onto_named_var(base, name, c),
        _ => {}
    }
}

fn infer_function_literal(
    params: &[noo_ast::Param],
    body: &Expr,
    annotation: Option<&Type>,
    state: &mut InferState,
) -> Result<Typed, InferError> {
    state.env.push_scope();
    let param_vars: Vec<TypeVar> = params.iter().map(|_| state.fresh.fresh()).collect();
    for (p, tv) in params.iter().zip(param_vars.iter()) {
        state
            .env
            .define(p.name.clone(), EnvEntry::immutable(Scheme::mono(Type::Variable(tv.clone()))));
    }
    let body_t = infer_expr(body, state);
    state.env.pop_scope();
    let body_t = body_t?;

    let resolved_params: Vec<Type> = param_vars.iter().map(|tv| substitute(&Type::Variable(tv.clone()), &state.sub)).collect();
    let resolved_ret = substitute(&body_t.ty, &state.sub);

    let declared_effects = annotation.and_then(|a| match intern(a) {
        Type::Function { effects, .. } => Some(effects),
        _ => None,
    });
    if let Some(declared) = &declared_effects {
        for e in &body_t.effects {
            if !declared.contains(e) {
                return Err(TypeError::EffectNotDeclared {
                    effect: *e,
                    location: body.location,
                }
                .into());
            }
        }
    }
    let effects = declared_effects.unwrap_or_else(|| body_t.effects.clone());

    let mut param_refs: Vec<&Type> = resolved_params.iter().collect();
    param_refs.push(&resolved_ret);
    let constraints = surface_constraints(&param_refs);

    let fn_ty = Type::function_with_constraints(resolved_params, resolved_ret, effects, constraints);

    if let Some(ann) = annotation {
        let annotated = intern(ann);
        unify(&fn_ty, &annotated, &mut state.sub, &state.registry, body.location, None)?;
        return Ok(Typed {
            ty: substitute(&annotated, &state.sub),
            effects: EffectSet::new(),
        });
    }

    Ok(Typed {
        ty: fn_ty,
        effects: EffectSet::new(),
    })
}

fn infer_application(func: &Expr, args: &[Expr], loc: Location, state: &mut InferState) -> Result<Typed, InferError> {
    // Trait functions are typed structurally the same way as any other
    // variable first — `instantiate` attaches the `Implements` obligation
    // to the shared parameter variable, and ordinary unification discharges
    // it against the first argument's concrete type once known (§4.7/§4.8).
    // That alone can't see a second trait declaring the same function name,
    // so the call site gets an explicit ambiguity check below (§7).
    let func_t = infer_expr(func, state)?;
    let mut effects = func_t.effects;
    let func_ty = substitute(&func_t.ty, &state.sub);

    let (params, ret, fn_effects) = match &func_ty {
        Type::Function { params, ret, effects: e, .. } => (params.clone(), (**ret).clone(), e.clone()),
        Type::Variable(_) => {
            let param_vars: Vec<Type> = args.iter().map(|_| state.fresh.fresh_type()).collect();
            let ret_var = state.fresh.fresh_type();
            unify(
                &func_ty,
                &Type::function(param_vars.clone(), ret_var.clone(), EffectSet::new()),
                &mut state.sub,
                &state.registry,
                func.location,
                Some(UnifyHint::FunctionApplication),
            )?;
            (param_vars, ret_var, EffectSet::new())
        }
        other => {
            return Err(TypeError::NotAFunction {
                found: other.clone(),
                location: func.location,
            }
            .into())
        }
    };

    if args.len() > params.len() {
        return Err(TypeError::ArityMismatch {
            expected: params.len(),
            found: args.len(),
            location: loc,
        }
        .into());
    }

    let mut arg_types = Vec::new();
    for arg in args {
        let t = infer_expr(arg, state)?;
        effects.extend(t.effects.iter().copied());
        arg_types.push(t.ty);
    }
    for (p, a) in params.iter().zip(arg_types.iter()) {
        unify(p, a, &mut state.sub, &state.registry, loc, Some(UnifyHint::FunctionApplication))?;
    }
    effects.extend(fn_effects.iter().copied());

    // Trait-dispatch ambiguity is a registry check at the call site, not a
    // structural unification failure (§7): the `Implements` constraint
    // attached by `instantiate` only ever names the one trait whose
    // `ConstraintDefinition` most recently bound this function name in the
    // environment, so it cannot by itself see a second trait declaring the
    // same function. Resolve against the dispatch argument's concrete type
    // name directly, the same index `resolve_trait_function` and the
    // evaluator's `dispatch_trait_function` both use.
    if let ExprKind::Variable(name) = &func.kind {
        if state.registry.is_trait_function(name) {
            if let Some(first_arg) = arg_types.first() {
                let resolved = substitute(first_arg, &state.sub);
                if let Some(type_name) = resolved.type_name() {
                    state.registry.resolve_trait_function(name, &type_name, loc)?;
                }
            }
        }
    }

    if args.len() == params.len() {
        Ok(Typed {
            ty: substitute(&ret, &state.sub),
            effects,
        })
    } else {
        let remaining: Vec<Type> = params[args.len()..]
            .iter()
            .map(|p| substitute(p, &state.sub))
            .collect();
        let resolved_ret = substitute(&ret, &state.sub);
        let mut refs: Vec<&Type> = remaining.iter().collect();
        refs.push(&resolved_ret);
        let constraints = surface_constraints(&refs);
        Ok(Typed {
            ty: Type::function_with_constraints(remaining, resolved_ret, fn_effects, constraints),
            effects,
        })
    }
}

fn infer_binary(op: BinOp, left: &Expr, right: &Expr, loc: Location, state: &mut InferState) -> Result<Typed, InferError> {
    match op {
        BinOp::Sequence => {
            let l = infer_expr(left, state)?;
            let r = infer_expr(right, state)?;
            let mut effects = l.effects;
            effects.extend(r.effects);
            Ok(Typed { ty: r.ty, effects })
        }
        BinOp::Dollar | BinOp::Thrush => {
            // `x | f` ≡ `f x`; `$` is low-precedence application.
            let (func, arg) = if op == BinOp::Thrush {
                (right, left)
            } else {
                (left, right)
            };
            let synthetic = Expr::new(
                ExprKind::Application {
                    func: Box::new(func.clone()),
                    args: vec![arg.clone()],
                },
                loc,
            );
            infer_expr(&synthetic, state)
        }
        BinOp::SafeThrush => {
            // `x |? f`: dispatches through the Monad trait at runtime; at
            // the type level it behaves like ordinary application of `f`
            // to the value `x` wraps (§9 Open Question: generalised to
            // any Monad).
            let l = infer_expr(left, state)?;
            let f = infer_expr(right, state)?;
            let mut effects = l.effects;
            effects.extend(f.effects);
            let resolved_l = substitute(&l.ty, &state.sub);
            let inner = match &resolved_l {
                Type::Variant(_, args) if args.len() == 1 => args[0].clone(),
                _ => state.fresh.fresh_type(),
            };
            let ret_var = state.fresh.fresh_type();
            unify(
                &f.ty,
                &Type::function(vec![inner], ret_var.clone(), EffectSet::new()),
                &mut state.sub,
                &state.registry,
                loc,
                Some(UnifyHint::OperatorApplication),
            )?;
            Ok(Typed {
                ty: resolved_l,
                effects,
            })
        }
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
            let l = infer_expr(left, state)?;
            let r = infer_expr(right, state)?;
            let mut effects = l.effects;
            effects.extend(r.effects);
            // `+` also concatenates Strings (§4.9); other arithmetic ops
            // are Float-only.
            if op == BinOp::Add {
                let resolved_l = substitute(&l.ty, &state.sub);
                if types_is_string(&resolved_l) {
                    unify(&r.ty, &Type::string(), &mut state.sub, &state.registry, loc, Some(UnifyHint::OperatorApplication))?;
                    return Ok(Typed {
                        ty: Type::string(),
                        effects,
                    });
                }
            }
            unify(&l.ty, &Type::float(), &mut state.sub, &state.registry, left.location, Some(UnifyHint::OperatorApplication))?;
            unify(&r.ty, &Type::float(), &mut state.sub, &state.registry, right.location, Some(UnifyHint::OperatorApplication))?;
            Ok(Typed {
                ty: Type::float(),
                effects,
            })
        }
        BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge | BinOp::Eq | BinOp::Ne => {
            let l = infer_expr(left, state)?;
            let r = infer_expr(right, state)?;
            let mut effects = l.effects;
            effects.extend(r.effects);
            unify(&l.ty, &r.ty, &mut state.sub, &state.registry, loc, Some(UnifyHint::OperatorApplication))?;
            Ok(Typed {
                ty: Type::bool(),
                effects,
            })
        }
    }
}

fn types_is_string(ty: &Type) -> bool {
    matches!(ty, Type::Primitive(Primitive::String))
}

fn infer_pipeline(steps: &[Expr], operators: &[PipeOp], state: &mut InferState) -> Result<Typed, InferError> {
    let mut iter = steps.iter();
    let first = iter.next().expect("pipeline always has at least one step");
    let mut acc = infer_expr(first, state)?;
    for (step, op) in iter.zip(operators.iter()) {
        let step_t = infer_expr(step, state)?;
        let (func, arg) = match op {
            PipeOp::Forward => (&step_t, &acc),
            PipeOp::Backward => (&acc, &step_t),
        };
        let ret_var = state.fresh.fresh_type();
        let arg_for_unify = arg.ty.clone();
        unify(
            &func.ty,
            &Type::function(vec![arg_for_unify], ret_var.clone(), EffectSet::new()),
            &mut state.sub,
            &state.registry,
            step.location,
            Some(UnifyHint::FunctionApplication),
        )?;
        let mut effects = acc.effects;
        effects.extend(step_t.effects);
        acc = Typed {
            ty: substitute(&ret_var, &state.sub),
            effects,
        };
    }
    Ok(acc)
}

fn infer_pattern(pattern: &Pattern, scrutinee_ty: &Type, state: &mut InferState) -> Result<(), InferError> {
    match &pattern.kind {
        PatternKind::Wildcard => Ok(()),
        PatternKind::Number(_) => unify(
            scrutinee_ty,
            &Type::float(),
            &mut state.sub,
            &state.registry,
            pattern.location,
            Some(UnifyHint::PatternMatching),
        ),
        PatternKind::Str(_) => unify(
            scrutinee_ty,
            &Type::string(),
            &mut state.sub,
            &state.registry,
            pattern.location,
            Some(UnifyHint::PatternMatching),
        ),
        PatternKind::Variable(name) => {
            state
                .env
                .define(name.clone(), EnvEntry::immutable(Scheme::mono(scrutinee_ty.clone())));
            Ok(())
        }
        PatternKind::Tuple(pats) => {
            let resolved = substitute(scrutinee_ty, &state.sub);
            match resolved {
                Type::Tuple(elem_tys) if elem_tys.len() == pats.len() => {
                    for (p, t) in pats.iter().zip(elem_tys.iter()) {
                        infer_pattern(p, t, state)?;
                    }
                    Ok(())
                }
                other => Err(TypeError::Mismatch {
                    expected: Type::tuple(pats.iter().map(|_| Type::Unknown).collect()),
                    found: other,
                    hint: Some(UnifyHint::PatternMatching),
                    location: pattern.location,
                }
                .into()),
            }
        }
        PatternKind::Record(fields) => {
            let resolved = substitute(scrutinee_ty, &state.sub);
            match resolved {
                Type::Record(field_tys) => {
                    for (name, p) in fields {
                        let t = field_tys.get(name).cloned().ok_or_else(|| TypeError::MissingField {
                            field: name.clone(),
                            record: Type::Record(field_tys.clone()),
                            location: pattern.location,
                        })?;
                        infer_pattern(p, &t, state)?;
                    }
                    Ok(())
                }
                other => Err(TypeError::NotARecord {
                    ty: other,
                    location: pattern.location,
                }
                .into()),
            }
        }
        PatternKind::Constructor(name, arg_pats) => {
            let entry = state
                .env
                .lookup(name)
                .ok_or_else(|| TypeError::UndefinedVariable {
                    name: name.clone(),
                    location: pattern.location,
                })?
                .clone();
            let ctor_ty = instantiate(&entry.scheme, &mut state.fresh);
            match ctor_ty {
                Type::Function { params, ret, .. } => {
                    if params.len() != arg_pats.len() {
                        return Err(TypeError::ArityMismatch {
                            expected: params.len(),
                            found: arg_pats.len(),
                            location: pattern.location,
                        }
                        .into());
                    }
                    unify(
                        &ret,
                        scrutinee_ty,
                        &mut state.sub,
                        &state.registry,
                        pattern.location,
                        Some(UnifyHint::PatternMatching),
                    )?;
                    for (p, t) in arg_pats.iter().zip(params.iter()) {
                        infer_pattern(p, t, state)?;
                    }
                    Ok(())
                }
                nullary => {
                    if !arg_pats.is_empty() {
                        return Err(TypeError::ArityMismatch {
                            expected: 0,
                            found: arg_pats.len(),
                            location: pattern.location,
                        }
                        .into());
                    }
                    unify(
                        &nullary,
                        scrutinee_ty,
                        &mut state.sub,
                        &state.registry,
                        pattern.location,
                        Some(UnifyHint::PatternMatching),
                    )
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noo_parser::parse_source;

    fn infer_src(src: &str) -> Result<Type, InferError> {
        let program = parse_source(src).expect("parses");
        let mut state = InferState::new();
        infer_program(&program, &mut state)
    }

    #[test]
    fn arithmetic_types_to_float() {
        assert_eq!(infer_src("1 + 2").unwrap(), Type::float());
    }

    #[test]
    fn string_concatenation_types_to_string() {
        assert_eq!(infer_src("\"hello\" + \" world\"").unwrap(), Type::string());
    }

    #[test]
    fn operator_mismatch_is_a_type_error() {
        assert!(infer_src("1 + \"hello\"").is_err());
    }

    #[test]
    fn let_polymorphism_instantiates_independently() {
        let ty = infer_src("id = fn x => x; id \"hi\"").unwrap();
        assert_eq!(ty, Type::string());
    }

    #[test]
    fn map_over_list_of_floats() {
        let ty = infer_src("map (fn x => x + 1) [1, 2, 3]").unwrap();
        assert_eq!(ty, Type::list(Type::float()));
    }

    #[test]
    fn if_condition_must_be_bool() {
        assert!(infer_src("if 1 then 2 else 3").is_err());
    }

    #[test]
    fn if_branches_must_unify() {
        let ty = infer_src("if True then 1 else 2").unwrap();
        assert_eq!(ty, Type::float());
    }

    #[test]
    fn accessor_infers_has_field_constraint() {
        let ty = infer_src("fn obj => @name obj").unwrap();
        match ty {
            Type::Function { params, ret, constraints, .. } => {
                assert_eq!(params.len(), 1);
                assert!(matches!(*ret, Type::Variable(_)));
                assert!(constraints.is_some());
            }
            other => panic!("expected function type, got {other:?}"),
        }
    }

    #[test]
    fn accessor_applies_to_record() {
        let ty = infer_src("(fn obj => @name obj) {@name \"Alice\"}").unwrap();
        assert_eq!(ty, Type::string());
    }

    #[test]
    fn trait_constraint_collapses_to_concrete_type() {
        let ty = infer_src(
            "constraint Show a (show : a -> String); implement Show Float (show = toString); show 42",
        )
        .unwrap();
        assert_eq!(ty, Type::string());
    }

    #[test]
    fn duplicate_implementation_is_rejected() {
        let err = infer_src(
            "constraint Show a (show : a -> String); implement Show Float (show = toString); implement Show Float (show = toString); show 1",
        )
        .unwrap_err();
        assert!(matches!(err, InferError::Trait(crate::error::TraitError::DuplicateImplementation { .. })));
    }

    #[test]
    fn ambiguous_trait_function_is_rejected() {
        let err = infer_src(
            "constraint P a (d : a -> String); constraint R a (d : a -> String); implement P Float (d = toString); implement R Float (d = toString); d 42",
        )
        .unwrap_err();
        assert!(matches!(err, InferError::Trait(crate::error::TraitError::Ambiguous { .. })));
    }

    #[test]
    fn undefined_variable_is_an_error() {
        assert!(infer_src("doesNotExist").is_err());
    }
}
