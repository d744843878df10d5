//! Type inference for Noolang: substitution, unification, trait
//! resolution, and the Hindley-Milner inferencer built on top of them
//! (C5-C8, §4.5-§4.8).

pub mod builtins;
pub mod env;
pub mod error;
pub mod infer;
pub mod subst;
pub mod traits;
pub mod unify;

pub use builtins::initialize_builtins;
pub use env::{EnvEntry, TypeEnv};
pub use error::{InferError, TraitError, TypeError, UnifyHint};
pub use infer::{generalize, infer_expr, infer_program, instantiate, InferState, Typed};
pub use subst::{constraint_vars, free_vars, occurs_check, rename_constraint, substitute, FreshVars, Substitution};
pub use traits::{ResolvedTraitFunction, TraitDefinition, TraitImplementation, TraitRegistry};
pub use unify::{collapse_constraints, discharge_constraint, unify};
