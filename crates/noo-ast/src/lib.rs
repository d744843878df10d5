//! Tagged-union AST and type definitions (C1).
//!
//! Generalized from `mesh-typeck::ty::Ty` (smart constructors, `Display`)
//! and `mesh-parser::ast::item` (a cast-style item enum), but built as
//! plain Rust enums rather than wrappers over a `rowan` syntax tree — see
//! SPEC_FULL.md §10.1 for why the CST layer was dropped.

mod expr;
mod types;

pub use expr::{
    BinOp, Expr, ExprKind, MatchCase, Param, PipeOp, Pattern, PatternKind, Program,
    VariantCtorDef,
};
pub use types::{
    constraints_equal, render_type, types_equal, Constraint, Effect, EffectSet, Primitive,
    RecordStructure, Scheme, Type, TypeVar, VarAliaser,
};
