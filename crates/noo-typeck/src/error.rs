//! `TypeError`/`TraitError` (§7), hand-written with manual `Display`/
//! `std::error::Error` impls — grounded in `mesh-typeck::error`'s
//! `ConstraintOrigin`/`TypeError` shape, trimmed to §7's taxonomy and
//! switched from `rowan::TextRange` to `noo_common::Location`.

use std::fmt;

use noo_ast::Type;
use noo_common::Location;

/// Distinguishes the operation a mismatch was discovered in, attached to
/// error messages the way `mesh-typeck::error::ConstraintOrigin` tags a
/// unification failure with its call site (§4.6: "the hint distinguishes
/// `concrete_vs_variable`, `function_application`, …").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnifyHint {
    ConcreteVsVariable,
    FunctionApplication,
    OperatorApplication,
    IfBranches,
    PatternMatching,
    ConstructorApplication,
}

impl fmt::Display for UnifyHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnifyHint::ConcreteVsVariable => "concrete_vs_variable",
            UnifyHint::FunctionApplication => "function_application",
            UnifyHint::OperatorApplication => "operator_application",
            UnifyHint::IfBranches => "if_branches",
            UnifyHint::PatternMatching => "pattern_matching",
            UnifyHint::ConstructorApplication => "constructor_application",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone)]
pub enum TypeError {
    Mismatch {
        expected: Type,
        found: Type,
        hint: Option<UnifyHint>,
        location: Location,
    },
    OccursCheck {
        var: String,
        ty: Type,
        location: Location,
    },
    UndefinedVariable {
        name: String,
        location: Location,
    },
    NotAFunction {
        found: Type,
        location: Location,
    },
    ArityMismatch {
        expected: usize,
        found: usize,
        location: Location,
    },
    MissingField {
        field: String,
        record: Type,
        location: Location,
    },
    StructuralMismatch {
        message: String,
        location: Location,
    },
    NotARecord {
        ty: Type,
        location: Location,
    },
    LegacyIsConstraint {
        name: String,
        ty: Type,
        location: Location,
    },
    ConditionNotBool {
        found: Type,
        location: Location,
    },
    EffectNotDeclared {
        effect: noo_ast::Effect,
        location: Location,
    },
    MixedNamedAndPositional {
        location: Location,
    },
    NonExhaustiveMatch {
        location: Location,
    },
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::Mismatch {
                expected,
                found,
                hint,
                location,
            } => {
                write!(
                    f,
                    "type mismatch: expected {expected}, found {found} at {location}"
                )?;
                if let Some(h) = hint {
                    write!(f, " (in {h})")?;
                }
                Ok(())
            }
            TypeError::OccursCheck { var, ty, location } => {
                write!(f, "infinite type: {var} occurs in {ty} at {location}")
            }
            TypeError::UndefinedVariable { name, location } => {
                write!(f, "undefined variable '{name}' at {location}")
            }
            TypeError::NotAFunction { found, location } => {
                write!(f, "cannot apply a value of type {found} at {location}")
            }
            TypeError::ArityMismatch {
                expected,
                found,
                location,
            } => write!(
                f,
                "arity mismatch: expected {expected} argument(s), found {found} at {location}"
            ),
            TypeError::MissingField {
                field,
                record,
                location,
            } => write!(f, "missing field '{field}' on {record} at {location}"),
            TypeError::StructuralMismatch { message, location } => {
                write!(f, "{message} at {location}")
            }
            TypeError::NotARecord { ty, location } => {
                write!(f, "expected a record type, found {ty} at {location}")
            }
            TypeError::LegacyIsConstraint { name, ty, location } => write!(
                f,
                "{ty} does not satisfy legacy predicate '{name}' at {location} (consider Option/Result instead)"
            ),
            TypeError::ConditionNotBool { found, location } => {
                write!(f, "if condition must be Bool, found {found} at {location}")
            }
            TypeError::EffectNotDeclared { effect, location } => write!(
                f,
                "function uses effect {effect} but does not declare it at {location}"
            ),
            TypeError::MixedNamedAndPositional { location } => write!(
                f,
                "cannot mix named and positional fields at {location}"
            ),
            TypeError::NonExhaustiveMatch { location } => {
                write!(f, "no pattern matched at {location}")
            }
        }
    }
}

impl std::error::Error for TypeError {}

#[derive(Debug, Clone)]
pub enum TraitError {
    NoImplementation {
        trait_name: String,
        type_name: String,
        location: Location,
    },
    Ambiguous {
        func_name: String,
        type_name: String,
        traits: Vec<String>,
        location: Location,
    },
    DuplicateImplementation {
        trait_name: String,
        type_name: String,
        location: Location,
    },
    ArityMismatch {
        trait_name: String,
        func_name: String,
        expected: usize,
        found: usize,
        location: Location,
    },
    UndefinedTraitFunction {
        trait_name: String,
        func_name: String,
        location: Location,
    },
    UndefinedTrait {
        trait_name: String,
        location: Location,
    },
}

impl fmt::Display for TraitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraitError::NoImplementation {
                trait_name,
                type_name,
                location,
            } => write!(
                f,
                "No implementation of {trait_name} for {type_name} at {location}"
            ),
            TraitError::Ambiguous {
                func_name,
                type_name,
                traits,
                location,
            } => write!(
                f,
                "ambiguous function call: {func_name} for {type_name} at {location} (candidates: {})",
                traits.join(", ")
            ),
            TraitError::DuplicateImplementation {
                trait_name,
                type_name,
                location,
            } => write!(
                f,
                "duplicate implementation of {trait_name} for {type_name} at {location}"
            ),
            TraitError::ArityMismatch {
                trait_name,
                func_name,
                expected,
                found,
                location,
            } => write!(
                f,
                "{trait_name}::{func_name} expects {expected} argument(s), found {found} at {location}"
            ),
            TraitError::UndefinedTraitFunction {
                trait_name,
                func_name,
                location,
            } => write!(
                f,
                "'{func_name}' is not a function of trait {trait_name} at {location}"
            ),
            TraitError::UndefinedTrait { trait_name, location } => {
                write!(f, "undefined trait '{trait_name}' at {location}")
            }
        }
    }
}

impl std::error::Error for TraitError {}

/// The inferencer's unified error type — every fallible `noo-typeck`
/// operation returns `Result<_, InferError>`.
#[derive(Debug, Clone)]
pub enum InferError {
    Type(TypeError),
    Trait(TraitError),
}

impl fmt::Display for InferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferError::Type(e) => write!(f, "{e}"),
            InferError::Trait(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for InferError {}

impl From<TypeError> for InferError {
    fn from(e: TypeError) -> Self {
        InferError::Type(e)
    }
}

impl From<TraitError> for InferError {
    fn from(e: TraitError) -> Self {
        InferError::Trait(e)
    }
}
