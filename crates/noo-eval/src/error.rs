//! `RuntimeError` (§4.9, §7): errors the evaluator can raise once a program
//! has already passed type inference. Grounded in `noo_typeck::error`'s
//! hand-written `Display`/`std::error::Error` style, trimmed to the
//! failures that remain possible at runtime (missing field, non-exhaustive
//! match, mutation of an undefined or immutable name, trait dispatch with
//! no matching implementation).

use std::fmt;

use noo_common::Location;

#[derive(Debug, Clone)]
pub enum RuntimeError {
    UndefinedVariable {
        name: String,
        location: Location,
    },
    NotMutable {
        name: String,
        location: Location,
    },
    NotAFunction {
        found: String,
        location: Location,
    },
    ArityMismatch {
        expected: usize,
        found: usize,
        location: Location,
    },
    MissingField {
        field: String,
        found: String,
        location: Location,
    },
    NonExhaustiveMatch {
        scrutinee: String,
        location: Location,
    },
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
    /// `loadStdlib`'s bundled source fails to parse, type, or evaluate
    /// (§9: "failure to load the stdlib is a fatal startup error, not a
    /// recoverable one").
    StdlibFailure {
        message: String,
    },
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::UndefinedVariable { name, location } => {
                write!(f, "undefined variable '{name}' at {location}")
            }
            RuntimeError::NotMutable { name, location } => {
                write!(f, "'{name}' is not mutable at {location}")
            }
            RuntimeError::NotAFunction { found, location } => {
                write!(f, "cannot call a value of type {found} at {location}")
            }
            RuntimeError::ArityMismatch {
                expected,
                found,
                location,
            } => write!(
                f,
                "arity mismatch: expected {expected} argument(s), found {found} at {location}"
            ),
            RuntimeError::MissingField { field, found, location } => {
                write!(f, "missing field '{field}' on {found} at {location}")
            }
            RuntimeError::NonExhaustiveMatch { scrutinee, location } => {
                write!(f, "no pattern matched {scrutinee} at {location}")
            }
            RuntimeError::NoImplementation {
                trait_name,
                type_name,
                location,
            } => write!(
                f,
                "No implementation of {trait_name} for {type_name} at {location}"
            ),
            RuntimeError::Ambiguous {
                func_name,
                type_name,
                traits,
                location,
            } => write!(
                f,
                "ambiguous function call: {func_name} for {type_name} at {location} (candidates: {})",
                traits.join(", ")
            ),
            RuntimeError::StdlibFailure { message } => {
                write!(f, "failed to load stdlib: {message}")
            }
        }
    }
}

impl std::error::Error for RuntimeError {}
