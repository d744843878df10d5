//! Pipeline glue for Noolang (§6): `parse`/`type_and_decorate`/`evaluate`
//! as library functions, a `Session` that threads the inference state and
//! runtime environment across calls the way a REPL or batch runner would,
//! and the embedded stdlib bootstrap.
//!
//! Plays the role of `snowc::main.rs`'s `build`/`report_diagnostics` pair
//! stripped of its CLI, codegen, and package-manager concerns (§10.1): the
//! same parse-then-typecheck-then-report shape, with `evaluate` added
//! since this is a tree-walking language, not a compiler emitting object
//! code.

pub mod diagnostics;
pub mod stdlib;

pub use diagnostics::{Diagnostic, DiagnosticKind};

use noo_ast::{Program, Type};
use noo_eval::{Env, RuntimeError, Traits, Value};
use noo_parser::ParseError;
use noo_typeck::{InferError, InferState};

/// `parse(tokens) → Program` (§6) — tokenizing happens inside
/// `noo_parser::parse_source`, so this takes source text directly.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    noo_parser::parse_source(source)
}

/// `typeAndDecorate(program [, initialState]) → { program, state, type }`
/// (§6). The program itself needs no decoration beyond the `state`
/// mutation `infer_program` already performs in place, so this is a thin
/// re-export kept under the spec's own name.
pub fn type_and_decorate(program: &Program, state: &mut InferState) -> Result<Type, InferError> {
    noo_typeck::infer_program(program, state)
}

/// `evaluate(program [, traitRegistry]) → { finalValue, environment }`
/// (§6). `environment` is `env` itself, already mutated in place by
/// top-level definitions; callers that need it afterwards keep their own
/// handle to it.
pub fn evaluate(program: &Program, env: &Env, traits: &Traits) -> Result<Value, RuntimeError> {
    noo_eval::evaluate_program(program, env, traits)
}

/// A running pipeline instance: the type-level state (environment,
/// substitution, trait registry) and the runtime state (environment,
/// trait table) threaded across successive `run`/`check` calls, seeded
/// with the embedded stdlib (§9 `initializeBuiltins` + `loadStdlib`).
pub struct Session {
    pub state: InferState,
    pub env: Env,
    pub traits: Traits,
}

impl Session {
    /// Builds a fresh session and loads the embedded stdlib into it.
    /// Failure here means the stdlib itself is broken, which §9 calls "a
    /// fatal startup error, not a program error" — callers should treat
    /// an `Err` as unrecoverable (log and exit), not retry or report it
    /// to an end user the way a `run`/`check` failure would be.
    pub fn new() -> Result<Self, RuntimeError> {
        let mut state = InferState::new();
        let env = Env::new();
        noo_eval::initialize_builtins(&env);
        let traits = Traits::new();

        let program = parse(stdlib::SOURCE).map_err(|e| RuntimeError::StdlibFailure {
            message: e.to_string(),
        })?;
        type_and_decorate(&program, &mut state).map_err(|e| RuntimeError::StdlibFailure {
            message: e.to_string(),
        })?;
        evaluate(&program, &env, &traits)?;

        Ok(Self { state, env, traits })
    }

    /// Parses and types `source` against the session's accumulated state,
    /// without evaluating it.
    pub fn check(&mut self, source: &str) -> Result<Type, Diagnostic> {
        let program = parse(source).map_err(|e| Diagnostic::from_parse_error(&e, source))?;
        type_and_decorate(&program, &mut self.state).map_err(|e| Diagnostic::from_infer_error(&e, source))
    }

    /// Parses, types, and evaluates `source` against the session's
    /// accumulated state, returning the final value and its type.
    pub fn run(&mut self, source: &str) -> Result<(Value, Type), Diagnostic> {
        let program = parse(source).map_err(|e| Diagnostic::from_parse_error(&e, source))?;
        let ty = type_and_decorate(&program, &mut self.state)
            .map_err(|e| Diagnostic::from_infer_error(&e, source))?;
        let value =
            evaluate(&program, &self.env, &self.traits).map_err(|e| Diagnostic::from_runtime_error(&e, source))?;
        Ok((value, ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_loads_stdlib_without_error() {
        Session::new().expect("stdlib should load");
    }

    #[test]
    fn run_types_and_evaluates_arithmetic() {
        let mut session = Session::new().unwrap();
        let (value, ty) = session.run("1 + 2").unwrap();
        assert_eq!(ty, Type::float());
        assert!(matches!(value, Value::Number(n) if n == 3.0));
    }

    #[test]
    fn run_reports_a_type_error_as_a_diagnostic() {
        let mut session = Session::new().unwrap();
        let err = session.run("1 + \"hello\"").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::Type);
        assert!(!err.rendered.is_empty());
    }

    #[test]
    fn bindings_persist_across_successive_run_calls() {
        let mut session = Session::new().unwrap();
        session.run("id = fn x => x").unwrap();
        let (value, ty) = session.run("id \"hi\"").unwrap();
        assert_eq!(ty, Type::string());
        assert!(matches!(value, Value::String(s) if s == "hi"));
    }

    #[test]
    fn stdlib_constructors_are_usable_from_session_source() {
        let mut session = Session::new().unwrap();
        let (value, ty) = session.run("match Some 1 with (Some x => x + 1; None => 0)").unwrap();
        assert_eq!(ty, Type::float());
        assert!(matches!(value, Value::Number(n) if n == 2.0));
    }
}
