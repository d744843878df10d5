//! The embedded stdlib program (§4.8/§9/§10.6): `Option`/`Result` as
//! `variant` ADTs, a `Show` trait with `Float`/`String`/`Bool`
//! implementations, and `Functor`/`Monad` traits with `Option`
//! implementations. Typed and evaluated once at `Session` construction
//! time through the same `infer_program`/`evaluate_program` entry points
//! user source runs through (§9: "load the stdlib program from an
//! embedded string at startup; typing it once during registry
//! initialisation produces the base environment").
//!
//! `Functor`/`Monad` are declared over a single type parameter standing
//! for `Option`'s element type rather than a generic container variable:
//! the type grammar (`noo-parser::parser::types`) has no type-application
//! atom for a lowercase name (`f a` does not parse — only uppercase
//! variant names consume following atoms as arguments), so a
//! `constraint Functor f (map : (a -> b) -> f a -> f b)`-shaped
//! declaration is not expressible. This is recorded as an open-question
//! resolution in DESIGN.md.
//!
//! `Functor`'s method is named `fmap`, not `map`: `noo_typeck::builtins`
//! already binds `map` to the native `(a -> b) -> List a -> List b`
//! combinator, and `TypeEnv::define` has no notion of per-trait overload
//! sets — it is an unconditional insert, the same one ordinary
//! let-rebinding relies on for shadowing. A `constraint Functor a (map :
//! …)` would silently replace the builtin's environment entry the moment
//! the stdlib loads, breaking `map` over `List` for the rest of the
//! session.
pub const SOURCE: &str = r#"
variant Option a = Some a | None;
variant Result a b = Ok a | Err b;

constraint Show a (show : a -> String);
implement Show Float (show = toString);
implement Show String (show = fn x => x);
implement Show Bool (show = fn x => if x then "true" else "false");

constraint Functor a (fmap : (a -> a) -> Option a -> Option a);
implement Functor Option (
  fmap = fn f opt => match opt with (Some x => Some (f x); None => None)
);

constraint Monad a (bind : Option a -> (a -> Option a) -> Option a);
implement Monad Option (
  bind = fn opt f => match opt with (Some x => f x; None => None)
);
"#;

#[cfg(test)]
mod tests {
    use super::SOURCE;

    #[test]
    fn parses_on_its_own() {
        noo_parser::parse_source(SOURCE).expect("stdlib source must parse");
    }

    #[test]
    fn type_checks_and_evaluates() {
        let program = noo_parser::parse_source(SOURCE).unwrap();
        let mut state = noo_typeck::InferState::new();
        noo_typeck::infer_program(&program, &mut state).expect("stdlib must type-check");

        let env = noo_eval::Env::new();
        noo_eval::initialize_builtins(&env);
        let traits = noo_eval::Traits::new();
        noo_eval::evaluate_program(&program, &env, &traits).expect("stdlib must evaluate");

        assert!(env.lookup("Some").is_some());
        assert!(env.lookup("None").is_some());
        assert!(env.lookup("Ok").is_some());
        assert!(env.lookup("Err").is_some());
    }
}
