//! `initializeBuiltins` (§4.8, §9): installs primitive constructors and a
//! small set of native combinators (`compose`, `map`, `filter`, `reduce`,
//! `toString`) ahead of `loadStdlib`'s bundled source. Grounded in
//! `mesh-typeck::builtins`'s shape of seeding the base environment before
//! any user or stdlib source is typed.

use noo_ast::{EffectSet, Scheme, Type};

use crate::env::{EnvEntry, TypeEnv};

pub fn initialize_builtins(env: &mut TypeEnv) {
    env.define("True", EnvEntry::immutable(Scheme::mono(Type::bool())));
    env.define("False", EnvEntry::immutable(Scheme::mono(Type::bool())));

    // compose : (b -> c) -> (a -> b) -> a -> c
    let compose_ty = Type::function(
        vec![Type::function(
            vec![Type::variable("b")],
            Type::variable("c"),
            EffectSet::new(),
        )],
        Type::function(
            vec![Type::function(vec![Type::variable("a")], Type::variable("b"), EffectSet::new())],
            Type::function(vec![Type::variable("a")], Type::variable("c"), EffectSet::new()),
            EffectSet::new(),
        ),
        EffectSet::new(),
    );
    env.define(
        "compose",
        EnvEntry::immutable(Scheme {
            quantified: vec!["a".into(), "b".into(), "c".into()],
            ty: compose_ty,
        }),
    );

    // map : (a -> b) -> List a -> List b
    let map_ty = Type::function(
        vec![Type::function(vec![Type::variable("a")], Type::variable("b"), EffectSet::new())],
        Type::function(
            vec![Type::list(Type::variable("a"))],
            Type::list(Type::variable("b")),
            EffectSet::new(),
        ),
        EffectSet::new(),
    );
    env.define(
        "map",
        EnvEntry::immutable(Scheme {
            quantified: vec!["a".into(), "b".into()],
            ty: map_ty,
        }),
    );

    // filter : (a -> Bool) -> List a -> List a
    let filter_ty = Type::function(
        vec![Type::function(vec![Type::variable("a")], Type::bool(), EffectSet::new())],
        Type::function(
            vec![Type::list(Type::variable("a"))],
            Type::list(Type::variable("a")),
            EffectSet::new(),
        ),
        EffectSet::new(),
    );
    env.define(
        "filter",
        EnvEntry::immutable(Scheme {
            quantified: vec!["a".into()],
            ty: filter_ty,
        }),
    );

    // reduce : (b -> a -> b) -> b -> List a -> b
    let reduce_ty = Type::function(
        vec![Type::function(
            vec![Type::variable("b"), Type::variable("a")],
            Type::variable("b"),
            EffectSet::new(),
        )],
        Type::function(
            vec![Type::variable("b")],
            Type::function(
                vec![Type::list(Type::variable("a"))],
                Type::variable("b"),
                EffectSet::new(),
            ),
            EffectSet::new(),
        ),
        EffectSet::new(),
    );
    env.define(
        "reduce",
        EnvEntry::immutable(Scheme {
            quantified: vec!["a".into(), "b".into()],
            ty: reduce_ty,
        }),
    );

    // toString : a -> String — used by the stdlib's `Show` instances
    // (`show = toString`), accepted without arity validation since it is
    // referenced by name rather than defined as a lambda (§4.7).
    env.define(
        "toString",
        EnvEntry::immutable(Scheme {
            quantified: vec!["a".into()],
            ty: Type::function(vec![Type::variable("a")], Type::string(), EffectSet::new()),
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installs_expected_names() {
        let mut env = TypeEnv::new();
        initialize_builtins(&mut env);
        for name in ["True", "False", "compose", "map", "filter", "reduce", "toString"] {
            assert!(env.lookup(name).is_some(), "missing builtin {name}");
        }
    }
}
