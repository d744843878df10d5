//! `TypeEnv` as an explicit lexical scope stack (§10.6(d)), grounded in
//! `snow-typeck::env`, so `where`-expressions and lambda bodies get real
//! lexical shadowing without rebuilding a flat map at every nesting level.

use rustc_hash::{FxHashMap, FxHashSet};

use noo_ast::Scheme;

/// An environment slot: a scheme plus whether the binding is a mutable
/// cell (`mut x = …`, only ever monomorphic per §4.8).
#[derive(Debug, Clone)]
pub struct EnvEntry {
    pub scheme: Scheme,
    pub mutable: bool,
}

impl EnvEntry {
    pub fn immutable(scheme: Scheme) -> Self {
        Self {
            scheme,
            mutable: false,
        }
    }

    pub fn mutable(scheme: Scheme) -> Self {
        Self {
            scheme,
            mutable: true,
        }
    }
}

#[derive(Default)]
pub struct TypeEnv {
    scopes: Vec<FxHashMap<String, EnvEntry>>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self {
            scopes: vec![FxHashMap::default()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
        if self.scopes.is_empty() {
            self.scopes.push(FxHashMap::default());
        }
    }

    pub fn define(&mut self, name: impl Into<String>, entry: EnvEntry) {
        self.scopes
            .last_mut()
            .expect("at least one scope always present")
            .insert(name.into(), entry);
    }

    pub fn lookup(&self, name: &str) -> Option<&EnvEntry> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Free variables of the whole environment, used by `generalize` to
    /// compute which of a value's free variables are *not* already bound
    /// in an outer scope (§4.8, §9: "must compute the free variables of
    /// the environment").
    pub fn free_vars(&self, sub: &crate::subst::Substitution) -> FxHashSet<String> {
        let mut out = FxHashSet::default();
        for scope in &self.scopes {
            for entry in scope.values() {
                let scheme_free = crate::subst::free_vars(&entry.scheme.ty, sub);
                for v in scheme_free {
                    if !entry.scheme.quantified.contains(&v) {
                        out.insert(v);
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noo_ast::Type;

    #[test]
    fn inner_scope_shadows_outer() {
        let mut env = TypeEnv::new();
        env.define("x", EnvEntry::immutable(Scheme::mono(Type::float())));
        env.push_scope();
        env.define("x", EnvEntry::immutable(Scheme::mono(Type::string())));
        assert_eq!(env.lookup("x").unwrap().scheme.ty, Type::string());
        env.pop_scope();
        assert_eq!(env.lookup("x").unwrap().scheme.ty, Type::float());
    }

    #[test]
    fn lookup_misses_after_pop() {
        let mut env = TypeEnv::new();
        env.push_scope();
        env.define("y", EnvEntry::immutable(Scheme::mono(Type::float())));
        env.pop_scope();
        assert!(env.lookup("y").is_none());
    }
}
