//! Tagged-union type representation (§3.2, §4.1).
//!
//! A type variable's constraint bag is an interior-mutable cell
//! (`Rc<RefCell<Vec<Constraint>>>`) rather than a field rebuilt on every
//! substitution, per the design notes in §9: "represent a Variable as an
//! interior-mutable cell … so constraints can be appended during
//! unification without cloning whole subtrees."

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

/// The closed set of primitive, nullary type names (§3.2). `List` appears
/// here too for the bare, unapplied list type constructor the type
/// grammar's `'List' atom?` production can produce when no element atom
/// follows (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Float,
    String,
    Bool,
    List,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Float => "Float",
            Primitive::String => "String",
            Primitive::Bool => "Bool",
            Primitive::List => "List",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Float" => Some(Primitive::Float),
            "String" => Some(Primitive::String),
            "Bool" => Some(Primitive::Bool),
            "List" => Some(Primitive::List),
            _ => None,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The closed effect set (§3.2, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Effect {
    Log,
    Read,
    Write,
    State,
    Time,
    Rand,
    Ffi,
    Async,
}

impl Effect {
    pub const ALL: &'static [Effect] = &[
        Effect::Log,
        Effect::Read,
        Effect::Write,
        Effect::State,
        Effect::Time,
        Effect::Rand,
        Effect::Ffi,
        Effect::Async,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Effect::Log => "log",
            Effect::Read => "read",
            Effect::Write => "write",
            Effect::State => "state",
            Effect::Time => "time",
            Effect::Rand => "rand",
            Effect::Ffi => "ffi",
            Effect::Async => "async",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.name() == name)
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub type EffectSet = BTreeSet<Effect>;

/// A type variable's own constraint bag (§3.2's `Variable(name,
/// constraints)`), shared by every occurrence of the same variable so
/// constraints discovered during unification become visible everywhere
/// the variable appears without re-walking the type graph.
#[derive(Clone)]
pub struct TypeVar {
    pub name: String,
    pub constraints: Rc<RefCell<Vec<Constraint>>>,
}

impl TypeVar {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraints: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn with_constraints(name: impl Into<String>, constraints: Vec<Constraint>) -> Self {
        Self {
            name: name.into(),
            constraints: Rc::new(RefCell::new(constraints)),
        }
    }

    pub fn push_constraint(&self, c: Constraint) {
        let mut bag = self.constraints.borrow_mut();
        if !bag.iter().any(|existing| constraints_equal(existing, &c)) {
            bag.push(c);
        }
    }

    pub fn constraints_snapshot(&self) -> Vec<Constraint> {
        self.constraints.borrow().clone()
    }
}

impl fmt::Debug for TypeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeVar({})", self.name)
    }
}

/// Structural equality ignores the constraint bag — two occurrences of
/// the same variable name are the same type regardless of what has been
/// discovered about them so far (§4.5: "`typesEqual` … ignores
/// `constraints` fields on variables").
impl PartialEq for TypeVar {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for TypeVar {}

/// A `Type`, per §3.2.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Primitive(Primitive),
    Variable(TypeVar),
    Function {
        params: Vec<Type>,
        ret: Box<Type>,
        effects: EffectSet,
        constraints: Option<Vec<Constraint>>,
    },
    List(Box<Type>),
    Tuple(Vec<Type>),
    Record(BTreeMap<String, Type>),
    Variant(String, Vec<Type>),
    Unit,
    Constrained(Box<Type>, BTreeMap<String, Vec<Constraint>>),
    Unknown,
}

impl Type {
    pub fn float() -> Type {
        Type::Primitive(Primitive::Float)
    }
    pub fn string() -> Type {
        Type::Primitive(Primitive::String)
    }
    pub fn bool() -> Type {
        Type::Primitive(Primitive::Bool)
    }
    pub fn bare_list() -> Type {
        Type::Primitive(Primitive::List)
    }
    pub fn unit() -> Type {
        Type::Unit
    }
    pub fn list(elem: Type) -> Type {
        Type::List(Box::new(elem))
    }
    pub fn tuple(elems: Vec<Type>) -> Type {
        Type::Tuple(elems)
    }
    pub fn record(fields: BTreeMap<String, Type>) -> Type {
        Type::Record(fields)
    }
    pub fn variant(name: impl Into<String>, args: Vec<Type>) -> Type {
        Type::Variant(name.into(), args)
    }
    pub fn variable(name: impl Into<String>) -> Type {
        Type::Variable(TypeVar::new(name))
    }
    pub fn function(params: Vec<Type>, ret: Type, effects: EffectSet) -> Type {
        Type::Function {
            params,
            ret: Box::new(ret),
            effects,
            constraints: None,
        }
    }
    pub fn function_with_constraints(
        params: Vec<Type>,
        ret: Type,
        effects: EffectSet,
        constraints: Vec<Constraint>,
    ) -> Type {
        Type::Function {
            params,
            ret: Box::new(ret),
            effects,
            constraints: if constraints.is_empty() {
                None
            } else {
                Some(constraints)
            },
        }
    }

    /// Wraps `base` in `Constrained` unless `constraints` is empty, in
    /// which case it collapses to the bare base type (§3.5 invariant: "A
    /// `Constrained(base, constraints)` never has empty `constraints`;
    /// empty collapses to `base`").
    pub fn constrained(base: Type, constraints: BTreeMap<String, Vec<Constraint>>) -> Type {
        let constraints: BTreeMap<_, _> = constraints
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .collect();
        if constraints.is_empty() {
            base
        } else {
            Type::Constrained(Box::new(base), constraints)
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Type::Function { .. })
    }

    /// `getTypeName` (§4.7): the canonical name the trait registry keys
    /// implementations by. Returns `None` for types with no fixed
    /// constructor name (variables, `Unknown`, `Constrained`).
    pub fn type_name(&self) -> Option<String> {
        match self {
            Type::Primitive(p) => Some(p.name().to_string()),
            Type::List(_) => Some("List".to_string()),
            Type::Tuple(_) => Some("Tuple".to_string()),
            Type::Record(_) => Some("Record".to_string()),
            Type::Unit => Some("Unit".to_string()),
            Type::Function { .. } => Some("Function".to_string()),
            Type::Variant(name, _) => Some(name.clone()),
            Type::Variable(v) => Some(v.name.clone()),
            Type::Constrained(base, _) => base.type_name(),
            Type::Unknown => None,
        }
    }
}

/// `constraintsEqual` (§4.5): structural comparison of constraint shapes.
pub fn constraints_equal(a: &Constraint, b: &Constraint) -> bool {
    a == b
}

/// `typesEqual` (§4.5): structural equality that ignores a variable's
/// constraint bag. Delegates to `Type`'s `PartialEq`, whose `Variable`
/// case in turn delegates to `TypeVar`'s name-only `PartialEq`.
pub fn types_equal(a: &Type, b: &Type) -> bool {
    a == b
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut aliaser = VarAliaser::default();
        write!(f, "{}", render_type(self, &mut aliaser))
    }
}

/// Assigns stable, human-readable aliases (α, β, …) to type variables in
/// first-seen order within a single render, matching §4.5's
/// "`typeToString` renders human-readable types with consistent variable
/// aliasing" and grounded in `mesh-typeck::ty`'s `Display for Ty`.
#[derive(Default)]
pub struct VarAliaser {
    seen: Vec<String>,
}

impl VarAliaser {
    pub fn alias(&mut self, name: &str) -> String {
        if let Some(idx) = self.seen.iter().position(|n| n == name) {
            alias_letter(idx)
        } else {
            let idx = self.seen.len();
            self.seen.push(name.to_string());
            alias_letter(idx)
        }
    }
}

fn alias_letter(idx: usize) -> String {
    const GREEK: &[char] = &['α', 'β', 'γ', 'δ', 'ε', 'ζ', 'η', 'θ'];
    match GREEK.get(idx) {
        Some(c) => c.to_string(),
        None => format!("τ{idx}"),
    }
}

pub fn render_type(ty: &Type, aliaser: &mut VarAliaser) -> String {
    match ty {
        Type::Primitive(p) => p.to_string(),
        Type::Variable(v) => aliaser.alias(&v.name),
        Type::Unit => "Unit".to_string(),
        Type::Unknown => "?".to_string(),
        Type::List(elem) => format!("List {}", render_type(elem, aliaser)),
        Type::Tuple(elems) => {
            let parts: Vec<_> = elems.iter().map(|e| render_type(e, aliaser)).collect();
            format!("{{{}}}", parts.join(", "))
        }
        Type::Record(fields) => {
            let parts: Vec<_> = fields
                .iter()
                .map(|(name, t)| format!("@{name} {}", render_type(t, aliaser)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        Type::Variant(name, args) => {
            if args.is_empty() {
                name.clone()
            } else {
                let parts: Vec<_> = args.iter().map(|a| render_type(a, aliaser)).collect();
                format!("{name} {}", parts.join(" "))
            }
        }
        Type::Function {
            params,
            ret,
            effects,
            constraints,
        } => {
            let params_str: Vec<_> = params.iter().map(|p| render_type(p, aliaser)).collect();
            let mut rendered = if params_str.len() == 1 {
                format!("{} -> {}", params_str[0], render_type(ret, aliaser))
            } else {
                format!(
                    "({}) -> {}",
                    params_str.join(", "),
                    render_type(ret, aliaser)
                )
            };
            for e in effects {
                rendered.push_str(&format!(" !{e}"));
            }
            if let Some(cs) = constraints {
                rendered.push_str(&render_given(cs, aliaser));
            }
            rendered
        }
        Type::Constrained(base, constraints) => {
            let base_str = render_type(base, aliaser);
            let all: Vec<Constraint> = constraints.values().flatten().cloned().collect();
            format!("{base_str}{}", render_given(&all, aliaser))
        }
    }
}

fn render_given(constraints: &[Constraint], aliaser: &mut VarAliaser) -> String {
    if constraints.is_empty() {
        return String::new();
    }
    let parts: Vec<_> = constraints
        .iter()
        .map(|c| render_constraint(c, aliaser))
        .collect();
    format!(" given {}", parts.join(" and "))
}

fn render_constraint(c: &Constraint, aliaser: &mut VarAliaser) -> String {
    match c {
        Constraint::Is(v, name) => format!("{} is {}", aliaser.alias(v), name),
        Constraint::HasField(v, field, ty) => {
            format!(
                "{} has {{@{} {}}}",
                aliaser.alias(v),
                field,
                render_type(ty, aliaser)
            )
        }
        Constraint::Has(v, structure) => {
            let parts: Vec<_> = structure
                .fields
                .iter()
                .map(|(f, t)| format!("@{f} {}", render_type(t, aliaser)))
                .collect();
            format!("{} has {{{}}}", aliaser.alias(v), parts.join(", "))
        }
        Constraint::Implements(v, trait_name) => {
            format!("{} implements {}", aliaser.alias(v), trait_name)
        }
        Constraint::And(l, r) => format!(
            "{} and {}",
            render_constraint(l, aliaser),
            render_constraint(r, aliaser)
        ),
        Constraint::Or(l, r) => format!(
            "{} or {}",
            render_constraint(l, aliaser),
            render_constraint(r, aliaser)
        ),
        Constraint::Paren(inner) => format!("({})", render_constraint(inner, aliaser)),
    }
}

/// `{@f1 T1, @f2 T2, …}` row-style shape constraint (§3.2 `Has`).
#[derive(Debug, Clone, PartialEq)]
pub struct RecordStructure {
    pub fields: BTreeMap<String, Type>,
}

/// A `Constraint`, per §3.2. Identifies its type variable by name rather
/// than by live `TypeVar` handle, since constraints travel through
/// declared signatures (where only a name is known, e.g. the `a` in
/// `a -> a given a implements T`) as often as through live inference
/// state.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Is(String, String),
    HasField(String, String, Type),
    Has(String, RecordStructure),
    Implements(String, String),
    And(Box<Constraint>, Box<Constraint>),
    Or(Box<Constraint>, Box<Constraint>),
    Paren(Box<Constraint>),
}

impl Constraint {
    /// The name of the type variable this constraint is about — `None`
    /// for the `And`/`Or`/`Paren` combinators, which have no single
    /// variable of their own.
    pub fn type_var_name(&self) -> Option<&str> {
        match self {
            Constraint::Is(v, _)
            | Constraint::HasField(v, _, _)
            | Constraint::Has(v, _)
            | Constraint::Implements(v, _) => Some(v),
            Constraint::And(_, _) | Constraint::Or(_, _) | Constraint::Paren(_) => None,
        }
    }
}

/// `TypeScheme = { quantifiedVars: [Name], type: Type }` (§3.2). Schemes
/// only live in the environment; values carry plain `Type`s.
#[derive(Debug, Clone, PartialEq)]
pub struct Scheme {
    pub quantified: Vec<String>,
    pub ty: Type,
}

impl Scheme {
    /// A monomorphic scheme with no quantified variables.
    pub fn mono(ty: Type) -> Self {
        Self {
            quantified: Vec::new(),
            ty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn types_equal_ignores_variable_constraints() {
        let a = TypeVar::new("a");
        a.push_constraint(Constraint::Implements("a".into(), "Show".into()));
        let b = TypeVar::new("a");
        assert!(types_equal(&Type::Variable(a), &Type::Variable(b)));
    }

    #[test]
    fn constrained_with_no_constraints_collapses_to_base() {
        let ty = Type::constrained(Type::float(), BTreeMap::new());
        assert_eq!(ty, Type::float());
    }

    #[test]
    fn get_type_name_variants() {
        assert_eq!(Type::float().type_name().as_deref(), Some("Float"));
        assert_eq!(
            Type::list(Type::float()).type_name().as_deref(),
            Some("List")
        );
        assert_eq!(
            Type::variant("Option", vec![Type::float()])
                .type_name()
                .as_deref(),
            Some("Option")
        );
    }

    #[test]
    fn display_function_with_effects_and_constraints() {
        let ty = Type::function_with_constraints(
            vec![Type::variable("a")],
            Type::variable("a"),
            BTreeSet::from([Effect::Log]),
            vec![Constraint::Implements("a".into(), "Show".into())],
        );
        assert_eq!(ty.to_string(), "α -> α !log given α implements Show");
    }

    #[test]
    fn push_constraint_deduplicates() {
        let v = TypeVar::new("a");
        v.push_constraint(Constraint::Implements("a".into(), "Show".into()));
        v.push_constraint(Constraint::Implements("a".into(), "Show".into()));
        assert_eq!(v.constraints_snapshot().len(), 1);
    }
}
