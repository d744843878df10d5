//! Expression and pattern AST (§3.3). A direct tagged union, built
//! straight off the token stream by the parser rather than through an
//! intermediate lossless syntax tree (see SPEC_FULL.md §10.1).

use noo_common::Location;

use crate::types::{Constraint, Type};

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: Location,
}

impl Expr {
    pub fn new(kind: ExprKind, location: Location) -> Self {
        Self { kind, location }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    /// `|` — thrush: `x | f` ≡ `f x`.
    Thrush,
    /// `|?` — safe thrush, short-circuits on a `None`/`Err` left side.
    SafeThrush,
    /// `$` — right-associative, lowest-precedence application.
    Dollar,
    /// `;` — sequence; evaluates to the right operand.
    Sequence,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Thrush => "|",
            BinOp::SafeThrush => "|?",
            BinOp::Dollar => "$",
            BinOp::Sequence => ";",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeOp {
    /// `|>` — left-to-right: `a |> f` ≡ `f a`.
    Forward,
    /// `<|` — right-to-left: `f <| a` ≡ `f a`.
    Backward,
}

/// A lambda parameter. Noolang lambda parameters are plain names (§4.8:
/// "bind each parameter to a fresh variable"); destructuring of composite
/// arguments happens through a top-level `TupleDestructuring`/
/// `RecordDestructuring` definition instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchCase {
    pub pattern: Pattern,
    pub body: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantCtorDef {
    pub name: String,
    pub location: Location,
    /// Argument types the constructor takes, e.g. `Some a` has one arg.
    pub args: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Number(f64),
    Str(String),
    Variable(String),
    List(Vec<Expr>),
    /// `{@name expr, …}` — named fields only.
    Record(Vec<(String, Expr)>),
    /// `{expr, …}` — positional fields only.
    Tuple(Vec<Expr>),
    /// `{}` — zero fields.
    Unit,
    /// `@field` / `@field?` (the safe-access marker).
    Accessor { field: String, safe: bool },
    /// `fn p… => body`. `annotation` is the whole-function type annotation
    /// hoisted here from a trailing `body : FunctionType` per §4.4's
    /// postfix-annotation hoisting rule.
    Function {
        params: Vec<Param>,
        body: Box<Expr>,
        annotation: Option<Type>,
    },
    Application {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Match {
        scrutinee: Box<Expr>,
        cases: Vec<MatchCase>,
    },
    /// `expr where (defs)` — `defs` evaluated/typed in order, binding into
    /// a fresh scope that `expr` is then evaluated/typed in.
    Where {
        body: Box<Expr>,
        defs: Vec<Expr>,
    },
    Definition {
        name: String,
        value: Box<Expr>,
    },
    MutableDefinition {
        name: String,
        value: Box<Expr>,
    },
    /// `mut! name = value`.
    Mutation {
        name: String,
        value: Box<Expr>,
    },
    Typed {
        expr: Box<Expr>,
        ty: Type,
    },
    Constrained {
        expr: Box<Expr>,
        ty: Type,
        given: Constraint,
    },
    Import {
        path: String,
    },
    TupleDestructuring {
        names: Vec<String>,
        value: Box<Expr>,
    },
    RecordDestructuring {
        /// `(field name, bound local name)` pairs.
        fields: Vec<(String, String)>,
        value: Box<Expr>,
    },
    /// `variant Name args = Ctor args | …` (ADT definition).
    TypeDefinition {
        name: String,
        params: Vec<String>,
        variants: Vec<VariantCtorDef>,
    },
    /// `type Name args = …` for record/tuple/union type aliases.
    UserDefinedType {
        name: String,
        params: Vec<String>,
        body: Type,
    },
    ConstraintDefinition {
        name: String,
        type_params: Vec<String>,
        functions: Vec<(String, Type)>,
    },
    ImplementDefinition {
        trait_name: String,
        for_type: Type,
        given: Option<Constraint>,
        functions: Vec<(String, Expr)>,
    },
    Pipeline {
        steps: Vec<Expr>,
        operators: Vec<PipeOp>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub kind: PatternKind,
    pub location: Location,
}

impl Pattern {
    pub fn new(kind: PatternKind, location: Location) -> Self {
        Self { kind, location }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternKind {
    Wildcard,
    Number(f64),
    Str(String),
    Variable(String),
    Constructor(String, Vec<Pattern>),
    Tuple(Vec<Pattern>),
    Record(Vec<(String, Pattern)>),
}

/// `Program { statements, location }` (§6).
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Expr>,
    pub location: Location,
}
