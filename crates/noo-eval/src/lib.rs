//! The tree-walking evaluator for Noolang (C9, §4.9): runtime values, a
//! persistent environment, a runtime trait table, and the evaluator built
//! on top of them.

pub mod builtins;
pub mod env;
pub mod error;
pub mod evaluator;
pub mod traits;
pub mod value;

pub use builtins::initialize_builtins;
pub use env::Env;
pub use error::RuntimeError;
pub use evaluator::{call_value, evaluate_expr, evaluate_program};
pub use traits::Traits;
pub use value::{BuiltinFn, Closure, Value};
