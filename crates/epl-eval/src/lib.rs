//! EPL tree-walking evaluator.
//!
//! Evaluates an [`epl_types::Expr`] tree against a lexical [`Environment`],
//! producing a [`Value`] or an [`EvalError`].
//!
//! # Semantics
//!
//! - Bindings map names to shared reference cells; `set`, `setref` and
//!   call-by-reference (`ref x`) mutate cells in place.
//! - Procedure application curries: fewer arguments yield a partial
//!   closure, surplus arguments are fed to whatever the body returns.
//! - `lazy(e)` captures `e` unevaluated; every `force` re-runs it.
//! - `raise v` produces [`EvalError::Raised`], the only failure a `try`
//!   intercepts.
//!
//! Primitive operators (`+`, `-`, ...) come from a pluggable
//! [`OperatorTable`].

pub mod env;
pub mod error;
pub mod evaluator;
pub mod operators;
pub mod value;

pub use env::Environment;
pub use error::{EvalError, EvalResult};
pub use evaluator::Evaluator;
pub use operators::{OperatorFn, OperatorTable};
pub use value::{Closure, Reference, Thunk, Value};
