//! Shared types for the EPL interpreter.
//!
//! This crate defines the expression tree handed to the evaluator, the
//! literal type, construction helpers, and the textual renderings used for
//! diagnostics (one-line concrete syntax and the indented [`Printable`]
//! tree).

pub mod ast;
mod printable;
mod repr;

pub use ast::{Expr, Literal, Procedure};
pub use printable::Printable;
