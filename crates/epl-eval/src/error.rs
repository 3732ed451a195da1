//! Runtime failure kinds for the EPL evaluator.

use crate::value::Value;
use thiserror::Error;

/// Evaluation failure.
///
/// Only [`EvalError::Raised`] is catchable by `try`; every other kind is an
/// interpreter-level fault that propagates to the caller unchanged.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// Variable, `set`, or `ref` target not bound in any enclosing scope.
    #[error("unbound variable: {0}")]
    UnboundVariable(String),

    /// Operator call against a name missing from the operator table.
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    /// A value of the wrong shape reached an operation.
    #[error("type mismatch in {context}: expected {expected}, got {got}")]
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
        context: String,
    },

    /// The operator position of a call did not evaluate to a procedure.
    #[error("not callable: {got}")]
    NotCallable { got: &'static str },

    /// Wrong number of arguments for a procedure or operator.
    #[error("arity mismatch: expected {expected} arguments, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    /// Arguments left over after a procedure returned a non-procedure.
    #[error("excess arguments: {remaining} left after procedure returned {got}")]
    ExcessArguments { remaining: usize, got: &'static str },

    /// Division by zero or integer overflow.
    #[error("arithmetic trap: {0}")]
    ArithmeticTrap(String),

    /// A name bound twice in the same scope.
    #[error("duplicate binding: {0}")]
    DuplicateBinding(String),

    /// A user-level exception produced by `raise`.
    #[error("raised value: {0}")]
    Raised(Value),
}

impl EvalError {
    /// Build a [`EvalError::TypeMismatch`] from the offending value.
    pub fn type_mismatch(
        expected: &'static str,
        got: &Value,
        context: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            expected,
            got: got.type_name(),
            context: context.into(),
        }
    }

    /// True only for failures a `try` may intercept.
    pub fn is_catchable(&self) -> bool {
        matches!(self, Self::Raised(_))
    }

    /// The payload of a raised failure.
    pub fn raised_value(&self) -> Option<&Value> {
        match self {
            Self::Raised(v) => Some(v),
            _ => None,
        }
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_raised_is_catchable() {
        assert!(EvalError::Raised(Value::int(1)).is_catchable());
        assert!(!EvalError::UnboundVariable("x".into()).is_catchable());
        let arity = EvalError::ArityMismatch {
            expected: 1,
            got: 0,
        };
        assert!(!arity.is_catchable());
        let trap = EvalError::ArithmeticTrap("division by zero".into());
        assert!(!trap.is_catchable());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            EvalError::Raised(Value::int(100)).to_string(),
            "raised value: 100"
        );
        assert_eq!(
            EvalError::UnboundVariable("y".into()).to_string(),
            "unbound variable: y"
        );
        assert_eq!(
            EvalError::type_mismatch("ref", &Value::bool(true), "deref").to_string(),
            "type mismatch in deref: expected ref, got bool"
        );
    }
}
