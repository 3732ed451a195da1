//! Primitive operator plug-in table.
//!
//! Operators receive their argument expressions unevaluated, together with
//! the evaluator and the current environment, and decide how and when to
//! evaluate them.

use crate::env::Environment;
use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::value::Value;
use epl_types::Expr;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A primitive operator implementation.
pub type OperatorFn = Rc<dyn Fn(&Evaluator, &Environment, &[Expr]) -> EvalResult<Value>>;

/// Name → operator registry consulted for `Expr::Op` nodes.
#[derive(Clone, Default)]
pub struct OperatorTable {
    ops: BTreeMap<String, OperatorFn>,
}

impl OperatorTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The integer arithmetic operators `+`, `-`, `*`, `/`.
    pub fn standard() -> Self {
        Self::new()
            .with("+", sum)
            .with("-", difference)
            .with("*", product)
            .with("/", quotient)
    }

    /// Register `f` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Evaluator, &Environment, &[Expr]) -> EvalResult<Value> + 'static,
    {
        let name = name.into();
        tracing::debug!(operator = %name, "registering operator");
        self.ops.insert(name, Rc::new(f));
    }

    /// Builder form of [`OperatorTable::register`].
    pub fn with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Evaluator, &Environment, &[Expr]) -> EvalResult<Value> + 'static,
    {
        self.register(name, f);
        self
    }

    pub fn get(&self, name: &str) -> Option<&OperatorFn> {
        self.ops.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ops.keys().map(String::as_str)
    }
}

impl fmt::Debug for OperatorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Standard arithmetic
// ══════════════════════════════════════════════════════════════════════════════

/// Evaluate one operand and require an integer.
fn int_operand(eval: &Evaluator, env: &Environment, arg: &Expr, op: &str) -> EvalResult<i64> {
    let value = eval.eval(arg, env)?;
    match value.as_int() {
        Some(n) => Ok(n),
        None => {
            let context = format!("operator '{op}'");
            Err(EvalError::type_mismatch("int", &value, context))
        }
    }
}

fn expect_operands(args: &[Expr], expected: usize) -> EvalResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(EvalError::ArityMismatch {
            expected,
            got: args.len(),
        })
    }
}

fn overflow(op: &str) -> EvalError {
    EvalError::ArithmeticTrap(format!("integer overflow in '{op}'"))
}

fn sum(eval: &Evaluator, env: &Environment, args: &[Expr]) -> EvalResult<Value> {
    let mut total: i64 = 0;
    for arg in args {
        let n = int_operand(eval, env, arg, "+")?;
        total = total.checked_add(n).ok_or_else(|| overflow("+"))?;
    }
    Ok(Value::int(total))
}

fn product(eval: &Evaluator, env: &Environment, args: &[Expr]) -> EvalResult<Value> {
    let mut total: i64 = 1;
    for arg in args {
        let n = int_operand(eval, env, arg, "*")?;
        total = total.checked_mul(n).ok_or_else(|| overflow("*"))?;
    }
    Ok(Value::int(total))
}

fn difference(eval: &Evaluator, env: &Environment, args: &[Expr]) -> EvalResult<Value> {
    expect_operands(args, 2)?;
    let a = int_operand(eval, env, &args[0], "-")?;
    let b = int_operand(eval, env, &args[1], "-")?;
    a.checked_sub(b).map(Value::int).ok_or_else(|| overflow("-"))
}

fn quotient(eval: &Evaluator, env: &Environment, args: &[Expr]) -> EvalResult<Value> {
    expect_operands(args, 2)?;
    let a = int_operand(eval, env, &args[0], "/")?;
    let b = int_operand(eval, env, &args[1], "/")?;
    if b == 0 {
        return Err(EvalError::ArithmeticTrap("division by zero".into()));
    }
    a.checked_div(b).map(Value::int).ok_or_else(|| overflow("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(expr: Expr) -> EvalResult<Value> {
        Evaluator::new(OperatorTable::standard()).run(&expr)
    }

    #[test]
    fn test_standard_names() {
        let table = OperatorTable::standard();
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["*", "+", "-", "/"]);
        assert!(!table.contains("isz"));
    }

    #[test]
    fn test_variadic_sum_and_product() {
        assert_eq!(run(Expr::op("+", [1, 2, 3, 4])).ok(), Some(Value::int(10)));
        let empty = Vec::<Expr>::new;
        assert_eq!(run(Expr::op("+", empty())).ok(), Some(Value::int(0)));
        assert_eq!(run(Expr::op("*", [2, 3, 4])).ok(), Some(Value::int(24)));
        assert_eq!(run(Expr::op("*", empty())).ok(), Some(Value::int(1)));
    }

    #[test]
    fn test_difference_requires_two_operands() {
        assert_eq!(run(Expr::op("-", [10, 4])).ok(), Some(Value::int(6)));
        assert!(matches!(
            run(Expr::op("-", [1])),
            Err(EvalError::ArityMismatch {
                expected: 2,
                got: 1,
            })
        ));
    }

    #[test]
    fn test_quotient_truncates_and_traps() {
        assert_eq!(run(Expr::op("/", [7, 2])).ok(), Some(Value::int(3)));
        assert_eq!(run(Expr::op("/", [-7, 2])).ok(), Some(Value::int(-3)));
        assert!(matches!(
            run(Expr::op("/", [1, 0])),
            Err(EvalError::ArithmeticTrap(_))
        ));
    }

    #[test]
    fn test_overflow_traps() {
        let e = Expr::op("+", [Expr::int(i64::MAX), Expr::int(1)]);
        assert!(matches!(run(e), Err(EvalError::ArithmeticTrap(_))));
    }

    #[test]
    fn test_non_integer_operand() {
        let err = run(Expr::op("+", [Expr::int(1), Expr::bool(true)])).unwrap_err();
        assert!(matches!(
            err,
            EvalError::TypeMismatch {
                expected: "int",
                got: "bool",
                ..
            }
        ));
    }

    #[test]
    fn test_custom_operator_controls_evaluation() {
        // Evaluates only its first operand.
        let table = OperatorTable::standard().with(
            "first",
            |eval: &Evaluator, env: &Environment, args: &[Expr]| eval.eval(&args[0], env),
        );
        let e = Expr::op("first", [Expr::int(1), Expr::var("unbound")]);
        assert_eq!(Evaluator::new(table).run(&e).ok(), Some(Value::int(1)));
    }
}
