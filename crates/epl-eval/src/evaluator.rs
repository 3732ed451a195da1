//! Core expression evaluator.

use crate::env::Environment;
use crate::error::{EvalError, EvalResult};
use crate::operators::OperatorTable;
use crate::value::{Closure, Reference, Thunk, Value};
use epl_types::{Expr, Procedure};
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// The core evaluator: walks expression nodes and produces Values.
///
/// The evaluator itself holds no per-run state; everything mutable lives in
/// the environment and the reference cells reachable from it.
#[derive(Debug, Clone)]
pub struct Evaluator {
    /// Primitive operators consulted for `Expr::Op`.
    operators: OperatorTable,
}

impl Evaluator {
    /// Create an evaluator over the given operator table.
    pub fn new(operators: OperatorTable) -> Self {
        Self { operators }
    }

    /// The table consulted for `Expr::Op` calls.
    pub fn operators(&self) -> &OperatorTable {
        &self.operators
    }

    /// Mutable access for registering operators after construction.
    pub fn operators_mut(&mut self) -> &mut OperatorTable {
        &mut self.operators
    }

    /// Evaluate `expr` against a fresh, empty root environment.
    #[tracing::instrument(level = "debug", skip_all, fields(kind = expr.kind_name()))]
    pub fn run(&self, expr: &Expr) -> EvalResult<Value> {
        let result = self.eval(expr, &Environment::new());
        if let Err(err) = &result {
            debug!(error = %err, "evaluation failed");
        }
        result
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expression evaluation
    // ══════════════════════════════════════════════════════════════════════

    /// Evaluate an expression in `env`.
    pub fn eval(&self, expr: &Expr, env: &Environment) -> EvalResult<Value> {
        match expr {
            Expr::Literal(lit) => Ok(Value::Literal(*lit)),
            Expr::Var(name) => env
                .lookup_value(name)
                .ok_or_else(|| EvalError::UnboundVariable(name.clone())),
            Expr::Op { op, args } => self.eval_operator(op, args, env),
            Expr::Tuple(children) => Ok(Value::Tuple(self.eval_all(children, env)?)),
            Expr::IsZero(inner) => self.eval_is_zero(inner, env),
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval(cond, env)?.is_true() {
                    self.eval(then_branch, env)
                } else {
                    self.eval(else_branch, env)
                }
            }

            Expr::Let { bindings, body } => self.eval_let(bindings, body, env),
            Expr::LetRec { procs, body } => self.eval_letrec(procs, body, env),

            Expr::Proc(proc) => Ok(Value::Closure(Closure::new(proc, env.clone()))),
            Expr::Call { operator, args } => self.eval_call(operator, args, env),

            Expr::NewRef(inner) => Ok(Value::Ref(Reference::new(self.eval(inner, env)?))),
            Expr::RefVar(name) => env
                .lookup_cell(name)
                .map(Value::Ref)
                .ok_or_else(|| EvalError::UnboundVariable(name.clone())),
            Expr::Deref(inner) => match self.eval(inner, env)? {
                Value::Ref(cell) => Ok(cell.get()),
                other => Err(EvalError::type_mismatch("ref", &other, "deref")),
            },
            Expr::SetRef { target, value } => self.eval_setref(target, value, env),
            Expr::Block(exprs) => self.eval_block(exprs, env),
            Expr::Assign { name, value } => {
                let value = self.eval(value, env)?;
                let cell = env
                    .lookup_cell(name)
                    .ok_or_else(|| EvalError::UnboundVariable(name.clone()))?;
                cell.set(value.clone());
                Ok(value)
            }

            Expr::Lazy(inner) => Ok(Value::Thunk(Thunk {
                expr: Rc::clone(inner),
                env: env.clone(),
            })),
            Expr::Force(inner) => {
                let value = self.eval(inner, env)?;
                self.force(&value)
            }

            Expr::Try { body, var, handler } => self.eval_try(body, var, handler, env),
            Expr::Raise(inner) => {
                let value = self.eval(inner, env)?;
                debug!(value = %value, "raise");
                Err(EvalError::Raised(value))
            }
        }
    }

    /// Evaluate expressions left to right, stopping at the first failure.
    pub fn eval_all(&self, exprs: &[Expr], env: &Environment) -> EvalResult<Vec<Value>> {
        exprs.iter().map(|e| self.eval(e, env)).collect()
    }

    // ── Basics ────────────────────────────────────────────────────────────

    fn eval_operator(&self, op: &str, args: &[Expr], env: &Environment) -> EvalResult<Value> {
        let f = self
            .operators
            .get(op)
            .ok_or_else(|| EvalError::UnknownOperator(op.to_string()))?;
        f(self, env, args)
    }

    fn eval_is_zero(&self, inner: &Expr, env: &Environment) -> EvalResult<Value> {
        let value = self.eval(inner, env)?;
        match value.as_int() {
            Some(n) => Ok(Value::bool(n == 0)),
            None => Err(EvalError::type_mismatch("int", &value, "isz")),
        }
    }

    // ── Binding ───────────────────────────────────────────────────────────

    /// Right-hand sides are evaluated in the outer scope and bound together.
    fn eval_let(
        &self,
        bindings: &BTreeMap<String, Expr>,
        body: &Expr,
        env: &Environment,
    ) -> EvalResult<Value> {
        let mut values = Vec::with_capacity(bindings.len());
        for (name, expr) in bindings {
            values.push((name.as_str(), self.eval(expr, env)?));
        }
        self.eval(body, &env.extend(values))
    }

    /// Every closure captures the scope that binds all of its siblings.
    fn eval_letrec(
        &self,
        procs: &BTreeMap<String, Procedure>,
        body: &Expr,
        env: &Environment,
    ) -> EvalResult<Value> {
        let scope = env.push();
        for (name, proc) in procs {
            let closure = Closure::new(proc, scope.clone());
            scope.bind(name.as_str(), Value::Closure(closure))?;
        }
        self.eval(body, &scope)
    }

    // ── State ─────────────────────────────────────────────────────────────

    fn eval_setref(&self, target: &Expr, value: &Expr, env: &Environment) -> EvalResult<Value> {
        let cell = match self.eval(target, env)? {
            Value::Ref(cell) => cell,
            other => return Err(EvalError::type_mismatch("ref", &other, "setref")),
        };
        let value = self.eval(value, env)?;
        cell.set(value.clone());
        Ok(value)
    }

    fn eval_block(&self, exprs: &[Expr], env: &Environment) -> EvalResult<Value> {
        let mut last = Value::int(0);
        for expr in exprs {
            last = self.eval(expr, env)?;
        }
        Ok(last)
    }

    // ── Laziness ──────────────────────────────────────────────────────────

    /// Evaluate a thunk's expression in its captured environment.
    ///
    /// Nothing is cached: every call re-runs the expression and its effects.
    pub fn force(&self, value: &Value) -> EvalResult<Value> {
        match value {
            Value::Thunk(thunk) => self.eval(&thunk.expr, &thunk.env),
            other => Err(EvalError::type_mismatch("thunk", other, "force")),
        }
    }

    // ── Exceptions ────────────────────────────────────────────────────────

    fn eval_try(
        &self,
        body: &Expr,
        var: &str,
        handler: &Expr,
        env: &Environment,
    ) -> EvalResult<Value> {
        match self.eval(body, env) {
            Err(EvalError::Raised(value)) => {
                debug!(var, value = %value, "caught raised value");
                self.eval(handler, &env.extend([(var, value)]))
            }
            other => other,
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Procedure application
    // ══════════════════════════════════════════════════════════════════════

    fn eval_call(&self, operator: &Expr, args: &[Expr], env: &Environment) -> EvalResult<Value> {
        let closure = match self.eval(operator, env)? {
            Value::Closure(closure) => closure,
            other => {
                return Err(EvalError::NotCallable {
                    got: other.type_name(),
                })
            }
        };
        let args = self.eval_all(args, env)?;
        self.apply_procedure(closure, args)
    }

    /// Apply `closure` to already-evaluated `args`.
    ///
    /// Fewer arguments than parameters yields a partial closure over the
    /// remaining parameters. More arguments than parameters feeds the
    /// remainder to the closure the body returns, repeatedly. A body that
    /// returns a parameterless closure is invoked in turn.
    pub fn apply_procedure(&self, closure: Closure, args: Vec<Value>) -> EvalResult<Value> {
        let mut current = closure;
        let mut args = args;
        let mut consumed = false;

        loop {
            let params = current.params.len();
            trace!(
                procedure = current.name.as_deref().unwrap_or("<anonymous>"),
                params,
                args = args.len(),
                consumed,
                "apply"
            );

            if params == 0 {
                if !args.is_empty() {
                    return Err(EvalError::ArityMismatch {
                        expected: 0,
                        got: args.len(),
                    });
                }
                match self.eval(&current.body, &current.env)? {
                    Value::Closure(next) if next.params.is_empty() => {
                        consumed = true;
                        current = next;
                        continue;
                    }
                    result => return Ok(result),
                }
            }

            if args.is_empty() {
                if consumed {
                    return Ok(Value::Closure(current));
                }
                return Err(EvalError::ArityMismatch {
                    expected: params,
                    got: 0,
                });
            }

            consumed = true;
            let take = params.min(args.len());
            let rest = args.split_off(take);
            let names = current.params[..take].iter().cloned();
            let bound = current.env.extend(names.zip(args));

            if params > take {
                trace!(remaining = params - take, "partial application");
                return Ok(Value::Closure(Closure {
                    name: current.name,
                    params: current.params[take..].to_vec(),
                    body: current.body,
                    env: bound,
                }));
            }

            match self.eval(&current.body, &bound)? {
                Value::Closure(next) => {
                    current = next;
                    args = rest;
                }
                result if rest.is_empty() => return Ok(result),
                result => {
                    return Err(EvalError::ExcessArguments {
                        remaining: rest.len(),
                        got: result.type_name(),
                    });
                }
            }
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(OperatorTable::standard())
    }
}
