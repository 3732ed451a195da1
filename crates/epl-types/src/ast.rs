//! Expression tree for the EPL language family.
//!
//! The tree is immutable once built and is consumed read-only by the
//! evaluator. Recursive variants are boxed; procedure bodies and lazy
//! expressions are reference-counted because closures and thunks keep
//! them alive after the enclosing node has been evaluated.
//!
//! [`BTreeMap`] is used for `let`/`letrec` bindings: names within one
//! binding group are unique and iteration order is deterministic.
//!
//! Deserialization enforces the same invariants as the builders: unique
//! parameter names, unique binding names, and `letrec` procedures whose
//! recorded name matches their key.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

// ══════════════════════════════════════════════════════════════════════════════
// Literals
// ══════════════════════════════════════════════════════════════════════════════

/// A literal constant: `42`, `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Literal {
    Int(i64),
    Bool(bool),
}

impl Literal {
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Int(_) => "int",
            Literal::Bool(_) => "bool",
        }
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Literal::Int(n)
    }
}

impl From<i32> for Literal {
    fn from(n: i32) -> Self {
        Literal::Int(i64::from(n))
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Procedures
// ══════════════════════════════════════════════════════════════════════════════

/// `proc (x, y) body`, optionally carrying the name it is bound to in a
/// `letrec`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProcedureRepr")]
pub struct Procedure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Rc<Expr>,
}

/// Unchecked wire form of [`Procedure`].
#[derive(Deserialize)]
struct ProcedureRepr {
    #[serde(default)]
    name: Option<String>,
    params: Vec<String>,
    body: Rc<Expr>,
}

impl TryFrom<ProcedureRepr> for Procedure {
    type Error = String;

    fn try_from(repr: ProcedureRepr) -> Result<Self, Self::Error> {
        check_params(&repr.params)?;
        Ok(Self {
            name: repr.name,
            params: repr.params,
            body: repr.body,
        })
    }
}

fn check_params(params: &[String]) -> Result<(), String> {
    for (i, p) in params.iter().enumerate() {
        if params[..i].contains(p) {
            return Err(format!("duplicate parameter '{p}' in procedure"));
        }
    }
    Ok(())
}

/// Give an unnamed procedure its `letrec` key; reject a conflicting name.
fn stamp_letrec_name(key: &str, proc: &mut Procedure) -> Result<(), String> {
    match &proc.name {
        Some(existing) if existing != key => Err(format!(
            "inconsistent name in letrec: key '{key}', procedure '{existing}'"
        )),
        _ => {
            proc.name = Some(key.to_string());
            Ok(())
        }
    }
}

impl Procedure {
    /// Create an anonymous procedure.
    ///
    /// Panics if a parameter name is repeated.
    pub fn new<S: Into<String>>(
        params: impl IntoIterator<Item = S>,
        body: impl Into<Expr>,
    ) -> Self {
        let params: Vec<String> = params.into_iter().map(Into::into).collect();
        if let Err(msg) = check_params(&params) {
            panic!("{msg}");
        }
        Self {
            name: None,
            params,
            body: Rc::new(body.into()),
        }
    }

    /// Create a procedure that records the name it will be bound to.
    pub fn named<S: Into<String>>(
        name: impl Into<String>,
        params: impl IntoIterator<Item = S>,
        body: impl Into<Expr>,
    ) -> Self {
        let mut proc = Self::new(params, body);
        proc.name = Some(name.into());
        proc
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// An expression node.
///
/// The variant set is closed; every language extension (references,
/// laziness, exceptions) is a variant here rather than a separate
/// evaluator layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    // ── Basics ──
    /// `42`, `true`
    Literal(Literal),
    /// `x`
    Var(String),
    /// `-(a, b)`, `+(a, b, c)`, resolved through the operator table
    Op { op: String, args: Vec<Expr> },
    /// `tuple(a, b, ...)`
    Tuple(Vec<Expr>),
    /// `isz(e)`
    IsZero(Box<Expr>),
    /// `if cond then a else b`
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    // ── Binding ──
    /// `let x = e1 y = e2 in body`: right-hand sides see only the outer scope
    Let {
        #[serde(deserialize_with = "unique_names")]
        bindings: BTreeMap<String, Expr>,
        body: Box<Expr>,
    },
    /// `letrec f(x) = ... g(y) = ... in body`
    LetRec {
        #[serde(deserialize_with = "letrec_procs")]
        procs: BTreeMap<String, Procedure>,
        body: Box<Expr>,
    },

    // ── Procedures ──
    /// `proc (x, y) body`
    Proc(Procedure),
    /// `(f a b ...)`
    Call { operator: Box<Expr>, args: Vec<Expr> },

    // ── State ──
    /// `newref(e)`
    NewRef(Box<Expr>),
    /// `ref x`: the cell bound to `x`, for call-by-reference
    RefVar(String),
    /// `deref(e)`
    Deref(Box<Expr>),
    /// `setref(r, v)`
    SetRef { target: Box<Expr>, value: Box<Expr> },
    /// `begin e1; e2; ... end`
    Block(Vec<Expr>),
    /// `set x = e`
    Assign { name: String, value: Box<Expr> },

    // ── Laziness ──
    /// `lazy(e)`, suspends `e`
    Lazy(Rc<Expr>),
    /// `force(e)`
    Force(Box<Expr>),

    // ── Exceptions ──
    /// `try body catch (var) handler`
    Try {
        body: Box<Expr>,
        var: String,
        handler: Box<Expr>,
    },
    /// `raise e`
    Raise(Box<Expr>),
}

// ── Construction helpers ──────────────────────────────────────────────────────

impl Expr {
    pub fn int(n: i64) -> Self {
        Expr::Literal(Literal::Int(n))
    }

    pub fn bool(b: bool) -> Self {
        Expr::Literal(Literal::Bool(b))
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn op<E: Into<Expr>>(op: impl Into<String>, args: impl IntoIterator<Item = E>) -> Self {
        Expr::Op {
            op: op.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn tuple<E: Into<Expr>>(children: impl IntoIterator<Item = E>) -> Self {
        Expr::Tuple(children.into_iter().map(Into::into).collect())
    }

    pub fn is_zero(e: impl Into<Expr>) -> Self {
        Expr::IsZero(Box::new(e.into()))
    }

    pub fn if_then_else(
        cond: impl Into<Expr>,
        then_branch: impl Into<Expr>,
        else_branch: impl Into<Expr>,
    ) -> Self {
        Expr::If {
            cond: Box::new(cond.into()),
            then_branch: Box::new(then_branch.into()),
            else_branch: Box::new(else_branch.into()),
        }
    }

    /// `let` with one or more bindings. Panics on a repeated name.
    pub fn let_in<S, E>(bindings: impl IntoIterator<Item = (S, E)>, body: impl Into<Expr>) -> Self
    where
        S: Into<String>,
        E: Into<Expr>,
    {
        let mut map = BTreeMap::new();
        for (name, value) in bindings {
            let name = name.into();
            assert!(
                !map.contains_key(&name),
                "duplicate binding '{name}' in let"
            );
            map.insert(name, value.into());
        }
        Expr::Let {
            bindings: map,
            body: Box::new(body.into()),
        }
    }

    /// `letrec` over `(name, procedure)` pairs.
    ///
    /// An unnamed procedure takes the name it is bound to; a procedure that
    /// already records a different name is a construction error and panics.
    pub fn letrec<S: Into<String>>(
        procs: impl IntoIterator<Item = (S, Procedure)>,
        body: impl Into<Expr>,
    ) -> Self {
        let mut map = BTreeMap::new();
        for (name, mut proc) in procs {
            let name = name.into();
            if let Err(msg) = stamp_letrec_name(&name, &mut proc) {
                panic!("{msg}");
            }
            assert!(
                !map.contains_key(&name),
                "duplicate procedure '{name}' in letrec"
            );
            map.insert(name, proc);
        }
        Expr::LetRec {
            procs: map,
            body: Box::new(body.into()),
        }
    }

    pub fn proc<S: Into<String>>(
        params: impl IntoIterator<Item = S>,
        body: impl Into<Expr>,
    ) -> Self {
        Expr::Proc(Procedure::new(params, body))
    }

    pub fn call<E: Into<Expr>>(
        operator: impl Into<Expr>,
        args: impl IntoIterator<Item = E>,
    ) -> Self {
        Expr::Call {
            operator: Box::new(operator.into()),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn newref(e: impl Into<Expr>) -> Self {
        Expr::NewRef(Box::new(e.into()))
    }

    pub fn ref_var(name: impl Into<String>) -> Self {
        Expr::RefVar(name.into())
    }

    pub fn deref(e: impl Into<Expr>) -> Self {
        Expr::Deref(Box::new(e.into()))
    }

    pub fn setref(target: impl Into<Expr>, value: impl Into<Expr>) -> Self {
        Expr::SetRef {
            target: Box::new(target.into()),
            value: Box::new(value.into()),
        }
    }

    pub fn block<E: Into<Expr>>(exprs: impl IntoIterator<Item = E>) -> Self {
        Expr::Block(exprs.into_iter().map(Into::into).collect())
    }

    pub fn assign(name: impl Into<String>, value: impl Into<Expr>) -> Self {
        Expr::Assign {
            name: name.into(),
            value: Box::new(value.into()),
        }
    }

    pub fn lazy(e: impl Into<Expr>) -> Self {
        Expr::Lazy(Rc::new(e.into()))
    }

    pub fn force(e: impl Into<Expr>) -> Self {
        Expr::Force(Box::new(e.into()))
    }

    pub fn try_catch(
        body: impl Into<Expr>,
        var: impl Into<String>,
        handler: impl Into<Expr>,
    ) -> Self {
        Expr::Try {
            body: Box::new(body.into()),
            var: var.into(),
            handler: Box::new(handler.into()),
        }
    }

    pub fn raise(e: impl Into<Expr>) -> Self {
        Expr::Raise(Box::new(e.into()))
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        Expr::int(n)
    }
}

/// Unsuffixed integer literals default to `i32`.
impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        Expr::int(i64::from(n))
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Expr::bool(b)
    }
}

impl From<Literal> for Expr {
    fn from(lit: Literal) -> Self {
        Expr::Literal(lit)
    }
}

/// A bare string names a variable.
impl From<&str> for Expr {
    fn from(name: &str) -> Self {
        Expr::var(name)
    }
}

impl From<String> for Expr {
    fn from(name: String) -> Self {
        Expr::Var(name)
    }
}

impl From<Procedure> for Expr {
    fn from(proc: Procedure) -> Self {
        Expr::Proc(proc)
    }
}

// ── Checked map deserialization ───────────────────────────────────────────────

/// A JSON object whose keys must not repeat.
fn unique_names<'de, D, V>(deserializer: D) -> Result<BTreeMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct UniqueNames<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for UniqueNames<V> {
        type Value = BTreeMap<String, V>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of distinct names")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut map = BTreeMap::new();
            while let Some((name, value)) = access.next_entry::<String, V>()? {
                if map.contains_key(&name) {
                    return Err(de::Error::custom(format!("duplicate binding '{name}'")));
                }
                map.insert(name, value);
            }
            Ok(map)
        }
    }

    deserializer.deserialize_map(UniqueNames(PhantomData))
}

fn letrec_procs<'de, D>(deserializer: D) -> Result<BTreeMap<String, Procedure>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut procs: BTreeMap<String, Procedure> = unique_names(deserializer)?;
    for (name, proc) in procs.iter_mut() {
        stamp_letrec_name(name, proc).map_err(de::Error::custom)?;
    }
    Ok(procs)
}

// ── JSON interchange ──────────────────────────────────────────────────────────

impl Expr {
    /// Serialize to compact JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Short variant label, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Literal(_) => "literal",
            Expr::Var(_) => "var",
            Expr::Op { .. } => "op",
            Expr::Tuple(_) => "tuple",
            Expr::IsZero(_) => "isz",
            Expr::If { .. } => "if",
            Expr::Let { .. } => "let",
            Expr::LetRec { .. } => "letrec",
            Expr::Proc(_) => "proc",
            Expr::Call { .. } => "call",
            Expr::NewRef(_) => "newref",
            Expr::RefVar(_) => "ref",
            Expr::Deref(_) => "deref",
            Expr::SetRef { .. } => "setref",
            Expr::Block(_) => "begin",
            Expr::Assign { .. } => "set",
            Expr::Lazy(_) => "lazy",
            Expr::Force(_) => "force",
            Expr::Try { .. } => "try",
            Expr::Raise(_) => "raise",
        }
    }
}
