//! Runtime values produced by evaluation.

use crate::env::Environment;
use epl_types::{Expr, Literal, Printable, Procedure};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::thread::LocalKey;

// ══════════════════════════════════════════════════════════════════════════════
// Reference cells
// ══════════════════════════════════════════════════════════════════════════════

/// A shared, mutable storage location.
///
/// Cloning a `Reference` yields another alias of the same cell; it never
/// copies the stored value. A cell may hold itself (`setref(r, r)`), so
/// comparison and rendering track the cells they are already inside.
#[derive(Clone)]
pub struct Reference(Rc<RefCell<Value>>);

impl Reference {
    pub fn new(value: Value) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Current contents.
    pub fn get(&self) -> Value {
        self.0.borrow().clone()
    }

    /// Overwrite the contents in place, visible through every alias.
    pub fn set(&self, value: Value) {
        *self.0.borrow_mut() = value;
    }

    /// True if both handles alias the same cell.
    pub fn ptr_eq(&self, other: &Reference) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    /// Run `f` on the contents, or on `None` if this cell is already being
    /// rendered further up the stack.
    fn render<R>(&self, f: impl FnOnce(Option<&Value>) -> R) -> R {
        match Visit::enter(&RENDERING, (self.addr(), 0)) {
            Some(_visit) => f(Some(&*self.0.borrow())),
            None => f(None),
        }
    }
}

/// Cells compare equal when they alias, or when their contents are equal.
/// A pair already under comparison is assumed equal, so cyclic contents
/// terminate.
impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match Visit::enter(&COMPARING, (self.addr(), other.addr())) {
            Some(_visit) => *self.0.borrow() == *other.0.borrow(),
            None => true,
        }
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(|value| match value {
            Some(value) => f.debug_tuple("Reference").field(value).finish(),
            None => f.write_str("<cycle>"),
        })
    }
}

/// Cell addresses (or address pairs) currently being visited.
type Active = RefCell<Vec<(usize, usize)>>;

thread_local! {
    static RENDERING: Active = const { RefCell::new(Vec::new()) };
    static COMPARING: Active = const { RefCell::new(Vec::new()) };
}

/// Marks a key as in progress until dropped.
struct Visit {
    table: &'static LocalKey<Active>,
    key: (usize, usize),
}

impl Visit {
    /// `None` if `key` is already in progress.
    fn enter(table: &'static LocalKey<Active>, key: (usize, usize)) -> Option<Self> {
        table.with(|active| {
            let mut active = active.borrow_mut();
            if active.contains(&key) {
                return None;
            }
            active.push(key);
            Some(Visit { table, key })
        })
    }
}

impl Drop for Visit {
    fn drop(&mut self) {
        self.table.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(pos) = active.iter().rposition(|k| *k == self.key) {
                active.remove(pos);
            }
        });
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Closures & thunks
// ══════════════════════════════════════════════════════════════════════════════

/// A procedure paired with the environment it was defined in.
#[derive(Debug, Clone)]
pub struct Closure {
    /// Name from a `letrec` binding, for diagnostics.
    pub name: Option<String>,
    /// Parameters still awaiting arguments.
    pub params: Vec<String>,
    pub body: Rc<Expr>,
    pub env: Environment,
}

impl Closure {
    pub fn new(proc: &Procedure, env: Environment) -> Self {
        Self {
            name: proc.name.clone(),
            params: proc.params.clone(),
            body: Rc::clone(&proc.body),
            env,
        }
    }
}

/// Captured environments are not compared.
impl PartialEq for Closure {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params && self.body == other.body
    }
}

/// A suspended expression. Forcing evaluates it afresh every time.
#[derive(Debug, Clone)]
pub struct Thunk {
    pub expr: Rc<Expr>,
    pub env: Environment,
}

impl PartialEq for Thunk {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Values
// ══════════════════════════════════════════════════════════════════════════════

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Literal(Literal),
    Tuple(Vec<Value>),
    Closure(Closure),
    Ref(Reference),
    Thunk(Thunk),
}

impl Value {
    pub fn int(n: i64) -> Self {
        Value::Literal(Literal::Int(n))
    }

    pub fn bool(b: bool) -> Self {
        Value::Literal(Literal::Bool(b))
    }

    /// Short type label used in failure messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Literal(lit) => lit.type_name(),
            Value::Tuple(_) => "tuple",
            Value::Closure(_) => "procedure",
            Value::Ref(_) => "ref",
            Value::Thunk(_) => "thunk",
        }
    }

    /// Only a literal `true` is true.
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Literal(Literal::Bool(true)))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Literal(Literal::Int(n)) => Some(*n),
            _ => None,
        }
    }

    /// Build the debug tree for this value.
    pub fn printable(&self) -> Printable {
        match self {
            Value::Literal(lit) => Printable::leaf(0, format!("Lit {lit}")),
            Value::Tuple(items) => {
                let mut children = vec![Printable::leaf(0, "Tuple")];
                children.extend(items.iter().map(|v| v.printable().indented(1)));
                Printable::group(0, children)
            }
            Value::Closure(c) => Printable::group(
                0,
                vec![
                    Printable::leaf(0, format!("Closure ({}) =", c.params.join(", "))),
                    c.body.printable().indented(1),
                ],
            ),
            Value::Ref(cell) => cell.render(|value| match value {
                Some(value) => Printable::group(
                    0,
                    vec![Printable::leaf(0, "Ref:"), value.printable().indented(1)],
                ),
                None => Printable::leaf(0, "<cycle>"),
            }),
            Value::Thunk(t) => Printable::group(
                0,
                vec![Printable::leaf(0, "Thunk:"), t.expr.printable().indented(1)],
            ),
        }
    }
}

impl From<Literal> for Value {
    fn from(lit: Literal) -> Self {
        Value::Literal(lit)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::bool(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Literal(lit) => write!(f, "{lit}"),
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Value::Closure(c) => match &c.name {
                Some(name) => write!(f, "<proc {name} ({})>", c.params.join(", ")),
                None => write!(f, "<proc ({})>", c.params.join(", ")),
            },
            Value::Ref(cell) => cell.render(|value| match value {
                Some(value) => write!(f, "ref({value})"),
                None => f.write_str("<cycle>"),
            }),
            Value::Thunk(t) => write!(f, "<thunk {}>", t.expr),
        }
    }
}
