//! Lexically scoped environment for the EPL evaluator.
//!
//! An environment is a chain of scopes. Each scope maps names to shared
//! [`Reference`] cells rather than to values, so that mutation through one
//! alias (a `set`, or a `setref` on a cell passed with `ref x`) is visible
//! through every other binding of the same cell.
//!
//! Scopes are reference-counted: closures and thunks keep the chain that
//! was current when they were created alive for as long as they are.

use crate::error::{EvalError, EvalResult};
use crate::value::{Reference, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A single scope level.
struct Scope {
    bindings: RefCell<BTreeMap<String, Reference>>,
    parent: Option<Environment>,
}

/// Handle to the innermost scope of a chain. Cloning is cheap and shares
/// the scope.
#[derive(Clone)]
pub struct Environment(Rc<Scope>);

impl Environment {
    /// Create an empty root environment.
    pub fn new() -> Self {
        Self(Rc::new(Scope {
            bindings: RefCell::new(BTreeMap::new()),
            parent: None,
        }))
    }

    /// Create a root environment pre-populated with `bindings`.
    pub fn from_bindings<S: Into<String>>(bindings: impl IntoIterator<Item = (S, Value)>) -> Self {
        let env = Self::new();
        env.insert_all(bindings);
        env
    }

    /// Find the cell bound to `name`, searching from this scope outward.
    pub fn lookup_cell(&self, name: &str) -> Option<Reference> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(cell) = env.0.bindings.borrow().get(name) {
                return Some(cell.clone());
            }
            scope = env.0.parent.as_ref();
        }
        None
    }

    /// Current value of the cell bound to `name`.
    pub fn lookup_value(&self, name: &str) -> Option<Value> {
        self.lookup_cell(name).map(|cell| cell.get())
    }

    /// Bind `name` to a fresh cell in this scope, shadowing outer bindings.
    ///
    /// Rebinding a name already present in this same scope is rejected.
    pub fn bind(&self, name: impl Into<String>, value: Value) -> EvalResult<Reference> {
        let name = name.into();
        let mut bindings = self.0.bindings.borrow_mut();
        if bindings.contains_key(&name) {
            return Err(EvalError::DuplicateBinding(name));
        }
        let cell = Reference::new(value);
        bindings.insert(name, cell.clone());
        Ok(cell)
    }

    /// A new child scope with a fresh cell for each binding.
    pub fn extend<S: Into<String>>(&self, bindings: impl IntoIterator<Item = (S, Value)>) -> Self {
        let child = self.push();
        child.insert_all(bindings);
        child
    }

    /// A new, empty child scope.
    pub fn push(&self) -> Self {
        Self(Rc::new(Scope {
            bindings: RefCell::new(BTreeMap::new()),
            parent: Some(self.clone()),
        }))
    }

    /// The enclosing scope, if any.
    pub fn parent(&self) -> Option<&Environment> {
        self.0.parent.as_ref()
    }

    /// Number of scopes in the chain, counting this one.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut scope = self.parent();
        while let Some(env) = scope {
            depth += 1;
            scope = env.parent();
        }
        depth
    }

    /// Names bound directly in this scope, in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.0.bindings.borrow().keys().cloned().collect()
    }

    /// True if both handles denote the same scope.
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn insert_all<S: Into<String>>(&self, bindings: impl IntoIterator<Item = (S, Value)>) {
        let mut scope = self.0.bindings.borrow_mut();
        for (name, value) in bindings {
            scope.insert(name.into(), Reference::new(value));
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

// Values are not printed: letrec closures capture the scope that binds them.
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("names", &self.names())
            .field("depth", &self.depth())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_outward() {
        let root = Environment::from_bindings([("x", Value::int(1)), ("y", Value::int(2))]);
        let child = root.extend([("x", Value::int(10))]);
        assert_eq!(child.lookup_value("x"), Some(Value::int(10)));
        assert_eq!(child.lookup_value("y"), Some(Value::int(2)));
        assert_eq!(root.lookup_value("x"), Some(Value::int(1)));
        assert_eq!(child.lookup_value("z"), None);
    }

    #[test]
    fn test_extend_does_not_touch_parent() {
        let root = Environment::new();
        let child = root.extend([("a", Value::int(1))]);
        assert!(root.names().is_empty());
        assert_eq!(child.names(), vec!["a".to_string()]);
        assert!(child.parent().is_some_and(|p| p.ptr_eq(&root)));
    }

    #[test]
    fn test_bind_shadows_outer_without_mutating_it() {
        let root = Environment::from_bindings([("x", Value::int(1))]);
        let outer_cell = root.lookup_cell("x").expect("bound");
        let child = root.push();
        child.bind("x", Value::int(2)).expect("fresh name");
        assert_eq!(child.lookup_value("x"), Some(Value::int(2)));
        assert_eq!(outer_cell.get(), Value::int(1));
    }

    #[test]
    fn test_bind_rejects_same_scope_rebinding() {
        let env = Environment::new();
        env.bind("f", Value::int(1)).expect("fresh name");
        assert!(matches!(
            env.bind("f", Value::int(2)),
            Err(EvalError::DuplicateBinding(name)) if name == "f"
        ));
    }

    #[test]
    fn test_cells_are_shared_between_lookups() {
        let env = Environment::from_bindings([("x", Value::int(1))]);
        let a = env.lookup_cell("x").expect("bound");
        let b = env.push().lookup_cell("x").expect("bound");
        assert!(a.ptr_eq(&b));
        a.set(Value::int(7));
        assert_eq!(env.lookup_value("x"), Some(Value::int(7)));
    }

    #[test]
    fn test_depth() {
        let root = Environment::new();
        assert_eq!(root.depth(), 1);
        assert_eq!(root.push().push().depth(), 3);
    }

    #[test]
    fn test_debug_lists_names_only() {
        let env = Environment::from_bindings([("b", Value::int(1)), ("a", Value::int(2))]);
        assert_eq!(
            format!("{env:?}"),
            r#"Environment { names: ["a", "b"], depth: 1 }"#
        );
    }
}
