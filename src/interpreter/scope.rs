use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use itertools::Itertools;

use crate::interpreter::value::Value;

/// A lexical environment: the names bound at one level plus a link to the
/// enclosing level.
///
/// Cloning a `Scope` clones the handle, not the bindings, so a function value
/// and the interpreter can hold the same environment. Parents always point
/// to scopes created earlier, so the parent chain is acyclic.
#[derive(Clone)]
pub struct Scope(Rc<Frame>);

struct Frame {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Scope>,
}

impl Scope {
    /// A scope with no parent, used once per program run.
    pub fn root() -> Self {
        Scope(Rc::new(Frame {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    pub fn child(parent: &Scope) -> Self {
        Scope(Rc::new(Frame {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent.clone()),
        }))
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.0.parent.as_ref()
    }

    /// Binds `name` in this scope, replacing any local binding of the same
    /// name. Ancestors are never touched.
    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.0.bindings.borrow_mut().insert(name.into(), value);
    }

    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.0.bindings.borrow().get(name).cloned()
    }

    /// Resolves `name` here first, then through each enclosing scope.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut scope = Some(self);

        while let Some(current) = scope {
            if let Some(value) = current.get_local(name) {
                return Some(value);
            }
            scope = current.parent();
        }

        None
    }

    /// Whether this scope itself binds `name`. A binding holding `0` or
    /// `undefined` still counts.
    pub fn has(&self, name: &str) -> bool {
        self.0.bindings.borrow().contains_key(name)
    }

    /// Number of enclosing scopes, 0 for a root.
    pub fn depth(&self) -> usize {
        std::iter::successors(self.parent(), |scope| scope.parent()).count()
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Whether `ancestor` is this scope or one of its enclosing scopes.
    pub fn is_within(&self, ancestor: &Scope) -> bool {
        std::iter::successors(Some(self), |scope| scope.parent())
            .any(|scope| scope.ptr_eq(ancestor))
    }

    /// Drops every local binding. Functions declared here hold this scope,
    /// so a finished call scope has to be emptied before it can be freed.
    pub fn release(&self) {
        let bindings = std::mem::take(&mut *self.0.bindings.borrow_mut());
        drop(bindings);
    }

    #[cfg(test)]
    pub(crate) fn handle_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

// Only names are printed: bound functions hold their defining scope, so
// printing values could recurse forever.
impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings = self.0.bindings.borrow();

        f.debug_struct("Scope")
            .field("depth", &self.depth())
            .field("names", &bindings.keys().sorted().collect::<Vec<_>>())
            .finish()
    }
}
