//! Persistent variable environment.
//!
//! An `Activation` maps names to [`Variable`] cells through an
//! `im::HashMap`, so [`Activation::extend`] returns a new activation in
//! O(log n) while the receiver (and every closure that captured it) stays
//! unchanged. Assignment mutates the cell, never the map.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use im::HashMap;
use vault_ir::Name;

use crate::value::Value;

/// Contents of a variable cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Binding {
    Value(Value),
    /// The value was transferred out with `<-`.
    Moved,
    /// Declared but not yet assigned (forward function declarations).
    Uninitialized,
}

/// A mutable variable cell shared by every activation that contains it.
#[derive(Clone)]
pub struct Variable(Rc<RefCell<Binding>>);

impl Variable {
    pub fn new(value: Value) -> Self {
        Variable(Rc::new(RefCell::new(Binding::Value(value))))
    }

    pub fn uninitialized() -> Self {
        Variable(Rc::new(RefCell::new(Binding::Uninitialized)))
    }

    /// Current contents of the cell.
    pub fn binding(&self) -> Binding {
        self.0.borrow().clone()
    }

    /// The held value, or `None` if moved or uninitialized.
    pub fn get(&self) -> Option<Value> {
        match &*self.0.borrow() {
            Binding::Value(value) => Some(value.clone()),
            Binding::Moved | Binding::Uninitialized => None,
        }
    }

    pub fn set(&self, value: Value) {
        *self.0.borrow_mut() = Binding::Value(value);
    }

    /// Move the value out, leaving the cell `Moved`.
    ///
    /// Returns the previous binding unchanged if it held no value.
    pub fn take(&self) -> Result<Value, Binding> {
        let mut cell = self.0.borrow_mut();
        match std::mem::replace(&mut *cell, Binding::Moved) {
            Binding::Value(value) => Ok(value),
            other => {
                *cell = other.clone();
                Err(other)
            }
        }
    }

    pub fn is_moved(&self) -> bool {
        matches!(*self.0.borrow(), Binding::Moved)
    }

    pub fn ptr_eq(&self, other: &Variable) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Variable").field(&*self.0.borrow()).finish()
    }
}

/// Immutable mapping from names to variable cells.
#[derive(Clone, Default)]
pub struct Activation {
    bindings: HashMap<Name, Variable>,
}

impl Activation {
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Look up the variable cell bound to `name`.
    pub fn lookup(&self, name: Name) -> Option<Variable> {
        self.bindings.get(&name).cloned()
    }

    /// Look up the current value of `name`. `None` if unbound, moved or
    /// uninitialized.
    pub fn lookup_value(&self, name: Name) -> Option<Value> {
        self.bindings.get(&name).and_then(Variable::get)
    }

    /// Return a new activation with `name` bound to a fresh cell holding
    /// `value`. Shadows any existing binding. `self` is not modified.
    #[must_use]
    pub fn extend(&self, name: Name, value: Value) -> Activation {
        self.extend_with(name, Variable::new(value))
    }

    /// Return a new activation with `name` bound to an existing cell.
    #[must_use]
    pub fn extend_with(&self, name: Name, variable: Variable) -> Activation {
        Activation {
            bindings: self.bindings.update(name, variable),
        }
    }

    /// Bind `name` to an uninitialized cell, returning the new activation
    /// and the cell so the caller can fill it in afterwards.
    #[must_use]
    pub fn declare(&self, name: Name) -> (Activation, Variable) {
        let variable = Variable::uninitialized();
        (self.extend_with(name, variable.clone()), variable)
    }

    pub fn contains(&self, name: Name) -> bool {
        self.bindings.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// True if both activations share the same underlying map.
    pub fn ptr_eq(&self, other: &Activation) -> bool {
        self.bindings.ptr_eq(&other.bindings)
    }
}

impl fmt::Debug for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activation")
            .field("len", &self.bindings.len())
            .finish()
    }
}
