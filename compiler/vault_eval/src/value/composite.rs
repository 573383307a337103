//! Container values: optionals, arrays, dictionaries, and composites.
//!
//! Containers are handles onto a shared record. Cloning a handle aliases the
//! container; [`Value::copy`] is the only way to duplicate one. The owner is
//! stored in the record, so every alias observes ownership changes.
//!
//! # Teardown
//!
//! Value graphs can nest as deep as a program likes. When the last handle
//! to a record goes away its children are drained into a heap worklist
//! ([`dismantle`]) instead of being dropped recursively.

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use vault_ir::{CompositeKind, Name};

use super::{Address, Int256, Value};
use crate::errors::{type_mismatch, unhashable_key, EvalResult};

/// Composite fields in declaration order.
pub type FieldMap = IndexMap<Name, Value, FxBuildHasher>;

// OptionalValue

/// Payload of a present optional. Immutable and shared, so clones are O(1).
#[derive(Clone)]
pub struct OptionalValue(Rc<Value>);

impl OptionalValue {
    pub fn new(value: Value) -> Self {
        OptionalValue(Rc::new(value))
    }

    /// Unwrap the payload, cloning the handle if it is shared.
    pub fn into_value(mut self) -> Value {
        match Rc::get_mut(&mut self.0) {
            Some(slot) => std::mem::replace(slot, Value::None),
            None => Value::clone(&self.0),
        }
    }

    pub fn ptr_eq(&self, other: &OptionalValue) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for OptionalValue {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.0
    }
}

impl Drop for OptionalValue {
    fn drop(&mut self) {
        if let Some(slot) = Rc::get_mut(&mut self.0) {
            if slot.is_container() {
                dismantle(vec![std::mem::replace(slot, Value::None)]);
            }
        }
    }
}

impl PartialEq for OptionalValue {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0 == *other.0
    }
}

impl fmt::Debug for OptionalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

// ArrayValue

struct ArrayData {
    elements: Vec<Value>,
    owner: Option<Address>,
}

/// Ordered, growable sequence of values.
#[derive(Clone)]
pub struct ArrayValue(Rc<RefCell<ArrayData>>);

impl ArrayValue {
    /// Create an unowned array.
    pub fn new(elements: Vec<Value>) -> Self {
        ArrayValue(Rc::new(RefCell::new(ArrayData {
            elements,
            owner: None,
        })))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().elements.get(index).cloned()
    }

    /// Replace the element at `index`, returning the previous element.
    ///
    /// A resource-kind value takes the array's owner. Returns `None` and drops
    /// `value` if `index` is out of bounds.
    pub fn set(&self, index: usize, value: Value) -> Option<Value> {
        if index >= self.len() {
            return None;
        }
        value.propagate_owner(self.owner(), false);
        let mut data = self.0.borrow_mut();
        data.elements
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, value))
    }

    /// Append an element. A resource-kind value takes the array's owner.
    pub fn push(&self, value: Value) {
        value.propagate_owner(self.owner(), false);
        self.0.borrow_mut().elements.push(value);
    }

    /// Snapshot of the elements. Container elements stay aliased.
    pub fn elements(&self) -> Vec<Value> {
        self.0.borrow().elements.clone()
    }

    pub fn owner(&self) -> Option<Address> {
        self.0.borrow().owner
    }

    pub(super) fn propagate_owner(&self, owner: Option<Address>, root: bool) -> bool {
        let holds_resource = adopt_children(&self.elements(), owner);
        if root || holds_resource {
            self.0.borrow_mut().owner = owner;
        }
        holds_resource
    }

    /// True if both handles refer to the same array.
    pub fn ptr_eq(&self, other: &ArrayValue) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ArrayValue {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0.borrow().elements == other.0.borrow().elements
    }
}

impl fmt::Debug for ArrayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.borrow().elements.iter()).finish()
    }
}

// DictionaryValue

/// Hashable projection of a primitive value used as a dictionary key.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum DictionaryKey {
    Bool(bool),
    Int(i64),
    UInt64(u64),
    Int256(Int256),
    Str(Rc<str>),
    Address(Address),
}

impl DictionaryKey {
    /// Project a key value. Only primitives are hashable.
    pub fn from_value(value: &Value) -> EvalResult<Self> {
        match value {
            Value::Bool(b) => Ok(DictionaryKey::Bool(*b)),
            Value::Int(n) => Ok(DictionaryKey::Int(*n)),
            Value::UInt64(n) => Ok(DictionaryKey::UInt64(*n)),
            Value::Int256(n) => Ok(DictionaryKey::Int256(n.clone())),
            Value::Str(s) => Ok(DictionaryKey::Str(s.clone())),
            Value::Address(a) => Ok(DictionaryKey::Address(*a)),
            other => Err(unhashable_key(other.type_name())),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            DictionaryKey::Bool(b) => Value::Bool(*b),
            DictionaryKey::Int(n) => Value::Int(*n),
            DictionaryKey::UInt64(n) => Value::UInt64(*n),
            DictionaryKey::Int256(n) => Value::Int256(n.clone()),
            DictionaryKey::Str(s) => Value::Str(s.clone()),
            DictionaryKey::Address(a) => Value::Address(*a),
        }
    }
}

struct DictionaryData {
    entries: IndexMap<DictionaryKey, Value, FxBuildHasher>,
    owner: Option<Address>,
}

/// Insertion-ordered map from primitive keys to values.
#[derive(Clone)]
pub struct DictionaryValue(Rc<RefCell<DictionaryData>>);

impl DictionaryValue {
    /// Create an empty, unowned dictionary.
    pub fn new() -> Self {
        DictionaryValue(Rc::new(RefCell::new(DictionaryData {
            entries: IndexMap::default(),
            owner: None,
        })))
    }

    /// Build a dictionary from entries in order. Later duplicates overwrite
    /// earlier ones in place.
    pub fn from_entries(entries: impl IntoIterator<Item = (Value, Value)>) -> EvalResult<Self> {
        let dictionary = DictionaryValue::new();
        for (key, value) in entries {
            dictionary.insert(key, value)?;
        }
        Ok(dictionary)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> EvalResult<Option<Value>> {
        let key = DictionaryKey::from_value(key)?;
        Ok(self.0.borrow().entries.get(&key).cloned())
    }

    pub fn contains_key(&self, key: &Value) -> EvalResult<bool> {
        let key = DictionaryKey::from_value(key)?;
        Ok(self.0.borrow().entries.contains_key(&key))
    }

    /// Insert or replace an entry, returning the previous value.
    ///
    /// New keys go to the end; existing keys keep their position. A
    /// resource-kind value takes the dictionary's owner.
    pub fn insert(&self, key: Value, value: Value) -> EvalResult<Option<Value>> {
        let key = DictionaryKey::from_value(&key)?;
        value.propagate_owner(self.owner(), false);
        Ok(self.0.borrow_mut().entries.insert(key, value))
    }

    /// Remove an entry, preserving the order of the rest.
    ///
    /// The removed value is no longer stored and loses its owner.
    pub fn remove(&self, key: &Value) -> EvalResult<Option<Value>> {
        let key = DictionaryKey::from_value(key)?;
        let removed = self.0.borrow_mut().entries.shift_remove(&key);
        if let Some(value) = &removed {
            value.propagate_owner(None, false);
        }
        Ok(removed)
    }

    /// Optional assignment: `Some(v)` inserts `v`, `nil` removes the key.
    pub fn set(&self, key: Value, value: Value) -> EvalResult<()> {
        match value {
            Value::Some(inner) => self.insert(key, inner.into_value()).map(drop),
            Value::None => self.remove(&key).map(drop),
            other => Err(type_mismatch("Optional", other.type_name())),
        }
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<Value> {
        self.0
            .borrow()
            .entries
            .keys()
            .map(DictionaryKey::to_value)
            .collect()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.0
            .borrow()
            .entries
            .iter()
            .map(|(key, value)| (key.to_value(), value.clone()))
            .collect()
    }

    pub fn owner(&self) -> Option<Address> {
        self.0.borrow().owner
    }

    pub(super) fn propagate_owner(&self, owner: Option<Address>, root: bool) -> bool {
        let children: Vec<Value> = self.0.borrow().entries.values().cloned().collect();
        let holds_resource = adopt_children(&children, owner);
        if root || holds_resource {
            self.0.borrow_mut().owner = owner;
        }
        holds_resource
    }

    pub fn ptr_eq(&self, other: &DictionaryValue) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for DictionaryValue {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for DictionaryValue {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0.borrow().entries == other.0.borrow().entries
    }
}

impl fmt::Debug for DictionaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.borrow().entries.iter())
            .finish()
    }
}

// CompositeValue

struct CompositeData {
    type_name: Name,
    kind: CompositeKind,
    fields: FieldMap,
    owner: Option<Address>,
}

/// Structure or resource instance.
#[derive(Clone)]
pub struct CompositeValue(Rc<RefCell<CompositeData>>);

impl CompositeValue {
    /// Create an unowned composite with fields in declaration order.
    pub fn new(
        type_name: Name,
        kind: CompositeKind,
        fields: impl IntoIterator<Item = (Name, Value)>,
    ) -> Self {
        CompositeValue(Rc::new(RefCell::new(CompositeData {
            type_name,
            kind,
            fields: fields.into_iter().collect(),
            owner: None,
        })))
    }

    pub fn type_name(&self) -> Name {
        self.0.borrow().type_name
    }

    pub fn kind(&self) -> CompositeKind {
        self.0.borrow().kind
    }

    pub fn is_resource(&self) -> bool {
        self.kind() == CompositeKind::Resource
    }

    pub fn get_field(&self, name: Name) -> Option<Value> {
        self.0.borrow().fields.get(&name).cloned()
    }

    /// Write a field, returning the previous value.
    ///
    /// A resource-kind field value takes the composite's owner. Existing
    /// fields keep their position.
    pub fn set_field(&self, name: Name, value: Value) -> Option<Value> {
        value.propagate_owner(self.owner(), false);
        self.0.borrow_mut().fields.insert(name, value)
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> Vec<(Name, Value)> {
        self.0
            .borrow()
            .fields
            .iter()
            .map(|(name, value)| (*name, value.clone()))
            .collect()
    }

    pub fn field_count(&self) -> usize {
        self.0.borrow().fields.len()
    }

    pub fn owner(&self) -> Option<Address> {
        self.0.borrow().owner
    }

    pub(super) fn propagate_owner(&self, owner: Option<Address>, root: bool) -> bool {
        let children: Vec<Value> = self.0.borrow().fields.values().cloned().collect();
        let holds_resource = adopt_children(&children, owner) || self.is_resource();
        if root || holds_resource {
            self.0.borrow_mut().owner = owner;
        }
        holds_resource
    }

    pub fn ptr_eq(&self, other: &CompositeValue) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for CompositeValue {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let (a, b) = (self.0.borrow(), other.0.borrow());
        a.type_name == b.type_name && a.kind == b.kind && a.fields == b.fields
    }
}

impl fmt::Debug for CompositeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        let mut s = f.debug_struct("Composite");
        s.field("type_name", &data.type_name)
            .field("kind", &data.kind);
        for (name, value) in &data.fields {
            s.field(&format!("{name:?}"), value);
        }
        s.field("owner", &data.owner).finish()
    }
}

/// Hand `owner` to every resource-kind child. Returns whether any child is
/// resource-kind.
fn adopt_children(children: &[Value], owner: Option<Address>) -> bool {
    children
        .iter()
        .fold(false, |held, child| child.propagate_owner(owner, false) || held)
}

// Teardown

impl Drop for ArrayData {
    fn drop(&mut self) {
        dismantle(std::mem::take(&mut self.elements));
    }
}

impl Drop for DictionaryData {
    fn drop(&mut self) {
        dismantle(self.entries.drain(..).map(|(_, value)| value).collect());
    }
}

impl Drop for CompositeData {
    fn drop(&mut self) {
        dismantle(self.fields.drain(..).map(|(_, value)| value).collect());
    }
}

/// Drop `pending` without recursing through nested containers.
///
/// A uniquely held container is emptied into the worklist before its handle
/// drops, so each record's own drop sees no children.
fn dismantle(mut pending: Vec<Value>) {
    while let Some(value) = pending.pop() {
        match value {
            Value::Some(mut optional) => {
                if let Some(slot) = Rc::get_mut(&mut optional.0) {
                    pending.push(std::mem::replace(slot, Value::None));
                }
            }
            Value::Array(mut array) => {
                if let Some(data) = Rc::get_mut(&mut array.0) {
                    pending.append(&mut data.get_mut().elements);
                }
            }
            Value::Dictionary(mut dict) => {
                if let Some(data) = Rc::get_mut(&mut dict.0) {
                    pending.extend(data.get_mut().entries.drain(..).map(|(_, value)| value));
                }
            }
            Value::Composite(mut composite) => {
                if let Some(data) = Rc::get_mut(&mut composite.0) {
                    pending.extend(data.get_mut().fields.drain(..).map(|(_, value)| value));
                }
            }
            _ => {}
        }
    }
}
