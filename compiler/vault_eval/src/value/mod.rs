//! Runtime values.
//!
//! Primitives are plain data. Optionals, arrays, dictionaries and composites
//! are shared handles (see [`composite`]), so cloning a `Value` never walks
//! the graph. Transfers between locations go through [`Value::copy`] unless
//! the value is moved.
//!
//! # Ownership
//!
//! Resources (and any container that holds one) have move semantics: they
//! are never copied, and [`Value::copy`] reports an internal error if it
//! reaches one. Each container records its owner; [`Value::set_owner`]
//! records it on the container and hands it down to every resource-kind
//! child. Nested plain data has no owner.

mod address;
mod composite;
mod int256;

use std::fmt;
use std::rc::Rc;

pub use address::Address;
pub use composite::{
    ArrayValue, CompositeValue, DictionaryKey, DictionaryValue, FieldMap, OptionalValue,
};
pub use int256::Int256;

use crate::errors::{implicit_resource_copy, type_mismatch, EvalResult};
use crate::function::FunctionValue;
use crate::stack::ensure_sufficient_stack;

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Void,
    Bool(bool),
    Int(i64),
    UInt64(u64),
    Int256(Int256),
    Str(Rc<str>),
    Address(Address),
    /// Present optional.
    Some(OptionalValue),
    /// Absent optional (`nil`).
    None,
    Array(ArrayValue),
    Dictionary(DictionaryValue),
    Composite(CompositeValue),
    Function(FunctionValue),
}

impl Value {
    pub fn string(s: &str) -> Value {
        Value::Str(Rc::from(s))
    }

    pub fn some(inner: Value) -> Value {
        Value::Some(OptionalValue::new(inner))
    }

    pub fn array(elements: Vec<Value>) -> Value {
        Value::Array(ArrayValue::new(elements))
    }

    /// Name of the value's variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Void => "Void",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::UInt64(_) => "UInt64",
            Value::Int256(_) => "Int256",
            Value::Str(_) => "String",
            Value::Address(_) => "Address",
            Value::Some(_) | Value::None => "Optional",
            Value::Array(_) => "Array",
            Value::Dictionary(_) => "Dictionary",
            Value::Composite(c) if c.is_resource() => "Resource",
            Value::Composite(_) => "Structure",
            Value::Function(_) => "Function",
        }
    }

    /// True for the variants that hold other values.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Value::Some(_) | Value::Array(_) | Value::Dictionary(_) | Value::Composite(_)
        )
    }

    /// Interpret as a condition.
    pub fn as_bool(&self) -> EvalResult<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(type_mismatch("Bool", other.type_name())),
        }
    }

    /// True for resources and for any container transitively holding one.
    pub fn is_resource_kind(&self) -> bool {
        ensure_sufficient_stack(|| match self {
            Value::Some(inner) => inner.is_resource_kind(),
            Value::Array(array) => array.elements().iter().any(Value::is_resource_kind),
            Value::Dictionary(dict) => dict
                .entries()
                .iter()
                .any(|(_, value)| value.is_resource_kind()),
            Value::Composite(composite) => {
                composite.is_resource()
                    || composite
                        .fields()
                        .iter()
                        .any(|(_, value)| value.is_resource_kind())
            }
            _ => false,
        })
    }

    /// The account owning this value, if it is a stored container.
    ///
    /// Primitives and functions never have an owner.
    pub fn owner(&self) -> Option<Address> {
        match self {
            Value::Some(inner) => inner.owner(),
            Value::Array(array) => array.owner(),
            Value::Dictionary(dict) => dict.owner(),
            Value::Composite(composite) => composite.owner(),
            _ => None,
        }
    }

    /// Set the owner of this container and of every resource-kind value
    /// nested inside it. `Some` forwards to its payload.
    ///
    /// No-op for primitives and functions.
    pub fn set_owner(&self, owner: Option<Address>) {
        self.propagate_owner(owner, true);
    }

    /// Owner propagation in one post-order pass. A container records `owner`
    /// if it is the `root` of the call or resource-kind. Returns whether
    /// `self` is resource-kind.
    pub(crate) fn propagate_owner(&self, owner: Option<Address>, root: bool) -> bool {
        ensure_sufficient_stack(|| match self {
            Value::Some(inner) => inner.propagate_owner(owner, root),
            Value::Array(array) => array.propagate_owner(owner, root),
            Value::Dictionary(dict) => dict.propagate_owner(owner, root),
            Value::Composite(composite) => composite.propagate_owner(owner, root),
            _ => false,
        })
    }

    /// Deep copy for value-semantics transfer.
    ///
    /// Containers are duplicated recursively and the copy is unowned.
    /// Primitives and functions return themselves. Fails with an internal
    /// error if a resource is reachable.
    pub fn copy(&self) -> EvalResult<Value> {
        ensure_sufficient_stack(|| match self {
            Value::Some(inner) => Ok(Value::some(inner.copy()?)),
            Value::Array(array) => {
                let elements = array
                    .elements()
                    .iter()
                    .map(Value::copy)
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Value::Array(ArrayValue::new(elements)))
            }
            Value::Dictionary(dict) => {
                let copy = DictionaryValue::new();
                for (key, value) in dict.entries() {
                    copy.insert(key, value.copy()?)?;
                }
                Ok(Value::Dictionary(copy))
            }
            Value::Composite(composite) => {
                if composite.is_resource() {
                    return Err(implicit_resource_copy(composite.type_name()));
                }
                let fields = composite
                    .fields()
                    .into_iter()
                    .map(|(name, value)| Ok((name, value.copy()?)))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Value::Composite(CompositeValue::new(
                    composite.type_name(),
                    composite.kind(),
                    fields,
                )))
            }
            other => Ok(other.clone()),
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        ensure_sufficient_stack(|| match (self, other) {
            (Value::Void, Value::Void) | (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt64(a), Value::UInt64(b)) => a == b,
            (Value::Int256(a), Value::Int256(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Address(a), Value::Address(b)) => a == b,
            (Value::Some(a), Value::Some(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Dictionary(a), Value::Dictionary(b)) => a == b,
            (Value::Composite(a), Value::Composite(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        })
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ensure_sufficient_stack(|| match self {
            Value::Void => write!(f, "Void"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::UInt64(n) => write!(f, "UInt64({n})"),
            Value::Int256(n) => write!(f, "{n:?}"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Address(a) => write!(f, "Address({a})"),
            Value::Some(inner) => f.debug_tuple("Some").field(inner).finish(),
            Value::None => write!(f, "None"),
            Value::Array(array) => f.debug_tuple("Array").field(array).finish(),
            Value::Dictionary(dict) => f.debug_tuple("Dictionary").field(dict).finish(),
            Value::Composite(composite) => fmt::Debug::fmt(composite, f),
            Value::Function(function) => fmt::Debug::fmt(function, f),
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ensure_sufficient_stack(|| match self {
            Value::Void => write!(f, "()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::UInt64(n) => write!(f, "{n}"),
            Value::Int256(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Address(a) => write!(f, "{a}"),
            Value::Some(inner) => fmt::Display::fmt(&**inner, f),
            Value::None => write!(f, "nil"),
            Value::Array(array) => {
                write!(f, "[")?;
                for (i, element) in array.elements().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, "]")
            }
            Value::Dictionary(dict) => {
                write!(f, "{{")?;
                for (i, (key, value)) in dict.entries().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Value::Composite(composite) => {
                write!(f, "{:?}(", composite.type_name())?;
                for (i, (name, value)) in composite.fields().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name:?}: {value}")?;
                }
                write!(f, ")")
            }
            Value::Function(_) => write!(f, "<function>"),
        })
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::UInt64(n)
    }
}

impl From<Int256> for Value {
    fn from(n: Int256) -> Self {
        Value::Int256(n)
    }
}

impl From<Address> for Value {
    fn from(a: Address) -> Self {
        Value::Address(a)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}
