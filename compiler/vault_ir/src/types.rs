//! Static types resolved by the (external) type checker.
//!
//! The evaluator never infers or checks these. They travel with function
//! values and invocations so host functions can dispatch on them.

use std::fmt;

use crate::ast::CompositeKind;
use crate::Name;

/// A resolved static type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StaticType {
    Void,
    Bool,
    Int,
    UInt64,
    Int256,
    String,
    Address,
    Optional(Box<StaticType>),
    Array(Box<StaticType>),
    Dictionary {
        key: Box<StaticType>,
        value: Box<StaticType>,
    },
    Composite {
        name: Name,
        kind: CompositeKind,
    },
    Function(FunctionType),
    /// Type parameter or otherwise erased type.
    Any,
}

impl StaticType {
    #[must_use]
    pub fn optional(inner: StaticType) -> Self {
        StaticType::Optional(Box::new(inner))
    }

    #[must_use]
    pub fn array(element: StaticType) -> Self {
        StaticType::Array(Box::new(element))
    }

    #[must_use]
    pub fn dictionary(key: StaticType, value: StaticType) -> Self {
        StaticType::Dictionary {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// True if values of this type are moved rather than copied.
    ///
    /// Containers of resources are themselves resource-typed.
    pub fn is_resource(&self) -> bool {
        match self {
            StaticType::Composite { kind, .. } => *kind == CompositeKind::Resource,
            StaticType::Optional(inner) | StaticType::Array(inner) => inner.is_resource(),
            StaticType::Dictionary { value, .. } => value.is_resource(),
            _ => false,
        }
    }
}

impl fmt::Display for StaticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticType::Void => write!(f, "Void"),
            StaticType::Bool => write!(f, "Bool"),
            StaticType::Int => write!(f, "Int"),
            StaticType::UInt64 => write!(f, "UInt64"),
            StaticType::Int256 => write!(f, "Int256"),
            StaticType::String => write!(f, "String"),
            StaticType::Address => write!(f, "Address"),
            StaticType::Optional(inner) => write!(f, "{inner}?"),
            StaticType::Array(element) => write!(f, "[{element}]"),
            StaticType::Dictionary { key, value } => write!(f, "{{{key}: {value}}}"),
            StaticType::Composite { name, kind } => {
                let marker = if *kind == CompositeKind::Resource { "@" } else { "" };
                write!(f, "{marker}{name:?}")
            }
            StaticType::Function(ty) => write!(f, "{ty}"),
            StaticType::Any => write!(f, "Any"),
        }
    }
}

/// Signature of a function: parameter types and return type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub params: Vec<StaticType>,
    pub ret: Box<StaticType>,
}

impl FunctionType {
    pub fn new(params: Vec<StaticType>, ret: StaticType) -> Self {
        FunctionType {
            params,
            ret: Box::new(ret),
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "((")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, "): {})", self.ret)
    }
}
