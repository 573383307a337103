//! Error types for evaluation.
//!
//! `EvalErrorKind` separates language-level failures, which a host may report
//! to the contract author, from `InternalError`s, which mean the evaluator or
//! the type checker upstream of it broke an invariant.
//!
//! Factory functions (e.g. `division_by_zero()`) are the construction API.

use std::fmt;

use vault_ir::{Name, Span};

use crate::value::Value;

/// Result of evaluation.
pub type EvalResult<T = Value> = Result<T, EvalError>;

/// Control flow signals carried through the error channel.
///
/// These are not errors. The trampoline driver intercepts them at the
/// nearest call boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlFlow {
    /// Return from the enclosing function with a value.
    Return(Value),
}

/// Invariant violations. Evaluation must not continue after one of these.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InternalError {
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },
    #[error("implicit copy of resource {type_name:?}")]
    ImplicitResourceCopy { type_name: Name },
    #[error("function values have no members (type {type_name})")]
    NoMembers { type_name: String },
    #[error("undefined variable: {name}")]
    UndefinedVariable { name: String },
    #[error("no field {field} on {type_name}")]
    UndefinedField { type_name: String, field: String },
    #[error("expected {expected} arguments, got {got}")]
    ArityMismatch { expected: usize, got: usize },
    #[error("dictionary keys must be hashable primitives, got {type_name}")]
    UnhashableKey { type_name: String },
    #[error("execution already finished")]
    ExecutionFinished,
    #[error("unreachable: {message}")]
    Unreachable { message: String },
}

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EvalErrorKind {
    // Arithmetic
    #[error("integer overflow in {left} {operation} {right}")]
    IntegerOverflow {
        operation: String,
        left: String,
        right: String,
    },
    #[error("division by zero")]
    DivisionByZero,

    // Access
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: String, len: usize },
    #[error("force unwrap of nil")]
    ForceUnwrapNone,
    #[error("use of moved resource: {name}")]
    ResourceMoved { name: String },

    // Limits
    #[error("maximum call depth exceeded (limit: {limit})")]
    CallDepthExceeded { limit: usize },
    #[error("step budget exceeded (budget: {budget})")]
    StepBudgetExceeded { budget: u64 },
    #[error("evaluation cancelled")]
    Cancelled,

    // Host
    #[error("{message}")]
    Host { message: String },

    /// Catch-all for errors not categorized into structured kinds.
    ///
    /// Control flow signals also use this kind.
    #[error("{message}")]
    Custom { message: String },

    #[error("internal error: {0}")]
    Internal(#[from] InternalError),
}

/// A single frame in an evaluation backtrace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BacktraceFrame {
    /// Function name.
    pub name: String,
    /// Source location of the call site.
    pub span: Option<Span>,
}

/// Immutable snapshot of the call stack at an error site.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalBacktrace {
    frames: Vec<BacktraceFrame>,
}

impl EvalBacktrace {
    pub fn new(frames: Vec<BacktraceFrame>) -> Self {
        Self { frames }
    }

    /// Frames, most recent call first.
    pub fn frames(&self) -> &[BacktraceFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

impl fmt::Display for EvalBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frames.is_empty() {
            return Ok(());
        }
        writeln!(f, "stack backtrace:")?;
        for (i, frame) in self.frames.iter().enumerate() {
            write!(f, "  {i}: {}", frame.name)?;
            if let Some(span) = frame.span {
                write!(f, " at {span}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Evaluation error.
#[derive(Clone, Debug)]
pub struct EvalError {
    /// Structured error category.
    pub kind: EvalErrorKind,
    /// Source location where the error occurred.
    pub span: Option<Span>,
    /// Call stack at the error site, attached by the trampoline driver.
    pub backtrace: Option<EvalBacktrace>,
    /// If this is a control flow signal, holds the signal.
    pub control_flow: Option<ControlFlow>,
}

impl EvalError {
    /// Create an error with just a message (`Custom` kind).
    pub fn new(message: impl Into<String>) -> Self {
        Self::from_kind(EvalErrorKind::Custom {
            message: message.into(),
        })
    }

    fn from_kind(kind: EvalErrorKind) -> Self {
        Self {
            kind,
            span: None,
            backtrace: None,
            control_flow: None,
        }
    }

    /// Create a return signal carrying the function result.
    pub fn return_with(value: Value) -> Self {
        Self {
            kind: EvalErrorKind::Custom {
                message: "return".to_string(),
            },
            span: None,
            backtrace: None,
            control_flow: Some(ControlFlow::Return(value)),
        }
    }

    /// Attach a source span unless one is already present.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    #[must_use]
    pub fn with_backtrace(mut self, backtrace: EvalBacktrace) -> Self {
        self.backtrace = Some(backtrace);
        self
    }

    #[inline]
    pub fn is_control_flow(&self) -> bool {
        self.control_flow.is_some()
    }

    /// True for internal invariant violations.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, EvalErrorKind::Internal(_))
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<InternalError> for EvalError {
    fn from(err: InternalError) -> Self {
        Self::from_kind(EvalErrorKind::Internal(err))
    }
}

// Arithmetic Errors

#[cold]
pub fn integer_overflow(operation: &str, left: &Value, right: &Value) -> EvalError {
    EvalError::from_kind(EvalErrorKind::IntegerOverflow {
        operation: operation.to_string(),
        left: left.to_string(),
        right: right.to_string(),
    })
}

#[cold]
pub fn division_by_zero() -> EvalError {
    EvalError::from_kind(EvalErrorKind::DivisionByZero)
}

// Access Errors

#[cold]
pub fn index_out_of_bounds(index: &Value, len: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::IndexOutOfBounds {
        index: index.to_string(),
        len,
    })
}

#[cold]
pub fn force_unwrap_none() -> EvalError {
    EvalError::from_kind(EvalErrorKind::ForceUnwrapNone)
}

#[cold]
pub fn resource_moved(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ResourceMoved {
        name: name.to_string(),
    })
}

// Limit Errors

#[cold]
pub fn call_depth_exceeded(limit: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::CallDepthExceeded { limit })
}

#[cold]
pub fn step_budget_exceeded(budget: u64) -> EvalError {
    EvalError::from_kind(EvalErrorKind::StepBudgetExceeded { budget })
}

#[cold]
pub fn cancelled() -> EvalError {
    EvalError::from_kind(EvalErrorKind::Cancelled)
}

/// Error raised by a host function.
#[cold]
pub fn host_error(message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Host {
        message: message.into(),
    })
}

// Internal Errors

#[cold]
pub fn type_mismatch(expected: &str, got: &str) -> EvalError {
    InternalError::TypeMismatch {
        expected: expected.to_string(),
        got: got.to_string(),
    }
    .into()
}

#[cold]
pub fn implicit_resource_copy(type_name: Name) -> EvalError {
    InternalError::ImplicitResourceCopy { type_name }.into()
}

#[cold]
pub fn no_members(type_name: &str) -> EvalError {
    InternalError::NoMembers {
        type_name: type_name.to_string(),
    }
    .into()
}

#[cold]
pub fn undefined_variable(name: &str) -> EvalError {
    InternalError::UndefinedVariable {
        name: name.to_string(),
    }
    .into()
}

#[cold]
pub fn undefined_field(type_name: &str, field: &str) -> EvalError {
    InternalError::UndefinedField {
        type_name: type_name.to_string(),
        field: field.to_string(),
    }
    .into()
}

#[cold]
pub fn arity_mismatch(expected: usize, got: usize) -> EvalError {
    InternalError::ArityMismatch { expected, got }.into()
}

#[cold]
pub fn unhashable_key(type_name: &str) -> EvalError {
    InternalError::UnhashableKey {
        type_name: type_name.to_string(),
    }
    .into()
}

#[cold]
pub fn execution_finished() -> EvalError {
    InternalError::ExecutionFinished.into()
}

#[cold]
pub fn unreachable(message: impl Into<String>) -> EvalError {
    InternalError::Unreachable {
        message: message.into(),
    }
    .into()
}
