//! Call-site data handed to a function value.

use smallvec::SmallVec;
use vault_ir::{Span, StaticType};

use crate::errors::{arity_mismatch, EvalResult};
use crate::interpreter::Interpreter;
use crate::value::Value;

static ANY: StaticType = StaticType::Any;

/// Inline capacity for argument lists. Most calls take few arguments.
pub type Arguments = SmallVec<[Value; 4]>;

/// One call: evaluated arguments, their static types, the call site, and
/// the interpreter so host functions can call back into the language.
pub struct Invocation<'i> {
    pub arguments: Arguments,
    pub argument_types: Vec<StaticType>,
    pub span: Span,
    pub interpreter: &'i mut Interpreter,
}

impl<'i> Invocation<'i> {
    pub fn new(
        interpreter: &'i mut Interpreter,
        arguments: impl IntoIterator<Item = Value>,
        argument_types: Vec<StaticType>,
        span: Span,
    ) -> Self {
        Self {
            arguments: arguments.into_iter().collect(),
            argument_types,
            span,
            interpreter,
        }
    }

    /// Argument at `index`; a missing argument is an arity violation.
    pub fn argument(&self, index: usize) -> EvalResult<&Value> {
        self.arguments
            .get(index)
            .ok_or_else(|| arity_mismatch(index.saturating_add(1), self.arguments.len()))
    }

    /// Static type of the argument at `index`, `Any` if unknown.
    pub fn argument_type(&self, index: usize) -> &StaticType {
        self.argument_types.get(index).unwrap_or(&ANY)
    }

    pub fn expect_arity(&self, expected: usize) -> EvalResult<()> {
        if self.arguments.len() == expected {
            Ok(())
        } else {
            Err(arity_mismatch(expected, self.arguments.len()).with_span(self.span))
        }
    }
}
