//! Function values: interpreted closures and host callbacks.

use std::fmt;
use std::rc::Rc;

use vault_ir::{FunctionId, FunctionType, Name, SharedArena};

use crate::activation::Activation;
use crate::diagnostics::CallFrame;
use crate::errors::{arity_mismatch, no_members, unreachable, EvalResult};
use crate::interpreter::{exec_block, Context};
use crate::invocation::Invocation;
use crate::trampoline::Trampoline;
use crate::value::{FieldMap, Value};

/// Native callback behind a host function.
///
/// The callback receives the invocation (including `&mut Interpreter`) and
/// returns a trampoline, so it may invoke interpreted functions and hand
/// the resulting work back to the same driver.
pub type HostFn = dyn Fn(Invocation<'_>) -> EvalResult<Trampoline>;

/// A function value.
///
/// Cloning is cheap; clones compare equal through [`FunctionValue::ptr_eq`].
#[derive(Clone)]
pub enum FunctionValue {
    Interpreted(Rc<InterpretedFunction>),
    Host(Rc<HostFunctionValue>),
}

/// A declared function closed over the activation it was created in.
pub struct InterpretedFunction {
    arena: SharedArena,
    decl: FunctionId,
    activation: Activation,
}

impl InterpretedFunction {
    pub fn arena(&self) -> &SharedArena {
        &self.arena
    }

    pub fn decl(&self) -> FunctionId {
        self.decl
    }

    pub fn activation(&self) -> &Activation {
        &self.activation
    }
}

/// A function implemented by the host.
pub struct HostFunctionValue {
    name: Name,
    ty: FunctionType,
    function: Box<HostFn>,
    members: Option<FieldMap>,
}

impl FunctionValue {
    /// Close `decl` over `activation`.
    pub fn interpreted(arena: SharedArena, decl: FunctionId, activation: Activation) -> Self {
        FunctionValue::Interpreted(Rc::new(InterpretedFunction {
            arena,
            decl,
            activation,
        }))
    }

    pub fn host(
        name: Name,
        ty: FunctionType,
        function: impl Fn(Invocation<'_>) -> EvalResult<Trampoline> + 'static,
    ) -> Self {
        FunctionValue::Host(Rc::new(HostFunctionValue {
            name,
            ty,
            function: Box::new(function),
            members: None,
        }))
    }

    /// A host function that also exposes named members.
    pub fn host_with_members(
        name: Name,
        ty: FunctionType,
        members: impl IntoIterator<Item = (Name, Value)>,
        function: impl Fn(Invocation<'_>) -> EvalResult<Trampoline> + 'static,
    ) -> Self {
        FunctionValue::Host(Rc::new(HostFunctionValue {
            name,
            ty,
            function: Box::new(function),
            members: Some(members.into_iter().collect()),
        }))
    }

    pub fn name(&self) -> Name {
        match self {
            FunctionValue::Interpreted(f) => f.arena.function(f.decl).name,
            FunctionValue::Host(f) => f.name,
        }
    }

    pub fn ty(&self) -> FunctionType {
        match self {
            FunctionValue::Interpreted(f) => f.arena.function(f.decl).ty.clone(),
            FunctionValue::Host(f) => f.ty.clone(),
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            FunctionValue::Interpreted(f) => f.arena.function(f.decl).arity(),
            FunctionValue::Host(f) => f.ty.arity(),
        }
    }

    /// Identity comparison: same closure or same host function.
    pub fn ptr_eq(&self, other: &FunctionValue) -> bool {
        match (self, other) {
            (FunctionValue::Interpreted(a), FunctionValue::Interpreted(b)) => Rc::ptr_eq(a, b),
            (FunctionValue::Host(a), FunctionValue::Host(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Start a call. The returned trampoline is wrapped in a call boundary
    /// and has not run any of the body yet.
    pub fn invoke(&self, invocation: Invocation<'_>) -> EvalResult<Trampoline> {
        let frame = CallFrame {
            name: self.name(),
            call_span: Some(invocation.span),
        };
        match self {
            FunctionValue::Interpreted(f) => {
                let decl = f.arena.function(f.decl);
                if invocation.arguments.len() != decl.arity() {
                    return Err(arity_mismatch(decl.arity(), invocation.arguments.len())
                        .with_span(invocation.span));
                }
                invocation.interpreter.count_function_call();
                let activation = decl
                    .params
                    .iter()
                    .zip(invocation.arguments)
                    .fold(f.activation.clone(), |activation, (param, argument)| {
                        activation.extend(param.name, argument)
                    });
                let ctx = Context::new(f.arena.clone(), activation);
                Ok(Trampoline::call(frame, exec_block(ctx, decl.body)))
            }
            FunctionValue::Host(f) => {
                invocation.interpreter.count_host_call();
                let Invocation {
                    arguments,
                    argument_types,
                    span,
                    ..
                } = invocation;
                let host = Rc::clone(f);
                // The callback runs in the step that landed its arguments.
                let body = Trampoline::done(Value::Void).then(move |interpreter, _| {
                    (host.function)(Invocation {
                        arguments,
                        argument_types,
                        span,
                        interpreter,
                    })
                    .map_err(|err| err.with_span(span))
                });
                Ok(Trampoline::call(frame, body))
            }
        }
    }

    /// Read a named member. Only host functions carry members.
    pub fn get_member(&self, name: Name) -> EvalResult<Option<Value>> {
        match self {
            FunctionValue::Interpreted(_) => Err(no_members("Function")),
            FunctionValue::Host(f) => Ok(f
                .members
                .as_ref()
                .and_then(|members| members.get(&name).cloned())),
        }
    }

    /// Function members are read-only.
    pub fn set_member(&self, _name: Name, _value: Value) -> EvalResult<()> {
        Err(unreachable("function members cannot be assigned"))
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionValue::Interpreted(func) => f
                .debug_tuple("Interpreted")
                .field(&func.decl)
                .field(&func.activation)
                .finish(),
            FunctionValue::Host(func) => f.debug_tuple("Host").field(&func.name).finish(),
        }
    }
}
