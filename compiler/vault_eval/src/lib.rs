//! Vault Eval - evaluation core for the Vault contract language.
//!
//! This crate executes the AST produced by the Vault front end (see
//! `vault_ir`) and enforces the language's resource discipline at runtime.
//!
//! # Architecture
//!
//! - [`Value`]: closed value model; resources move, structures copy
//! - [`Activation`]: persistent scopes shared by closures
//! - [`FunctionValue`] / [`Invocation`]: one calling convention for
//!   interpreted and host functions
//! - [`Trampoline`] / [`Execution`]: stack-bounded stepping with metering,
//!   cancellation and hooks at every step
//! - [`Interpreter`]: AST evaluation on top of the trampoline
//! - [`inspect`]: pre-order walk over a live value graph
//!
//! # Errors
//!
//! Everything fails through [`EvalError`]. Language-level errors (overflow,
//! moved resources, limits) are reported to the host; internal errors mean
//! an invariant broke upstream.

mod activation;
mod diagnostics;
pub mod errors;
mod eval_mode;
mod function;
mod hooks;
pub mod inspect;
pub mod interpreter;
mod invocation;
mod stack;
mod trampoline;
pub mod value;

pub use activation::{Activation, Binding, Variable};
pub use diagnostics::{CallFrame, CallStack, EvalCounters};
pub use errors::{
    BacktraceFrame, ControlFlow, EvalBacktrace, EvalError, EvalErrorKind, EvalResult,
    InternalError,
};
pub use eval_mode::{BudgetExceeded, EvalMode, ModeState};
pub use function::{FunctionValue, HostFn, HostFunctionValue, InterpretedFunction};
pub use hooks::{CancelToken, StepContext, StepHook};
pub use inspect::{inspect, ContainerEnd, Inspected};
pub use interpreter::{Interpreter, InterpreterBuilder};
pub use invocation::{Arguments, Invocation};
pub use trampoline::{Continuation, Execution, Progress, Step, Trampoline};
pub use value::{
    Address, ArrayValue, CompositeValue, DictionaryKey, DictionaryValue, FieldMap, Int256, Value,
};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Enable with `RUST_LOG=vault_eval=debug`,
/// or `RUST_LOG=vault_eval=trace` to log every step.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
