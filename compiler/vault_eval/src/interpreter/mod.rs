//! Tree-walking interpreter for Vault.
//!
//! # Architecture
//!
//! Expressions and statements are not evaluated recursively. Each node
//! becomes a [`Trampoline`] step whose sub-evaluations are chained with
//! [`Trampoline::then`]; the [`Execution`] driver unfolds the chain on the
//! heap. Helper modules:
//!
//! - `expr` - expression steps, transfer sites, moves
//! - `stmt` - statement sequencing, `if`, `while`, assignment
//! - `operators` - unary and binary operator dispatch
//!
//! # Arena Threading
//!
//! An interpreted function carries the `SharedArena` its declaration lives
//! in, and its body always evaluates against that arena. Different
//! functions may come from different arenas.
//!
//! # Name Resolution
//!
//! Identifiers resolve in the current activation first, then in the
//! interpreter's globals (top-level declarations and host values).

mod builder;
mod expr;
mod operators;
mod stmt;

pub use builder::InterpreterBuilder;
pub(crate) use expr::Context;
pub(crate) use stmt::exec_block;

use tracing::{debug, trace};
use vault_ir::{ExprId, FunctionId, Name, SharedArena, SharedInterner, Span, StaticType, StmtRange};

use crate::activation::{Activation, Variable};
use crate::diagnostics::{CallFrame, CallStack, EvalCounters};
use crate::errors::{
    cancelled, step_budget_exceeded, type_mismatch, undefined_variable, EvalError, EvalResult,
};
use crate::eval_mode::{EvalMode, ModeState};
use crate::function::FunctionValue;
use crate::hooks::{CancelToken, StepContext, StepHook};
use crate::invocation::Invocation;
use crate::trampoline::{Execution, Trampoline};
use crate::value::Value;

/// The evaluator.
///
/// Holds configuration (mode, limits, hooks) and the state that outlives a
/// single execution: globals, the live call stack, and step counters.
/// Single-threaded; only the [`CancelToken`] may be shared across threads.
pub struct Interpreter {
    pub(crate) interner: SharedInterner,
    pub(crate) mode: EvalMode,
    pub(crate) mode_state: ModeState,
    pub(crate) call_stack: CallStack,
    pub(crate) cancel: CancelToken,
    pub(crate) hooks: Vec<Box<dyn StepHook>>,
    pub(crate) globals: Activation,
    /// Transfer lists being evaluated, innermost last.
    pub(crate) transfers: Vec<expr::TransferScope>,
}

impl Interpreter {
    pub fn builder() -> InterpreterBuilder {
        InterpreterBuilder::new()
    }

    /// An interpreter in `Interpret` mode with a fresh interner.
    pub fn new() -> Self {
        InterpreterBuilder::new().build()
    }

    // Entry points

    /// Start a call to `function`. Nothing runs until the returned
    /// trampoline is driven.
    #[tracing::instrument(level = "debug", skip_all, fields(function = ?function.name()))]
    pub fn invoke(
        &mut self,
        function: &FunctionValue,
        arguments: impl IntoIterator<Item = Value>,
        argument_types: Vec<StaticType>,
        span: Span,
    ) -> EvalResult<Trampoline> {
        function.invoke(Invocation::new(self, arguments, argument_types, span))
    }

    /// Drive `trampoline` to completion.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run(&mut self, trampoline: Trampoline) -> EvalResult<Value> {
        Execution::new(trampoline, self).run(self)
    }

    /// A step-by-step driver for `trampoline`.
    pub fn execution(&self, trampoline: Trampoline) -> Execution {
        Execution::new(trampoline, self)
    }

    /// Invoke and run `function`, using its declared parameter types.
    pub fn call_function(
        &mut self,
        function: &FunctionValue,
        arguments: impl IntoIterator<Item = Value>,
    ) -> EvalResult<Value> {
        let argument_types = function.ty().params;
        let trampoline = self.invoke(function, arguments, argument_types, Span::DUMMY)?;
        self.run(trampoline)
    }

    /// Look up the global function `name`, invoke it, and run it.
    pub fn call(
        &mut self,
        name: &str,
        arguments: impl IntoIterator<Item = Value>,
    ) -> EvalResult<Value> {
        let name = self.interner.intern(name);
        let function = match self.globals.lookup_value(name) {
            Some(Value::Function(function)) => function,
            Some(other) => return Err(type_mismatch("Function", other.type_name())),
            None => return Err(undefined_variable(self.interner.lookup(name))),
        };
        self.call_function(&function, arguments)
    }

    /// Evaluate a single expression of `arena` against the globals.
    pub fn evaluate(&mut self, arena: &SharedArena, expr: ExprId) -> EvalResult<Value> {
        let ctx = Context::new(arena.clone(), self.globals.clone());
        self.run(expr::eval_expr(ctx, expr))
    }

    /// Execute a block of `arena` against the globals. A `return` inside
    /// the block finishes it with the returned value.
    pub fn execute(&mut self, arena: &SharedArena, block: StmtRange) -> EvalResult<Value> {
        let ctx = Context::new(arena.clone(), self.globals.clone());
        self.run(exec_block(ctx, block))
    }

    // Globals

    /// Bind top-level function declarations as globals.
    ///
    /// Every name is declared before any closure is created, so the
    /// functions may call each other in any order.
    pub fn declare_functions(&mut self, arena: &SharedArena, ids: &[FunctionId]) {
        let mut globals = self.globals.clone();
        let mut cells = Vec::with_capacity(ids.len());
        for &id in ids {
            let (extended, variable) = globals.declare(arena.function(id).name);
            globals = extended;
            cells.push((id, variable));
        }
        for (id, variable) in cells {
            let function = FunctionValue::interpreted(arena.clone(), id, globals.clone());
            variable.set(Value::Function(function));
        }
        debug!(count = ids.len(), "declared functions");
        self.globals = globals;
    }

    /// Bind a global value, typically a host function.
    pub fn define_global(&mut self, name: Name, value: Value) {
        self.globals = self.globals.extend(name, value);
    }

    // Accessors

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    pub fn mode(&self) -> &EvalMode {
        &self.mode
    }

    pub fn globals(&self) -> &Activation {
        &self.globals
    }

    /// Suspension points passed since the interpreter was built.
    pub fn steps(&self) -> u64 {
        self.mode_state.steps()
    }

    pub fn counters(&self) -> Option<&EvalCounters> {
        self.mode_state.counters()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Current language-level call depth.
    pub fn call_depth(&self) -> usize {
        self.call_stack.depth()
    }

    pub fn max_call_depth(&self) -> Option<usize> {
        self.call_stack.max_depth()
    }

    // Driver support

    pub(crate) fn push_call(&mut self, frame: CallFrame) -> EvalResult<()> {
        trace!(depth = self.call_stack.depth(), "call");
        let span = frame.call_span;
        self.call_stack.push(frame).map_err(|err| match span {
            Some(span) => err.with_span(span),
            None => err,
        })
    }

    pub(crate) fn pop_call(&mut self) {
        self.call_stack.pop();
    }

    pub(crate) fn truncate_call_stack(&mut self, depth: usize) {
        self.call_stack.truncate(depth);
    }

    pub(crate) fn open_transfers(&self) -> usize {
        self.transfers.len()
    }

    /// Drop every transfer list above the first `open`. Their reserved moves
    /// never happened, so the sources stay bound.
    pub(crate) fn abandon_transfers(&mut self, open: usize) {
        self.transfers.truncate(open);
    }

    pub(crate) fn attach_backtrace(&self, err: EvalError) -> EvalError {
        self.call_stack.attach_backtrace(err, &self.interner)
    }

    /// Bookkeeping before every `More` step: meter, check cancellation,
    /// run hooks.
    pub(crate) fn suspension_point(&mut self) -> EvalResult<()> {
        if let Err(exceeded) = self.mode_state.check_step() {
            debug!(
                budget = exceeded.budget,
                steps = exceeded.steps,
                "step budget exceeded"
            );
            return Err(step_budget_exceeded(exceeded.budget));
        }
        if self.cancel.is_cancelled() {
            debug!(steps = self.mode_state.steps(), "evaluation cancelled");
            return Err(cancelled());
        }
        if !self.hooks.is_empty() {
            let ctx = StepContext {
                steps: self.mode_state.steps(),
                call_depth: self.call_stack.depth(),
            };
            for hook in &mut self.hooks {
                hook.on_step(&ctx)?;
            }
        }
        Ok(())
    }

    pub(crate) fn count_expression(&mut self) {
        self.mode_state.count_expression();
    }

    pub(crate) fn count_statement(&mut self) {
        self.mode_state.count_statement();
    }

    pub(crate) fn count_function_call(&mut self) {
        self.mode_state.count_function_call();
    }

    pub(crate) fn count_host_call(&mut self) {
        self.mode_state.count_host_call();
    }

    /// Resolve `name`: current activation, then globals.
    pub(crate) fn lookup_variable(
        &self,
        activation: &Activation,
        name: Name,
    ) -> Option<Variable> {
        activation
            .lookup(name)
            .or_else(|| self.globals.lookup(name))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
