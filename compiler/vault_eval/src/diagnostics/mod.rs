//! Diagnostic infrastructure for the evaluator.
//!
//! - `CallStack`: live call frames, used for the depth limit and backtraces
//! - `CallFrame`: per-call metadata (name, call-site span)
//! - `EvalCounters`: optional evaluation counters
//!
//! Frames live on the heap; the trampoline pushes one per call boundary and
//! pops it when the boundary completes, so the stack depth here is the
//! language-level call depth, not the native one.

use vault_ir::{Name, Span, StringLookup};

use crate::errors::{call_depth_exceeded, BacktraceFrame, EvalBacktrace, EvalError};

/// A single frame in the live call stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallFrame {
    /// Interned function name.
    pub name: Name,
    /// Source location of the call site.
    pub call_span: Option<Span>,
}

/// Live call stack for the interpreter.
///
/// The depth check is integrated into `push()`.
///
/// ```ignore
/// let mut stack = CallStack::new(Some(200));
/// stack.push(CallFrame { name, call_span: Some(span) })?;
/// // ... evaluate function body ...
/// stack.pop();
/// ```
#[derive(Clone, Debug)]
pub struct CallStack {
    frames: Vec<CallFrame>,
    max_depth: Option<usize>,
}

impl CallStack {
    /// Create an empty call stack. `None` means unlimited depth.
    pub fn new(max_depth: Option<usize>) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Push a call frame, checking the depth limit.
    ///
    /// The frame is NOT pushed on overflow.
    pub fn push(&mut self, frame: CallFrame) -> Result<(), EvalError> {
        if let Some(max) = self.max_depth {
            if self.frames.len() >= max {
                return Err(call_depth_exceeded(max));
            }
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Pop the most recent call frame.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if the stack is empty. In release mode,
    /// this is a no-op on an empty stack.
    pub fn pop(&mut self) {
        debug_assert!(
            !self.frames.is_empty(),
            "CallStack::pop() called on empty stack"
        );
        self.frames.pop();
    }

    /// Drop frames above `depth`. Used to restore the stack after an error.
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// The current (most recent) call frame, if any.
    #[inline]
    pub fn current_frame(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    /// Snapshot the stack as an `EvalBacktrace`, most recent call first.
    pub fn capture(&self, interner: &dyn StringLookup) -> EvalBacktrace {
        if self.frames.is_empty() {
            return EvalBacktrace::default();
        }
        let frames = self
            .frames
            .iter()
            .rev()
            .map(|f| BacktraceFrame {
                name: interner.lookup(f.name).to_string(),
                span: f.call_span,
            })
            .collect();
        EvalBacktrace::new(frames)
    }

    /// Attach a backtrace from this call stack to an error, unless the error
    /// already carries one or the stack is empty.
    pub fn attach_backtrace(&self, err: EvalError, interner: &dyn StringLookup) -> EvalError {
        if self.frames.is_empty() || err.backtrace.is_some() {
            return err;
        }
        err.with_backtrace(self.capture(interner))
    }
}

impl Default for CallStack {
    /// Creates an unlimited call stack (`Interpret` mode default).
    fn default() -> Self {
        Self::new(None)
    }
}

/// Optional evaluation counters.
///
/// Stored as `Option<EvalCounters>` on `ModeState`. When `None`, all
/// counter increments are no-ops.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalCounters {
    pub expressions_evaluated: u64,
    pub statements_executed: u64,
    pub function_calls: u64,
    pub host_calls: u64,
}

impl EvalCounters {
    #[inline]
    pub fn count_expression(&mut self) {
        self.expressions_evaluated = self.expressions_evaluated.wrapping_add(1);
    }

    #[inline]
    pub fn count_statement(&mut self) {
        self.statements_executed = self.statements_executed.wrapping_add(1);
    }

    #[inline]
    pub fn count_function_call(&mut self) {
        self.function_calls = self.function_calls.wrapping_add(1);
    }

    #[inline]
    pub fn count_host_call(&mut self) {
        self.host_calls = self.host_calls.wrapping_add(1);
    }

    /// Format a summary report.
    pub fn report(&self) -> String {
        format!(
            "Evaluation profile:\n  \
             Expressions evaluated: {}\n  \
             Statements executed:   {}\n  \
             Function calls:        {}\n  \
             Host calls:            {}",
            self.expressions_evaluated,
            self.statements_executed,
            self.function_calls,
            self.host_calls,
        )
    }
}
