//! Stack-bounded evaluation engine.
//!
//! Evaluation never recurses on the native stack. Every piece of work is a
//! [`Trampoline`]: either a finished value, a deferred step, or one of two
//! composition forms (`FlatMap`, `Call`) that the driver unfolds onto its
//! own heap-allocated frame stack. Native stack use per [`Execution::step`]
//! is constant regardless of how deeply the program nests or recurses.
//!
//! Every `More` step is a suspension point where the interpreter meters,
//! checks for cancellation, and runs its step hooks.

use std::fmt;

use tracing::{debug, trace};

use crate::diagnostics::CallFrame;
use crate::errors::{execution_finished, ControlFlow, EvalError, EvalResult};
use crate::interpreter::Interpreter;
use crate::value::Value;

/// A deferred evaluation step.
pub type Step = Box<dyn FnOnce(&mut Interpreter) -> EvalResult<Trampoline>>;

/// What to do with a value once the preceding trampoline finishes.
pub type Continuation = Box<dyn FnOnce(&mut Interpreter, Value) -> EvalResult<Trampoline>>;

/// A unit of suspended work.
pub enum Trampoline {
    /// Evaluation finished with a value.
    Done(Value),
    /// One more step is needed.
    More(Step),
    /// Run the first trampoline, then feed its value to the continuation.
    FlatMap(Box<Trampoline>, Continuation),
    /// A function call boundary: tracks call depth and catches `return`.
    Call { frame: CallFrame, body: Box<Trampoline> },
}

impl Trampoline {
    #[inline]
    pub fn done(value: Value) -> Self {
        Trampoline::Done(value)
    }

    #[inline]
    pub fn more(step: impl FnOnce(&mut Interpreter) -> EvalResult<Trampoline> + 'static) -> Self {
        Trampoline::More(Box::new(step))
    }

    /// Sequence: run `self`, then `next` with its result.
    #[must_use]
    pub fn then(
        self,
        next: impl FnOnce(&mut Interpreter, Value) -> EvalResult<Trampoline> + 'static,
    ) -> Self {
        Trampoline::FlatMap(Box::new(self), Box::new(next))
    }

    /// Transform the result of `self`.
    #[must_use]
    pub fn map(self, f: impl FnOnce(Value) -> Value + 'static) -> Self {
        self.then(move |_, value| Ok(Trampoline::Done(f(value))))
    }

    /// Wrap `body` in a call boundary.
    pub fn call(frame: CallFrame, body: Trampoline) -> Self {
        Trampoline::Call {
            frame,
            body: Box::new(body),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Trampoline::Done(_))
    }
}

impl fmt::Debug for Trampoline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trampoline::Done(value) => f.debug_tuple("Done").field(value).finish(),
            Trampoline::More(_) => write!(f, "More(..)"),
            Trampoline::FlatMap(first, _) => f.debug_tuple("FlatMap").field(first).finish(),
            Trampoline::Call { frame, .. } => f.debug_struct("Call").field("frame", frame).finish(),
        }
    }
}

impl From<Value> for Trampoline {
    fn from(value: Value) -> Self {
        Trampoline::Done(value)
    }
}

/// Pending work on the driver's frame stack.
enum Frame {
    Then(Continuation),
    /// Marks the extent of a call; pops the call stack when reached.
    Boundary,
}

/// Outcome of a single [`Execution::step`].
#[derive(Debug, PartialEq)]
pub enum Progress {
    /// More steps remain.
    Pending,
    /// The trampoline finished with a value.
    Finished(Value),
}

/// Driver for one trampoline.
///
/// Hosts that want to interleave their own work call [`Execution::step`]
/// repeatedly. [`Interpreter::run`] drives to completion.
pub struct Execution {
    current: Option<Trampoline>,
    frames: Vec<Frame>,
    /// Call stack depth when the execution started; restored on error.
    base_depth: usize,
    /// Open transfer lists when the execution started; restored on error.
    base_transfers: usize,
}

impl Execution {
    pub fn new(trampoline: Trampoline, interpreter: &Interpreter) -> Self {
        Self {
            current: Some(trampoline),
            frames: Vec::new(),
            base_depth: interpreter.call_depth(),
            base_transfers: interpreter.open_transfers(),
        }
    }

    /// True once the execution produced a value or failed.
    pub fn is_finished(&self) -> bool {
        self.current.is_none()
    }

    /// Number of pending frames (continuations and call boundaries).
    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// Run exactly one `More` step, plus the bookkeeping around it.
    ///
    /// Stepping a finished execution is an internal error.
    pub fn step(&mut self, interpreter: &mut Interpreter) -> EvalResult<Progress> {
        let Some(mut current) = self.current.take() else {
            return Err(execution_finished());
        };
        loop {
            current = match current {
                Trampoline::Done(value) => match self.frames.pop() {
                    None => return Ok(Progress::Finished(value)),
                    Some(Frame::Boundary) => {
                        interpreter.pop_call();
                        Trampoline::Done(value)
                    }
                    Some(Frame::Then(next)) => match next(interpreter, value) {
                        Ok(next) => next,
                        Err(err) => self.unwind(interpreter, err)?,
                    },
                },
                Trampoline::FlatMap(first, next) => {
                    self.frames.push(Frame::Then(next));
                    *first
                }
                Trampoline::Call { frame, body } => {
                    if let Err(err) = interpreter.push_call(frame) {
                        return Err(self.fail(interpreter, err));
                    }
                    self.frames.push(Frame::Boundary);
                    *body
                }
                Trampoline::More(step) => {
                    if let Err(err) = interpreter.suspension_point() {
                        return Err(self.fail(interpreter, err));
                    }
                    trace!(
                        steps = interpreter.steps(),
                        frames = self.frames.len(),
                        "step"
                    );
                    let next = match step(interpreter) {
                        Ok(next) => next,
                        Err(err) => self.unwind(interpreter, err)?,
                    };
                    self.current = Some(next);
                    return Ok(Progress::Pending);
                }
            };
        }
    }

    /// Drive to completion.
    pub fn run(mut self, interpreter: &mut Interpreter) -> EvalResult<Value> {
        loop {
            if let Progress::Finished(value) = self.step(interpreter)? {
                return Ok(value);
            }
        }
    }

    /// Route an error raised by a step or continuation.
    ///
    /// A return signal discards pending continuations up to the nearest call
    /// boundary and resumes there with the returned value. At top level it
    /// finishes the execution. Anything else is a failure.
    fn unwind(&mut self, interpreter: &mut Interpreter, err: EvalError) -> EvalResult<Trampoline> {
        match err.control_flow {
            Some(ControlFlow::Return(value)) => {
                while let Some(frame) = self.frames.pop() {
                    if let Frame::Boundary = frame {
                        interpreter.pop_call();
                        break;
                    }
                }
                Ok(Trampoline::Done(value))
            }
            None => Err(self.fail(interpreter, err)),
        }
    }

    /// Finish with an error: attach a backtrace, restore the call stack,
    /// abandon open transfers, and drop all pending work.
    fn fail(&mut self, interpreter: &mut Interpreter, err: EvalError) -> EvalError {
        let err = interpreter.attach_backtrace(err);
        debug!(error = %err, depth = interpreter.call_depth(), "evaluation failed");
        interpreter.truncate_call_stack(self.base_depth);
        interpreter.abandon_transfers(self.base_transfers);
        self.frames.clear();
        self.current = None;
        err
    }
}
