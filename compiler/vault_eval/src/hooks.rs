//! Suspension-point hooks and cooperative cancellation.
//!
//! Every `More` step of the trampoline is a suspension point. The
//! interpreter counts the step, checks the budget and the [`CancelToken`],
//! then calls each registered [`StepHook`] in registration order. Any hook
//! may abort evaluation by returning an error.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::EvalResult;

/// What a hook sees at a suspension point.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StepContext {
    /// Steps taken so far, including this one.
    pub steps: u64,
    /// Current language-level call depth.
    pub call_depth: usize,
}

/// Callback invoked at every suspension point.
pub trait StepHook {
    fn on_step(&mut self, ctx: &StepContext) -> EvalResult<()>;
}

impl<F> StepHook for F
where
    F: FnMut(&StepContext) -> EvalResult<()>,
{
    fn on_step(&mut self, ctx: &StepContext) -> EvalResult<()> {
        self(ctx)
    }
}

/// Cancellation flag that another thread may set.
///
/// The interpreter only reads it at step boundaries, so cancellation takes
/// effect before the next step runs.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear a previous cancellation request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CancelToken")
            .field(&self.is_cancelled())
            .finish()
    }
}
