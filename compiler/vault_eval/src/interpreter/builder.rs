//! `InterpreterBuilder` for creating Interpreter instances with various configurations.

use vault_ir::SharedInterner;

use super::Interpreter;
use crate::activation::Activation;
use crate::diagnostics::CallStack;
use crate::eval_mode::{EvalMode, ModeState};
use crate::hooks::{CancelToken, StepHook};

/// Builder for creating Interpreter instances with various configurations.
///
/// The mode supplies defaults for every policy; the individual setters
/// override them:
/// - `EvalMode::Interpret` for unmetered runs
/// - `EvalMode::Metered { .. }` for transactions
/// - `EvalMode::TestRun` for test harnesses
pub struct InterpreterBuilder {
    mode: EvalMode,
    /// `Some(limit)` overrides the mode's call depth policy.
    max_call_depth: Option<Option<usize>>,
    /// `Some(budget)` overrides the mode's step budget.
    step_budget: Option<Option<u64>>,
    cancel: Option<CancelToken>,
    hooks: Vec<Box<dyn StepHook>>,
    interner: Option<SharedInterner>,
    counters: bool,
    globals: Option<Activation>,
}

impl InterpreterBuilder {
    /// Create a new builder with default `Interpret` mode.
    pub fn new() -> Self {
        Self {
            mode: EvalMode::default(),
            max_call_depth: None,
            step_budget: None,
            cancel: None,
            hooks: Vec::new(),
            interner: None,
            counters: false,
            globals: None,
        }
    }

    /// Set the evaluation mode.
    #[must_use]
    pub fn mode(mut self, mode: EvalMode) -> Self {
        self.mode = mode;
        self
    }

    /// Override the call depth limit. `None` means unlimited.
    #[must_use]
    pub fn max_call_depth(mut self, limit: Option<usize>) -> Self {
        self.max_call_depth = Some(limit);
        self
    }

    /// Meter evaluation with `budget` steps regardless of mode.
    #[must_use]
    pub fn step_budget(mut self, budget: u64) -> Self {
        self.step_budget = Some(Some(budget));
        self
    }

    /// Share a cancellation token with the host.
    #[must_use]
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Register a hook run at every suspension point. Hooks run in
    /// registration order.
    #[must_use]
    pub fn step_hook(mut self, hook: impl StepHook + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Use an existing interner, typically the front end's.
    #[must_use]
    pub fn interner(mut self, interner: SharedInterner) -> Self {
        self.interner = Some(interner);
        self
    }

    /// Collect evaluation counters even if the mode does not.
    #[must_use]
    pub fn enable_counters(mut self) -> Self {
        self.counters = true;
        self
    }

    /// Start from an existing set of globals.
    #[must_use]
    pub fn globals(mut self, globals: Activation) -> Self {
        self.globals = Some(globals);
        self
    }

    /// Build the interpreter.
    pub fn build(self) -> Interpreter {
        let max_depth = self
            .max_call_depth
            .unwrap_or_else(|| self.mode.max_call_depth());

        let mut mode_state = ModeState::new(&self.mode);
        if let Some(budget) = self.step_budget {
            mode_state.set_budget(budget);
        }
        if self.counters {
            mode_state.enable_counters();
        }

        Interpreter {
            interner: self.interner.unwrap_or_default(),
            mode: self.mode,
            mode_state,
            call_stack: CallStack::new(max_depth),
            cancel: self.cancel.unwrap_or_default(),
            hooks: self.hooks,
            globals: self.globals.unwrap_or_default(),
            transfers: Vec::new(),
        }
    }
}

impl Default for InterpreterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
