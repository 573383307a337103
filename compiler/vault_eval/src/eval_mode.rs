//! Evaluation modes.
//!
//! `EvalMode` parameterizes the interpreter through policy methods: call
//! depth limit, step budget, and whether counters are collected.
//! `InterpreterBuilder` can override each policy individually.

use crate::diagnostics::EvalCounters;

/// Call depth limit for metered transactions.
pub const METERED_MAX_CALL_DEPTH: usize = 1024;

/// Call depth limit for test runs.
pub const TEST_RUN_MAX_CALL_DEPTH: usize = 500;

/// Evaluation mode. Determines interpreter behavior via match dispatch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum EvalMode {
    /// Unmetered evaluation. Call depth is bounded only by heap memory.
    #[default]
    Interpret,
    /// Transaction execution: every suspension point consumes one step.
    Metered {
        /// Maximum number of steps before aborting.
        step_budget: u64,
    },
    /// Test execution: bounded depth, counters collected.
    TestRun,
}

impl EvalMode {
    /// Maximum call depth, or `None` for unlimited.
    ///
    /// The trampoline keeps calls off the native stack, so `Interpret` can
    /// afford to be unlimited.
    #[inline]
    pub fn max_call_depth(&self) -> Option<usize> {
        match self {
            Self::Interpret => None,
            Self::Metered { .. } => Some(METERED_MAX_CALL_DEPTH),
            Self::TestRun => Some(TEST_RUN_MAX_CALL_DEPTH),
        }
    }

    /// Step budget, or `None` for unmetered modes.
    #[inline]
    pub fn step_budget(&self) -> Option<u64> {
        match self {
            Self::Metered { step_budget } => Some(*step_budget),
            Self::Interpret | Self::TestRun => None,
        }
    }

    /// Whether this mode collects evaluation counters by default.
    #[inline]
    pub fn collects_counters(&self) -> bool {
        matches!(self, Self::TestRun)
    }
}

/// Per-mode mutable state stored alongside `EvalMode`.
#[derive(Debug)]
pub struct ModeState {
    /// Suspension points passed so far. Counted in every mode.
    steps: u64,
    budget: Option<u64>,
    /// When `None`, all counter increments are no-ops.
    counters: Option<EvalCounters>,
}

impl ModeState {
    /// Create mode state appropriate for the given evaluation mode.
    pub fn new(mode: &EvalMode) -> Self {
        Self {
            steps: 0,
            budget: mode.step_budget(),
            counters: mode.collects_counters().then(EvalCounters::default),
        }
    }

    /// Override the step budget chosen by the mode.
    pub fn set_budget(&mut self, budget: Option<u64>) {
        self.budget = budget;
    }

    pub fn budget(&self) -> Option<u64> {
        self.budget
    }

    pub fn enable_counters(&mut self) {
        if self.counters.is_none() {
            self.counters = Some(EvalCounters::default());
        }
    }

    /// Count one step and check it against the budget.
    #[inline]
    pub fn check_step(&mut self) -> Result<(), BudgetExceeded> {
        self.steps = self.steps.saturating_add(1);
        if let Some(budget) = self.budget {
            if self.steps > budget {
                return Err(BudgetExceeded {
                    budget,
                    steps: self.steps,
                });
            }
        }
        Ok(())
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    #[inline]
    pub fn count_expression(&mut self) {
        if let Some(ref mut c) = self.counters {
            c.count_expression();
        }
    }

    #[inline]
    pub fn count_statement(&mut self) {
        if let Some(ref mut c) = self.counters {
            c.count_statement();
        }
    }

    #[inline]
    pub fn count_function_call(&mut self) {
        if let Some(ref mut c) = self.counters {
            c.count_function_call();
        }
    }

    #[inline]
    pub fn count_host_call(&mut self) {
        if let Some(ref mut c) = self.counters {
            c.count_host_call();
        }
    }

    /// Get the counters for reporting (`None` when counting is off).
    pub fn counters(&self) -> Option<&EvalCounters> {
        self.counters.as_ref()
    }
}

/// Error returned when the step budget is exhausted.
#[derive(Debug, PartialEq, Eq)]
pub struct BudgetExceeded {
    /// The configured budget.
    pub budget: u64,
    /// Steps taken, including the one that failed.
    pub steps: u64,
}
