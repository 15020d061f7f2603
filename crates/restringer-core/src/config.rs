use serde::{Deserialize, Serialize};

/// Maximum total rule passes across one deobfuscation run. The budget is
/// shared by preprocessors, the main safe/unsafe loops and postprocessors.
pub const DEFAULT_MAX_ITERATIONS: usize = 500;

/// Caller-facing options for a deobfuscation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeobfuscateOptions {
    /// Run a dead-code elimination pass after postprocessing.
    #[serde(default)]
    pub clean: bool,

    /// Total pass budget; must be positive.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

impl Default for DeobfuscateOptions {
    fn default() -> Self {
        DeobfuscateOptions {
            clean: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Decrementing pass counter shared across a whole run.
///
/// Semantics: every driver pass (one sweep of one rule list over the
/// current source) consumes one unit. When the budget is exhausted the
/// driver stops and the orchestrator reports the current best source with
/// `budget_exhausted` set.
#[derive(Debug, Clone)]
pub struct IterationBudget {
    remaining: usize,
    exhausted: bool,
}

impl IterationBudget {
    pub fn new(max_iterations: usize) -> Self {
        IterationBudget {
            remaining: max_iterations.max(1),
            exhausted: false,
        }
    }

    /// Consumes one pass. Returns `false` (and latches the exhausted flag)
    /// once nothing is left.
    pub fn take(&mut self) -> bool {
        if self.remaining == 0 {
            self.exhausted = true;
            return false;
        }
        self.remaining -= 1;
        true
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn exhausted(&self) -> bool {
        self.exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_latches_exhaustion() {
        let mut budget = IterationBudget::new(2);
        assert!(budget.take());
        assert!(budget.take());
        assert!(!budget.take());
        assert!(budget.exhausted());
    }

    #[test]
    fn zero_budget_is_clamped_to_one() {
        let mut budget = IterationBudget::new(0);
        assert!(budget.take());
        assert!(!budget.take());
    }
}
