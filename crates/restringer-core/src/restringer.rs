//! Outward-facing façade: detect the obfuscation family, run its
//! preprocessors, drive the safe rules to a fixpoint, interleave unsafe
//! passes with safe cleanup until quiet, run the postprocessors, then an
//! optional dead-code pass.

use crate::arborist::Arborist;
use crate::config::{DeobfuscateOptions, IterationBudget};
use crate::driver::apply_with;
use crate::processors::{detect, processor_for, ObfuscationKind};
use crate::rules::{safe_rules, unsafe_rules, NamedRule, RuleCtx};
use crate::Result;
use tracing::{debug, info};

pub struct Restringer {
    source: String,
    script: String,
    options: DeobfuscateOptions,
    /// Ordered safe rule list; callers may inspect or replace it before
    /// calling [`Restringer::deobfuscate`].
    pub safe_methods: Vec<NamedRule>,
    /// Ordered unsafe (evaluator-backed) rule list, equally replaceable.
    pub unsafe_methods: Vec<NamedRule>,
    detected: Option<ObfuscationKind>,
    budget_exhausted: bool,
}

impl Restringer {
    pub fn new(source: impl Into<String>) -> Self {
        Restringer::with_options(source, DeobfuscateOptions::default())
    }

    pub fn with_options(source: impl Into<String>, options: DeobfuscateOptions) -> Self {
        let source = source.into();
        Restringer {
            script: source.clone(),
            source,
            options,
            safe_methods: safe_rules(),
            unsafe_methods: unsafe_rules(),
            detected: None,
            budget_exhausted: false,
        }
    }

    /// Current source text: the input until [`Restringer::deobfuscate`]
    /// succeeds with changes, the rewritten script afterwards.
    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn detected_kind(&self) -> Option<ObfuscationKind> {
        self.detected
    }

    /// Whether the run stopped because the pass budget ran out rather
    /// than by reaching a fixpoint.
    pub fn budget_exhausted(&self) -> bool {
        self.budget_exhausted
    }

    /// Runs the whole pipeline. Returns `true` when the final source
    /// differs from the input; parse failure of the input is the only
    /// fatal error.
    pub fn deobfuscate(&mut self) -> Result<bool> {
        let mut budget = IterationBudget::new(self.options.max_iterations);
        let mut ctx = RuleCtx::new();

        // Normalized emission of the untouched input is the no-progress
        // baseline: formatting alone must not count as a change.
        let baseline = Arborist::parse(&self.source)?.emit();
        let mut current = baseline.clone();

        self.detected = detect(&self.source);
        let processor = self.detected.map(processor_for);
        if let Some(processor) = &processor {
            info!(kind = ?processor.kind, "obfuscation family detected");
            current = apply_with(&current, &processor.preprocessors, &mut budget, &mut ctx)?;
        }

        current = apply_with(&current, &self.safe_methods, &mut budget, &mut ctx)?;
        loop {
            let before = current.clone();
            current = apply_with(&current, &self.unsafe_methods, &mut budget, &mut ctx)?;
            current = apply_with(&current, &self.safe_methods, &mut budget, &mut ctx)?;
            if current == before || budget.exhausted() {
                break;
            }
            debug!("unsafe round made progress, continuing");
        }

        if let Some(processor) = &processor {
            current = apply_with(&current, &processor.postprocessors, &mut budget, &mut ctx)?;
        }

        if self.options.clean {
            let cleanup = [
                NamedRule {
                    name: "remove-dead-declarations",
                    run: crate::rules::variables::remove_dead_declarations,
                },
                NamedRule {
                    name: "normalize-empty-statements",
                    run: crate::rules::control_flow::normalize_empty_statements,
                },
            ];
            current = apply_with(&current, &cleanup, &mut budget, &mut ctx)?;
        }

        self.budget_exhausted = budget.exhausted();
        let changed = current != baseline;
        if changed {
            self.script = current;
        } else {
            // Round-trip guarantee: untouched scripts come back verbatim.
            self.script = self.source.clone();
        }
        info!(changed, budget_left = budget.remaining(), "deobfuscation finished");
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_source_is_returned_verbatim() {
        let source = "function add(a,b){return a+b}";
        let mut restringer = Restringer::new(source);
        let changed = restringer.deobfuscate().unwrap();
        assert!(!changed);
        assert_eq!(restringer.script(), source, "input must round-trip untouched");
    }

    #[test]
    fn rule_lists_are_replaceable() {
        let mut restringer = Restringer::new("var x = 'a' + 'b';");
        restringer.safe_methods.retain(|r| r.name == "fold-binary-literals");
        restringer.unsafe_methods.clear();
        assert!(restringer.deobfuscate().unwrap());
        assert_eq!(restringer.script(), "var x = 'ab';\n");
    }

    #[test]
    fn parse_failure_is_fatal() {
        let mut restringer = Restringer::new("var = = ;");
        assert!(restringer.deobfuscate().is_err());
    }
}
