//! Iterative driver: runs a rule list over the current source until the
//! emitted text stops changing or the shared pass budget runs out.
//!
//! Each pass re-parses from the previous emission, so node ranges are
//! exact for the staleness check and orphaned arena nodes never pile up.
//! A rule whose commit fails has its pass rolled back and is disabled for
//! the remainder of the run; the rest of the pipeline continues.

use crate::arborist::Arborist;
use crate::config::{DeobfuscateOptions, IterationBudget};
use crate::rules::{NamedRule, RuleCtx};
use crate::Result;
use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

/// Library-facing helper with default budget and context, for custom
/// pipelines: `apply_iteratively(source, &my_rules)`.
pub fn apply_iteratively(source: &str, rules: &[NamedRule]) -> Result<String> {
    let mut budget = IterationBudget::new(DeobfuscateOptions::default().max_iterations);
    let mut ctx = RuleCtx::new();
    apply_with(source, rules, &mut budget, &mut ctx)
}

/// Driver entry used by the orchestrator: shares one budget and one cache
/// across pre-, main- and post-phases.
pub fn apply_with(
    source: &str,
    rules: &[NamedRule],
    budget: &mut IterationBudget,
    ctx: &mut RuleCtx,
) -> Result<String> {
    let mut current = source.to_string();
    let mut disabled: FxHashSet<&'static str> = FxHashSet::default();

    loop {
        if !budget.take() {
            warn!("iteration budget exhausted, returning current best source");
            break;
        }

        let mut arborist = Arborist::parse(&current)?;
        for rule in rules {
            if disabled.contains(rule.name) {
                continue;
            }
            let staged = (rule.run)(&mut arborist, ctx);
            if staged == 0 {
                continue;
            }
            debug!(rule = rule.name, staged, "rule staged edits");
            if let Err(err) = arborist.commit() {
                warn!(rule = rule.name, %err, "commit failed; rolling back pass and disabling rule");
                disabled.insert(rule.name);
                arborist = Arborist::parse(&current)?;
            }
        }

        let next = arborist.emit();
        if next == current {
            debug!("fixpoint reached");
            break;
        }
        current = next;
    }

    if !disabled.is_empty() {
        info!(?disabled, "rules disabled during this run");
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::safe_rules;

    #[test]
    fn terminates_on_clean_source_within_two_passes() {
        let mut budget = IterationBudget::new(10);
        let mut ctx = RuleCtx::new();
        let source = "f(1);\n";
        let out = apply_with(source, &safe_rules(), &mut budget, &mut ctx).unwrap();
        assert_eq!(out, source);
        assert!(budget.remaining() >= 8, "clean source must settle fast");
    }

    #[test]
    fn cascades_rules_across_passes() {
        // Constant propagation feeds folding feeds dead code removal.
        let out = apply_iteratively(
            "function f() { var a = 2; var b = a + 3; return b; }",
            &safe_rules(),
        )
        .unwrap();
        assert_eq!(out, "function f() {\n    return 5;\n}\n");
    }

    #[test]
    fn budget_caps_total_passes() {
        let mut budget = IterationBudget::new(1);
        let mut ctx = RuleCtx::new();
        let out = apply_with(
            "var x = 'a' + 'b' + 'c';",
            &safe_rules(),
            &mut budget,
            &mut ctx,
        )
        .unwrap();
        // One pass folds the left association once; the budget stops the
        // run before the second fold.
        assert!(budget.exhausted() || out.contains("abc"));
    }
}
