//! Convenience helpers for integration tests: parse/emit shortcuts,
//! single-rule drivers and full-pipeline runs.

use restringer_core::rules::{NamedRule, RuleCtx};
use restringer_core::{apply_iteratively, Arborist, DeobfuscateOptions, Restringer};

/// Parse + emit, panicking with context on failure. Useful to get the
/// canonical formatting of an expected output.
pub fn normalize(source: &str) -> String {
    let arb = Arborist::parse(source)
        .unwrap_or_else(|e| panic!("failed to parse {source:?}: {e}"));
    arb.emit()
}

/// Runs one rule once (match → stage → commit) and emits the result.
pub fn run_rule(source: &str, rule: NamedRule) -> String {
    let mut arb = Arborist::parse(source)
        .unwrap_or_else(|e| panic!("failed to parse {source:?}: {e}"));
    let mut ctx = RuleCtx::new();
    if (rule.run)(&mut arb, &mut ctx) > 0 {
        arb.commit().unwrap_or_else(|e| panic!("commit failed: {e}"));
    }
    arb.emit()
}

/// Runs a rule list to its fixpoint with the default budget.
pub fn run_rules(source: &str, rules: &[NamedRule]) -> String {
    apply_iteratively(source, rules)
        .unwrap_or_else(|e| panic!("apply_iteratively failed on {source:?}: {e}"))
}

/// Full default pipeline; returns the final script.
pub fn deob(source: &str) -> String {
    let mut restringer = Restringer::new(source);
    restringer
        .deobfuscate()
        .unwrap_or_else(|e| panic!("deobfuscate failed on {source:?}: {e}"));
    restringer.script().to_string()
}

/// Full pipeline with the dead-code `clean` option enabled.
pub fn deob_clean(source: &str) -> String {
    let mut restringer = Restringer::with_options(
        source,
        DeobfuscateOptions {
            clean: true,
            ..DeobfuscateOptions::default()
        },
    );
    restringer
        .deobfuscate()
        .unwrap_or_else(|e| panic!("deobfuscate failed on {source:?}: {e}"));
    restringer.script().to_string()
}
