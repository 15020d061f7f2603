//! Evaluator-backed rule coverage: literal math, JSFuck idioms, builtin
//! calls, local wrapper resolution, eval arguments, prototype injection.

use restringer_core::rules::{evaluated, NamedRule};
use restringer_test_helpers::{run_rule, run_rules};

fn rule(name: &'static str, run: restringer_core::rules::RuleFn) -> NamedRule {
    NamedRule { name, run }
}

#[test]
fn evaluates_mixed_literal_binaries() {
    let r = rule("evaluate-literal-binaries", evaluated::evaluate_literal_binaries);
    assert_eq!(run_rule("x = 'a' + 1;", r), "x = 'a1';\n");
    assert_eq!(run_rule("x = '5' - 2;", r), "x = 3;\n");
    assert_eq!(run_rule("x = 7 % 4;", r), "x = 3;\n");
    assert_eq!(run_rule("x = 'b' > 'a';", r), "x = true;\n");
}

#[test]
fn negative_results_collapse_to_unary_literals() {
    let r = rule("evaluate-literal-binaries", evaluated::evaluate_literal_binaries);
    assert_eq!(run_rule("x = 3 - 8;", r), "x = -5;\n");
}

#[test]
fn evaluates_jsfuck_idioms() {
    let r = rule("evaluate-minimal-alphabet", evaluated::evaluate_minimal_alphabet);
    assert_eq!(run_rule("x = +[];", r), "x = 0;\n");
    assert_eq!(run_rule("x = [] + [];", r), "x = '';\n");
    assert_eq!(run_rule("x = !+[];", r), "x = true;\n");
    // `this` poisons the candidate.
    assert_eq!(run_rule("x = +[this];", r), "x = +[this];\n");
}

#[test]
fn collapses_redundant_negations() {
    let r = rule(
        "collapse-redundant-negations",
        evaluated::collapse_redundant_negations,
    );
    assert_eq!(run_rule("x = ![];", r), "x = false;\n");
    assert_eq!(run_rule("x = !'';", r), "x = true;\n");
    assert_eq!(run_rule("x = !undefined;", r), "x = true;\n");
    assert_eq!(run_rule("x = !flag;", r), "x = !flag;\n");
}

#[test]
fn evaluates_literal_member_access() {
    let r = rule("evaluate-literal-members", evaluated::evaluate_literal_members);
    assert_eq!(run_rule("x = 'abc'[0];", r), "x = 'a';\n");
    assert_eq!(run_rule("x = [1, 2, 3][1];", r), "x = 2;\n");
    assert_eq!(run_rule("x = 'hi'.length;", r), "x = 2;\n");
    // Callee position must be left alone.
    assert_eq!(
        run_rule("x = 'abc'[0](1);", r),
        "x = 'abc'[0](1);\n"
    );
}

#[test]
fn evaluates_builtin_calls_with_literal_arguments() {
    let r = rule("evaluate-builtin-calls", evaluated::evaluate_builtin_calls);
    assert_eq!(run_rule("x = parseInt('2a', 16);", r), "x = 42;\n");
    assert_eq!(run_rule("x = String.fromCharCode(104, 105);", r), "x = 'hi';\n");
    assert_eq!(run_rule("x = unescape('%68%69');", r), "x = 'hi';\n");
    assert_eq!(run_rule("x = btoa('hi');", r), "x = 'aGk=';\n");
}

#[test]
fn deny_listed_builtins_are_never_evaluated() {
    let r = rule("evaluate-builtin-calls", evaluated::evaluate_builtin_calls);
    assert_eq!(run_rule("x = Array(3);", r), "x = Array(3);\n");
    assert_eq!(
        run_rule("x = Function('return 1');", r),
        "x = Function('return 1');\n"
    );
    assert_eq!(run_rule("x = eval('1');", r), "x = eval('1');\n");
}

#[test]
fn resolves_local_wrapper_calls_in_context() {
    let r = rule("evaluate-local-calls", evaluated::evaluate_local_calls);
    let out = run_rules(
        "var table = ['alpha', 'beta']; function pick(i) { return table[i]; } use(pick(1));",
        &[r],
    );
    assert!(out.contains("use('beta');"), "wrapper not resolved: {out}");
}

#[test]
fn local_calls_skip_probe_properties() {
    let r = rule("evaluate-local-calls", evaluated::evaluate_local_calls);
    let source = "var re = makeRegex(); check(re.test('x'));";
    assert_eq!(run_rule(source, r), "var re = makeRegex();\ncheck(re.test('x'));\n");
}

#[test]
fn resolves_eval_of_computed_strings() {
    let r = rule("evaluate-eval-arguments", evaluated::evaluate_eval_arguments);
    let out = run_rules("var p = 'f(' + '1)'; eval(p);", &[r]);
    assert!(out.contains("f(1);"), "computed eval not unfolded: {out}");
}

#[test]
fn resolves_injected_prototype_methods() {
    let r = rule("evaluate-prototype-calls", evaluated::evaluate_prototype_calls);
    let source = r#"
function Codec() { }
Codec.prototype.twice = function (s) { return s + s; };
var codec = new Codec();
use(codec.twice('ab'));
"#;
    let out = run_rules(source, &[r]);
    assert!(out.contains("use('abab');"), "prototype call unresolved: {out}");
}

#[test]
fn resolves_member_chains_on_local_objects() {
    let r = rule("evaluate-member-chains", evaluated::evaluate_member_chains);
    let out = run_rule(
        "var cfg = { net: { port: 8080 } }; listen(cfg.net.port);",
        r,
    );
    assert!(out.contains("listen(8080);"), "chain unresolved: {out}");
}

#[test]
fn member_chain_rejects_empty_results() {
    let r = rule("evaluate-member-chains", evaluated::evaluate_member_chains);
    let source = "var cfg = { name: '' }; use(cfg.name);";
    assert_eq!(run_rule(source, r), "var cfg = { name: '' };\nuse(cfg.name);\n");
}

#[test]
fn resolves_augmented_array_wrappers() {
    let r = rule("evaluate-augmented-arrays", evaluated::evaluate_augmented_arrays);
    let source = r#"
var table = ['gamma', 'alpha', 'beta'];
function pick(i) { pick = null; return table[i]; }
(function (a, n) { while (n--) a.push(a.shift()); })(table, 1);
use(pick(0));
"#;
    let out = run_rules(source, &[r]);
    assert!(out.contains("use('alpha');"), "augmented wrapper unresolved: {out}");
}
