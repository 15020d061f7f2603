//! End-to-end pipeline scenarios through the public `Restringer` façade.

use restringer_test_helpers::{deob, deob_clean};

#[test]
fn s1_decodes_atob_literals() {
    assert_eq!(
        deob("const encoded = atob('cGFzc3dvcmQ9aGFja01lOTQh');"),
        "const encoded = 'password=hackMe94!';\n"
    );
}

#[test]
fn s2_folds_string_concatenation() {
    assert_eq!(deob("var x = 'a' + 'b' + 'c';"), "var x = 'abc';\n");
}

#[test]
fn s3_resolves_large_array_indexing() {
    let entries: Vec<String> = (1..=21).map(|i| (i * 10).to_string()).collect();
    let source = format!("var A = [{}]; log(A[3]);", entries.join(", "));
    let out = deob(&source);
    assert!(out.contains("log(40);"), "index not resolved: {out}");
}

#[test]
fn s4_unwraps_iife_shells() {
    assert_eq!(deob("(function(){ return 42; })();"), "42;\n");
}

#[test]
fn s5_linearizes_switch_dispatchers() {
    let out = deob("var s = 0; switch (s) { case 0: a(); s = 1; break; case 1: b(); break; }");
    assert!(!out.contains("switch"), "dispatcher not linearized: {out}");
    let a = out.find("a();").expect("a() missing");
    let b = out.find("b();").expect("b() missing");
    assert!(a < b, "case order lost: {out}");
}

#[test]
fn s6_resolves_deterministic_ifs() {
    assert_eq!(deob("if (true) do_a(); else do_b();"), "do_a();\n");
}

#[test]
fn s7_unfolds_eval_literals() {
    assert_eq!(deob("eval('console.log(\"hi\")');"), "console.log('hi');\n");
}

#[test]
fn resolves_string_array_obfuscation_end_to_end() {
    let source = r#"
var words = ['log', 'hello'];
(function (a, n) { while (n--) a.push(a.shift()); })(words, 1);
function w(i) { return words[i]; }
console[w(1)](w(0));
"#;
    let out = deob(source);
    assert!(
        out.contains("console.log('hello');"),
        "wrapper calls not resolved: {out}"
    );
    assert!(!out.contains("shift"), "rotation IIFE survived: {out}");
}

#[test]
fn resolves_proxy_chains_and_wrappers_together() {
    let source = r#"
function add(a, b) { return a + b; }
function indirect(a, b) { return add(a, b); }
var x = indirect(40, 2);
report('total: ' + x);
"#;
    let out = deob(source);
    assert!(out.contains("report('total: 42');"), "pipeline fell short: {out}");
}

#[test]
fn clean_option_removes_leftover_scaffolding() {
    let source = r#"
function decode(i) { return ['alpha', 'beta'][i]; }
function helper() { var stale = 1; return decode(0); }
log(helper());
"#;
    let out = deob_clean(source);
    assert!(!out.contains("stale"), "dead local survived: {out}");
    assert!(out.contains("log("), "call chain lost: {out}");
}

#[test]
fn already_clean_code_round_trips_byte_identical() {
    let source = "const total = items.reduce((a, b) => a + b, 0);\nconsole.log(total);\n";
    let mut restringer = restringer_core::Restringer::new(source);
    let changed = restringer.deobfuscate().unwrap();
    assert!(!changed);
    assert_eq!(restringer.script(), source);
}

#[test]
fn deobfuscation_is_idempotent() {
    let sources = [
        "var x = 'a' + 'b' + 'c';",
        "(function(){ return 42; })();",
        "if (1) left(); else right();",
        "eval('f(1)');",
    ];
    for source in sources {
        let once = deob(source);
        let twice = deob(&once);
        assert_eq!(once, twice, "not idempotent for {source}");
    }
}

#[test]
fn iteration_budget_bounds_the_run() {
    let mut restringer = restringer_core::Restringer::with_options(
        "var x = 'a' + 'b' + 'c' + 'd' + 'e';",
        restringer_core::DeobfuscateOptions {
            clean: false,
            max_iterations: 2,
        },
    );
    restringer.deobfuscate().unwrap();
    assert!(
        restringer.budget_exhausted(),
        "two passes cannot finish this pipeline"
    );
}

#[test]
fn obfuscator_io_traps_are_bypassed() {
    let source = r#"
var guard = { 'removeCookie': function () { return 'dev'; } };
var x = 'a' + 'b';
"#;
    let out = deob(source);
    assert!(out.contains("bypassed!"), "trap value not replaced: {out}");
    assert!(out.contains("var x = 'ab';"), "main loop skipped: {out}");
}
