use criterion::{black_box, criterion_group, criterion_main, Criterion};
use restringer_core::rules::safe_rules;
use restringer_core::{apply_iteratively, Arborist, Restringer};

const SAMPLE: &str = r#"
var words = ['log', 'hello', 'world'];
function w(i) { return words[i]; }
var a = 'a' + 'b' + 'c';
var flag = true;
if (flag) { console[w(0)](a); } else { }
(function () { return 42; })();
var s = 0;
switch (s) { case 0: first(); s = 1; break; case 1: second(); break; }
"#;

fn bench_parse_and_emit(c: &mut Criterion) {
    c.bench_function("parse_emit_roundtrip", |b| {
        b.iter(|| {
            let arb = Arborist::parse(black_box(SAMPLE)).expect("parse");
            black_box(arb.emit())
        })
    });
}

fn bench_safe_rules(c: &mut Criterion) {
    c.bench_function("safe_rules_fixpoint", |b| {
        b.iter(|| apply_iteratively(black_box(SAMPLE), &safe_rules()).expect("driver"))
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    c.bench_function("deobfuscate_full", |b| {
        b.iter(|| {
            let mut restringer = Restringer::new(black_box(SAMPLE));
            restringer.deobfuscate().expect("pipeline");
            black_box(restringer.script().len())
        })
    });
}

criterion_group!(
    benches,
    bench_parse_and_emit,
    bench_safe_rules,
    bench_full_pipeline
);
criterion_main!(benches);
