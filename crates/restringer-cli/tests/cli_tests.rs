use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn restringer() -> Command {
    Command::cargo_bin("restringer").expect("binary builds")
}

#[test]
fn deobfuscates_to_stdout_in_quiet_mode() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("sample.js");
    fs::write(&input, "var x = 'a' + 'b' + 'c';").unwrap();

    restringer()
        .arg(&input)
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::contains("var x = 'abc';"));
}

#[test]
fn writes_default_output_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("sample.js");
    fs::write(&input, "(function () { return 42; })();").unwrap();

    restringer().arg(&input).arg("-o").assert().success();

    let output = dir.path().join("sample-deob.js");
    let written = fs::read_to_string(&output).expect("default output file written");
    assert_eq!(written, "42;\n");
}

#[test]
fn writes_named_output_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("sample.js");
    let output = dir.path().join("clean.js");
    fs::write(&input, "if (true) do_a(); else do_b();").unwrap();

    restringer()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&output).unwrap(), "do_a();\n");
}

#[test]
fn clean_flag_removes_dead_code() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("sample.js");
    fs::write(
        &input,
        "function f() { var unused = 1; return 2; } log(f());",
    )
    .unwrap();

    restringer()
        .arg(&input)
        .arg("--clean")
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::contains("unused").not());
}

#[test]
fn rejects_invalid_max_iterations() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("sample.js");
    fs::write(&input, "f();").unwrap();

    restringer()
        .arg(&input)
        .arg("-m")
        .arg("0")
        .assert()
        .failure();
    restringer()
        .arg(&input)
        .arg("-m")
        .arg("banana")
        .assert()
        .failure();
}

#[test]
fn accepts_equals_form_options() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("sample.js");
    fs::write(&input, "var x = 1 + 2;").unwrap();

    restringer()
        .arg(&input)
        .arg("-m=3")
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::contains("var x = 3;"));
}

#[test]
fn parse_failure_exits_nonzero() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("broken.js");
    fs::write(&input, "function ( {").unwrap();

    restringer()
        .arg(&input)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("not parseable"));
}

#[test]
fn missing_file_exits_nonzero() {
    restringer()
        .arg("definitely-missing.js")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn quiet_and_verbose_conflict() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("sample.js");
    fs::write(&input, "f();").unwrap();

    restringer()
        .arg(&input)
        .arg("-q")
        .arg("-v")
        .assert()
        .failure();
}
