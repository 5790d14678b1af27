use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::TempDir;

fn write_file(path: &Path, contents: &str) {
    fs::write(path, contents).expect("write test file");
}

#[test]
fn round_trip_keeps_comments_and_quotes() {
    let dir = TempDir::new().expect("tempdir");
    let input = dir.path().join("input.yaml");
    let text = "# settings\nname: 'Ada'  # quoted\nports:\n  - 80\n  - 443\n";
    write_file(&input, text);

    cargo_bin_cmd!("yrt")
        .arg(&input)
        .assert()
        .success()
        .stdout(text);
}

#[test]
fn safe_mode_normalises() {
    let dir = TempDir::new().expect("tempdir");
    let input = dir.path().join("input.yaml");
    write_file(&input, "# gone\nname: 'Ada'\nhex: 0x10\n");

    cargo_bin_cmd!("yrt")
        .arg(&input)
        .arg("--safe")
        .assert()
        .success()
        .stdout("name: Ada\nhex: 16\n");
}

#[test]
fn converts_yaml_to_json() {
    let dir = TempDir::new().expect("tempdir");
    let input = dir.path().join("input.yaml");
    write_file(&input, "name: Ada\nage: 37\n");

    let expected = "{\n  \"name\": \"Ada\",\n  \"age\": 37\n}\n";

    cargo_bin_cmd!("yrt")
        .arg(&input)
        .arg("--json")
        .assert()
        .success()
        .stdout(expected);
}

#[test]
fn json_input_is_converted_to_yaml() {
    let dir = TempDir::new().expect("tempdir");
    let input = dir.path().join("input.json");
    write_file(&input, r#"{"name":"Ada","tags":["a","b"]}"#);

    cargo_bin_cmd!("yrt")
        .arg(&input)
        .assert()
        .success()
        .stdout("name: Ada\ntags:\n  - a\n  - b\n");
}

#[test]
fn from_json_reads_stdin() {
    cargo_bin_cmd!("yrt")
        .arg("--from-json")
        .write_stdin(r#"{"a":{"b":1}}"#)
        .assert()
        .success()
        .stdout("a:\n  b: 1\n");
}

#[test]
fn check_reports_document_count() {
    cargo_bin_cmd!("yrt")
        .arg("--check")
        .write_stdin("a: 1\n---\nb: 2\n")
        .assert()
        .success()
        .stdout(contains("stdin: 2 documents"));
}

#[test]
fn scanner_error_is_reported() {
    cargo_bin_cmd!("yrt")
        .arg("--check")
        .write_stdin("key: \"unterminated\n")
        .assert()
        .failure()
        .stderr(contains("ERROR  ").and(contains("line")));
}

#[test]
fn duplicate_keys_warn_by_default_and_fail_on_request() {
    cargo_bin_cmd!("yrt")
        .arg("--safe")
        .write_stdin("a: 1\na: 2\n")
        .assert()
        .success()
        .stdout("a: 2\n")
        .stderr(contains("WARN  ").and(contains("found duplicate key")));

    cargo_bin_cmd!("yrt")
        .args(["--safe", "--duplicate-keys", "error"])
        .write_stdin("a: 1\na: 2\n")
        .assert()
        .failure()
        .stderr(contains("found duplicate key"));
}

#[test]
fn yaml_version_changes_booleans() {
    cargo_bin_cmd!("yrt")
        .args(["--json", "--yaml-version", "1.1"])
        .write_stdin("on: yes\n")
        .assert()
        .success()
        .stdout("{\n  \"true\": true\n}\n");

    cargo_bin_cmd!("yrt")
        .arg("--json")
        .write_stdin("on: yes\n")
        .assert()
        .success()
        .stdout("{\n  \"on\": \"yes\"\n}\n");
}

#[test]
fn indent_and_flow_options() {
    cargo_bin_cmd!("yrt")
        .args(["--safe", "--indent", "4"])
        .write_stdin("a:\n  b: 1\n")
        .assert()
        .success()
        .stdout("a:\n    b: 1\n");

    cargo_bin_cmd!("yrt")
        .args(["--safe", "--flow"])
        .write_stdin("a: [1, 2]\n")
        .assert()
        .success()
        .stdout("{a: [1, 2]}\n");
}

#[test]
fn invalid_indent_fails() {
    cargo_bin_cmd!("yrt")
        .args(["--safe", "--indent", "12"])
        .write_stdin("a: 1\n")
        .assert()
        .failure()
        .stderr(contains("ERROR  indent must be between 1 and 9"));
}

#[test]
fn explicit_start_marks_documents() {
    cargo_bin_cmd!("yrt")
        .args(["--safe", "--explicit-start"])
        .write_stdin("a: 1\n")
        .assert()
        .success()
        .stdout("---\na: 1\n");
}

#[test]
fn writes_to_output_file() {
    let dir = TempDir::new().expect("tempdir");
    let input = dir.path().join("input.yaml");
    let output = dir.path().join("output.yaml");
    write_file(&input, "a: 1  # one\n");

    cargo_bin_cmd!("yrt")
        .arg(&input)
        .args(["-o", output.to_str().expect("output path")])
        .assert()
        .success()
        .stdout(contains("Formatted").and(contains("output.yaml")));

    let contents = fs::read_to_string(&output).expect("read output");
    assert_eq!(contents, "a: 1  # one\n");
}
