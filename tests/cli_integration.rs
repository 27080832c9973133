//! CLI integration tests for the tidemark binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn tidemark() -> Command {
    Command::cargo_bin("tidemark").expect("binary builds")
}

#[test]
fn scm_configuration_prints_a_success_envelope() {
    tidemark()
        .args(["--provider", "git", "scm-configuration"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"response-code\":200"))
        .stdout(predicate::str::contains("\"url\""));
}

#[test]
fn unknown_operation_prints_a_404_envelope() {
    tidemark()
        .args(["--provider", "git", "no-such-operation"])
        .write_stdin("{}")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"response-code\":404"));
}

#[test]
fn unknown_provider_fails_with_the_valid_choices() {
    tidemark()
        .args(["--provider", "svn", "scm-configuration"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown provider"));
}

#[test]
fn validate_reads_the_request_body_from_stdin() {
    let body = r#"{"scm-configuration": {"url": {"value": "not-a-url"}}}"#;
    tidemark()
        .args(["--provider", "git", "validate-scm-configuration"])
        .write_stdin(body)
        .assert()
        .success()
        .stdout(predicate::str::contains("Invalid URL"));
}
