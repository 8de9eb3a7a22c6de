//! CLI smoke tests

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("mf").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_version_flag() {
    let mut cmd = Command::cargo_bin("mf").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("museflow"));
}

#[test]
fn test_missing_api_key_fails_fast() {
    let mut cmd = Command::cargo_bin("mf").unwrap();
    cmd.env_remove("GEMINI_API_KEY")
        .args(["status", "--thread", "t-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
}
