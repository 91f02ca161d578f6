//! CLI smoke tests for top-level behavior.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn smoke_cli_help_lists_feature_command() {
    let mut cmd = Command::cargo_bin("dcontainer").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("feature"))
        .stdout(predicate::str::contains("--log-level"));
}

#[test]
fn smoke_cli_feature_help_lists_generate_dependencies() {
    let mut cmd = Command::cargo_bin("dcontainer").unwrap();
    cmd.args(["feature", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("generate-dependencies"));
}

#[test]
fn smoke_cli_without_subcommand_prints_hint() {
    let mut cmd = Command::cargo_bin("dcontainer").unwrap();
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("dcontainer --help"));
}

#[test]
fn smoke_cli_version() {
    let mut cmd = Command::cargo_bin("dcontainer").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn smoke_cli_rejects_unknown_log_level() {
    let mut cmd = Command::cargo_bin("dcontainer").unwrap();
    cmd.args(["--log-level", "loud"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
