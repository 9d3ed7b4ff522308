//! # Envkeep CLI Main Integration Tests
//!
//! File: cli/tests/main_tests.rs
//!
//! Top-level behaviour: `--help`, `--version`, unknown commands.
//!
mod common;
use common::*;
use predicates::prelude::*;

#[test]
fn test_help_lists_command_groups() {
    envkeep_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("env"))
        .stdout(predicate::str::contains("backup"))
        .stdout(predicate::str::contains("image"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_flag() {
    envkeep_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_command_fails() {
    envkeep_cmd()
        .arg("blueprint")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_subcommand_help() {
    envkeep_cmd()
        .args(["backup", "restore", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--yes"));
}
