//! # Envkeep CLI Backup Integration Tests
//!
//! File: cli/tests/backup.rs
//!
//! `envkeep backup ...` argument handling and refusals that happen before the
//! engine is reached.
//!
mod common;
use common::*;
use predicates::prelude::*;

#[test]
fn test_delete_needs_target() {
    envkeep_cmd()
        .args(["backup", "delete"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("<ID>"));
}

#[test]
fn test_delete_id_and_all_conflict() {
    envkeep_cmd()
        .args(["backup", "delete", "1", "--all"])
        .assert()
        .failure();
}

#[test]
fn test_rotate_rejects_keep_zero() {
    envkeep_cmd()
        .args(["backup", "rotate", "--keep", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 1"));
}

#[test]
fn test_restore_without_environment() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["backup", "restore", "1", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no environment selected"));
}

#[test]
#[ignore = "needs a Docker daemon"]
fn test_list_empty_repository() {
    let sandbox = Sandbox::new();
    sandbox.write_environment(
        "empty",
        "[container]\nname = \"envkeep-empty\"\nimage = \"envkeep-empty-repo\"\n",
    );
    sandbox
        .cmd()
        .args(["--env", "empty", "backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No snapshots"));
}
