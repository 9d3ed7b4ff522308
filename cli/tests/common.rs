//! # Envkeep CLI Integration Test Helpers
//!
//! File: cli/tests/common.rs
//!
//! Shared helpers for the integration tests in `cli/tests/`. Every command runs
//! with its own temporary config directory and working directory, so tests
//! never read the developer's real environments or a stray `.envkeep.toml`.
//!

// Not every test file uses every helper.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::path::Path;
use tempfile::TempDir;

/// An isolated config directory plus a working directory outside any project.
pub struct Sandbox {
    pub config: TempDir,
    pub cwd: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Sandbox {
            config: tempfile::tempdir().expect("config tempdir"),
            cwd: tempfile::tempdir().expect("cwd tempdir"),
        }
    }

    /// `envkeep` with `--config-dir` pointing into the sandbox.
    pub fn cmd(&self) -> Command {
        let mut cmd = envkeep_cmd();
        cmd.current_dir(self.cwd.path())
            .env_remove("ENVKEEP_ENV")
            .env_remove("RUST_LOG")
            .env("ENVKEEP_CONFIG_DIR", self.config.path());
        cmd
    }

    pub fn environment_file(&self, name: &str) -> std::path::PathBuf {
        self.config
            .path()
            .join("environments")
            .join(format!("{}.toml", name))
    }

    pub fn write_environment(&self, name: &str, body: &str) {
        let path = self.environment_file(name);
        std::fs::create_dir_all(path.parent().unwrap_or(Path::new("."))).unwrap();
        std::fs::write(path, body).unwrap();
    }
}

pub fn envkeep_cmd() -> Command {
    Command::cargo_bin("envkeep").expect("Failed to find envkeep binary for testing")
}
