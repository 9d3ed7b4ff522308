//! # Envkeep Compose Supervision (`common::docker::compose`)
//!
//! File: cli/src/common/docker/compose.rs
//!
//! ## Overview
//!
//! When an environment names a compose file, its container is brought up and
//! down by the compose CLI instead of direct engine calls. This module wraps the
//! three compose verbs envkeep needs (`up -d`, `down`, `logs`) behind the
//! `Supervisor` trait so the lifecycle controller can be tested without it.
//!
//! ## Invocation selection
//!
//! Two syntaxes exist in the wild. `ComposeCli::detect` probes them once, in order:
//! 1. `docker compose version` (the CLI plugin)
//! 2. `docker-compose version` (the standalone binary)
//!
//! If neither answers, compose is configured but unusable and the environment is
//! rejected as `ConfigInvalid`.
//!
use crate::common::process;
use crate::core::error::{EnvkeepError, Result};
use anyhow::anyhow;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Compose verbs used by the lifecycle controller.
#[async_trait]
pub trait Supervisor: Send + Sync {
    /// `up -d`
    async fn up(&self) -> Result<()>;
    /// `down`
    async fn down(&self) -> Result<()>;
    /// Combined service logs, verbatim.
    async fn logs(&self) -> Result<String>;
}

/// Which compose executable answered the version probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeFlavor {
    /// `docker compose ...`
    Plugin,
    /// `docker-compose ...`
    Standalone,
}

impl ComposeFlavor {
    fn program(self) -> &'static str {
        match self {
            ComposeFlavor::Plugin => "docker",
            ComposeFlavor::Standalone => "docker-compose",
        }
    }

    fn prefix(self) -> &'static [&'static str] {
        match self {
            ComposeFlavor::Plugin => &["compose"],
            ComposeFlavor::Standalone => &[],
        }
    }
}

/// `Supervisor` implemented by shelling out to the compose CLI.
#[derive(Debug, Clone)]
pub struct ComposeCli {
    flavor: ComposeFlavor,
    file: PathBuf,
}

impl ComposeCli {
    pub fn new(flavor: ComposeFlavor, file: PathBuf) -> Self {
        ComposeCli { flavor, file }
    }

    /// Probes the available compose syntax.
    ///
    /// # Errors
    ///
    /// `EnvkeepError::ConfigInvalid` if neither syntax answers its version probe.
    #[instrument]
    pub async fn detect(file: &Path) -> Result<Self> {
        for flavor in [ComposeFlavor::Plugin, ComposeFlavor::Standalone] {
            let mut args: Vec<&str> = flavor.prefix().to_vec();
            args.push("version");
            match process::run_capture(flavor.program(), &args, None).await {
                Ok(out) if out.success() => {
                    info!("Using compose via '{:?}': {}", flavor, out.stdout.trim());
                    return Ok(ComposeCli::new(flavor, file.to_path_buf()));
                }
                Ok(out) => debug!("{:?} compose probe exited with {:?}", flavor, out.code),
                Err(e) => debug!("{:?} compose probe could not run: {}", flavor, e),
            }
        }
        Err(anyhow!(EnvkeepError::ConfigInvalid(format!(
            "compose file '{}' is configured but neither 'docker compose' nor 'docker-compose' is available",
            file.display()
        ))))
    }

    pub fn flavor(&self) -> ComposeFlavor {
        self.flavor
    }

    /// Full argument list for a compose verb: prefix, `-f <file>`, then the verb.
    fn args(&self, verb: &[&str]) -> Vec<String> {
        let mut args: Vec<String> = self.flavor.prefix().iter().map(|s| s.to_string()).collect();
        args.push("-f".to_string());
        args.push(self.file.to_string_lossy().into_owned());
        args.extend(verb.iter().map(|s| s.to_string()));
        args
    }

    async fn run(&self, verb: &[&str]) -> Result<process::CommandOutput> {
        let args = self.args(verb);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        process::run_checked(self.flavor.program(), &refs, self.file.parent()).await
    }
}

#[async_trait]
impl Supervisor for ComposeCli {
    async fn up(&self) -> Result<()> {
        info!("compose up -d ({})", self.file.display());
        self.run(&["up", "-d"]).await.map(|_| ())
    }

    async fn down(&self) -> Result<()> {
        info!("compose down ({})", self.file.display());
        self.run(&["down"]).await.map(|_| ())
    }

    async fn logs(&self) -> Result<String> {
        Ok(self.run(&["logs", "--no-color"]).await?.combined())
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_args() {
        let cli = ComposeCli::new(ComposeFlavor::Plugin, PathBuf::from("/p/docker-compose.yml"));
        assert_eq!(
            cli.args(&["up", "-d"]),
            vec!["compose", "-f", "/p/docker-compose.yml", "up", "-d"]
        );
        assert_eq!(cli.flavor().program(), "docker");
    }

    #[test]
    fn test_standalone_args() {
        let cli = ComposeCli::new(ComposeFlavor::Standalone, PathBuf::from("/p/c.yml"));
        assert_eq!(cli.args(&["down"]), vec!["-f", "/p/c.yml", "down"]);
        assert_eq!(cli.flavor().program(), "docker-compose");
    }
}
