//! # Envkeep Docker Connection Helper
//!
//! File: cli/src/common/docker/connect.rs
//!
//! ## Overview
//!
//! Establishes the single Docker connection used for a whole envkeep invocation
//! and checks that the daemon actually answers. Any failure here is reported as
//! `EnvkeepError::EngineUnreachable`: it is fatal and never retried.
//!
//! ## Usage
//!
//! ```rust
//! let docker = connect::connect_docker()?;
//! connect::ping(&docker).await?;
//! ```
//!
use crate::core::error::{EnvkeepError, Result};
use anyhow::anyhow;
use bollard::Docker;
use tracing::{debug, instrument};

/// Creates a client for the local Docker daemon (`/var/run/docker.sock` on Unix,
/// named pipe on Windows, or whatever `DOCKER_HOST` names).
///
/// Creating the client does not contact the daemon; call [`ping`] for that.
///
/// # Errors
///
/// Returns `EnvkeepError::EngineUnreachable` if the client cannot be configured.
#[instrument]
pub fn connect_docker() -> Result<Docker> {
    Docker::connect_with_local_defaults().map_err(|e| {
        anyhow!(EnvkeepError::EngineUnreachable(format!(
            "{}. Is the Docker daemon running and accessible?",
            e
        )))
    })
}

/// Blocking health check against the daemon.
///
/// # Errors
///
/// Returns `EnvkeepError::EngineUnreachable` if the daemon does not respond.
#[instrument(skip(docker))]
pub async fn ping(docker: &Docker) -> Result<()> {
    let reply = docker.ping().await.map_err(|e| {
        anyhow!(EnvkeepError::EngineUnreachable(format!(
            "ping failed: {}. Is the Docker daemon running and accessible?",
            e
        )))
    })?;
    debug!("Docker daemon answered ping: {}", reply);
    Ok(())
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    /// Requires a running Docker daemon. Run locally with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn test_connect_and_ping() {
        let docker = connect_docker().expect("client should be constructible");
        assert!(ping(&docker).await.is_ok());
    }
}
