//! # Envkeep Docker Container Interaction Utilities
//!
//! File: cli/src/common/docker/interaction.rs
//!
//! ## Overview
//!
//! Reading from and running commands inside containers:
//! - `exec_capture` runs a non-interactive command and captures stdout, stderr and
//!   the exit code. The cleanup runner uses it for every step.
//! - `container_logs` returns the captured output of a container, either in full
//!   or the last N lines (the diagnostic tail attached to startup failures).
//!
//! Both consume bollard's multiplexed `LogOutput` stream with `futures_util`.
//!
use super::engine::ExecOutput;
use crate::core::error::{EnvkeepError, Result};
use anyhow::anyhow;
use bollard::{
    container::{LogOutput, LogsOptions},
    exec::{CreateExecOptions, StartExecResults},
    Docker,
};
use futures_util::StreamExt;
use tracing::{debug, info, instrument, warn};

/// Runs `cmd` inside a running container and waits for it to finish.
///
/// # Returns
///
/// * `ExecOutput` with stdout and stderr interleaved in arrival order and the
///   command's exit code (`-1` if the engine does not report one).
///
/// # Errors
///
/// * `EnvkeepError::DockerApi` if the exec cannot be created, started or inspected.
#[instrument(skip(docker, cmd), fields(container = %name))]
pub async fn exec_capture(docker: &Docker, name: &str, cmd: &[String]) -> Result<ExecOutput> {
    debug!("Creating exec in '{}': {:?}", name, cmd);
    let exec_options = CreateExecOptions {
        attach_stdout: Some(true),
        attach_stderr: Some(true),
        attach_stdin: Some(false),
        tty: Some(false),
        cmd: Some(cmd.to_vec()),
        ..Default::default()
    };
    let created = docker
        .create_exec(name, exec_options)
        .await
        .map_err(|e| {
            anyhow!(EnvkeepError::DockerApi { source: e })
                .context(format!("Failed to create exec instance in '{}'", name))
        })?;

    let mut collected = String::new();
    match docker.start_exec(&created.id, None).await.map_err(|e| {
        anyhow!(EnvkeepError::DockerApi { source: e }).context("Failed to start exec instance")
    })? {
        StartExecResults::Attached { mut output, .. } => {
            while let Some(chunk) = output.next().await {
                match chunk {
                    Ok(LogOutput::StdOut { message }) | Ok(LogOutput::StdErr { message }) => {
                        collected.push_str(&String::from_utf8_lossy(&message));
                    }
                    Ok(LogOutput::Console { message }) => {
                        collected.push_str(&String::from_utf8_lossy(&message));
                    }
                    Ok(LogOutput::StdIn { .. }) => {}
                    Err(e) => {
                        warn!("Error receiving exec output from '{}': {}", name, e);
                        break;
                    }
                }
            }
        }
        StartExecResults::Detached => {
            debug!("Exec {} started detached; no output captured.", created.id);
        }
    }

    let inspect = docker.inspect_exec(&created.id).await.map_err(|e| {
        anyhow!(EnvkeepError::DockerApi { source: e })
            .context(format!("Failed to inspect exec instance '{}'", created.id))
    })?;
    let exit_code = inspect.exit_code.unwrap_or(-1);
    info!("Exec in '{}' finished with exit code {}", name, exit_code);
    Ok(ExecOutput {
        exit_code,
        output: collected,
    })
}

/// Returns the container's log output verbatim.
///
/// # Arguments
///
/// * `tail` - `Some(n)` for the last `n` lines, `None` for everything.
#[instrument(skip(docker), fields(container = %name))]
pub async fn container_logs(docker: &Docker, name: &str, tail: Option<usize>) -> Result<String> {
    let options = LogsOptions::<String> {
        stdout: true,
        stderr: true,
        follow: false,
        tail: tail.map_or_else(|| "all".to_string(), |n| n.to_string()),
        timestamps: false,
        ..Default::default()
    };
    let mut stream = docker.logs(name, Some(options));
    let mut collected = String::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(output) => collected.push_str(&String::from_utf8_lossy(&output.into_bytes())),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                debug!("No logs: container '{}' not found.", name);
                break;
            }
            Err(e) => {
                return Err(anyhow!(EnvkeepError::DockerApi { source: e })
                    .context(format!("Error reading logs for container '{}'", name)));
            }
        }
    }
    Ok(collected)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    /// Requires a running Docker daemon.
    #[tokio::test]
    #[ignore]
    async fn test_logs_for_missing_container_are_empty() {
        let docker = crate::common::docker::connect::connect_docker().unwrap();
        let logs = container_logs(&docker, "envkeep-test-absent", Some(50))
            .await
            .unwrap();
        assert!(logs.is_empty());
    }
}
