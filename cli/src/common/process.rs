//! # Envkeep Process Execution Utilities (`common::process`)
//!
//! File: cli/src/common/process.rs
//!
//! ## Overview
//!
//! Runs external programs (the compose CLI, `docker import`) with
//! `tokio::process::Command` and captures their output. `run_piped` feeds a
//! byte stream into stdin chunk by chunk. A spawn failure (program not
//! installed) is distinguished from a non-zero exit so that callers can probe
//! for tools.
//!
//! ## Usage
//!
//! ```rust
//! let out = process::run_capture("docker", &["compose", "version"], None).await?;
//! if out.success() {
//!     println!("{}", out.stdout);
//! }
//! ```
//!
use crate::core::error::{EnvkeepError, Result};
use anyhow::{anyhow, Context};
use futures_util::stream::{Stream, StreamExt};
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut all = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !all.is_empty() && !all.ends_with('\n') {
                all.push('\n');
            }
            all.push_str(&self.stderr);
        }
        all
    }
}

/// Runs `program args...` to completion, capturing stdout and stderr.
///
/// # Errors
///
/// Returns an error only if the process cannot be spawned. A non-zero exit is
/// reported through `CommandOutput::code`.
#[instrument(skip(args, cwd))]
pub async fn run_capture(program: &str, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutput> {
    let mut cmd = Command::new(program);
    cmd.args(args).kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    debug!("Running: {} {}", program, args.join(" "));
    let output = cmd
        .output()
        .await
        .with_context(|| format!("Failed to spawn '{}'", program))?;
    Ok(CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Runs `program args...` with `input` written to its stdin one chunk at a
/// time, so at most one chunk is held in memory.
///
/// Returns the byte count written and the captured output.
///
/// # Errors
///
/// * `EnvkeepError::ExternalCommand` on a non-zero exit.
/// * The first error yielded by `input`. The process is killed first, so a
///   truncated input is never handed over as complete.
#[instrument(skip(args, input))]
pub async fn run_piped<S, B>(program: &str, args: &[&str], input: S) -> Result<(u64, CommandOutput)>
where
    S: Stream<Item = Result<B>>,
    B: AsRef<[u8]>,
{
    debug!("Running (stdin piped): {} {}", program, args.join(" "));
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to spawn '{}'", program))?;
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("stdin of '{}' was not captured", program))?;

    tokio::pin!(input);
    let mut written = 0u64;
    let fed: Result<()> = async {
        while let Some(chunk) = input.next().await {
            let chunk = chunk?;
            let bytes = chunk.as_ref();
            stdin
                .write_all(bytes)
                .await
                .with_context(|| format!("Failed to write to '{}'", program))?;
            written += bytes.len() as u64;
        }
        stdin
            .shutdown()
            .await
            .with_context(|| format!("Failed to close stdin of '{}'", program))
    }
    .await;
    drop(stdin);

    if let Err(e) = fed {
        if let Err(kill) = child.start_kill() {
            warn!("Could not kill '{}': {}", program, kill);
        }
        let stderr = match child.wait_with_output().await {
            Ok(out) => String::from_utf8_lossy(&out.stderr).trim().to_string(),
            Err(_) => String::new(),
        };
        return Err(if stderr.is_empty() {
            e
        } else {
            e.context(format!("'{}' reported: {}", program, stderr))
        });
    }

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("Failed to wait for '{}'", program))?;
    let output = CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    if !output.success() {
        return Err(anyhow!(EnvkeepError::ExternalCommand {
            cmd: format!("{} {}", program, args.join(" ")),
            status: output
                .code
                .map_or_else(|| "terminated by signal".to_string(), |c| c.to_string()),
            output: output.combined(),
        }));
    }
    Ok((written, output))
}

/// Like [`run_capture`] but turns a non-zero exit into `EnvkeepError::ExternalCommand`.
pub async fn run_checked(program: &str, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutput> {
    let output = run_capture(program, args, cwd).await?;
    if output.success() {
        Ok(output)
    } else {
        Err(anyhow!(EnvkeepError::ExternalCommand {
            cmd: format!("{} {}", program, args.join(" ")),
            status: output
                .code
                .map_or_else(|| "terminated by signal".to_string(), |c| c.to_string()),
            output: output.combined(),
        }))
    }
}
