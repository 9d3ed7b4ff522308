//! # Envkeep Error Types
//!
//! File: cli/src/core/error.rs
//!
//! ## Overview
//!
//! This module defines the error kinds used throughout envkeep. Every operation
//! returns a clear success/failure signal; the failure side carries one of these
//! kinds so callers (and tests) can react to *what* went wrong rather than parse
//! messages.
//!
//! ## Architecture
//!
//! - `EnvkeepError`: a `thiserror` enum with one variant per failure kind.
//! - `Result<T>`: an alias for `anyhow::Result<T>` so context can be layered on
//!   top of a kind with `.context(..)` while the kind stays reachable through
//!   `downcast_ref`.
//!
//! Kinds fall into groups:
//! - fatal: `EngineUnreachable`
//! - refused before any mutation: `NotRunning`, `ContainerBusy`, `ImageNotFound`,
//!   `SnapshotNotFound`, `ConfigInvalid`, `ConfirmationRequired`
//! - failed while waiting: `StartupTimeout`, `ContainerExited`, `ShutdownTimeout`, `Cancelled`
//! - engine reported: `BuildFailure`, `DockerApi`, `ExternalCommand`
//! - non-fatal, logged: `PartialCleanupFailure`
//!
//! ## Examples
//!
//! ```rust
//! let result = lifecycle.start().await;
//! if let Err(e) = &result {
//!     if let Some(EnvkeepError::ContainerExited { log_tail, .. }) = e.downcast_ref::<EnvkeepError>() {
//!         eprintln!("{}", log_tail);
//!     }
//! }
//! ```
//!
use std::time::Duration;
use thiserror::Error;

/// Error kinds for envkeep operations.
#[derive(Error, Debug)]
pub enum EnvkeepError {
    #[error("Cannot reach the Docker engine: {0}")]
    EngineUnreachable(String),

    #[error("Container '{name}' is not running.")]
    NotRunning { name: String },

    #[error("Container '{name}' is running. Stop it before compacting its image.")]
    ContainerBusy { name: String },

    #[error("Image '{name}' not found.")]
    ImageNotFound { name: String },

    #[error("Snapshot '{identifier}' not found.")]
    SnapshotNotFound { identifier: String },

    #[error("Container '{name}' did not reach 'running' within {}s. Recent logs:\n{log_tail}", .waited.as_secs())]
    StartupTimeout {
        name: String,
        waited: Duration,
        log_tail: String,
    },

    #[error("Container '{name}' entered '{status}' while starting. Recent logs:\n{log_tail}")]
    ContainerExited {
        name: String,
        status: String,
        log_tail: String,
    },

    #[error("Container '{name}' was still present {}s after shutdown was requested.", .waited.as_secs())]
    ShutdownTimeout { name: String, waited: Duration },

    #[error("Waiting for container '{name}' was cancelled.")]
    Cancelled { name: String },

    #[error("Build of '{tag}' failed: {message}\n{log}")]
    BuildFailure {
        tag: String,
        message: String,
        log: String,
    },

    #[error("Cleanup step '{step}' failed: {reason}")]
    PartialCleanupFailure { step: String, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("'{operation}' is destructive and was not confirmed. Re-run with --yes to proceed.")]
    ConfirmationRequired { operation: String },

    #[error("Docker API interaction failed: {source}")]
    DockerApi {
        #[from]
        source: bollard::errors::Error,
    },

    #[error("External command failed: {cmd}, Status: {status}, Output:\n{output}")]
    ExternalCommand {
        cmd: String,
        status: String,
        output: String,
    },

    #[error("Template rendering error: {source}")]
    Template {
        #[from]
        source: tera::Error,
    },
}

/// Type alias for Result using anyhow::Error for broad compatibility.
pub type Result<T> = anyhow::Result<T>;

/// Returns the envkeep error kind carried by `err`, if any.
pub fn kind_of(err: &anyhow::Error) -> Option<&EnvkeepError> {
    err.downcast_ref::<EnvkeepError>()
}
