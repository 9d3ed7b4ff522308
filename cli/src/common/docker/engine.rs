//! # Envkeep Engine Client (`common::docker::engine`)
//!
//! File: cli/src/common/docker/engine.rs
//!
//! ## Overview
//!
//! The `Engine` trait is the narrow set of container-engine verbs the core relies
//! on: build, run, start, stop, restart, remove, commit, tag, list, inspect,
//! flatten (export piped into import), exec, logs and ping. The managers in `crate::manager` only ever
//! talk to the engine through this trait, borrowing one shared handle.
//!
//! `DockerEngine` is the production implementation. It owns a single bollard
//! `Docker` connection (created once per process) and delegates each verb to the
//! function of the same purpose in the sibling modules (`state`, `images`,
//! `lifecycle`, `operations`, `interaction`).
//!
//! The types in this module are engine-agnostic views of what bollard returns,
//! so the managers can be exercised against an in-memory engine in tests.
//!
use crate::core::error::Result;
use async_trait::async_trait;
use bollard::Docker;
use std::fmt;
use std::path::Path;

use super::{connect, images, interaction, lifecycle, operations, state};

/// Observed status of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    /// No container with the name exists.
    Absent,
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
}

impl ContainerStatus {
    pub fn is_running(self) -> bool {
        self == ContainerStatus::Running
    }

    /// Running, paused or restarting: the container holds its image and filesystem.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ContainerStatus::Running | ContainerStatus::Paused | ContainerStatus::Restarting
        )
    }

    /// `true` for states a starting container can not recover from on its own.
    pub fn is_terminal(self) -> bool {
        matches!(self, ContainerStatus::Exited | ContainerStatus::Dead)
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContainerStatus::Absent => "absent",
            ContainerStatus::Created => "created",
            ContainerStatus::Running => "running",
            ContainerStatus::Paused => "paused",
            ContainerStatus::Restarting => "restarting",
            ContainerStatus::Removing => "removing",
            ContainerStatus::Exited => "exited",
            ContainerStatus::Dead => "dead",
        };
        f.write_str(s)
    }
}

/// Status plus the id of the image the container was created from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub status: ContainerStatus,
    pub image_id: Option<String>,
}

impl ContainerInfo {
    pub fn absent() -> Self {
        ContainerInfo {
            status: ContainerStatus::Absent,
            image_id: None,
        }
    }
}

/// One entry of an image listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSummary {
    pub id: String,
    /// `repository:tag` references carried by the image, in engine order.
    pub repo_tags: Vec<String>,
    /// Creation time as a unix timestamp (seconds).
    pub created: i64,
    pub size: i64,
}

/// Result of inspecting a single image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageDetails {
    pub id: String,
    pub size: i64,
    pub cmd: Option<Vec<String>>,
    pub entrypoint: Option<Vec<String>>,
    pub working_dir: Option<String>,
    pub env: Option<Vec<String>>,
}

/// Captured result of a non-interactive exec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i64,
    /// Interleaved stdout and stderr.
    pub output: String,
}

/// Container-engine verbs used by envkeep.
///
/// Image references are passed as `repository:tag` strings.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Health check. Fails with `EngineUnreachable`.
    async fn ping(&self) -> Result<()>;

    /// Returns `ContainerStatus::Absent` when no such container exists.
    async fn container_info(&self, name: &str) -> Result<ContainerInfo>;

    /// Creates and starts a detached container. Fails with `ImageNotFound`
    /// instead of pulling.
    async fn run_container(&self, image: &str, name: &str) -> Result<()>;

    async fn start_container(&self, name: &str) -> Result<()>;

    /// Stopping a missing or already stopped container succeeds.
    async fn stop_container(&self, name: &str, timeout_secs: Option<u32>) -> Result<()>;

    async fn restart_container(&self, name: &str) -> Result<()>;

    async fn remove_container(&self, name_or_id: &str, force: bool) -> Result<()>;

    /// Creates a container without starting it and returns its id.
    async fn create_container(&self, image: &str) -> Result<String>;

    /// Full log output when `tail` is `None`.
    async fn container_logs(&self, name: &str, tail: Option<usize>) -> Result<String>;

    async fn exec(&self, name: &str, cmd: &[String]) -> Result<ExecOutput>;

    async fn commit(&self, container: &str, repository: &str, tag: &str) -> Result<()>;

    /// Points `repository:tag` at `source`, replacing any previous mapping.
    async fn tag_image(&self, source: &str, repository: &str, tag: &str) -> Result<()>;

    /// Lists images matching a reference filter such as `repo:backup_*`.
    async fn list_images(&self, reference: &str) -> Result<Vec<ImageSummary>>;

    /// Fails with `ImageNotFound` when the reference does not resolve.
    async fn inspect_image(&self, reference: &str) -> Result<ImageDetails>;

    async fn remove_image(&self, reference: &str, force: bool) -> Result<()>;

    /// Exports container `id` and imports the stream as the single-layer image
    /// `repository:tag`, without holding the filesystem in memory.
    async fn flatten(&self, id: &str, repository: &str, tag: &str) -> Result<()>;

    /// Builds `context_dir` into `tag`. Fails with `BuildFailure`.
    async fn build_image(&self, context_dir: &Path, dockerfile: &str, tag: &str, no_cache: bool)
        -> Result<()>;
}

/// `Engine` backed by the local Docker daemon.
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connects with local defaults and verifies the daemon answers.
    pub async fn connect() -> Result<Self> {
        let docker = connect::connect_docker()?;
        let engine = DockerEngine { docker };
        engine.ping().await?;
        Ok(engine)
    }
}

#[async_trait]
impl Engine for DockerEngine {
    async fn ping(&self) -> Result<()> {
        connect::ping(&self.docker).await
    }

    async fn container_info(&self, name: &str) -> Result<ContainerInfo> {
        state::container_info(&self.docker, name).await
    }

    async fn run_container(&self, image: &str, name: &str) -> Result<()> {
        lifecycle::run_container(&self.docker, image, name).await
    }

    async fn start_container(&self, name: &str) -> Result<()> {
        lifecycle::start_container(&self.docker, name).await
    }

    async fn stop_container(&self, name: &str, timeout_secs: Option<u32>) -> Result<()> {
        lifecycle::stop_container(&self.docker, name, timeout_secs).await
    }

    async fn restart_container(&self, name: &str) -> Result<()> {
        lifecycle::restart_container(&self.docker, name).await
    }

    async fn remove_container(&self, name_or_id: &str, force: bool) -> Result<()> {
        lifecycle::remove_container(&self.docker, name_or_id, force).await
    }

    async fn create_container(&self, image: &str) -> Result<String> {
        lifecycle::create_container(&self.docker, image).await
    }

    async fn container_logs(&self, name: &str, tail: Option<usize>) -> Result<String> {
        interaction::container_logs(&self.docker, name, tail).await
    }

    async fn exec(&self, name: &str, cmd: &[String]) -> Result<ExecOutput> {
        interaction::exec_capture(&self.docker, name, cmd).await
    }

    async fn commit(&self, container: &str, repository: &str, tag: &str) -> Result<()> {
        operations::commit_container(&self.docker, container, repository, tag).await
    }

    async fn tag_image(&self, source: &str, repository: &str, tag: &str) -> Result<()> {
        images::tag_image(&self.docker, source, repository, tag).await
    }

    async fn list_images(&self, reference: &str) -> Result<Vec<ImageSummary>> {
        images::list_images(&self.docker, reference).await
    }

    async fn inspect_image(&self, reference: &str) -> Result<ImageDetails> {
        images::inspect_image(&self.docker, reference).await
    }

    async fn remove_image(&self, reference: &str, force: bool) -> Result<()> {
        images::remove_image(&self.docker, reference, force).await
    }

    async fn flatten(&self, id: &str, repository: &str, tag: &str) -> Result<()> {
        operations::flatten_container(&self.docker, id, repository, tag).await
    }

    async fn build_image(
        &self,
        context_dir: &Path,
        dockerfile: &str,
        tag: &str,
        no_cache: bool,
    ) -> Result<()> {
        operations::build_image(&self.docker, context_dir, dockerfile, tag, no_cache).await
    }
}
