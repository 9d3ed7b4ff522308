//! # Envkeep Lifecycle Controller (`manager::lifecycle`)
//!
//! File: cli/src/manager/lifecycle.rs
//!
//! ## Overview
//!
//! Drives the environment's container to a target status and reports the result
//! with diagnostic context. Two control paths exist:
//!
//! - **compose**: when the environment names a compose file, `up -d` / `down` are
//!   delegated to a `Supervisor`.
//! - **direct**: otherwise the engine verbs (`run`, `start`, `stop`, `restart`)
//!   are used on the named container.
//!
//! ## Waiting
//!
//! After a start command is issued the container status is polled every
//! `lifecycle.poll_interval` until it is `running` or `lifecycle.startup_timeout`
//! elapses. Reaching `exited`/`dead` first fails immediately with the tail of the
//! container log attached. Every sleep also observes the controller's
//! `CancellationToken`.
//!
//! ```text
//!   Absent --start--> Created --> Running --stop--> Exited --start--> Running
//!     ^                                |
//!     +-------- compose down ----------+
//! ```
//!
//! `stop` and `restart` are no-ops on an absent container; `start` is not.
//!
use crate::common::docker::{ContainerInfo, ContainerStatus, Engine, Supervisor};
use crate::core::config::EnvironmentConfig;
use crate::core::error::{kind_of, EnvkeepError, Result};
use crate::manager::cleanup::{CleanupReport, CleanupRunner};
use crate::manager::model::{timestamp, ImageRef};
use anyhow::{anyhow, Context};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    AlreadyRunning,
    Started,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    AlreadyStopped,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartOutcome {
    /// No container existed; nothing was done.
    NotPresent,
    /// Restarted in place (or via compose down/up).
    Restarted,
    /// Removed and re-run because the configured image changed.
    Recreated,
}

/// Result of `save_as_image`.
#[derive(Debug)]
pub struct SaveOutcome {
    /// Where the replaced image was kept.
    pub backup: ImageRef,
    /// Present when cleanup ran and succeeded.
    pub cleanup: Option<CleanupReport>,
    pub restart: RestartOutcome,
}

/// Container lifecycle for one environment.
///
/// Borrows the shared engine handle and the resolved configuration; holds no
/// state of its own besides the cancellation token.
pub struct LifecycleController<'a> {
    engine: &'a dyn Engine,
    supervisor: Option<&'a dyn Supervisor>,
    config: &'a EnvironmentConfig,
    cancel: CancellationToken,
}

/// Last `n` lines of `text`.
fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

impl<'a> LifecycleController<'a> {
    pub fn new(engine: &'a dyn Engine, config: &'a EnvironmentConfig) -> Self {
        LifecycleController {
            engine,
            supervisor: None,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Routes `up`/`down`/`logs` through compose.
    pub fn with_supervisor(mut self, supervisor: &'a dyn Supervisor) -> Self {
        self.supervisor = Some(supervisor);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn engine(&self) -> &'a dyn Engine {
        self.engine
    }

    pub fn config(&self) -> &'a EnvironmentConfig {
        self.config
    }

    pub fn name(&self) -> &'a str {
        &self.config.name
    }

    /// The configured image reference, i.e. the "current" state.
    pub fn image(&self) -> &'a ImageRef {
        &self.config.image
    }

    pub async fn status(&self) -> Result<ContainerStatus> {
        Ok(self.engine.container_info(self.name()).await?.status)
    }

    /// Fails with `NotRunning` unless the container exists and runs.
    pub async fn require_running(&self) -> Result<()> {
        if self.status().await?.is_running() {
            Ok(())
        } else {
            Err(anyhow!(EnvkeepError::NotRunning {
                name: self.name().to_string()
            }))
        }
    }

    #[instrument(skip(self), fields(container = %self.config.name))]
    pub async fn start(&self) -> Result<StartOutcome> {
        let info = self.engine.container_info(self.name()).await?;
        if info.status.is_running() {
            info!("Container '{}' is already running.", self.name());
            return Ok(StartOutcome::AlreadyRunning);
        }

        match self.supervisor {
            Some(supervisor) => supervisor
                .up()
                .await
                .context("compose up failed")?,
            None if info.status == ContainerStatus::Absent => {
                info!("Running '{}' from image '{}'", self.name(), self.image());
                self.engine
                    .run_container(&self.image().to_string(), self.name())
                    .await?;
            }
            None => {
                info!("Starting existing container '{}'", self.name());
                self.engine.start_container(self.name()).await?;
            }
        }

        self.wait_until_running().await?;
        Ok(StartOutcome::Started)
    }

    #[instrument(skip(self), fields(container = %self.config.name))]
    pub async fn stop(&self) -> Result<StopOutcome> {
        let status = self.status().await?;
        if !status.is_active() {
            info!("Container '{}' is not running ({}).", self.name(), status);
            return Ok(StopOutcome::AlreadyStopped);
        }

        match self.supervisor {
            Some(supervisor) => {
                supervisor.down().await.context("compose down failed")?;
                self.wait_until_absent().await?;
            }
            None => {
                self.engine
                    .stop_container(self.name(), Some(self.config.lifecycle.stop_timeout_secs))
                    .await?;
            }
        }
        info!("Container '{}' stopped.", self.name());
        Ok(StopOutcome::Stopped)
    }

    /// Stop-then-start through the active control path.
    ///
    /// On the direct path the container is re-created when the configured image
    /// reference now points at a different image than the container runs.
    #[instrument(skip(self), fields(container = %self.config.name))]
    pub async fn restart(&self) -> Result<RestartOutcome> {
        let info = self.engine.container_info(self.name()).await?;
        if info.status == ContainerStatus::Absent {
            info!("Container '{}' does not exist; nothing to restart.", self.name());
            return Ok(RestartOutcome::NotPresent);
        }

        let outcome = match self.supervisor {
            Some(supervisor) => {
                supervisor.down().await.context("compose down failed")?;
                self.wait_until_absent().await?;
                supervisor.up().await.context("compose up failed")?;
                RestartOutcome::Restarted
            }
            None if self.image_changed(&info).await? => {
                info!(
                    "Image '{}' changed; re-creating container '{}'",
                    self.image(),
                    self.name()
                );
                self.engine
                    .stop_container(self.name(), Some(self.config.lifecycle.stop_timeout_secs))
                    .await?;
                self.engine.remove_container(self.name(), false).await?;
                self.engine
                    .run_container(&self.image().to_string(), self.name())
                    .await?;
                RestartOutcome::Recreated
            }
            None => {
                self.engine.restart_container(self.name()).await?;
                RestartOutcome::Restarted
            }
        };

        self.wait_until_running().await?;
        Ok(outcome)
    }

    /// Container output, verbatim.
    pub async fn logs(&self) -> Result<String> {
        match self.supervisor {
            Some(supervisor) => supervisor.logs().await,
            None => self.engine.container_logs(self.name(), None).await,
        }
    }

    /// Last `n` lines of container output.
    pub async fn logs_tail(&self, n: usize) -> Result<String> {
        match self.supervisor {
            Some(supervisor) => Ok(last_lines(&supervisor.logs().await?, n)),
            None => self.engine.container_logs(self.name(), Some(n)).await,
        }
    }

    /// Commits the running container over the configured image.
    ///
    /// Order: optional cleanup, then the current image is tagged
    /// `backup_<ts>`, then the container is committed, then restarted. No commit
    /// happens unless the backup tag succeeded.
    ///
    /// # Errors
    ///
    /// * `ConfirmationRequired` if `confirmed` is false.
    /// * `NotRunning` if the container is absent or stopped.
    #[instrument(skip(self), fields(container = %self.config.name))]
    pub async fn save_as_image(&self, cleanup_first: bool, confirmed: bool) -> Result<SaveOutcome> {
        if !confirmed {
            return Err(anyhow!(EnvkeepError::ConfirmationRequired {
                operation: "save".to_string()
            }));
        }
        self.require_running().await?;

        let cleanup = if cleanup_first {
            match CleanupRunner::new(self).run().await {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!("Cleanup failed, saving anyway: {:#}", e);
                    None
                }
            }
        } else {
            None
        };

        let current = self.image().to_string();
        let backup = self.vacant_tag(self.image().backup(&timestamp())).await?;
        info!("Backing up '{}' as '{}'", current, backup);
        self.engine
            .tag_image(&current, &backup.repository, &backup.tag)
            .await
            .with_context(|| format!("Failed to back up '{}'; commit not attempted", current))?;

        info!("Committing '{}' as '{}'", self.name(), current);
        self.engine
            .commit(self.name(), &self.image().repository, &self.image().tag)
            .await?;

        let restart = self.restart().await?;
        Ok(SaveOutcome {
            backup,
            cleanup,
            restart,
        })
    }

    /// `wanted`, or `wanted` with a `_1`, `_2`, ... suffix when that tag is
    /// already taken. Timestamped tags have one-second resolution and tagging
    /// moves an existing tag, so every new one goes through here.
    pub async fn vacant_tag(&self, wanted: ImageRef) -> Result<ImageRef> {
        let mut candidate = wanted.clone();
        let mut suffix = 0u32;
        loop {
            match self.engine.inspect_image(&candidate.to_string()).await {
                Err(e) if matches!(kind_of(&e), Some(EnvkeepError::ImageNotFound { .. })) => {
                    return Ok(candidate);
                }
                Err(e) => return Err(e),
                Ok(_) => {
                    suffix += 1;
                    debug!("'{}' is taken", candidate);
                    candidate = wanted.with_tag(format!("{}_{}", wanted.tag, suffix));
                }
            }
        }
    }

    /// Whether the configured reference resolves to an image other than the one
    /// the container was created from.
    async fn image_changed(&self, info: &ContainerInfo) -> Result<bool> {
        let Some(running) = &info.image_id else {
            return Ok(false);
        };
        match self.engine.inspect_image(&self.image().to_string()).await {
            Ok(details) => Ok(details.id != *running),
            Err(e) if matches!(kind_of(&e), Some(EnvkeepError::ImageNotFound { .. })) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn log_tail(&self) -> String {
        self.logs_tail(self.config.lifecycle.log_tail_lines)
            .await
            .unwrap_or_else(|e| format!("<logs unavailable: {}>", e))
    }

    async fn sleep(&self, wait: Duration) -> Result<()> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(anyhow!(EnvkeepError::Cancelled {
                name: self.name().to_string()
            })),
            _ = tokio::time::sleep(wait) => Ok(()),
        }
    }

    async fn wait_until_running(&self) -> Result<()> {
        let settings = self.config.lifecycle;
        let deadline = Instant::now() + settings.startup_timeout;
        loop {
            let status = self.status().await?;
            debug!("'{}' is {}", self.name(), status);
            if status.is_running() {
                info!("Container '{}' is running.", self.name());
                return Ok(());
            }
            if status.is_terminal() {
                return Err(anyhow!(EnvkeepError::ContainerExited {
                    name: self.name().to_string(),
                    status: status.to_string(),
                    log_tail: self.log_tail().await,
                }));
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(anyhow!(EnvkeepError::StartupTimeout {
                    name: self.name().to_string(),
                    waited: settings.startup_timeout,
                    log_tail: self.log_tail().await,
                }));
            }
            self.sleep(settings.poll_interval.min(deadline - now)).await?;
        }
    }

    /// Polls until compose has removed the container, for at most
    /// `lifecycle.stop_timeout_secs`.
    async fn wait_until_absent(&self) -> Result<()> {
        let settings = self.config.lifecycle;
        let limit = Duration::from_secs(u64::from(settings.stop_timeout_secs));
        let deadline = Instant::now() + limit;
        loop {
            if self.status().await? == ContainerStatus::Absent {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(anyhow!(EnvkeepError::ShutdownTimeout {
                    name: self.name().to_string(),
                    waited: limit,
                }));
            }
            self.sleep(settings.poll_interval.min(deadline - now)).await?;
        }
    }
}
