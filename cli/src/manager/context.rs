//! # Envkeep Invocation Context (`manager::context`)
//!
//! File: cli/src/manager/context.rs
//!
//! ## Overview
//!
//! Everything one CLI invocation shares, passed explicitly to the command
//! handlers instead of living in globals:
//!
//! - `Session`: where configuration comes from (`ConfigStore` + `EnvSelector`)
//!   and the cancellation token wired to Ctrl-C. Available to every command,
//!   including the `config` group which never talks to the engine.
//! - `EnvContext`: the resolved `EnvironmentConfig` plus the engine handle and,
//!   when a compose file is configured, the compose supervisor. Opened once per
//!   invocation; the managers borrow from it.
//!
//! Opening order matters: configuration is loaded and validated first, so an
//! invalid environment fails with `ConfigInvalid` before any engine call.
//!
use crate::common::docker::{ComposeCli, DockerEngine};
use crate::core::config::{ConfigStore, EnvSelector, EnvironmentConfig};
use crate::core::error::Result;
use crate::manager::lifecycle::LifecycleController;
use anyhow::Context;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Per-invocation settings shared by all commands.
#[derive(Debug, Clone)]
pub struct Session {
    store: ConfigStore,
    selector: EnvSelector,
    cancel: CancellationToken,
}

impl Session {
    /// # Arguments
    ///
    /// * `config_dir` - Overrides the platform configuration directory.
    /// * `env` - Named environment; `None` means "search for `.envkeep.toml`".
    pub fn new(
        config_dir: Option<PathBuf>,
        env: Option<String>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let store = ConfigStore::locate(config_dir)?;
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        debug!("Configuration root: {}", store.root().display());
        Ok(Session {
            store,
            selector: EnvSelector { name: env, cwd },
            cancel,
        })
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn selector(&self) -> &EnvSelector {
        &self.selector
    }

    pub fn load_config(&self) -> Result<EnvironmentConfig> {
        self.store.load_environment(&self.selector)
    }

    /// Loads the environment, then connects to the engine and, if needed,
    /// probes the compose CLI.
    pub async fn open(&self) -> Result<EnvContext> {
        let config = self.load_config()?;
        let engine = DockerEngine::connect().await?;
        let compose = match &config.compose_file {
            Some(file) => Some(ComposeCli::detect(file).await?),
            None => None,
        };
        match &compose {
            Some(cli) => info!(
                "Environment '{}' ({}) via compose ({:?})",
                config.name,
                config.image,
                cli.flavor()
            ),
            None => info!("Environment '{}' ({}) via engine", config.name, config.image),
        }
        Ok(EnvContext {
            config,
            engine,
            compose,
            cancel: self.cancel.clone(),
        })
    }
}

/// An opened environment.
pub struct EnvContext {
    config: EnvironmentConfig,
    engine: DockerEngine,
    compose: Option<ComposeCli>,
    cancel: CancellationToken,
}

impl EnvContext {
    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// A lifecycle controller over this context's engine and configuration.
    pub fn lifecycle(&self) -> LifecycleController<'_> {
        let controller = LifecycleController::new(&self.engine, &self.config)
            .with_cancellation(self.cancel.clone());
        match &self.compose {
            Some(compose) => controller.with_supervisor(compose),
            None => controller,
        }
    }
}
