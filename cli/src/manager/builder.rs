//! # Envkeep Image Builder (`manager::builder`)
//!
//! File: cli/src/manager/builder.rs
//!
//! ## Overview
//!
//! Builds the environment image from `[build].context` / `[build].dockerfile`
//! into the configured reference.
//!
//! A build over an existing image replaces it, so it needs confirmation and
//! the current image is first kept under `backup_<timestamp>`. Only a first
//! build, with no image under the configured reference yet, goes straight to
//! the engine.
//!
use crate::core::error::{kind_of, EnvkeepError, Result};
use crate::manager::lifecycle::LifecycleController;
use crate::manager::model::{timestamp, ImageRef};
use anyhow::{anyhow, Context};
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub image: ImageRef,
    /// Where the replaced image was kept, when there was one to keep.
    pub backup: Option<ImageRef>,
}

pub struct ImageBuilder<'c, 'a> {
    lifecycle: &'c LifecycleController<'a>,
}

impl<'c, 'a> ImageBuilder<'c, 'a> {
    pub fn new(lifecycle: &'c LifecycleController<'a>) -> Self {
        ImageBuilder { lifecycle }
    }

    /// True when the configured reference already resolves to an image.
    pub async fn replaces_image(&self) -> Result<bool> {
        let image = self.lifecycle.image().to_string();
        match self.lifecycle.engine().inspect_image(&image).await {
            Ok(_) => Ok(true),
            Err(e) if matches!(kind_of(&e), Some(EnvkeepError::ImageNotFound { .. })) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Builds the configured image.
    ///
    /// # Errors
    ///
    /// - `ConfigInvalid` without a `[build]` section or with a missing context directory.
    /// - `ConfirmationRequired` when an image exists under the reference and
    ///   `confirmed` is false.
    /// - `BuildFailure` from the engine.
    #[instrument(skip(self), fields(image = %self.lifecycle.image()))]
    pub async fn build(&self, no_cache: bool, confirmed: bool) -> Result<BuildOutcome> {
        let image = self.lifecycle.image();
        let settings = self.lifecycle.config().build.as_ref().ok_or_else(|| {
            anyhow!(EnvkeepError::ConfigInvalid(
                "no [build] section: set build.context to the directory holding the Dockerfile"
                    .to_string()
            ))
        })?;
        if !settings.context.is_dir() {
            return Err(anyhow!(EnvkeepError::ConfigInvalid(format!(
                "build context '{}' is not a directory",
                settings.context.display()
            ))));
        }

        let engine = self.lifecycle.engine();
        let backup = if self.replaces_image().await? {
            if !confirmed {
                return Err(anyhow!(EnvkeepError::ConfirmationRequired {
                    operation: format!("rebuild of '{}'", image)
                }));
            }
            let backup = self.lifecycle.vacant_tag(image.backup(&timestamp())).await?;
            engine
                .tag_image(&image.to_string(), &backup.repository, &backup.tag)
                .await
                .with_context(|| {
                    format!("Failed to keep '{}' as '{}'; build not attempted", image, backup)
                })?;
            info!("Kept current image as '{}'", backup);
            Some(backup)
        } else {
            None
        };

        engine
            .build_image(&settings.context, &settings.dockerfile, &image.to_string(), no_cache)
            .await?;
        info!("Built '{}'", image);
        Ok(BuildOutcome {
            image: image.clone(),
            backup,
        })
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::BuildSettings;
    use crate::manager::testing::{test_config, Call, FakeEngine};
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn with_build_dir(dockerfile: &str) -> (TempDir, crate::core::config::EnvironmentConfig) {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Dockerfile"), dockerfile).unwrap();
        let mut config = test_config();
        config.build = Some(BuildSettings {
            context: dir.path().to_path_buf(),
            dockerfile: "Dockerfile".to_string(),
        });
        (dir, config)
    }

    #[tokio::test]
    async fn test_first_build_needs_no_confirmation() {
        let engine = FakeEngine::new();
        engine.add_image("ubuntu:22.04");
        let (_dir, config) = with_build_dir("FROM ubuntu:22.04\nWORKDIR /workspace\n");
        let lc = LifecycleController::new(&engine, &config);

        let outcome = ImageBuilder::new(&lc).build(false, false).await.unwrap();
        assert_eq!(outcome.backup, None);
        assert!(engine.image_id("ml-dev:latest").is_some());
    }

    #[tokio::test]
    async fn test_rebuild_without_snapshots_still_keeps_previous_image() {
        let engine = FakeEngine::new();
        engine.add_image("ubuntu:22.04");
        let old = engine.add_image("ml-dev:latest");
        let (_dir, config) = with_build_dir("FROM ubuntu:22.04\n");
        let lc = LifecycleController::new(&engine, &config);
        let builder = ImageBuilder::new(&lc);

        let err = builder.build(false, false).await.unwrap_err();
        assert!(matches!(
            kind_of(&err),
            Some(EnvkeepError::ConfirmationRequired { .. })
        ));
        assert_eq!(engine.image_id("ml-dev:latest"), Some(old.clone()));

        let outcome = builder.build(false, true).await.unwrap();
        let backup = outcome.backup.unwrap();
        assert_eq!(engine.image_id(&backup.to_string()), Some(old.clone()));
        assert!(engine.tags_of(&old).iter().any(|t| t.starts_with("ml-dev:backup_")));
    }

    #[tokio::test]
    async fn test_rebuild_with_snapshots_requires_confirmation() {
        let engine = FakeEngine::new();
        engine.add_image("ubuntu:22.04");
        engine.add_image("ml-dev:latest");
        engine.add_image("ml-dev:backup_20250101_000000");
        let (_dir, config) = with_build_dir("FROM ubuntu:22.04\n");
        let lc = LifecycleController::new(&engine, &config);

        let err = ImageBuilder::new(&lc).build(false, false).await.unwrap_err();
        assert!(matches!(
            kind_of(&err),
            Some(EnvkeepError::ConfirmationRequired { .. })
        ));
        assert!(!engine.calls().iter().any(|c| c.verb() == "build"));
    }

    #[tokio::test]
    async fn test_confirmed_rebuild_keeps_previous_image() {
        let engine = FakeEngine::new();
        engine.add_image("ubuntu:22.04");
        let old = engine.add_image("ml-dev:latest");
        engine.add_image("ml-dev:backup_20250101_000000");
        let (_dir, config) = with_build_dir("FROM ubuntu:22.04\n");
        let lc = LifecycleController::new(&engine, &config);

        let outcome = ImageBuilder::new(&lc).build(true, true).await.unwrap();
        let backup = outcome.backup.unwrap();
        assert!(backup.tag.starts_with("backup_"));
        assert_eq!(engine.image_id(&backup.to_string()), Some(old.clone()));
        assert_ne!(engine.image_id("ml-dev:latest"), Some(old));

        let calls = engine.calls();
        let tag_at = calls.iter().position(|c| matches!(c, Call::Tag(..))).unwrap();
        let build_at = calls.iter().position(|c| c.verb() == "build").unwrap();
        assert!(tag_at < build_at);
    }

    #[tokio::test]
    async fn test_missing_build_section_is_config_invalid() {
        let engine = FakeEngine::new();
        let config = test_config();
        let lc = LifecycleController::new(&engine, &config);
        let err = ImageBuilder::new(&lc).build(false, true).await.unwrap_err();
        assert!(matches!(kind_of(&err), Some(EnvkeepError::ConfigInvalid(_))));
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_build_failure_surfaces() {
        let engine = FakeEngine::new();
        engine.fail_build("step 3 failed");
        let (_dir, config) = with_build_dir("FROM ubuntu:22.04\n");
        let lc = LifecycleController::new(&engine, &config);
        let err = ImageBuilder::new(&lc).build(false, false).await.unwrap_err();
        assert!(matches!(kind_of(&err), Some(EnvkeepError::BuildFailure { .. })));
    }
}
