//! # Envkeep Image Compactor (`manager::compactor`)
//!
//! File: cli/src/manager/compactor.rs
//!
//! ## Overview
//!
//! Shrinks an image by flattening its layer history, then puts its runtime
//! metadata back.
//!
//! ```text
//!  repo:<tag> --tag--> repo:backup_<ts>                      (recovery path, kept)
//!  repo:<tag> --create, export | import--> repo:compressed  (no history, no metadata)
//!  repo:compressed --build(generated Dockerfile)--> repo:compressed_with_metadata
//!  repo:compressed removed
//!  adopt: repo:compressed_with_metadata --tag--> repo:<tag>, intermediate tag removed
//! ```
//!
//! On any failure after the backup tag, the intermediate tags are removed and
//! the temporary build directory is gone before the error is returned. The
//! backup tag is never undone.
//!
use crate::core::error::{kind_of, EnvkeepError, Result};
use crate::core::templating::render_metadata_dockerfile;
use crate::manager::lifecycle::LifecycleController;
use crate::manager::model::{
    timestamp, ImageRef, RuntimeMetadata, COMPRESSED_TAG, COMPRESSED_WITH_METADATA_TAG,
};
use anyhow::{anyhow, Context};
use std::fs;
use tracing::{info, instrument, warn};

const GENERATED_DOCKERFILE: &str = "Dockerfile";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeReport {
    pub before: i64,
    pub after: i64,
}

impl SizeReport {
    pub fn saved(&self) -> i64 {
        self.before - self.after
    }

    pub fn saved_percent(&self) -> f64 {
        if self.before <= 0 {
            0.0
        } else {
            self.saved() as f64 * 100.0 / self.before as f64
        }
    }
}

/// A finished compaction, not yet adopted.
#[derive(Debug, Clone)]
pub struct CompactedImage {
    pub source: ImageRef,
    pub backup: ImageRef,
    /// `repository:compressed_with_metadata`
    pub result: ImageRef,
    pub metadata: RuntimeMetadata,
    /// Informational; `None` if the result could not be inspected.
    pub sizes: Option<SizeReport>,
}

pub struct ImageCompactor<'c, 'a> {
    lifecycle: &'c LifecycleController<'a>,
}

impl<'c, 'a> ImageCompactor<'c, 'a> {
    pub fn new(lifecycle: &'c LifecycleController<'a>) -> Self {
        ImageCompactor { lifecycle }
    }

    /// Flattens `repository:<tag>` (the configured tag when `None`) into
    /// `repository:compressed_with_metadata`.
    ///
    /// # Errors
    ///
    /// * `ContainerBusy` if the environment's container is running.
    /// * `ImageNotFound` if the source image does not exist.
    /// * `BuildFailure` if the metadata rebuild fails.
    #[instrument(skip(self), fields(container = %self.lifecycle.name()))]
    pub async fn compact(&self, tag: Option<&str>) -> Result<CompactedImage> {
        let engine = self.lifecycle.engine();
        let configured = self.lifecycle.image();
        let source = tag.map_or_else(|| configured.clone(), |t| configured.with_tag(t));

        if self.lifecycle.status().await?.is_active() {
            return Err(anyhow!(EnvkeepError::ContainerBusy {
                name: self.lifecycle.name().to_string()
            }));
        }
        let details = engine.inspect_image(&source.to_string()).await?;

        let backup = self.lifecycle.vacant_tag(source.backup(&timestamp())).await?;
        engine
            .tag_image(&source.to_string(), &backup.repository, &backup.tag)
            .await
            .with_context(|| format!("Failed to back up '{}'; nothing was changed", source))?;
        info!("Backed up '{}' as '{}'", source, backup);

        let metadata = RuntimeMetadata::capture(&details);
        info!("Captured runtime metadata: {:?}", metadata);

        let compressed = source.with_tag(COMPRESSED_TAG);
        let result = source.with_tag(COMPRESSED_WITH_METADATA_TAG);

        if let Err(e) = self.flatten(&source, &compressed).await {
            self.discard(&[&compressed]).await;
            return Err(e.context(format!("Flattening '{}' failed; '{}' is intact", source, backup)));
        }
        if let Err(e) = self.rebuild(&compressed, &metadata, &result).await {
            self.discard(&[&result, &compressed]).await;
            return Err(e.context(format!(
                "Rebuilding metadata for '{}' failed; '{}' is intact",
                source, backup
            )));
        }
        if let Err(e) = engine.remove_image(&compressed.to_string(), false).await {
            warn!("Could not remove intermediate '{}': {:#}", compressed, e);
        }

        let sizes = match engine.inspect_image(&result.to_string()).await {
            Ok(after) => Some(SizeReport {
                before: details.size,
                after: after.size,
            }),
            Err(e) => {
                warn!("Could not inspect '{}' for its size: {:#}", result, e);
                None
            }
        };

        Ok(CompactedImage {
            source,
            backup,
            result,
            metadata,
            sizes,
        })
    }

    /// Moves the source tag onto the compacted image and drops the
    /// intermediate tag.
    #[instrument(skip(self, compacted), fields(image = %compacted.source))]
    pub async fn adopt(&self, compacted: &CompactedImage, confirmed: bool) -> Result<()> {
        if !confirmed {
            return Err(anyhow!(EnvkeepError::ConfirmationRequired {
                operation: "image compact (adopt)".to_string()
            }));
        }
        let engine = self.lifecycle.engine();
        engine
            .tag_image(
                &compacted.result.to_string(),
                &compacted.source.repository,
                &compacted.source.tag,
            )
            .await
            .with_context(|| {
                format!(
                    "Failed to adopt '{}'; it is still available as '{}'",
                    compacted.source, compacted.result
                )
            })?;
        if let Err(e) = engine.remove_image(&compacted.result.to_string(), false).await {
            warn!("Could not remove tag '{}': {:#}", compacted.result, e);
        }
        info!("'{}' now points at the compacted image", compacted.source);
        Ok(())
    }

    /// export piped into import through a created (never started) container,
    /// which is removed whatever the outcome.
    async fn flatten(&self, source: &ImageRef, compressed: &ImageRef) -> Result<()> {
        let engine = self.lifecycle.engine();
        let id = engine.create_container(&source.to_string()).await?;
        let imported = engine
            .flatten(&id, &compressed.repository, &compressed.tag)
            .await;
        if imported.is_ok() {
            info!("Flattened '{}' into '{}'", source, compressed);
        }
        if let Err(e) = engine.remove_container(&id, true).await {
            warn!("Could not remove temporary container '{}': {:#}", id, e);
        }
        imported
    }

    async fn rebuild(
        &self,
        base: &ImageRef,
        metadata: &RuntimeMetadata,
        target: &ImageRef,
    ) -> Result<()> {
        let dockerfile = render_metadata_dockerfile(base, metadata)?;
        let dir = tempfile::Builder::new()
            .prefix("envkeep-compact-")
            .tempdir()
            .context("Failed to create temporary build directory")?;
        fs::write(dir.path().join(GENERATED_DOCKERFILE), dockerfile)
            .context("Failed to write generated Dockerfile")?;

        self.lifecycle
            .engine()
            .build_image(dir.path(), GENERATED_DOCKERFILE, &target.to_string(), false)
            .await?;
        dir.close()
            .context("Failed to remove temporary build directory")?;
        Ok(())
    }

    /// Best-effort removal of intermediate tags after a failure.
    async fn discard(&self, refs: &[&ImageRef]) {
        for reference in refs {
            match self
                .lifecycle
                .engine()
                .remove_image(&reference.to_string(), true)
                .await
            {
                Ok(()) => info!("Removed intermediate '{}'", reference),
                Err(e) if matches!(kind_of(&e), Some(EnvkeepError::ImageNotFound { .. })) => {}
                Err(e) => warn!("Could not remove intermediate '{}': {:#}", reference, e),
            }
        }
    }
}
