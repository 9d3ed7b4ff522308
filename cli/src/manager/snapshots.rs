//! # Envkeep Snapshot Store (`manager::snapshots`)
//!
//! File: cli/src/manager/snapshots.rs
//!
//! ## Overview
//!
//! Snapshots are images tagged `<repository>:backup_<timestamp>`. The engine is
//! the only record of them: `list()` derives `SnapshotRecord`s from an image
//! listing every time, newest first by image creation time.
//!
//! ## Invariants
//!
//! - `restore` tags the current image `pre_restore_<timestamp>` before it moves
//!   the configured tag; if that tag fails nothing else happens.
//! - New `backup_*` and `pre_restore_*` tags never replace existing ones; a tag
//!   taken within the same second gets a `_1`, `_2`, ... suffix.
//! - `rotate(n)` only ever deletes snapshots beyond the newest `n`, oldest first,
//!   and keeps going when a single deletion fails.
//! - Destructive calls take an explicit `confirmed` flag; the prompt lives in the
//!   command layer.
//!
use crate::common::docker::ContainerStatus;
use crate::core::error::{kind_of, EnvkeepError, Result};
use crate::manager::cleanup::{CleanupReport, CleanupRunner};
use crate::manager::lifecycle::{LifecycleController, RestartOutcome};
use crate::manager::model::{timestamp, ImageRef, SnapshotRecord, BACKUP_PREFIX};
use anyhow::{anyhow, Context};
use chrono::{TimeZone, Utc};
use tracing::{info, instrument, warn};

/// Result of a batch deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationReport {
    pub removed: Vec<String>,
    /// `(tag, reason)` for deletions the engine refused.
    pub failed: Vec<(String, String)>,
}

/// Result of `restore`. Partial when the tag swap happened but the restart
/// did not complete.
#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    pub restored_from: ImageRef,
    /// Holds the image the configured tag pointed at before the swap.
    pub safety: ImageRef,
    pub restart: Option<RestartOutcome>,
    pub restart_error: Option<String>,
    pub final_status: Option<ContainerStatus>,
}

impl RestoreOutcome {
    pub fn is_partial(&self) -> bool {
        self.restart_error.is_some()
    }
}

#[derive(Debug)]
pub struct AutoBackupReport {
    pub cleanup: Option<CleanupReport>,
    pub created: ImageRef,
    pub rotation: RotationReport,
}

fn refuse_unconfirmed(operation: &str, confirmed: bool) -> Result<()> {
    if confirmed {
        Ok(())
    } else {
        Err(anyhow!(EnvkeepError::ConfirmationRequired {
            operation: operation.to_string()
        }))
    }
}

pub struct SnapshotStore<'c, 'a> {
    lifecycle: &'c LifecycleController<'a>,
}

impl<'c, 'a> SnapshotStore<'c, 'a> {
    pub fn new(lifecycle: &'c LifecycleController<'a>) -> Self {
        SnapshotStore { lifecycle }
    }

    fn image(&self) -> &'a ImageRef {
        self.lifecycle.image()
    }

    /// All snapshots of the repository, newest first. Empty is not an error.
    #[instrument(skip(self), fields(repository = %self.lifecycle.image().repository))]
    pub async fn list(&self) -> Result<Vec<SnapshotRecord>> {
        let image = self.image();
        let prefix = format!("{}:{}", image.repository, BACKUP_PREFIX);
        let summaries = self
            .lifecycle
            .engine()
            .list_images(&image.backup_filter())
            .await?;

        let mut records: Vec<SnapshotRecord> = summaries
            .into_iter()
            .filter_map(|summary| {
                let reference = summary.repo_tags.iter().find(|t| t.starts_with(&prefix))?;
                Some(SnapshotRecord {
                    tag: reference[image.repository.len() + 1..].to_string(),
                    image_id: summary.id,
                    created: Utc
                        .timestamp_opt(summary.created, 0)
                        .single()
                        .unwrap_or_default(),
                    size: summary.size,
                })
            })
            .collect();
        records.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| b.tag.cmp(&a.tag)));
        Ok(records)
    }

    /// Commits the running container as a new snapshot.
    ///
    /// # Errors
    ///
    /// `NotRunning` if the container is absent or stopped.
    #[instrument(skip(self), fields(container = %self.lifecycle.name()))]
    pub async fn create(&self) -> Result<ImageRef> {
        self.lifecycle.require_running().await?;
        let backup = self
            .lifecycle
            .vacant_tag(self.image().backup(&timestamp()))
            .await?;
        self.lifecycle
            .engine()
            .commit(self.lifecycle.name(), &backup.repository, &backup.tag)
            .await
            .with_context(|| format!("Failed to create snapshot '{}'", backup))?;
        info!("Created snapshot '{}'", backup);
        Ok(backup)
    }

    /// Keeps the newest `keep` snapshots and deletes the rest, oldest first.
    ///
    /// # Errors
    ///
    /// `ConfigInvalid` when `keep` is 0; `delete_all` is the way to remove
    /// every snapshot.
    #[instrument(skip(self))]
    pub async fn rotate(&self, keep: usize) -> Result<RotationReport> {
        if keep == 0 {
            return Err(anyhow!(EnvkeepError::ConfigInvalid(
                "rotation must keep at least one snapshot".to_string()
            )));
        }
        let records = self.list().await?;
        if records.len() <= keep {
            info!("{} snapshot(s), keeping up to {}; nothing to rotate.", records.len(), keep);
            return Ok(RotationReport::default());
        }
        Ok(self.remove_all(records[keep..].iter().rev()).await)
    }

    /// Maps an identifier to an image reference and the image id it resolves to.
    ///
    /// A number is a 1-based position in `list()`. Anything else is a tag,
    /// optionally prefixed with `<repository>:`. With `allow_any_tag`, tags that
    /// are not snapshots but exist in the repository (e.g. `pre_restore_*`) are
    /// accepted too.
    async fn resolve(&self, identifier: &str, allow_any_tag: bool) -> Result<(ImageRef, String)> {
        let not_found = || {
            anyhow!(EnvkeepError::SnapshotNotFound {
                identifier: identifier.to_string()
            })
        };
        let image = self.image();
        let records = self.list().await?;
        if records.is_empty() {
            return Err(not_found());
        }

        let id = identifier.trim();
        if let Ok(index) = id.parse::<usize>() {
            return match index.checked_sub(1).and_then(|i| records.get(i)) {
                Some(record) => Ok((image.with_tag(record.tag.as_str()), record.image_id.clone())),
                None => Err(not_found()),
            };
        }

        let repo_prefix = format!("{}:", image.repository);
        let tag = id.strip_prefix(repo_prefix.as_str()).unwrap_or(id);
        if let Some(record) = records.iter().find(|r| r.tag == tag) {
            return Ok((image.with_tag(tag), record.image_id.clone()));
        }
        if allow_any_tag && !tag.is_empty() && tag != image.tag {
            let candidate = image.with_tag(tag);
            match self
                .lifecycle
                .engine()
                .inspect_image(&candidate.to_string())
                .await
            {
                Ok(details) => return Ok((candidate, details.id)),
                Err(e) if matches!(kind_of(&e), Some(EnvkeepError::ImageNotFound { .. })) => {}
                Err(e) => return Err(e),
            }
        }
        Err(not_found())
    }

    /// Deletes one snapshot by tag or index.
    #[instrument(skip(self))]
    pub async fn delete_one(&self, identifier: &str, confirmed: bool) -> Result<ImageRef> {
        refuse_unconfirmed("backup delete", confirmed)?;
        let (target, _) = self.resolve(identifier, false).await?;
        self.lifecycle
            .engine()
            .remove_image(&target.to_string(), false)
            .await
            .with_context(|| format!("Failed to delete snapshot '{}'", target))?;
        info!("Deleted snapshot '{}'", target);
        Ok(target)
    }

    /// Deletes every snapshot, tolerating individual failures.
    #[instrument(skip(self))]
    pub async fn delete_all(&self, confirmed: bool) -> Result<RotationReport> {
        refuse_unconfirmed("backup delete --all", confirmed)?;
        let records = self.list().await?;
        Ok(self.remove_all(records.iter().rev()).await)
    }

    async fn remove_all(&self, records: impl Iterator<Item = &SnapshotRecord>) -> RotationReport {
        let mut report = RotationReport::default();
        for record in records {
            let reference = self.image().with_tag(record.tag.as_str()).to_string();
            match self.lifecycle.engine().remove_image(&reference, false).await {
                Ok(()) => {
                    info!("Deleted snapshot '{}'", reference);
                    report.removed.push(record.tag.clone());
                }
                Err(e) => {
                    warn!("Could not delete snapshot '{}': {:#}", reference, e);
                    report.failed.push((record.tag.clone(), format!("{:#}", e)));
                }
            }
        }
        report
    }

    /// Points the configured tag at a snapshot and restarts the container.
    ///
    /// 1. The current image is tagged `pre_restore_<ts>`. Failure aborts.
    /// 2. The snapshot is tagged over the configured tag.
    /// 3. The container is restarted.
    /// 4. The final status is reported.
    ///
    /// A failure in step 3 is reported through `RestoreOutcome::is_partial`; the
    /// tag swap is kept.
    ///
    /// # Errors
    ///
    /// * `ConfirmationRequired` if `confirmed` is false.
    /// * `SnapshotNotFound` if the identifier does not resolve.
    #[instrument(skip(self))]
    pub async fn restore(&self, identifier: &str, confirmed: bool) -> Result<RestoreOutcome> {
        refuse_unconfirmed("backup restore", confirmed)?;
        // Pinned by id: the safety tag below may reuse a name the target had.
        let (target, target_id) = self.resolve(identifier, true).await?;
        let engine = self.lifecycle.engine();
        let current = self.image();

        let safety = self
            .lifecycle
            .vacant_tag(current.pre_restore(&timestamp()))
            .await?;
        engine
            .tag_image(&current.to_string(), &safety.repository, &safety.tag)
            .await
            .with_context(|| {
                format!(
                    "Failed to tag '{}' as '{}'; restore aborted, nothing changed",
                    current, safety
                )
            })?;
        info!("Saved '{}' as '{}'", current, safety);

        engine
            .tag_image(&target_id, &current.repository, &current.tag)
            .await
            .with_context(|| {
                format!(
                    "Failed to point '{}' at '{}'; '{}' is unchanged",
                    current, target, current
                )
            })?;
        info!("'{}' now points at '{}'", current, target);

        let (restart, restart_error) = match self.lifecycle.restart().await {
            Ok(outcome) => (Some(outcome), None),
            Err(e) => {
                warn!(
                    "Restart after restore failed; '{}' stays on '{}': {:#}",
                    current, target, e
                );
                (None, Some(format!("{:#}", e)))
            }
        };
        let final_status = self.lifecycle.status().await.ok();

        Ok(RestoreOutcome {
            restored_from: target,
            safety,
            restart,
            restart_error,
            final_status,
        })
    }

    /// Snapshot then rotate to `backup.max_backups`, cleaning first when
    /// `backup.auto_clean` is set. Entry point for scheduled runs.
    #[instrument(skip(self), fields(container = %self.lifecycle.name()))]
    pub async fn auto_backup(&self) -> Result<AutoBackupReport> {
        let settings = &self.lifecycle.config().backup;
        let cleanup = if settings.auto_clean {
            match CleanupRunner::new(self.lifecycle).run().await {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!("Cleanup before backup failed, continuing: {:#}", e);
                    None
                }
            }
        } else {
            None
        };
        let created = self.create().await?;
        let rotation = self.rotate(settings.max_backups).await?;
        Ok(AutoBackupReport {
            cleanup,
            created,
            rotation,
        })
    }
}
