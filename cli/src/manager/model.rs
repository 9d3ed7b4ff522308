//! # Envkeep Domain Model (`manager::model`)
//!
//! File: cli/src/manager/model.rs
//!
//! ## Overview
//!
//! Value types shared by the lifecycle, snapshot, compaction and cleanup
//! components:
//!
//! - `ImageRef`: a `(repository, tag)` pair and the tag conventions built on it
//!   (`latest`, `backup_<ts>`, `pre_restore_<ts>`, `compressed`,
//!   `compressed_with_metadata`).
//! - `SnapshotRecord`: a derived view over one `repository:backup_*` image.
//! - `RuntimeMetadata`: the CMD/ENTRYPOINT/WORKDIR/ENV an image needs to behave
//!   the same after flattening.
//! - `CleanupPolicy`: include/exclude path lists and the effective deletion set.
//!
use crate::common::docker::ImageDetails;
use crate::core::error::{EnvkeepError, Result};
use anyhow::anyhow;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const LATEST_TAG: &str = "latest";
pub const BACKUP_PREFIX: &str = "backup_";
pub const PRE_RESTORE_PREFIX: &str = "pre_restore_";
pub const COMPRESSED_TAG: &str = "compressed";
pub const COMPRESSED_WITH_METADATA_TAG: &str = "compressed_with_metadata";

/// Timestamp suffix used in snapshot tags, e.g. `20240131_235959`.
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// An image reference split into repository and tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    pub repository: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        ImageRef {
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Parses `repo[:tag]`; the tag defaults to `latest`. A colon inside a
    /// registry host (`host:5000/repo`) is not mistaken for a tag separator.
    ///
    /// # Errors
    ///
    /// `EnvkeepError::ConfigInvalid` for empty parts or digest references.
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.contains('@') {
            return Err(anyhow!(EnvkeepError::ConfigInvalid(format!(
                "image '{}' must be referenced by tag, not digest",
                reference
            ))));
        }
        let last_slash = reference.rfind('/').map_or(0, |i| i + 1);
        let (repository, tag) = match reference[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                (&reference[..split], &reference[split + 1..])
            }
            None => (reference, LATEST_TAG),
        };
        if repository.is_empty() || tag.is_empty() {
            return Err(anyhow!(EnvkeepError::ConfigInvalid(format!(
                "image reference '{}' needs a repository and a tag",
                reference
            ))));
        }
        Ok(ImageRef::new(repository, tag))
    }

    /// Same repository, different tag.
    pub fn with_tag(&self, tag: impl Into<String>) -> ImageRef {
        ImageRef::new(self.repository.clone(), tag)
    }

    pub fn latest(&self) -> ImageRef {
        self.with_tag(LATEST_TAG)
    }

    pub fn backup(&self, ts: &str) -> ImageRef {
        self.with_tag(format!("{}{}", BACKUP_PREFIX, ts))
    }

    pub fn pre_restore(&self, ts: &str) -> ImageRef {
        self.with_tag(format!("{}{}", PRE_RESTORE_PREFIX, ts))
    }

    /// Reference filter matching every snapshot of this repository.
    pub fn backup_filter(&self) -> String {
        format!("{}:{}*", self.repository, BACKUP_PREFIX)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// One snapshot, as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    /// Tag only (e.g. `backup_20240101_120000`), without the repository.
    pub tag: String,
    pub image_id: String,
    /// Image creation time from the engine metadata.
    pub created: DateTime<Utc>,
    pub size: i64,
}

/// Runtime settings carried over a flatten round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeMetadata {
    pub cmd: Vec<String>,
    pub entrypoint: Vec<String>,
    pub working_dir: String,
    pub env: Vec<String>,
}

impl RuntimeMetadata {
    pub fn default_cmd() -> Vec<String> {
        vec!["/start_service.sh".to_string()]
    }

    pub fn default_entrypoint() -> Vec<String> {
        vec!["/bin/bash".to_string(), "-c".to_string()]
    }

    pub fn default_working_dir() -> String {
        "/workspace".to_string()
    }

    /// Captures metadata from an inspected image, substituting defaults for
    /// anything absent or empty.
    pub fn capture(details: &ImageDetails) -> Self {
        fn non_empty(v: &Option<Vec<String>>) -> Option<Vec<String>> {
            v.as_ref().filter(|items| !items.is_empty()).cloned()
        }
        RuntimeMetadata {
            cmd: non_empty(&details.cmd).unwrap_or_else(Self::default_cmd),
            entrypoint: non_empty(&details.entrypoint).unwrap_or_else(Self::default_entrypoint),
            working_dir: details
                .working_dir
                .as_ref()
                .filter(|w| !w.trim().is_empty())
                .cloned()
                .unwrap_or_else(Self::default_working_dir),
            env: details.env.clone().unwrap_or_default(),
        }
    }
}

/// Paths removed by cleanup and paths that must survive it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CleanupPolicy {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

/// Why an include path was left out of the deletion set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPath {
    pub path: String,
    pub excluded_by: String,
}

const GLOB_CHARS: &[char] = &['*', '?', '['];

fn trimmed(path: &str) -> &str {
    let t = path.trim_end_matches('/');
    if t.is_empty() {
        "/"
    } else {
        t
    }
}

/// `true` when `path` equals `base` or lies underneath it.
fn is_within(path: &str, base: &str) -> bool {
    let (p, b) = (trimmed(path), trimmed(base));
    p == b || b == "/" || p.starts_with(&format!("{}/", b))
}

/// The literal directory a glob pattern expands inside, e.g. `/var/log/` for
/// `/var/log/*.log`. `None` when `path` has no glob characters.
fn glob_root(path: &str) -> Option<&str> {
    let first = path.find(GLOB_CHARS)?;
    let slash = path[..first].rfind('/')?;
    Some(&path[..=slash])
}

impl CleanupPolicy {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        CleanupPolicy { include, exclude }
    }

    /// The exclude entry that protects `path` from deletion, if any.
    ///
    /// An include path is protected when it is string-prefixed by an exclude
    /// path, lies inside one, contains one (deleting it would delete the excluded
    /// path too), or is a glob whose expansion directory contains one.
    pub fn excluded_by(&self, path: &str) -> Option<&str> {
        self.exclude
            .iter()
            .find(|ex| {
                path.starts_with(ex.as_str())
                    || is_within(path, ex)
                    || is_within(ex, path)
                    || glob_root(path).is_some_and(|root| is_within(ex, root))
            })
            .map(String::as_str)
    }

    /// Include paths minus anything protected by an exclude path, in include
    /// order, without duplicates.
    pub fn effective_paths(&self) -> (Vec<String>, Vec<SkippedPath>) {
        let mut keep: Vec<String> = Vec::new();
        let mut skipped = Vec::new();
        for path in &self.include {
            match self.excluded_by(path) {
                Some(ex) => skipped.push(SkippedPath {
                    path: path.clone(),
                    excluded_by: ex.to_string(),
                }),
                None if !keep.contains(path) => keep.push(path.clone()),
                None => {}
            }
        }
        (keep, skipped)
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_by(path).is_some()
    }
}
