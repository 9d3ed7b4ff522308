//! # Envkeep Build Context Archives (`common::archive::tar`)
//!
//! File: cli/src/common/archive/tar.rs
//!
//! ## Overview
//!
//! Packs a directory into an in-memory gzipped tarball, the form the Docker
//! build endpoint accepts as a build context. Used for `env build` (the
//! environment's own Dockerfile) and for the metadata rebuild step of image
//! compaction (a temporary directory holding one generated Dockerfile).
//!
//! Paths inside the archive are relative to the directory root, so
//! `<dir>/Dockerfile` is stored as `./Dockerfile`.
//!
use crate::core::error::Result;
use anyhow::Context;
use flate2::{write::GzEncoder, Compression};
use std::path::Path;
use tracing::debug;

/// Creates a gzipped tar of everything under `context_path`.
///
/// # Errors
///
/// Returns an error if the directory cannot be read or the archive cannot be
/// finalized.
pub fn create_context_tar(context_path: &Path) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut builder = tar::Builder::new(GzEncoder::new(&mut bytes, Compression::default()));
    builder.follow_symlinks(false);

    builder
        .append_dir_all(".", context_path)
        .with_context(|| {
            format!(
                "Failed to add '{}' to the build context archive",
                context_path.display()
            )
        })?;

    builder
        .into_inner()
        .context("Failed to finalize tar archive")?
        .finish()
        .context("Failed to finish gzip stream")?;

    debug!(
        "Packed build context '{}' ({} bytes)",
        context_path.display(),
        bytes.len()
    );
    Ok(bytes)
}
