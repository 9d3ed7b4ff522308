//! # Envkeep Docker Image Operations
//!
//! File: cli/src/common/docker/operations.rs
//!
//! ## Overview
//!
//! Operations that produce images:
//! - **`build_image`**: builds a directory into a tag. The directory is packed into
//!   an in-memory gzipped tarball (`common::archive::tar`) and streamed to the
//!   daemon; build output is collected so a failure can be surfaced together with
//!   the engine's build log.
//! - **`commit_container`**: snapshots a container's filesystem as `repository:tag`.
//! - **`flatten_container`**: the export/import round trip. The container
//!   filesystem is streamed out of the engine and piped into `docker import -`,
//!   producing a single-layer image without history or metadata.
//!
use crate::common::archive::tar::create_context_tar;
use crate::common::process;
use crate::core::error::{EnvkeepError, Result};
use anyhow::{anyhow, Context};
use bollard::{
    container::Config as ContainerConfig,
    image::{BuildImageOptions, CommitContainerOptions},
    models::BuildInfo,
    Docker,
};
use futures_util::stream::StreamExt;
use std::path::Path;
use tracing::{debug, error, info, instrument};

/// Builds the image described by `dockerfile` inside `context_dir` and tags it `tag`.
///
/// # Arguments
///
/// * `context_dir` - Directory sent as the build context.
/// * `dockerfile` - Path of the Dockerfile relative to `context_dir`.
/// * `tag` - `repository:tag` for the result.
/// * `no_cache` - Disable the build cache.
///
/// # Errors
///
/// * `EnvkeepError::BuildFailure` when the daemon reports a build error; the
///   message carries every output line received up to that point.
/// * Context errors if the build context cannot be packed.
#[instrument(skip(docker, context_dir, dockerfile))]
pub async fn build_image(
    docker: &Docker,
    context_dir: &Path,
    dockerfile: &str,
    tag: &str,
    no_cache: bool,
) -> Result<()> {
    info!(
        "Creating build context tarball for '{}'...",
        context_dir.display()
    );
    let tar_gz =
        create_context_tar(context_dir).context("Failed to create build context tarball")?;

    let build_options = BuildImageOptions {
        dockerfile: dockerfile.to_string(),
        t: tag.to_string(),
        rm: true,
        nocache: no_cache,
        ..Default::default()
    };
    info!("Starting image build for tag: {}", tag);
    let mut build_stream = docker.build_image(build_options, None, Some(tar_gz.into()));

    let mut log = String::new();
    while let Some(build_result) = build_stream.next().await {
        match build_result {
            Ok(BuildInfo {
                error: Some(err),
                error_detail,
                ..
            }) => {
                let detail = error_detail.and_then(|d| d.message).unwrap_or_default();
                error!("Build Error: {} - {}", err, detail);
                let message = if detail.is_empty() || detail == err {
                    err
                } else {
                    format!("{} ({})", err, detail)
                };
                return Err(anyhow!(EnvkeepError::BuildFailure {
                    tag: tag.to_string(),
                    message,
                    log,
                }));
            }
            Ok(BuildInfo {
                stream: Some(s), ..
            }) => {
                debug!("{}", s.trim_end());
                log.push_str(&s);
            }
            Ok(BuildInfo {
                status: Some(s), ..
            }) => {
                debug!("Build Status: {}", s);
            }
            Ok(other) => debug!("Received unhandled build info: {:?}", other),
            Err(e) => {
                error!("Build stream for '{}' failed: {:?}", tag, e);
                return Err(anyhow!(EnvkeepError::BuildFailure {
                    tag: tag.to_string(),
                    message: e.to_string(),
                    log,
                }));
            }
        }
    }
    info!("Image build finished successfully for tag: {}", tag);
    Ok(())
}

/// Commits the current filesystem of `container` as `repository:tag`.
///
/// The container is paused for the duration of the commit.
#[instrument(skip(docker), fields(container = %container))]
pub async fn commit_container(
    docker: &Docker,
    container: &str,
    repository: &str,
    tag: &str,
) -> Result<()> {
    info!("Committing '{}' as '{}:{}'", container, repository, tag);
    let options = CommitContainerOptions {
        container: container.to_string(),
        repo: repository.to_string(),
        tag: tag.to_string(),
        pause: true,
        ..Default::default()
    };
    let commit = docker
        .commit_container(options, ContainerConfig::<String>::default())
        .await
        .map_err(|e| {
            anyhow!(EnvkeepError::DockerApi { source: e })
                .context(format!("Failed to commit container '{}'", container))
        })?;
    debug!("Commit produced image {:?}", commit.id);
    Ok(())
}

/// Flattens the filesystem of container `id` into the single-layer image
/// `repository:tag` (`docker export <id> | docker import - <ref>`).
///
/// The export stream from the engine API is fed chunk by chunk into the
/// `docker import -` CLI; bollard's `/images/create` only takes a complete
/// in-memory body, which does not fit multi-gigabyte filesystems.
///
/// # Errors
///
/// * `EnvkeepError::DockerApi` when the export stream fails.
/// * `EnvkeepError::ExternalCommand` when `docker import` exits non-zero.
#[instrument(skip(docker), fields(container = %id))]
pub async fn flatten_container(docker: &Docker, id: &str, repository: &str, tag: &str) -> Result<()> {
    let target = format!("{}:{}", repository, tag);
    info!("Flattening container {} into '{}'", id, target);
    let export = docker.export_container(id).map(|chunk| {
        chunk.map_err(|e| {
            anyhow!(EnvkeepError::DockerApi { source: e })
                .context(format!("Failed to export container '{}'", id))
        })
    });
    let (bytes, output) = process::run_piped("docker", &["import", "-", &target], export)
        .await
        .with_context(|| format!("Failed to import '{}'", target))?;
    debug!(
        "Imported {} bytes as '{}' ({})",
        bytes,
        target,
        output.stdout.trim()
    );
    Ok(())
}
