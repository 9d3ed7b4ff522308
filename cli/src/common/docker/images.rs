//! # Envkeep Docker Image Utilities
//!
//! File: cli/src/common/docker/images.rs
//!
//! ## Overview
//!
//! Image-level verbs: inspect, list by reference pattern, tag and remove.
//!
//! ## Architecture
//!
//! Every function takes the shared `&Docker` handle and maps bollard's HTTP
//! status codes onto envkeep error kinds:
//! - 404 → `EnvkeepError::ImageNotFound`
//! - anything else → `EnvkeepError::DockerApi` with context
//!
//! Results are converted into the engine-agnostic `ImageSummary` / `ImageDetails`
//! views from `engine.rs`.
//!
use super::engine::{ImageDetails, ImageSummary};
use crate::core::error::{EnvkeepError, Result};
use anyhow::anyhow;
use bollard::{
    image::{ListImagesOptions, RemoveImageOptions, TagImageOptions},
    models::ImageInspect,
    Docker,
};
use std::collections::HashMap;
use tracing::{debug, error, info, instrument, warn};

fn not_found_or_api(reference: &str, action: &str, e: bollard::errors::Error) -> anyhow::Error {
    match e {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        } => {
            warn!("{} failed because image '{}' was not found.", action, reference);
            anyhow!(EnvkeepError::ImageNotFound {
                name: reference.to_string()
            })
        }
        _ => {
            error!("{} of image '{}' failed: {:?}", action, reference, e);
            anyhow!(EnvkeepError::DockerApi { source: e })
                .context(format!("{} of image '{}' failed", action, reference))
        }
    }
}

/// Inspects an image by reference or id.
///
/// # Errors
///
/// * `EnvkeepError::ImageNotFound` when the engine answers 404.
#[instrument(skip(docker), fields(image = %reference))]
pub async fn inspect_image(docker: &Docker, reference: &str) -> Result<ImageDetails> {
    debug!("Inspecting image: {}", reference);
    let inspect = docker
        .inspect_image(reference)
        .await
        .map_err(|e| not_found_or_api(reference, "Inspection", e))?;
    Ok(to_details(inspect))
}

fn to_details(inspect: ImageInspect) -> ImageDetails {
    let config = inspect.config;
    ImageDetails {
        id: inspect.id.unwrap_or_default(),
        size: inspect.size.unwrap_or_default(),
        cmd: config.as_ref().and_then(|c| c.cmd.clone()),
        entrypoint: config.as_ref().and_then(|c| c.entrypoint.clone()),
        working_dir: config.as_ref().and_then(|c| c.working_dir.clone()),
        env: config.and_then(|c| c.env),
    }
}

/// Lists images whose reference matches `reference` (glob patterns allowed in the
/// tag part, e.g. `my-env:backup_*`).
#[instrument(skip(docker))]
pub async fn list_images(docker: &Docker, reference: &str) -> Result<Vec<ImageSummary>> {
    let mut filters = HashMap::new();
    filters.insert("reference".to_string(), vec![reference.to_string()]);
    let options = Some(ListImagesOptions::<String> {
        all: false,
        filters,
        ..Default::default()
    });
    info!("Listing images matching '{}'...", reference);
    let images = docker.list_images(options).await.map_err(|e| {
        anyhow!(EnvkeepError::DockerApi { source: e }).context("Failed to list images")
    })?;
    Ok(images
        .into_iter()
        .map(|img| ImageSummary {
            id: img.id,
            repo_tags: img.repo_tags,
            created: img.created,
            size: img.size,
        })
        .collect())
}

/// Points `repository:tag` at `source`. An existing mapping for the target is replaced.
///
/// # Errors
///
/// * `EnvkeepError::ImageNotFound` if `source` does not exist.
#[instrument(skip(docker), fields(image = %source))]
pub async fn tag_image(docker: &Docker, source: &str, repository: &str, tag: &str) -> Result<()> {
    info!("Tagging '{}' as '{}:{}'", source, repository, tag);
    let options = Some(TagImageOptions {
        repo: repository.to_string(),
        tag: tag.to_string(),
    });
    docker
        .tag_image(source, options)
        .await
        .map_err(|e| not_found_or_api(source, "Tagging", e))
}

/// Removes an image reference. When the image carries other tags only this
/// reference is untagged.
///
/// # Errors
///
/// * `EnvkeepError::ImageNotFound` when the reference does not exist.
/// * `EnvkeepError::DockerApi` on conflicts (409), e.g. the image backs a container.
#[instrument(skip(docker, force), fields(image = %reference))]
pub async fn remove_image(docker: &Docker, reference: &str, force: bool) -> Result<()> {
    info!("Removing image '{}' (Force: {})...", reference, force);
    let options = Some(RemoveImageOptions {
        force,
        noprune: false,
    });
    match docker.remove_image(reference, options, None).await {
        Ok(results) => {
            for result in results {
                if let Some(deleted) = result.deleted {
                    debug!("Deleted: {}", deleted);
                }
                if let Some(untagged) = result.untagged {
                    debug!("Untagged: {}", untagged);
                }
            }
            Ok(())
        }
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 409,
            message,
        }) => {
            error!("Conflict removing image '{}': {}", reference, message);
            Err(anyhow!(EnvkeepError::DockerApi {
                source: bollard::errors::Error::DockerResponseServerError {
                    status_code: 409,
                    message,
                }
            })
            .context(format!(
                "Image '{}' is in use by a container and cannot be removed",
                reference
            )))
        }
        Err(e) => Err(not_found_or_api(reference, "Removal", e)),
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_details_reads_runtime_config() {
        let inspect: ImageInspect = serde_json::from_value(serde_json::json!({
            "Id": "sha256:1",
            "Size": 2048,
            "Config": {
                "Cmd": ["python", "app.py"],
                "WorkingDir": "/workspace",
                "Env": ["FOO=bar"]
            }
        }))
        .expect("valid inspect payload");
        let details = to_details(inspect);
        assert_eq!(details.size, 2048);
        assert_eq!(details.cmd, Some(vec!["python".to_string(), "app.py".to_string()]));
        assert_eq!(details.entrypoint, None);
        assert_eq!(details.working_dir.as_deref(), Some("/workspace"));
    }

    #[test]
    fn test_to_details_without_config() {
        let details = to_details(ImageInspect::default());
        assert_eq!(details, ImageDetails::default());
    }

    #[test]
    fn test_404_maps_to_image_not_found() {
        let err = not_found_or_api(
            "env:latest",
            "Inspection",
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message: "No such image".into(),
            },
        );
        assert!(matches!(
            err.downcast_ref::<EnvkeepError>(),
            Some(EnvkeepError::ImageNotFound { .. })
        ));
    }
}
