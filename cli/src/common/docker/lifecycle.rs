//! # Envkeep Docker Container Lifecycle Verbs
//!
//! File: cli/src/common/docker/lifecycle.rs
//!
//! ## Overview
//!
//! Raw container verbs against the Docker API: create/run, start, stop, restart
//! and remove. These functions issue a single engine call each and translate
//! status codes; they do not wait for a target state. Waiting and the choice
//! between compose and direct control live in `crate::manager::lifecycle`.
//!
//! ## Status code handling
//!
//! | Verb    | 304                 | 404                      |
//! |---------|---------------------|--------------------------|
//! | start   | already running: ok | API error                |
//! | stop    | already stopped: ok | already gone: ok         |
//! | remove  | n/a                 | already gone: ok         |
//! | create  | n/a                 | `ImageNotFound`          |
//!
use crate::core::error::{EnvkeepError, Result};
use anyhow::anyhow;
use bollard::{
    container::{
        Config as ContainerConfig, CreateContainerOptions, RemoveContainerOptions,
        RestartContainerOptions, StartContainerOptions, StopContainerOptions,
    },
    Docker,
};
use tracing::{debug, error, info, instrument, warn};

fn api_error(e: bollard::errors::Error, what: String) -> anyhow::Error {
    anyhow!(EnvkeepError::DockerApi { source: e }).context(what)
}

/// Creates a container from `image` without starting it and returns its id.
///
/// When `name` is `None` the engine picks a random name.
///
/// # Errors
///
/// * `EnvkeepError::ImageNotFound` if the image is not present locally. No pull
///   is attempted.
#[instrument(skip(docker))]
async fn create_named(docker: &Docker, image: &str, name: Option<&str>) -> Result<String> {
    let options = name.map(|n| CreateContainerOptions {
        name: n.to_string(),
        platform: None,
    });
    let config = ContainerConfig {
        image: Some(image.to_string()),
        ..Default::default()
    };
    match docker.create_container(options, config).await {
        Ok(response) => {
            for warning in &response.warnings {
                warn!("Engine warning while creating container: {}", warning);
            }
            debug!("Created container {} from '{}'", response.id, image);
            Ok(response.id)
        }
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        }) => Err(anyhow!(EnvkeepError::ImageNotFound {
            name: image.to_string()
        })),
        Err(e) => Err(api_error(
            e,
            format!("Failed to create container from image '{}'", image),
        )),
    }
}

/// Creates an unnamed, stopped container from `image`. Used as the source of a
/// filesystem export.
pub async fn create_container(docker: &Docker, image: &str) -> Result<String> {
    create_named(docker, image, None).await
}

/// Equivalent of `docker run -d --name <name> <image>`.
///
/// # Errors
///
/// * `EnvkeepError::ImageNotFound` if the image is missing locally.
#[instrument(skip(docker), fields(container = %name))]
pub async fn run_container(docker: &Docker, image: &str, name: &str) -> Result<()> {
    info!("Creating container '{}' from image '{}'", name, image);
    create_named(docker, image, Some(name)).await?;
    info!("Starting container '{}'", name);
    docker
        .start_container(name, None::<StartContainerOptions<String>>)
        .await
        .map_err(|e| api_error(e, format!("Failed to start container '{}'", name)))
}

/// Starts an existing container. Already running is success.
#[instrument(skip(docker), fields(container = %name))]
pub async fn start_container(docker: &Docker, name: &str) -> Result<()> {
    info!("Attempting to start container '{}'...", name);
    match docker
        .start_container(name, None::<StartContainerOptions<String>>)
        .await
    {
        Ok(_) => Ok(()),
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 304, ..
        }) => {
            info!("Container '{}' was already started.", name);
            Ok(())
        }
        Err(e) => {
            error!("Failed to start container '{}': {:?}", name, e);
            Err(api_error(e, format!("Failed to start container '{}'", name)))
        }
    }
}

/// Stops a container. A container that is already stopped or no longer exists
/// counts as stopped.
#[instrument(skip(docker), fields(container = %name))]
pub async fn stop_container(docker: &Docker, name: &str, timeout_secs: Option<u32>) -> Result<()> {
    let options = timeout_secs.map(|t| StopContainerOptions { t: i64::from(t) });
    info!(
        "Attempting to stop container '{}' (Timeout: {} seconds)...",
        name,
        timeout_secs.map_or_else(|| "default".to_string(), |t| t.to_string())
    );
    match docker.stop_container(name, options).await {
        Ok(_) => {
            info!("Container '{}' stopped.", name);
            Ok(())
        }
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 304, ..
        }) => {
            info!("Container '{}' was already stopped.", name);
            Ok(())
        }
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        }) => {
            info!("Container '{}' not found after stop; treating as stopped.", name);
            Ok(())
        }
        Err(e) => {
            error!("Failed to stop container '{}': {:?}", name, e);
            Err(api_error(e, format!("Failed to stop container '{}'", name)))
        }
    }
}

/// Restarts a container in place (same container, same image).
#[instrument(skip(docker), fields(container = %name))]
pub async fn restart_container(docker: &Docker, name: &str) -> Result<()> {
    info!("Restarting container '{}'...", name);
    docker
        .restart_container(name, None::<RestartContainerOptions>)
        .await
        .map_err(|e| api_error(e, format!("Failed to restart container '{}'", name)))
}

/// Removes a container. A missing container is success.
#[instrument(skip(docker), fields(container = %name_or_id))]
pub async fn remove_container(docker: &Docker, name_or_id: &str, force: bool) -> Result<()> {
    info!("Removing container '{}' (Force: {})...", name_or_id, force);
    let options = Some(RemoveContainerOptions {
        force,
        v: false,
        link: false,
    });
    match docker.remove_container(name_or_id, options).await {
        Ok(_) => Ok(()),
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        }) => {
            debug!("Container '{}' already gone.", name_or_id);
            Ok(())
        }
        Err(e) => {
            error!("Failed to remove container '{}': {:?}", name_or_id, e);
            Err(api_error(
                e,
                format!("Failed to remove container '{}'", name_or_id),
            ))
        }
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    /// Requires a running Docker daemon and never pulls.
    #[tokio::test]
    #[ignore]
    async fn test_run_missing_image_is_image_not_found() {
        let docker = crate::common::docker::connect::connect_docker().unwrap();
        let err = run_container(&docker, "envkeep-does-not-exist:nope", "envkeep-test-missing")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EnvkeepError>(),
            Some(EnvkeepError::ImageNotFound { .. })
        ));
    }

    /// Requires a running Docker daemon.
    #[tokio::test]
    #[ignore]
    async fn test_stop_and_remove_missing_container_succeed() {
        let docker = crate::common::docker::connect::connect_docker().unwrap();
        assert!(stop_container(&docker, "envkeep-test-absent", Some(1)).await.is_ok());
        assert!(remove_container(&docker, "envkeep-test-absent", true).await.is_ok());
    }
}
