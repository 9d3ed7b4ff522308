//! # Envkeep Docker Container State Utilities
//!
//! File: cli/src/common/docker/state.rs
//!
//! ## Overview
//!
//! Queries the state of a container by name. A missing container is a normal
//! answer here (`ContainerStatus::Absent`), not an error: lifecycle operations
//! branch on it.
//!
//! ## Architecture
//!
//! - `container_info` inspects the container and maps bollard's
//!   `ContainerStateStatusEnum` onto `ContainerStatus`. HTTP 404 maps to `Absent`.
//! - `map_status` is the pure mapping, kept separate so it can be unit tested.
//!
use super::engine::{ContainerInfo, ContainerStatus};
use crate::core::error::{EnvkeepError, Result};
use anyhow::anyhow;
use bollard::{
    container::InspectContainerOptions,
    models::{ContainerInspectResponse, ContainerStateStatusEnum},
    Docker,
};
use tracing::{debug, error, instrument};

/// Inspects `name` and reports its status and image id.
///
/// # Returns
///
/// * `Ok(ContainerInfo)` with `ContainerStatus::Absent` when the engine answers 404.
///
/// # Errors
///
/// Returns `EnvkeepError::DockerApi` for any other engine failure.
#[instrument(skip(docker), fields(container = %name))]
pub async fn container_info(docker: &Docker, name: &str) -> Result<ContainerInfo> {
    match docker
        .inspect_container(name, None::<InspectContainerOptions>)
        .await
    {
        Ok(details) => {
            let info = to_container_info(details);
            debug!("Container '{}' status: {}", name, info.status);
            Ok(info)
        }
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        }) => {
            debug!("Container '{}' does not exist (404).", name);
            Ok(ContainerInfo::absent())
        }
        Err(e) => {
            error!("Failed to inspect container '{}': {:?}", name, e);
            Err(anyhow!(EnvkeepError::DockerApi { source: e })
                .context(format!("Failed to inspect container '{}'", name)))
        }
    }
}

fn to_container_info(details: ContainerInspectResponse) -> ContainerInfo {
    let status = details
        .state
        .and_then(|s| s.status)
        .map(map_status)
        .unwrap_or(ContainerStatus::Created);
    ContainerInfo {
        status,
        image_id: details.image,
    }
}

/// Maps the engine's state enum onto envkeep's status.
pub fn map_status(status: ContainerStateStatusEnum) -> ContainerStatus {
    match status {
        ContainerStateStatusEnum::RUNNING => ContainerStatus::Running,
        ContainerStateStatusEnum::PAUSED => ContainerStatus::Paused,
        ContainerStateStatusEnum::RESTARTING => ContainerStatus::Restarting,
        ContainerStateStatusEnum::REMOVING => ContainerStatus::Removing,
        ContainerStateStatusEnum::EXITED => ContainerStatus::Exited,
        ContainerStateStatusEnum::DEAD => ContainerStatus::Dead,
        ContainerStateStatusEnum::CREATED | ContainerStateStatusEnum::EMPTY => {
            ContainerStatus::Created
        }
    }
}
