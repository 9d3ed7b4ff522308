//! # Envkeep Docker Module (`common::docker`)
//!
//! File: cli/src/common/docker/mod.rs
//!
//! ## Overview
//!
//! Everything envkeep knows about talking to the container engine and to the
//! compose CLI. The rest of the crate only sees two traits:
//!
//! - [`engine::Engine`]: the engine verbs (build, run, stop, restart, remove,
//!   commit, tag, list, inspect, flatten, exec, logs, ping).
//! - [`compose::Supervisor`]: compose `up -d` / `down` / `logs`.
//!
//! ## Architecture
//!
//! - **`connect`**: client construction and health check.
//! - **`state`**: container status queries.
//! - **`images`**: image inspect, list, tag and remove.
//! - **`lifecycle`**: container create/run/start/stop/restart/remove.
//! - **`operations`**: build, commit and flatten (export piped into import).
//! - **`interaction`**: exec with captured output, container logs.
//! - **`engine`**: the `Engine` trait, its engine-agnostic types, and
//!   `DockerEngine`, which delegates to the modules above.
//! - **`compose`**: the `Supervisor` trait and the `ComposeCli` implementation.
//!
pub mod compose;
pub mod connect;
pub mod engine;
pub mod images;
pub mod interaction;
pub mod lifecycle;
pub mod operations;
pub mod state;

pub use compose::{ComposeCli, Supervisor};
pub use engine::{ContainerInfo, ContainerStatus, DockerEngine, Engine, ExecOutput, ImageDetails, ImageSummary};
