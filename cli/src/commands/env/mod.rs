//! # Envkeep Environment Commands (`commands::env`)
//!
//! File: cli/src/commands/env/mod.rs
//!
//! ## Overview
//!
//! `envkeep env ...` drives the environment container itself:
//!
//! - `start` / `stop` / `restart`: bring the container to a target state and wait.
//! - `status`: container state, image and snapshot count.
//! - `logs [--tail N]`: container (or compose) logs.
//! - `save [--clean] [--yes]`: commit the running container over the configured
//!   image, keeping the previous image as a snapshot.
//! - `clean`: remove caches and temporary files inside the running container.
//! - `build [--no-cache] [--yes]`: build the image from its Dockerfile.
//!
//! Each subcommand lives in its own file with a `*Args` struct and a
//! `handle_*` function; this module only routes.
//!
use crate::core::error::Result;
use crate::manager::context::Session;
use clap::{Parser, Subcommand};

mod build;
mod clean;
mod logs;
mod restart;
mod save;
mod start;
mod status;
mod stop;

#[derive(Parser, Debug)]
pub struct EnvArgs {
    #[command(subcommand)]
    command: EnvCommand,
}

#[derive(Subcommand, Debug)]
enum EnvCommand {
    /// Start the container and wait until it runs.
    Start(start::StartArgs),
    /// Stop the container.
    Stop(stop::StopArgs),
    /// Restart the container, recreating it if the image changed.
    Restart(restart::RestartArgs),
    /// Show container status.
    Status(status::StatusArgs),
    /// Show container logs.
    Logs(logs::LogsArgs),
    /// Commit the running container as the new current image.
    Save(save::SaveArgs),
    /// Remove caches and temporary files inside the container.
    Clean(clean::CleanArgs),
    /// Build the image from its Dockerfile.
    Build(build::BuildArgs),
}

pub async fn handle_env(args: EnvArgs, session: &Session) -> Result<()> {
    match args.command {
        EnvCommand::Start(args) => start::handle_start(args, session).await,
        EnvCommand::Stop(args) => stop::handle_stop(args, session).await,
        EnvCommand::Restart(args) => restart::handle_restart(args, session).await,
        EnvCommand::Status(args) => status::handle_status(args, session).await,
        EnvCommand::Logs(args) => logs::handle_logs(args, session).await,
        EnvCommand::Save(args) => save::handle_save(args, session).await,
        EnvCommand::Clean(args) => clean::handle_clean(args, session).await,
        EnvCommand::Build(args) => build::handle_build(args, session).await,
    }
}
