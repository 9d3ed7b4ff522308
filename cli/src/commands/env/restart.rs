//! # Envkeep Environment Restart Handler
//!
//! File: cli/src/commands/env/restart.rs
//!
//! ## Overview
//!
//! `envkeep env restart` restarts the environment container and waits until it
//! runs again. When the configured image now points at a different image than
//! the one the container was created from (after `env save` or `backup restore`),
//! the container is recreated so the new image is actually used.
//!
use crate::core::error::Result;
use crate::manager::{context::Session, lifecycle::RestartOutcome};
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "Restart the environment container")]
pub struct RestartArgs {}

pub async fn handle_restart(args: RestartArgs, session: &Session) -> Result<()> {
    info!("Handling env restart command...");
    debug!("Restart args: {:?}", args);

    let ctx = session.open().await?;
    let lifecycle = ctx.lifecycle();
    match lifecycle.restart().await? {
        RestartOutcome::NotPresent => println!(
            "Container '{}' does not exist; nothing to restart. Use 'envkeep env start'.",
            lifecycle.name()
        ),
        RestartOutcome::Restarted => println!("Container '{}' restarted.", lifecycle.name()),
        RestartOutcome::Recreated => println!(
            "Container '{}' recreated from '{}'.",
            lifecycle.name(),
            lifecycle.image()
        ),
    }
    Ok(())
}
