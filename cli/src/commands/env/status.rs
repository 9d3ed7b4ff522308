//! # Envkeep Environment Status Handler
//!
//! File: cli/src/commands/env/status.rs
//!
//! ## Overview
//!
//! `envkeep env status` prints what the engine reports about the environment:
//! container state, configured image, control path, and the snapshot count.
//! An absent container is a valid state and not an error.
//!
use crate::core::error::Result;
use crate::manager::{context::Session, snapshots::SnapshotStore};
use clap::Parser;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(about = "Show the environment container's status")]
pub struct StatusArgs {}

pub async fn handle_status(args: StatusArgs, session: &Session) -> Result<()> {
    info!("Handling env status command...");
    debug!("Status args: {:?}", args);

    let ctx = session.open().await?;
    let lifecycle = ctx.lifecycle();
    let config = ctx.config();
    let status = lifecycle.status().await?;

    println!("--- Environment: {} ---", config.name);
    println!("  Status:     {}", status);
    println!("  Image:      {}", config.image);
    match &config.compose_file {
        Some(file) => println!("  Managed by: compose ({})", file.display()),
        None => println!("  Managed by: engine"),
    }
    match SnapshotStore::new(&lifecycle).list().await {
        Ok(snapshots) => match snapshots.first() {
            Some(newest) => println!(
                "  Snapshots:  {} (newest {}, keep {})",
                snapshots.len(),
                newest.tag,
                config.backup.max_backups
            ),
            None => println!("  Snapshots:  none"),
        },
        Err(e) => warn!("Could not list snapshots: {:#}", e),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_args_parse() {
        assert!(StatusArgs::try_parse_from(["status"]).is_ok());
    }
}
