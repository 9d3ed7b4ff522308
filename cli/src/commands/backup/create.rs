//! # Envkeep Backup Create Handler
//!
//! File: cli/src/commands/backup/create.rs
//!
//! `envkeep backup create` commits the running container as
//! `<repository>:backup_<timestamp>`. The current image is not touched.
//!
use crate::core::error::Result;
use crate::manager::{context::Session, snapshots::SnapshotStore};
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "Snapshot the running container")]
pub struct CreateArgs {}

pub async fn handle_create(args: CreateArgs, session: &Session) -> Result<()> {
    info!("Handling backup create command...");
    debug!("Create args: {:?}", args);

    let ctx = session.open().await?;
    let lifecycle = ctx.lifecycle();
    let created = SnapshotStore::new(&lifecycle).create().await?;
    println!("Created snapshot '{}'.", created);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_args_parse() {
        assert!(CreateArgs::try_parse_from(["create"]).is_ok());
    }
}
