//! # Envkeep Backup Delete Handler
//!
//! File: cli/src/commands/backup/delete.rs
//!
//! ## Overview
//!
//! `envkeep backup delete <ID>` removes one snapshot. `ID` is a snapshot tag
//! (`backup_20240301_120000`, optionally with the repository prefix) or its
//! number in `envkeep backup list`. `--all` removes every snapshot.
//!
//! Both forms ask for confirmation unless `--yes` is given.
//!
use crate::commands::report;
use crate::common::ui::prompts;
use crate::core::error::Result;
use crate::manager::{context::Session, snapshots::SnapshotStore};
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "Delete a snapshot by tag or list number, or all snapshots")]
pub struct DeleteArgs {
    /// Snapshot tag or number from `backup list`.
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    id: Option<String>,

    /// Delete every snapshot.
    #[arg(long)]
    all: bool,

    /// Do not ask for confirmation.
    #[arg(long, short = 'y')]
    yes: bool,
}

pub async fn handle_delete(args: DeleteArgs, session: &Session) -> Result<()> {
    info!("Handling backup delete command...");
    debug!("Delete args: {:?}", args);

    let ctx = session.open().await?;
    let lifecycle = ctx.lifecycle();
    let store = SnapshotStore::new(&lifecycle);
    let repository = &lifecycle.image().repository;

    match args.id.as_deref() {
        Some(id) => {
            let confirmed =
                prompts::ask(&format!("Delete snapshot '{}' of '{}'?", id, repository), args.yes)?;
            let deleted = store.delete_one(id, confirmed).await?;
            println!("Deleted snapshot '{}'.", deleted);
        }
        None => {
            let confirmed =
                prompts::ask(&format!("Delete ALL snapshots of '{}'?", repository), args.yes)?;
            let report = store.delete_all(confirmed).await?;
            report::print_rotation(&report);
        }
    }
    Ok(())
}
