//! # Envkeep Backup Restore Handler
//!
//! File: cli/src/commands/backup/restore.rs
//!
//! ## Overview
//!
//! `envkeep backup restore <ID>` makes a snapshot the current image: the image
//! the configured tag pointed at is kept as `pre_restore_<timestamp>`, the tag
//! is moved to the snapshot, and the container is restarted from it.
//!
//! `ID` is a snapshot tag or list number. Any other existing tag of the
//! repository is accepted too, so a restore can be undone by restoring its
//! `pre_restore_*` tag.
//!
//! If the restart fails the tag stays moved; the command reports the failure,
//! exits non-zero, and prints the command that reverts the restore.
//!
use crate::common::ui::prompts;
use crate::core::error::Result;
use crate::manager::{
    context::Session,
    snapshots::{RestoreOutcome, SnapshotStore},
};
use anyhow::bail;
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "Make a snapshot the current image and restart")]
pub struct RestoreArgs {
    /// Snapshot tag or number from `backup list`.
    id: String,

    /// Do not ask for confirmation.
    #[arg(long, short = 'y')]
    yes: bool,
}

fn revert_hint(outcome: &RestoreOutcome) -> String {
    format!("envkeep backup restore {} --yes", outcome.safety.tag)
}

pub async fn handle_restore(args: RestoreArgs, session: &Session) -> Result<()> {
    info!("Handling backup restore command...");
    debug!("Restore args: {:?}", args);

    let ctx = session.open().await?;
    let lifecycle = ctx.lifecycle();
    let confirmed = prompts::ask(
        &format!(
            "Replace '{}' with snapshot '{}'? The container will be restarted.",
            lifecycle.image(),
            args.id
        ),
        args.yes,
    )?;
    let outcome = SnapshotStore::new(&lifecycle)
        .restore(&args.id, confirmed)
        .await?;

    println!("Previous image kept as '{}'.", outcome.safety);
    println!(
        "'{}' now points at '{}'.",
        lifecycle.image(),
        outcome.restored_from
    );
    if let Some(status) = outcome.final_status {
        println!("Container '{}' is {}.", lifecycle.name(), status);
    }
    if let Some(error) = &outcome.restart_error {
        println!("The container did not restart cleanly. To revert, run:");
        println!("  {}", revert_hint(&outcome));
        bail!("Restore incomplete: {}", error);
    }
    Ok(())
}
