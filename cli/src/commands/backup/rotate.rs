//! # Envkeep Backup Rotate Handler
//!
//! File: cli/src/commands/backup/rotate.rs
//!
//! `envkeep backup rotate` deletes every snapshot beyond the newest N, oldest
//! first. N defaults to `backup.max_backups`. A snapshot the engine refuses to
//! delete (e.g. still used by a container) is reported and skipped.
//!
use crate::commands::report;
use crate::core::error::Result;
use crate::manager::{context::Session, snapshots::SnapshotStore};
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "Delete all but the newest snapshots")]
pub struct RotateArgs {
    /// Number of snapshots to keep, at least 1 [default: backup.max_backups].
    #[arg(long, short = 'k', value_name = "N", value_parser = parse_keep)]
    keep: Option<usize>,
}

/// Same lower bound as `backup.max_backups`; `backup delete --all` removes everything.
fn parse_keep(raw: &str) -> std::result::Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err(
            "must be at least 1 (use `backup delete --all` to remove every snapshot)".to_string(),
        ),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

pub async fn handle_rotate(args: RotateArgs, session: &Session) -> Result<()> {
    info!("Handling backup rotate command...");
    debug!("Rotate args: {:?}", args);

    let ctx = session.open().await?;
    let keep = args.keep.unwrap_or(ctx.config().backup.max_backups);
    let lifecycle = ctx.lifecycle();
    let rotation = SnapshotStore::new(&lifecycle).rotate(keep).await?;
    report::print_rotation(&rotation);
    Ok(())
}
