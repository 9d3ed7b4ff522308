//! # Envkeep Scheduled Backup Handler
//!
//! File: cli/src/commands/backup/auto.rs
//!
//! ## Overview
//!
//! `envkeep backup auto` is the entry point for a scheduler: it snapshots the
//! running container (cleaning it first when `backup.auto_clean` is set) and
//! rotates down to `backup.max_backups`. It never prompts.
//!
//! A crontab line matching the default `backup.schedule`:
//!
//! ```text
//! 0 0 * * * envkeep --env ml-dev backup auto
//! ```
//!
use crate::commands::report;
use crate::core::error::Result;
use crate::manager::{context::Session, snapshots::SnapshotStore};
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "Create a snapshot and rotate old ones (for cron)")]
pub struct AutoArgs {}

pub async fn handle_auto(args: AutoArgs, session: &Session) -> Result<()> {
    info!("Handling backup auto command...");
    debug!("Auto args: {:?}", args);

    let ctx = session.open().await?;
    let lifecycle = ctx.lifecycle();
    let auto = SnapshotStore::new(&lifecycle).auto_backup().await?;
    if let Some(cleanup) = &auto.cleanup {
        report::print_cleanup(cleanup);
    }
    println!("Created snapshot '{}'.", auto.created);
    report::print_rotation(&auto.rotation);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_args_parse() {
        assert!(AutoArgs::try_parse_from(["auto"]).is_ok());
    }
}
