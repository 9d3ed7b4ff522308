//! # Envkeep Backup Commands (`commands::backup`)
//!
//! File: cli/src/commands/backup/mod.rs
//!
//! ## Overview
//!
//! `envkeep backup ...` manages snapshots: images tagged
//! `<repository>:backup_<timestamp>`. The engine is the only record of them, so
//! every subcommand starts from a fresh listing.
//!
//! - `list`: snapshots, newest first, numbered from 1.
//! - `create`: commit the running container as a new snapshot.
//! - `rotate [--keep N]`: delete all but the newest N.
//! - `delete <ID>` / `delete --all`: remove snapshots by tag or list number.
//! - `restore <ID>`: make a snapshot the current image and restart.
//! - `auto`: create then rotate, for cron.
//!
use crate::core::error::Result;
use crate::manager::context::Session;
use clap::{Parser, Subcommand};

mod auto;
mod create;
mod delete;
mod list;
mod restore;
mod rotate;

#[derive(Parser, Debug)]
pub struct BackupArgs {
    #[command(subcommand)]
    command: BackupCommand,
}

#[derive(Subcommand, Debug)]
enum BackupCommand {
    /// List snapshots, newest first.
    #[command(alias = "ls")]
    List(list::ListArgs),
    /// Snapshot the running container.
    Create(create::CreateArgs),
    /// Delete all but the newest snapshots.
    Rotate(rotate::RotateArgs),
    /// Delete one snapshot, or all of them.
    #[command(alias = "rm")]
    Delete(delete::DeleteArgs),
    /// Make a snapshot the current image.
    Restore(restore::RestoreArgs),
    /// Scheduled backup: create, then rotate.
    Auto(auto::AutoArgs),
}

pub async fn handle_backup(args: BackupArgs, session: &Session) -> Result<()> {
    match args.command {
        BackupCommand::List(args) => list::handle_list(args, session).await,
        BackupCommand::Create(args) => create::handle_create(args, session).await,
        BackupCommand::Rotate(args) => rotate::handle_rotate(args, session).await,
        BackupCommand::Delete(args) => delete::handle_delete(args, session).await,
        BackupCommand::Restore(args) => restore::handle_restore(args, session).await,
        BackupCommand::Auto(args) => auto::handle_auto(args, session).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Parser, Debug)]
    struct Wrapper {
        #[command(subcommand)]
        command: BackupCommand,
    }

    #[test]
    fn test_aliases() {
        assert!(matches!(
            Wrapper::try_parse_from(["backup", "ls"]).unwrap().command,
            BackupCommand::List(_)
        ));
        assert!(matches!(
            Wrapper::try_parse_from(["backup", "rm", "2"]).unwrap().command,
            BackupCommand::Delete(_)
        ));
    }
}
