//! # Envkeep Configuration Commands (`commands::config`)
//!
//! File: cli/src/commands/config/mod.rs
//!
//! ## Overview
//!
//! `envkeep config ...` manages environment descriptors without touching the
//! engine:
//!
//! - `init`: write a new descriptor (named, or `.envkeep.toml` with `--project`).
//! - `show`: print the resolved configuration of the selected environment.
//! - `set <KEY> <VALUE>`: change one field of the selected descriptor.
//! - `list`: named environments and the project file in effect, if any.
//! - `remove <NAME>`: delete a named descriptor.
//!
use crate::core::error::Result;
use crate::manager::context::Session;
use clap::{Parser, Subcommand};

mod init;
mod list;
mod remove;
mod set;
mod show;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Create an environment descriptor.
    Init(init::InitArgs),
    /// Print the resolved configuration.
    Show(show::ShowArgs),
    /// Change one configuration field.
    Set(set::SetArgs),
    /// List configured environments.
    #[command(alias = "ls")]
    List(list::ListArgs),
    /// Delete a named environment descriptor.
    #[command(alias = "rm")]
    Remove(remove::RemoveArgs),
}

pub async fn handle_config(args: ConfigArgs, session: &Session) -> Result<()> {
    match args.command {
        ConfigCommand::Init(args) => init::handle_init(args, session),
        ConfigCommand::Show(args) => show::handle_show(args, session),
        ConfigCommand::Set(args) => set::handle_set(args, session),
        ConfigCommand::List(args) => list::handle_list(args, session),
        ConfigCommand::Remove(args) => remove::handle_remove(args, session),
    }
}
