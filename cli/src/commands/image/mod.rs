//! # Envkeep Image Commands (`commands::image`)
//!
//! File: cli/src/commands/image/mod.rs
//!
//! `envkeep image compact` flattens the environment image to reclaim the space
//! held by its layer history.
//!
use crate::core::error::Result;
use crate::manager::context::Session;
use clap::{Parser, Subcommand};

mod compact;

#[derive(Parser, Debug)]
pub struct ImageArgs {
    #[command(subcommand)]
    command: ImageCommand,
}

#[derive(Subcommand, Debug)]
enum ImageCommand {
    /// Flatten the image and restore its runtime metadata.
    Compact(compact::CompactArgs),
}

pub async fn handle_image(args: ImageArgs, session: &Session) -> Result<()> {
    match args.command {
        ImageCommand::Compact(args) => compact::handle_compact(args, session).await,
    }
}
