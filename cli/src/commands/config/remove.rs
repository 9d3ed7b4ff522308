//! # Envkeep Config Remove Handler
//!
//! File: cli/src/commands/config/remove.rs
//!
//! `envkeep config remove <NAME>` deletes a named environment descriptor. The
//! container and its images are not touched.
//!
use crate::common::ui::prompts;
use crate::core::error::Result;
use crate::manager::context::Session;
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "Delete a named environment descriptor")]
pub struct RemoveArgs {
    /// Environment name as shown by `config list`.
    name: String,

    /// Do not ask for confirmation.
    #[arg(long, short = 'y')]
    yes: bool,
}

pub fn handle_remove(args: RemoveArgs, session: &Session) -> Result<()> {
    info!("Handling config remove command...");
    debug!("Remove args: {:?}", args);

    prompts::require(
        &format!("Delete environment descriptor '{}'?", args.name),
        args.yes,
        "config remove",
    )?;
    session.store().remove_environment(&args.name)?;
    println!("Removed environment '{}'.", args.name);
    Ok(())
}
