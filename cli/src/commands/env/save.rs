//! # Envkeep Environment Save Handler
//!
//! File: cli/src/commands/env/save.rs
//!
//! ## Overview
//!
//! `envkeep env save` turns the running container into the new current image.
//! The image it replaces is first kept as `backup_<timestamp>`, then the
//! container is committed over the configured reference and restarted so it
//! runs from the saved image.
//!
//! With `--clean`, in-container caches are removed before the commit. A failing
//! cleanup is reported but does not stop the save.
//!
//! ```bash
//! envkeep env save --clean
//! envkeep env save --yes    # no prompt, for scripts
//! ```
//!
use crate::commands::report;
use crate::common::ui::prompts;
use crate::core::error::Result;
use crate::manager::context::Session;
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "Commit the running container as the new current image")]
pub struct SaveArgs {
    /// Remove caches and temporary files inside the container first.
    #[arg(long)]
    clean: bool,

    /// Do not ask for confirmation.
    #[arg(long, short = 'y')]
    yes: bool,
}

pub async fn handle_save(args: SaveArgs, session: &Session) -> Result<()> {
    info!("Handling env save command...");
    debug!("Save args: {:?}", args);

    let ctx = session.open().await?;
    let lifecycle = ctx.lifecycle();
    let confirmed = prompts::ask(
        &format!(
            "Replace '{}' with the current state of container '{}'?",
            lifecycle.image(),
            lifecycle.name()
        ),
        args.yes,
    )?;
    let outcome = lifecycle.save_as_image(args.clean, confirmed).await?;

    if let Some(cleanup) = &outcome.cleanup {
        report::print_cleanup(cleanup);
    }
    println!("Previous image kept as '{}'.", outcome.backup);
    println!(
        "Saved '{}' as '{}' ({}).",
        lifecycle.name(),
        lifecycle.image(),
        report::describe_restart(outcome.restart)
    );
    Ok(())
}
