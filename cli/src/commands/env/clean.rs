//! # Envkeep Environment Clean Handler
//!
//! File: cli/src/commands/env/clean.rs
//!
//! ## Overview
//!
//! `envkeep env clean` removes caches and temporary files inside the running
//! container according to the configured `[cleanup]` lists. Paths under an
//! exclude entry are never touched; they are listed as kept.
//!
use crate::commands::report;
use crate::core::error::Result;
use crate::manager::{cleanup::CleanupRunner, context::Session};
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "Remove caches and temporary files inside the running container")]
pub struct CleanArgs {}

pub async fn handle_clean(args: CleanArgs, session: &Session) -> Result<()> {
    info!("Handling env clean command...");
    debug!("Clean args: {:?}", args);

    let ctx = session.open().await?;
    let lifecycle = ctx.lifecycle();
    let cleanup = CleanupRunner::new(&lifecycle).run().await?;
    report::print_cleanup(&cleanup);
    Ok(())
}
