//! # Envkeep Environment Start Handler
//!
//! File: cli/src/commands/env/start.rs
//!
//! ## Overview
//!
//! `envkeep env start` brings the environment container to `running`, through
//! compose when a compose file is configured and through the engine otherwise,
//! then waits for it. A container that exits during startup fails the command
//! with the tail of its log.
//!
//! ```bash
//! envkeep env start
//! envkeep --env ml-dev env start
//! ```
//!
use crate::core::error::Result;
use crate::manager::{context::Session, lifecycle::StartOutcome};
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "Start the environment container and wait until it is running")]
pub struct StartArgs {}

pub async fn handle_start(args: StartArgs, session: &Session) -> Result<()> {
    info!("Handling env start command...");
    debug!("Start args: {:?}", args);

    let ctx = session.open().await?;
    let lifecycle = ctx.lifecycle();
    match lifecycle.start().await? {
        StartOutcome::AlreadyRunning => {
            println!("Container '{}' is already running.", lifecycle.name())
        }
        StartOutcome::Started => println!(
            "Container '{}' is running ({}).",
            lifecycle.name(),
            lifecycle.image()
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_takes_no_arguments() {
        assert!(StartArgs::try_parse_from(["start"]).is_ok());
        assert!(StartArgs::try_parse_from(["start", "extra"]).is_err());
    }
}
