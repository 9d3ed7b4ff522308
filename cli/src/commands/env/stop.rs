//! # Envkeep Environment Stop Handler
//!
//! File: cli/src/commands/env/stop.rs
//!
//! ## Overview
//!
//! `envkeep env stop` stops the environment container. With compose the stack is
//! taken `down` and the command waits until the container is gone; otherwise the
//! engine stop verb is used with `lifecycle.stop_timeout_secs` before a kill.
//! Stopping an absent or already stopped container succeeds.
//!
use crate::core::error::Result;
use crate::manager::{context::Session, lifecycle::StopOutcome};
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "Stop the environment container")]
pub struct StopArgs {}

pub async fn handle_stop(args: StopArgs, session: &Session) -> Result<()> {
    info!("Handling env stop command...");
    debug!("Stop args: {:?}", args);

    let ctx = session.open().await?;
    let lifecycle = ctx.lifecycle();
    match lifecycle.stop().await? {
        StopOutcome::AlreadyStopped => println!("Container '{}' is not running.", lifecycle.name()),
        StopOutcome::Stopped => println!("Container '{}' stopped.", lifecycle.name()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_args_parse() {
        assert!(StopArgs::try_parse_from(["stop"]).is_ok());
        assert!(StopArgs::try_parse_from(["stop", "--time", "3"]).is_err());
    }
}
