//! # Envkeep Environment Logs Handler
//!
//! File: cli/src/commands/env/logs.rs
//!
//! ## Overview
//!
//! `envkeep env logs` prints the container's log output verbatim, or the last
//! `--tail N` lines of it. With compose the combined service logs are shown.
//!
//! ```bash
//! envkeep env logs
//! envkeep env logs --tail 20
//! ```
//!
use crate::core::error::Result;
use crate::manager::context::Session;
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "Show the environment container's logs")]
pub struct LogsArgs {
    /// Only show the last N lines.
    #[arg(long, short = 'n', value_name = "N")]
    tail: Option<usize>,
}

pub async fn handle_logs(args: LogsArgs, session: &Session) -> Result<()> {
    info!("Handling env logs command...");
    debug!("Logs args: {:?}", args);

    let ctx = session.open().await?;
    let lifecycle = ctx.lifecycle();
    let output = match args.tail {
        Some(n) => lifecycle.logs_tail(n).await?,
        None => lifecycle.logs().await?,
    };
    print!("{}", output);
    if !output.is_empty() && !output.ends_with('\n') {
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logs_args_default_is_full_output() {
        let args = LogsArgs::try_parse_from(["logs"]).unwrap();
        assert_eq!(args.tail, None);
    }

    #[test]
    fn test_logs_args_tail() {
        let args = LogsArgs::try_parse_from(["logs", "--tail", "20"]).unwrap();
        assert_eq!(args.tail, Some(20));
        let args = LogsArgs::try_parse_from(["logs", "-n", "5"]).unwrap();
        assert_eq!(args.tail, Some(5));
        assert!(LogsArgs::try_parse_from(["logs", "--tail", "all"]).is_err());
    }
}
