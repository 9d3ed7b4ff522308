//! # Envkeep Main Entry Point
//!
//! File: cli/src/main.rs
//!
//! ## Overview
//!
//! Entry point for the `envkeep` CLI, which manages one Docker-based
//! development environment: its container lifecycle, snapshot images, image
//! compaction and in-container cleanup.
//!
//! This file:
//! - parses the command line with Clap,
//! - sets up logging from `-v` (or `RUST_LOG`),
//! - wires Ctrl-C to the cancellation token polled by long waits,
//! - routes to the command handlers and reports their errors.
//!
//! ## Examples
//!
//! ```bash
//! envkeep config init --name ml-dev --image ml-dev:latest
//! envkeep --env ml-dev env start
//! envkeep -v --env ml-dev env save --clean
//! envkeep --env ml-dev backup list
//! ```
//!
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod common;
mod core;
mod manager;

use crate::manager::context::Session;

#[derive(Parser, Debug)]
#[command(
    name = "envkeep",
    about = "Lifecycle, snapshots and compaction for a Docker development environment",
    long_about = "Start, stop and restart a development container, save its state as images,\n\
                  roll back to snapshots, and compact its image.",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Named environment to operate on [default: nearest .envkeep.toml].
    #[arg(long, short = 'e', global = true, env = "ENVKEEP_ENV")]
    env: Option<String>,

    /// Directory holding user settings and named environments.
    #[arg(long, global = true, env = "ENVKEEP_CONFIG_DIR", value_name = "DIR")]
    config_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Container lifecycle, save, clean and build.
    Env(commands::env::EnvArgs),
    /// Snapshot images.
    #[command(alias = "b")]
    Backup(commands::backup::BackupArgs),
    /// Image compaction.
    Image(commands::image::ImageArgs),
    /// Environment descriptors.
    Config(commands::config::ConfigArgs),
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

async fn run(cli: Cli, cancel: CancellationToken) -> anyhow::Result<()> {
    let session = Session::new(cli.config_dir, cli.env, cancel)?;
    match cli.command {
        Commands::Env(args) => commands::env::handle_env(args, &session).await,
        Commands::Backup(args) => commands::backup::handle_backup(args, &session).await,
        Commands::Image(args) => commands::image::handle_image(args, &session).await,
        Commands::Config(args) => commands::config::handle_config(args, &session).await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; cancelling");
            on_interrupt.cancel();
        }
    });

    if let Err(e) = run(cli, cancel).await {
        tracing::error!("Command execution failed: {:?}", e);
        eprintln!("Error: {}", e);
        for cause in e.chain().skip(1) {
            eprintln!("  caused by: {}", cause);
        }
        std::process::exit(1);
    }

    Ok(())
}
