//! # Envkeep Environment Build Handler
//!
//! File: cli/src/commands/env/build.rs
//!
//! ## Overview
//!
//! `envkeep env build` builds `[build].context` / `[build].dockerfile` into the
//! configured image reference. Build output is streamed to the log at `info`
//! level (`-v`).
//!
//! When an image already exists under the configured reference, rebuilding
//! replaces it. In that case the command asks first and keeps the current
//! image as a `backup_<timestamp>` snapshot before building.
//!
use crate::common::ui::prompts;
use crate::core::error::Result;
use crate::manager::{builder::ImageBuilder, context::Session};
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "Build the environment image from its Dockerfile")]
pub struct BuildArgs {
    /// Build without the engine's layer cache.
    #[arg(long)]
    no_cache: bool,

    /// Do not ask for confirmation when the image already exists.
    #[arg(long, short = 'y')]
    yes: bool,
}

pub async fn handle_build(args: BuildArgs, session: &Session) -> Result<()> {
    info!("Handling env build command...");
    debug!("Build args: {:?}", args);

    let ctx = session.open().await?;
    let lifecycle = ctx.lifecycle();
    let builder = ImageBuilder::new(&lifecycle);

    let confirmed = if builder.replaces_image().await? {
        prompts::ask(
            &format!(
                "'{}' exists. Rebuild and replace it (the current image is kept as a snapshot)?",
                lifecycle.image()
            ),
            args.yes,
        )?
    } else {
        true
    };

    println!("Building '{}'...", lifecycle.image());
    let outcome = builder.build(args.no_cache, confirmed).await?;
    if let Some(backup) = &outcome.backup {
        println!("Previous image kept as '{}'.", backup);
    }
    println!("Built '{}'.", outcome.image);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args() {
        let args = BuildArgs::try_parse_from(["build"]).unwrap();
        assert!(!args.no_cache);
        assert!(!args.yes);
        let args = BuildArgs::try_parse_from(["build", "--no-cache", "--yes"]).unwrap();
        assert!(args.no_cache);
        assert!(args.yes);
    }
}
