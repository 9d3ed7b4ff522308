//! # Envkeep Config Init Handler
//!
//! File: cli/src/commands/config/init.rs
//!
//! ## Overview
//!
//! `envkeep config init` writes a new environment descriptor after validating
//! it exactly as it will be loaded later.
//!
//! - Default: `<config dir>/environments/<NAME>.toml`, selected with `--env NAME`.
//! - `--project`: `./.envkeep.toml`, picked up from this directory and below.
//!
//! Only the given fields are written; everything else keeps its default, so
//! later changes to user settings still apply.
//!
//! ```bash
//! envkeep config init --name ml-dev --image ml-dev:latest
//! envkeep config init --name ml-dev --image ml-dev --compose-file docker-compose.yml --project
//! ```
//!
use crate::core::config::{self, ConfigLayer, PROJECT_CONFIG_FILENAME};
use crate::core::error::{EnvkeepError, Result};
use crate::manager::context::Session;
use anyhow::anyhow;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "Create an environment descriptor")]
pub struct InitArgs {
    /// Container name (also the descriptor name).
    #[arg(long)]
    name: String,

    /// Image reference the container runs, e.g. `ml-dev:latest`.
    #[arg(long)]
    image: String,

    /// Compose file managing the container.
    #[arg(long, value_name = "FILE")]
    compose_file: Option<String>,

    /// Build context directory for `envkeep env build`.
    #[arg(long, value_name = "DIR")]
    build_context: Option<String>,

    /// Write `.envkeep.toml` in the current directory instead.
    #[arg(long)]
    project: bool,

    /// Overwrite an existing descriptor.
    #[arg(long)]
    force: bool,
}

impl InitArgs {
    fn layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();
        layer.container.name = Some(self.name.clone());
        layer.container.image = Some(self.image.clone());
        layer.container.compose_file = self.compose_file.clone();
        layer.build.context = self.build_context.clone();
        layer
    }
}

pub fn handle_init(args: InitArgs, session: &Session) -> Result<()> {
    info!("Handling config init command...");
    debug!("Init args: {:?}", args);

    let target: PathBuf = if args.project {
        session.selector().cwd.join(PROJECT_CONFIG_FILENAME)
    } else {
        session.store().environment_path(&args.name)
    };
    if target.exists() && !args.force {
        return Err(anyhow!(EnvkeepError::ConfigInvalid(format!(
            "'{}' already exists (use --force to overwrite)",
            target.display()
        ))));
    }

    let layer = args.layer();
    layer.clone().resolve(Some(&target))?;
    config::save_layer(&target, &layer)?;

    println!("Wrote {}", target.display());
    if !args.project {
        println!("Select it with: envkeep --env {} ...", args.name);
    }
    Ok(())
}
