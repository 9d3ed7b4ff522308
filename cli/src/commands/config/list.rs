//! # Envkeep Config List Handler
//!
//! File: cli/src/commands/config/list.rs
//!
//! `envkeep config list` prints the named environments in the config directory
//! and the project descriptor that applies to the current directory, if any.
//!
use crate::core::config::find_project_config;
use crate::core::error::Result;
use crate::manager::context::Session;
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "List configured environments")]
pub struct ListArgs {}

pub fn handle_list(args: ListArgs, session: &Session) -> Result<()> {
    info!("Handling config list command...");
    debug!("List args: {:?}", args);

    let names = session.store().list_environments()?;
    if names.is_empty() {
        println!("No named environments in {}.", session.store().root().display());
    } else {
        let selected = session.selector().name.as_deref();
        for name in names {
            let marker = if selected == Some(name.as_str()) { "*" } else { " " };
            println!("{} {}", marker, name);
        }
    }
    if let Some(project) = find_project_config(&session.selector().cwd) {
        println!("Project: {}", project.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_args_parse() {
        assert!(ListArgs::try_parse_from(["list"]).is_ok());
    }
}
