//! # Envkeep Config Show Handler
//!
//! File: cli/src/commands/config/show.rs
//!
//! `envkeep config show` prints the selected environment after merging user
//! settings and filling defaults, i.e. exactly what the other commands use.
//!
use crate::core::config::EnvironmentConfig;
use crate::core::error::Result;
use crate::manager::context::Session;
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "Print the resolved configuration of the selected environment")]
pub struct ShowArgs {}

fn render(config: &EnvironmentConfig) -> String {
    let mut out = String::new();
    let mut line = |key: &str, value: String| out.push_str(&format!("{:<30} {}\n", key, value));
    if let Some(origin) = &config.origin {
        line("source", origin.display().to_string());
    }
    line("container.name", config.name.clone());
    line("container.image", config.image.to_string());
    line(
        "container.compose_file",
        config
            .compose_file
            .as_ref()
            .map_or_else(|| "-".to_string(), |p| p.display().to_string()),
    );
    match &config.build {
        Some(build) => {
            line("build.context", build.context.display().to_string());
            line("build.dockerfile", build.dockerfile.clone());
        }
        None => line("build.context", "-".to_string()),
    }
    line("cleanup.include", config.cleanup.include.join(", "));
    line("cleanup.exclude", config.cleanup.exclude.join(", "));
    line("backup.max_backups", config.backup.max_backups.to_string());
    line("backup.auto_clean", config.backup.auto_clean.to_string());
    line("backup.schedule", config.backup.schedule.clone());
    let lifecycle = &config.lifecycle;
    line(
        "lifecycle.startup_timeout_secs",
        lifecycle.startup_timeout.as_secs().to_string(),
    );
    line(
        "lifecycle.poll_interval_ms",
        lifecycle.poll_interval.as_millis().to_string(),
    );
    line(
        "lifecycle.stop_timeout_secs",
        lifecycle.stop_timeout_secs.to_string(),
    );
    line("lifecycle.log_tail_lines", lifecycle.log_tail_lines.to_string());
    out
}

pub fn handle_show(args: ShowArgs, session: &Session) -> Result<()> {
    info!("Handling config show command...");
    debug!("Show args: {:?}", args);

    let config = session.load_config()?;
    print!("{}", render(&config));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ConfigLayer;

    #[test]
    fn test_render_shows_defaults() {
        let mut layer = ConfigLayer::default();
        layer.container.name = Some("ml-dev".into());
        layer.container.image = Some("ml-dev".into());
        let text = render(&layer.resolve(None).unwrap());
        assert!(text.contains("container.image                ml-dev:latest\n"));
        assert!(text.contains("backup.max_backups             5\n"));
        assert!(text.contains("container.compose_file         -\n"));
        assert!(!text.contains("source"));
    }
}
