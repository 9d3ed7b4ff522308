//! # Envkeep Config Set Handler
//!
//! File: cli/src/commands/config/set.rs
//!
//! ## Overview
//!
//! `envkeep config set <KEY> <VALUE>` changes one field of the selected
//! environment's descriptor (or of the user settings with `--user`). Keys are
//! `section.field` as shown by `envkeep config show`. List values are
//! comma-separated; an empty value removes the field so the default applies.
//!
//! The edited environment is validated before the file is written.
//!
//! ```bash
//! envkeep config set backup.max_backups 3
//! envkeep config set cleanup.exclude "/workspace/,/root/.ssh/"
//! envkeep config set --user lifecycle.startup_timeout_secs 60
//! ```
//!
use crate::core::config::{self, ConfigLayer};
use crate::core::error::Result;
use crate::manager::context::Session;
use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "Change one configuration field")]
pub struct SetArgs {
    /// Field to change, e.g. `backup.max_backups`.
    key: String,

    /// New value; empty to remove the field.
    value: String,

    /// Edit the user settings instead of the selected environment.
    #[arg(long)]
    user: bool,
}

pub fn handle_set(args: SetArgs, session: &Session) -> Result<()> {
    info!("Handling config set command...");
    debug!("Set args: {:?}", args);

    let store = session.store();
    let path = if args.user {
        store.user_settings_path()
    } else {
        store.environment_file(session.selector())?
    };
    let mut layer = if path.is_file() {
        config::load_layer(&path)?
    } else {
        ConfigLayer::default()
    };
    layer.set(&args.key, &args.value)?;

    if args.user {
        // User settings alone are incomplete; check them against the selected
        // environment when there is one.
        if let Ok(env_path) = store.environment_file(session.selector()) {
            let mut merged = layer.clone();
            merged.merge(config::load_layer(&env_path)?);
            merged
                .resolve(Some(&env_path))
                .context("The selected environment would become invalid")?;
        }
    } else {
        let mut merged = if store.user_settings_path().is_file() {
            config::load_layer(&store.user_settings_path())?
        } else {
            ConfigLayer::default()
        };
        merged.merge(layer.clone());
        merged.resolve(Some(&path))?;
    }

    config::save_layer(&path, &layer)?;
    println!("Set {} in {}", args.key, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::load_layer;
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;

    fn named_session(dir: &std::path::Path) -> Session {
        let session = Session::new(
            Some(dir.to_path_buf()),
            Some("ml-dev".to_string()),
            CancellationToken::new(),
        )
        .unwrap();
        let mut layer = ConfigLayer::default();
        layer.container.name = Some("ml-dev".into());
        layer.container.image = Some("ml-dev".into());
        config::save_layer(&session.store().environment_path("ml-dev"), &layer).unwrap();
        session
    }

    #[test]
    fn test_set_updates_descriptor() {
        let dir = tempdir().unwrap();
        let session = named_session(dir.path());
        let args = SetArgs::try_parse_from(["set", "backup.max_backups", "3"]).unwrap();
        handle_set(args, &session).unwrap();
        let layer = load_layer(&session.store().environment_path("ml-dev")).unwrap();
        assert_eq!(layer.backup.max_backups, Some(3));
        assert_eq!(session.load_config().unwrap().backup.max_backups, 3);
    }

    #[test]
    fn test_invalid_value_leaves_file_alone() {
        let dir = tempdir().unwrap();
        let session = named_session(dir.path());
        let args = SetArgs::try_parse_from(["set", "backup.max_backups", "0"]).unwrap();
        assert!(handle_set(args, &session).is_err());
        let layer = load_layer(&session.store().environment_path("ml-dev")).unwrap();
        assert_eq!(layer.backup.max_backups, None);
    }

    #[test]
    fn test_set_user_settings() {
        let dir = tempdir().unwrap();
        let session = named_session(dir.path());
        let args = SetArgs::try_parse_from([
            "set",
            "--user",
            "lifecycle.startup_timeout_secs",
            "90",
        ])
        .unwrap();
        handle_set(args, &session).unwrap();
        assert_eq!(
            session.load_config().unwrap().lifecycle.startup_timeout.as_secs(),
            90
        );
    }
}
