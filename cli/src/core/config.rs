//! # Envkeep Configuration System
//!
//! File: cli/src/core/config.rs
//!
//! ## Overview
//!
//! Loads, merges, validates and persists environment descriptors. The result of
//! loading is one immutable `EnvironmentConfig` per invocation; every component
//! receives it explicitly.
//!
//! ## Architecture
//!
//! Configuration lives in TOML *layers* (`ConfigLayer`). Every field of a layer is
//! optional, so a layer only says what it overrides. Layers are combined with a
//! typed, per-section merge (`ConfigLayer::merge`, later layer wins per field) and
//! the merged layer is resolved exactly once (`ConfigLayer::resolve`): defaults are
//! filled in, `~` is expanded, relative paths are anchored at the descriptor's
//! directory and the whole thing is validated. Nothing downstream re-defaults.
//!
//! Layer sources, lowest precedence first:
//! 1. User settings: `<config dir>/config.toml`
//! 2. The selected environment, either
//!    - a named descriptor `<config dir>/environments/<name>.toml` (`--env NAME`), or
//!    - the nearest `.envkeep.toml` in the current directory or its ancestors
//!      (the search stops at a directory containing `.git`).
//!
//! `<config dir>` is the platform config directory for envkeep
//! (`~/.config/envkeep` on Linux) unless `--config-dir` / `ENVKEEP_CONFIG_DIR`
//! points elsewhere.
//!
//! ## Examples
//!
//! ```toml
//! [container]
//! name = "ml-dev"
//! image = "ml-dev:latest"
//! compose_file = "docker-compose.yml"
//!
//! [cleanup]
//! include = ["/tmp/*", "/root/.cache/pip/"]
//! exclude = ["/workspace/"]
//!
//! [backup]
//! max_backups = 3
//! ```
//!
use crate::core::error::{EnvkeepError, Result};
use crate::manager::model::{CleanupPolicy, ImageRef};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info};

pub const PROJECT_CONFIG_FILENAME: &str = ".envkeep.toml";
const USER_CONFIG_FILENAME: &str = "config.toml";
const ENVIRONMENTS_DIR: &str = "environments";

// --- Defaults ---

pub fn default_cleanup_include() -> Vec<String> {
    [
        "/var/cache/apt/",
        "/root/.cache/pip/",
        "/root/.cache/huggingface/",
        "/tmp/*",
        "/var/log/*.log",
        "/var/log/*.gz",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn default_cleanup_exclude() -> Vec<String> {
    [
        "/root/.cursor/",
        "/root/.config/cursor/",
        "/etc/ssh/",
        "/root/.ssh/",
        "/workspace/",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

const DEFAULT_MAX_BACKUPS: usize = 5;
const DEFAULT_SCHEDULE: &str = "0 0 * * *";
const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_STOP_TIMEOUT_SECS: u32 = 10;
const DEFAULT_LOG_TAIL_LINES: usize = 50;
const DEFAULT_DOCKERFILE: &str = "Dockerfile";

// --- Resolved configuration ---

/// Fully resolved, validated configuration for one environment.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentConfig {
    /// Container name.
    pub name: String,
    /// The image the container runs; its tag is the "current" state.
    pub image: ImageRef,
    pub compose_file: Option<PathBuf>,
    pub build: Option<BuildSettings>,
    pub cleanup: CleanupPolicy,
    pub backup: BackupSettings,
    pub lifecycle: LifecycleSettings,
    /// File the environment descriptor was read from.
    pub origin: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    pub context: PathBuf,
    pub dockerfile: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSettings {
    pub max_backups: usize,
    pub auto_clean: bool,
    /// Cron expression for an external scheduler calling `envkeep backup auto`.
    pub schedule: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    pub startup_timeout: Duration,
    pub poll_interval: Duration,
    pub stop_timeout_secs: u32,
    pub log_tail_lines: usize,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        LifecycleSettings {
            startup_timeout: Duration::from_secs(DEFAULT_STARTUP_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            stop_timeout_secs: DEFAULT_STOP_TIMEOUT_SECS,
            log_tail_lines: DEFAULT_LOG_TAIL_LINES,
        }
    }
}

// --- Layers (on-disk form) ---

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// One TOML file's worth of settings. Absent fields inherit from lower layers.
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(default, skip_serializing_if = "is_default")]
    pub container: ContainerLayer,
    #[serde(default, skip_serializing_if = "is_default")]
    pub build: BuildLayer,
    #[serde(default, skip_serializing_if = "is_default")]
    pub cleanup: CleanupLayer,
    #[serde(default, skip_serializing_if = "is_default")]
    pub backup: BackupLayer,
    #[serde(default, skip_serializing_if = "is_default")]
    pub lifecycle: LifecycleLayer,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ContainerLayer {
    pub name: Option<String>,
    pub image: Option<String>,
    pub compose_file: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BuildLayer {
    pub context: Option<String>,
    pub dockerfile: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CleanupLayer {
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BackupLayer {
    pub max_backups: Option<usize>,
    pub auto_clean: Option<bool>,
    pub schedule: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LifecycleLayer {
    pub startup_timeout_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub stop_timeout_secs: Option<u32>,
    pub log_tail_lines: Option<usize>,
}

fn take_over<T>(base: &mut Option<T>, over: Option<T>) {
    if over.is_some() {
        *base = over;
    }
}

impl ContainerLayer {
    fn merge(&mut self, over: ContainerLayer) {
        take_over(&mut self.name, over.name);
        take_over(&mut self.image, over.image);
        take_over(&mut self.compose_file, over.compose_file);
    }
}

impl BuildLayer {
    fn merge(&mut self, over: BuildLayer) {
        take_over(&mut self.context, over.context);
        take_over(&mut self.dockerfile, over.dockerfile);
    }
}

impl CleanupLayer {
    fn merge(&mut self, over: CleanupLayer) {
        take_over(&mut self.include, over.include);
        take_over(&mut self.exclude, over.exclude);
    }
}

impl BackupLayer {
    fn merge(&mut self, over: BackupLayer) {
        take_over(&mut self.max_backups, over.max_backups);
        take_over(&mut self.auto_clean, over.auto_clean);
        take_over(&mut self.schedule, over.schedule);
    }
}

impl LifecycleLayer {
    fn merge(&mut self, over: LifecycleLayer) {
        take_over(&mut self.startup_timeout_secs, over.startup_timeout_secs);
        take_over(&mut self.poll_interval_ms, over.poll_interval_ms);
        take_over(&mut self.stop_timeout_secs, over.stop_timeout_secs);
        take_over(&mut self.log_tail_lines, over.log_tail_lines);
    }
}

fn invalid(msg: String) -> anyhow::Error {
    anyhow!(EnvkeepError::ConfigInvalid(msg))
}

/// Docker container name rule: `[a-zA-Z0-9][a-zA-Z0-9_.-]*`.
fn validate_container_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_first = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid_first && valid_rest {
        Ok(())
    } else {
        Err(invalid(format!(
            "container name '{}' must match [a-zA-Z0-9][a-zA-Z0-9_.-]*",
            name
        )))
    }
}

/// Cleanup paths end up in a shell command; only plain absolute paths with
/// glob characters are accepted.
fn validate_cleanup_path(path: &str) -> Result<()> {
    const FORBIDDEN: &[char] = &[
        ';', '&', '|', '$', '`', '\'', '"', '<', '>', '(', ')', '{', '}', '\\', '!', '#',
    ];
    if !path.starts_with('/') {
        return Err(invalid(format!("cleanup path '{}' must be absolute", path)));
    }
    if path.trim_end_matches('/').is_empty() {
        return Err(invalid("cleanup path '/' is not allowed".to_string()));
    }
    if path.chars().any(|c| c.is_whitespace() || FORBIDDEN.contains(&c)) {
        return Err(invalid(format!(
            "cleanup path '{}' contains whitespace or shell metacharacters",
            path
        )));
    }
    Ok(())
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<Option<T>> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| invalid(format!("'{}' is not a valid value for {}", value, key)))
}

/// Expands `~` and anchors relative paths at `base`.
fn expand_path(raw: &str, base: Option<&Path>) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(raw).into_owned());
    match base {
        Some(dir) if expanded.is_relative() => dir.join(expanded),
        _ => expanded,
    }
}

impl ConfigLayer {
    /// Applies `over` on top of `self`, section by section.
    pub fn merge(&mut self, over: ConfigLayer) {
        self.container.merge(over.container);
        self.build.merge(over.build);
        self.cleanup.merge(over.cleanup);
        self.backup.merge(over.backup);
        self.lifecycle.merge(over.lifecycle);
    }

    /// Sets one field addressed as `section.field`. List fields take a
    /// comma-separated value; an empty value clears the field.
    ///
    /// # Errors
    ///
    /// `EnvkeepError::ConfigInvalid` for an unknown key or a value of the wrong type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let text = || (!value.is_empty()).then(|| value.to_string());
        let list = || {
            (!value.is_empty()).then(|| {
                value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
        };
        match key {
            "container.name" => self.container.name = text(),
            "container.image" => self.container.image = text(),
            "container.compose_file" => self.container.compose_file = text(),
            "build.context" => self.build.context = text(),
            "build.dockerfile" => self.build.dockerfile = text(),
            "cleanup.include" => self.cleanup.include = list(),
            "cleanup.exclude" => self.cleanup.exclude = list(),
            "backup.max_backups" => self.backup.max_backups = parse_value(key, value)?,
            "backup.auto_clean" => self.backup.auto_clean = parse_value(key, value)?,
            "backup.schedule" => self.backup.schedule = text(),
            "lifecycle.startup_timeout_secs" => {
                self.lifecycle.startup_timeout_secs = parse_value(key, value)?
            }
            "lifecycle.poll_interval_ms" => {
                self.lifecycle.poll_interval_ms = parse_value(key, value)?
            }
            "lifecycle.stop_timeout_secs" => {
                self.lifecycle.stop_timeout_secs = parse_value(key, value)?
            }
            "lifecycle.log_tail_lines" => self.lifecycle.log_tail_lines = parse_value(key, value)?,
            _ => return Err(invalid(format!("unknown configuration key '{}'", key))),
        }
        Ok(())
    }

    /// Fills defaults and validates.
    ///
    /// # Arguments
    ///
    /// * `origin` - The descriptor file; relative paths are resolved against its directory.
    ///
    /// # Errors
    ///
    /// `EnvkeepError::ConfigInvalid` naming the first problem found.
    pub fn resolve(self, origin: Option<&Path>) -> Result<EnvironmentConfig> {
        let base_dir = origin.and_then(Path::parent);

        let name = self
            .container
            .name
            .ok_or_else(|| invalid("[container].name is required".to_string()))?;
        validate_container_name(&name)?;

        let image_raw = self
            .container
            .image
            .ok_or_else(|| invalid("[container].image is required".to_string()))?;
        let image = ImageRef::parse(&image_raw)?;

        let compose_file = match self.container.compose_file {
            Some(raw) if !raw.trim().is_empty() => {
                let path = expand_path(&raw, base_dir);
                if !path.is_file() {
                    return Err(invalid(format!(
                        "compose file '{}' does not exist",
                        path.display()
                    )));
                }
                Some(path)
            }
            _ => None,
        };

        let build = match self.build.context {
            Some(raw) => Some(BuildSettings {
                context: expand_path(&raw, base_dir),
                dockerfile: self
                    .build
                    .dockerfile
                    .unwrap_or_else(|| DEFAULT_DOCKERFILE.to_string()),
            }),
            None => None,
        };

        let cleanup = CleanupPolicy::new(
            self.cleanup.include.unwrap_or_else(default_cleanup_include),
            self.cleanup.exclude.unwrap_or_else(default_cleanup_exclude),
        );
        for path in cleanup.include.iter().chain(&cleanup.exclude) {
            validate_cleanup_path(path)?;
        }

        let backup = BackupSettings {
            max_backups: self.backup.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS),
            auto_clean: self.backup.auto_clean.unwrap_or(false),
            schedule: self
                .backup
                .schedule
                .unwrap_or_else(|| DEFAULT_SCHEDULE.to_string()),
        };
        if backup.max_backups == 0 {
            return Err(invalid("[backup].max_backups must be at least 1".to_string()));
        }

        let lifecycle = LifecycleSettings {
            startup_timeout: Duration::from_secs(
                self.lifecycle
                    .startup_timeout_secs
                    .unwrap_or(DEFAULT_STARTUP_TIMEOUT_SECS),
            ),
            poll_interval: Duration::from_millis(
                self.lifecycle
                    .poll_interval_ms
                    .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            stop_timeout_secs: self
                .lifecycle
                .stop_timeout_secs
                .unwrap_or(DEFAULT_STOP_TIMEOUT_SECS),
            log_tail_lines: self
                .lifecycle
                .log_tail_lines
                .unwrap_or(DEFAULT_LOG_TAIL_LINES),
        };
        if lifecycle.poll_interval.is_zero() {
            return Err(invalid("[lifecycle].poll_interval_ms must be positive".to_string()));
        }
        if lifecycle.poll_interval > lifecycle.startup_timeout {
            return Err(invalid(
                "[lifecycle].poll_interval_ms must not exceed startup_timeout_secs".to_string(),
            ));
        }

        Ok(EnvironmentConfig {
            name,
            image,
            compose_file,
            build,
            cleanup,
            backup,
            lifecycle,
            origin: origin.map(Path::to_path_buf),
        })
    }
}

// --- Loading & persistence ---

/// Reads one layer from disk.
///
/// # Errors
///
/// `EnvkeepError::ConfigInvalid` if the file is not valid TOML for a layer.
pub fn load_layer(path: &Path) -> Result<ConfigLayer> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    toml::from_str(&content).map_err(|e| invalid(format!("{}: {}", path.display(), e)))
}

/// Writes a layer, creating parent directories.
pub fn save_layer(path: &Path, layer: &ConfigLayer) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory '{}'", parent.display()))?;
    }
    let content = toml::to_string_pretty(layer).context("Failed to serialize configuration")?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;
    info!("Saved configuration to {}", path.display());
    Ok(())
}

/// Finds `.envkeep.toml` in `start` or its ancestors, stopping at a `.git` directory.
pub fn find_project_config(start: &Path) -> Option<PathBuf> {
    let mut path = start;
    loop {
        let candidate = path.join(PROJECT_CONFIG_FILENAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if path.join(".git").is_dir() {
            debug!(
                "Found .git directory at {}, stopping project config search.",
                path.display()
            );
            return None;
        }
        path = path.parent()?;
    }
}

/// Which environment a command targets.
#[derive(Debug, Clone)]
pub struct EnvSelector {
    /// Named environment (`--env`); takes precedence over the project file.
    pub name: Option<String>,
    /// Directory to start the project file search from.
    pub cwd: PathBuf,
}

/// Location of user settings and named environment descriptors.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    pub fn new(root: PathBuf) -> Self {
        ConfigStore { root }
    }

    /// Uses `override_dir` when given, else the platform config directory.
    pub fn locate(override_dir: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = override_dir {
            return Ok(ConfigStore::new(expand_path(&dir.to_string_lossy(), None)));
        }
        let dirs = ProjectDirs::from("com", "Envkeep", "envkeep").ok_or_else(|| {
            invalid("could not determine the user configuration directory".to_string())
        })?;
        Ok(ConfigStore::new(dirs.config_dir().to_path_buf()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn user_settings_path(&self) -> PathBuf {
        self.root.join(USER_CONFIG_FILENAME)
    }

    pub fn environment_path(&self, name: &str) -> PathBuf {
        self.root
            .join(ENVIRONMENTS_DIR)
            .join(format!("{}.toml", name))
    }

    /// Names of all stored environment descriptors, sorted.
    pub fn list_environments(&self) -> Result<Vec<String>> {
        let dir = self.root.join(ENVIRONMENTS_DIR);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("Failed to read directory '{}'", dir.display()))?
        {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn remove_environment(&self, name: &str) -> Result<()> {
        let path = self.environment_path(name);
        if !path.is_file() {
            return Err(invalid(format!("no environment named '{}'", name)));
        }
        fs::remove_file(&path)
            .with_context(|| format!("Failed to remove '{}'", path.display()))
    }

    /// The descriptor file `selector` points at.
    ///
    /// # Errors
    ///
    /// `EnvkeepError::ConfigInvalid` if the named descriptor does not exist or no
    /// project file is found.
    pub fn environment_file(&self, selector: &EnvSelector) -> Result<PathBuf> {
        match &selector.name {
            Some(name) => {
                let path = self.environment_path(name);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(invalid(format!(
                        "no environment named '{}' (expected {})",
                        name,
                        path.display()
                    )))
                }
            }
            None => find_project_config(&selector.cwd).ok_or_else(|| {
                invalid(format!(
                    "no environment selected: pass --env NAME or create {} in the project",
                    PROJECT_CONFIG_FILENAME
                ))
            }),
        }
    }

    /// Loads, merges and resolves the selected environment.
    pub fn load_environment(&self, selector: &EnvSelector) -> Result<EnvironmentConfig> {
        let mut layer = ConfigLayer::default();
        let user_path = self.user_settings_path();
        if user_path.is_file() {
            info!("Loading user settings from: {}", user_path.display());
            layer.merge(load_layer(&user_path)?);
        }
        let env_path = self.environment_file(selector)?;
        info!("Loading environment from: {}", env_path.display());
        layer.merge(load_layer(&env_path)?);
        let resolved = layer
            .resolve(Some(&env_path))
            .with_context(|| format!("Invalid environment '{}'", env_path.display()))?;
        debug!("Resolved environment: {:?}", resolved);
        Ok(resolved)
    }
}
