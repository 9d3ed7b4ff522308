//! # In-memory engine for manager tests (`manager::testing`)
//!
//! File: cli/src/manager/testing.rs
//!
//! `FakeEngine` keeps images, tags and containers in a `Mutex` and records every
//! verb in call order, so tests can assert both resulting state and ordering
//! (e.g. that a backup tag precedes a commit). `FakeSupervisor` plays the
//! compose CLI against the same state.
//!
//! Images are plain records. Flatten creates an image without metadata at half
//! the size of the container's image; build parses the generated
//! Dockerfile (`FROM`, `WORKDIR`, `ENV`, `ENTRYPOINT`, `CMD`) so metadata round
//! trips are checked end to end.
//!
use crate::common::docker::{
    ContainerInfo, ContainerStatus, Engine, ExecOutput, ImageDetails, ImageSummary, Supervisor,
};
use crate::core::config::{
    default_cleanup_exclude, default_cleanup_include, BackupSettings, EnvironmentConfig,
    LifecycleSettings,
};
use crate::core::error::{EnvkeepError, Result};
use crate::manager::model::{CleanupPolicy, ImageRef};
use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Environment used by manager tests: `ml-dev` / `ml-dev:latest`, default
/// cleanup lists, fast polling.
pub fn test_config() -> EnvironmentConfig {
    EnvironmentConfig {
        name: "ml-dev".to_string(),
        image: ImageRef::new("ml-dev", "latest"),
        compose_file: None,
        build: None,
        cleanup: CleanupPolicy::new(default_cleanup_include(), default_cleanup_exclude()),
        backup: BackupSettings {
            max_backups: 5,
            auto_clean: false,
            schedule: "0 0 * * *".to_string(),
        },
        lifecycle: LifecycleSettings {
            startup_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(10),
            ..LifecycleSettings::default()
        },
        origin: None,
    }
}

/// One recorded engine verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Info(String),
    Run(String, String),
    Start(String),
    Stop(String, Option<u32>),
    Restart(String),
    RemoveContainer(String, bool),
    Create(String),
    Logs(String, Option<usize>),
    Exec(String, Vec<String>),
    /// container, target reference
    Commit(String, String),
    /// source, target reference
    Tag(String, String),
    List(String),
    Inspect(String),
    RemoveImage(String, bool),
    /// container id, target reference
    Flatten(String, String),
    Build(String),
}

impl Call {
    pub fn verb(&self) -> &'static str {
        match self {
            Call::Info(_) => "info",
            Call::Run(..) => "run",
            Call::Start(_) => "start",
            Call::Stop(..) => "stop",
            Call::Restart(_) => "restart",
            Call::RemoveContainer(..) => "remove_container",
            Call::Create(_) => "create",
            Call::Logs(..) => "logs",
            Call::Exec(..) => "exec",
            Call::Commit(..) => "commit",
            Call::Tag(..) => "tag",
            Call::List(_) => "list",
            Call::Inspect(_) => "inspect",
            Call::RemoveImage(..) => "remove_image",
            Call::Flatten(..) => "flatten",
            Call::Build(_) => "build",
        }
    }
}

#[derive(Debug, Clone)]
struct FakeImage {
    created: i64,
    size: i64,
    details: ImageDetails,
}

#[derive(Debug, Clone)]
struct FakeContainer {
    id: String,
    image_id: String,
    status: ContainerStatus,
}

struct FakeState {
    next_id: u64,
    clock: i64,
    images: HashMap<String, FakeImage>,
    tags: BTreeMap<String, String>,
    containers: HashMap<String, FakeContainer>,
    calls: Vec<Call>,
    start_status: ContainerStatus,
    logs: String,
    exec_results: HashMap<String, ExecOutput>,
    fail_build: Option<String>,
    fail_flatten: Option<String>,
    fail_tag_prefixes: Vec<String>,
    fail_remove: HashSet<String>,
    build_contexts: Vec<PathBuf>,
}

impl FakeState {
    fn new_id(&mut self) -> String {
        self.next_id += 1;
        format!("sha256:{:012x}", self.next_id)
    }

    fn tick(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }

    fn resolve(&self, reference: &str) -> Option<String> {
        if let Some(id) = self.tags.get(reference) {
            return Some(id.clone());
        }
        self.images
            .contains_key(reference)
            .then(|| reference.to_string())
    }

    fn resolve_or_missing(&self, reference: &str) -> Result<String> {
        self.resolve(reference).ok_or_else(|| {
            anyhow!(EnvkeepError::ImageNotFound {
                name: reference.to_string()
            })
        })
    }

    fn insert_image(&mut self, reference: &str, created: i64, size: i64, details: ImageDetails) -> String {
        let id = self.new_id();
        self.images.insert(
            id.clone(),
            FakeImage {
                created,
                size,
                details,
            },
        );
        self.tags.insert(reference.to_string(), id.clone());
        id
    }

    fn tags_of(&self, id: &str) -> Vec<String> {
        self.tags
            .iter()
            .filter(|(_, v)| v.as_str() == id)
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn container_key(&self, name_or_id: &str) -> Option<String> {
        if self.containers.contains_key(name_or_id) {
            return Some(name_or_id.to_string());
        }
        self.containers
            .iter()
            .find(|(_, c)| c.id == name_or_id)
            .map(|(k, _)| k.clone())
    }

    fn drop_untagged(&mut self, id: &str) {
        if self.tags_of(id).is_empty() {
            self.images.remove(id);
        }
    }
}

pub struct FakeEngine {
    state: Mutex<FakeState>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeEngine {
    pub fn new() -> Self {
        FakeEngine {
            state: Mutex::new(FakeState {
                next_id: 0,
                clock: 1_750_000_000,
                images: HashMap::new(),
                tags: BTreeMap::new(),
                containers: HashMap::new(),
                calls: Vec::new(),
                start_status: ContainerStatus::Running,
                logs: String::new(),
                exec_results: HashMap::new(),
                fail_build: None,
                fail_flatten: None,
                fail_tag_prefixes: Vec::new(),
                fail_remove: HashSet::new(),
                build_contexts: Vec::new(),
            }),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    fn record(&self, call: Call) {
        self.with(|s| s.calls.push(call));
    }

    // --- Fixtures ---

    /// New image tagged `reference` (replacing an older mapping), created "now".
    pub fn add_image(&self, reference: &str) -> String {
        self.add_image_with(
            reference,
            ImageDetails {
                size: 1000,
                ..Default::default()
            },
        )
    }

    pub fn add_image_at(&self, reference: &str, created: i64) -> String {
        self.with(|s| s.insert_image(reference, created, 1000, ImageDetails::default()))
    }

    pub fn add_image_with(&self, reference: &str, details: ImageDetails) -> String {
        self.with(|s| {
            let created = s.tick();
            s.insert_image(reference, created, details.size, details)
        })
    }

    pub fn put_container(&self, name: &str, image: &str, status: ContainerStatus) {
        self.with(|s| {
            let image_id = s.resolve(image).expect("fixture image exists");
            let id = s.new_id();
            s.containers.insert(
                name.to_string(),
                FakeContainer {
                    id,
                    image_id,
                    status,
                },
            );
        })
    }

    /// Status a container reaches after run/start/restart/compose up.
    pub fn set_start_status(&self, status: ContainerStatus) {
        self.with(|s| s.start_status = status);
    }

    pub fn set_logs(&self, logs: &str) {
        self.with(|s| s.logs = logs.to_string());
    }

    /// Result for an exec whose last argument equals `script`.
    pub fn set_exec_result(&self, script: &str, output: ExecOutput) {
        self.with(|s| s.exec_results.insert(script.to_string(), output));
    }

    pub fn fail_build(&self, message: &str) {
        self.with(|s| s.fail_build = Some(message.to_string()));
    }

    /// Flatten fails after the container was created, like a broken export stream.
    pub fn fail_flatten(&self, message: &str) {
        self.with(|s| s.fail_flatten = Some(message.to_string()));
    }

    /// Tagging onto any tag starting with `prefix` fails.
    pub fn fail_tag_to(&self, prefix: &str) {
        self.with(|s| s.fail_tag_prefixes.push(prefix.to_string()));
    }

    pub fn fail_remove(&self, reference: &str) {
        self.with(|s| s.fail_remove.insert(reference.to_string()));
    }

    // --- Observations ---

    pub fn calls(&self) -> Vec<Call> {
        self.with(|s| s.calls.clone())
    }

    pub fn image_id(&self, reference: &str) -> Option<String> {
        self.with(|s| s.resolve(reference))
    }

    pub fn details(&self, reference: &str) -> Option<ImageDetails> {
        self.with(|s| {
            let id = s.resolve(reference)?;
            s.images.get(&id).map(|i| i.details.clone())
        })
    }

    pub fn tags_of(&self, id: &str) -> Vec<String> {
        self.with(|s| s.tags_of(id))
    }

    pub fn container_image(&self, name: &str) -> Option<String> {
        self.with(|s| s.containers.get(name).map(|c| c.image_id.clone()))
    }

    pub fn container_count(&self) -> usize {
        self.with(|s| s.containers.len())
    }

    pub fn build_contexts(&self) -> Vec<PathBuf> {
        self.with(|s| s.build_contexts.clone())
    }

    // --- Compose ---

    fn compose_up(&self, name: &str, image: &str) -> Result<()> {
        self.with(|s| {
            let image_id = s.resolve_or_missing(image)?;
            let status = s.start_status;
            let id = s.new_id();
            let container = s.containers.entry(name.to_string()).or_insert(FakeContainer {
                id,
                image_id,
                status,
            });
            if !container.status.is_active() {
                container.status = status;
            }
            Ok(())
        })
    }

    fn compose_down(&self, name: &str) {
        self.with(|s| s.containers.remove(name));
    }
}

fn parse_json_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw.trim()).expect("exec form JSON")
}

/// Undoes Dockerfile double-quoting: `\\`, `\"` and `\$` lose their backslash.
fn unquote(raw: &str) -> String {
    let inner = raw
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .expect("double-quoted ENV value");
    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => value.extend(chars.next()),
            c => value.push(c),
        }
    }
    value
}

/// Applies a generated Dockerfile to `base` details.
fn apply_dockerfile(text: &str, mut details: ImageDetails) -> (String, ImageDetails) {
    let mut base = String::new();
    let mut env = Vec::new();
    for line in text.lines() {
        let (instr, rest) = line.split_once(' ').unwrap_or((line, ""));
        match instr {
            "FROM" => base = rest.trim().to_string(),
            "WORKDIR" => details.working_dir = Some(rest.trim().to_string()),
            "ENV" => {
                let (key, raw) = rest.split_once('=').expect("ENV key=value");
                let value = unquote(raw);
                env.push(format!("{}={}", key, value));
            }
            "ENTRYPOINT" => details.entrypoint = Some(parse_json_list(rest)),
            "CMD" => details.cmd = Some(parse_json_list(rest)),
            _ => {}
        }
    }
    details.env = Some(env);
    (base, details)
}

#[async_trait]
impl Engine for FakeEngine {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn container_info(&self, name: &str) -> Result<ContainerInfo> {
        self.record(Call::Info(name.to_string()));
        Ok(self.with(|s| match s.containers.get(name) {
            Some(c) => ContainerInfo {
                status: c.status,
                image_id: Some(c.image_id.clone()),
            },
            None => ContainerInfo::absent(),
        }))
    }

    async fn run_container(&self, image: &str, name: &str) -> Result<()> {
        self.record(Call::Run(image.to_string(), name.to_string()));
        self.with(|s| {
            let image_id = s.resolve_or_missing(image)?;
            if s.containers.contains_key(name) {
                return Err(anyhow!("Conflict: container name '{}' in use", name));
            }
            let id = s.new_id();
            let status = s.start_status;
            s.containers.insert(
                name.to_string(),
                FakeContainer {
                    id,
                    image_id,
                    status,
                },
            );
            Ok(())
        })
    }

    async fn start_container(&self, name: &str) -> Result<()> {
        self.record(Call::Start(name.to_string()));
        self.with(|s| {
            let status = s.start_status;
            let c = s
                .containers
                .get_mut(name)
                .ok_or_else(|| anyhow!("No such container: {}", name))?;
            c.status = status;
            Ok(())
        })
    }

    async fn stop_container(&self, name: &str, timeout_secs: Option<u32>) -> Result<()> {
        self.record(Call::Stop(name.to_string(), timeout_secs));
        self.with(|s| {
            if let Some(c) = s.containers.get_mut(name) {
                if c.status.is_active() {
                    c.status = ContainerStatus::Exited;
                }
            }
        });
        Ok(())
    }

    async fn restart_container(&self, name: &str) -> Result<()> {
        self.record(Call::Restart(name.to_string()));
        self.with(|s| {
            let status = s.start_status;
            let c = s
                .containers
                .get_mut(name)
                .ok_or_else(|| anyhow!("No such container: {}", name))?;
            c.status = status;
            Ok(())
        })
    }

    async fn remove_container(&self, name_or_id: &str, force: bool) -> Result<()> {
        self.record(Call::RemoveContainer(name_or_id.to_string(), force));
        self.with(|s| {
            let Some(key) = s.container_key(name_or_id) else {
                return Ok(());
            };
            if s.containers[&key].status.is_active() && !force {
                return Err(anyhow!("Conflict: container '{}' is running", name_or_id));
            }
            s.containers.remove(&key);
            Ok(())
        })
    }

    async fn create_container(&self, image: &str) -> Result<String> {
        self.record(Call::Create(image.to_string()));
        self.with(|s| {
            let image_id = s.resolve_or_missing(image)?;
            let id = s.new_id();
            s.containers.insert(
                id.clone(),
                FakeContainer {
                    id: id.clone(),
                    image_id,
                    status: ContainerStatus::Created,
                },
            );
            Ok(id)
        })
    }

    async fn container_logs(&self, name: &str, tail: Option<usize>) -> Result<String> {
        self.record(Call::Logs(name.to_string(), tail));
        let logs = self.with(|s| s.logs.clone());
        Ok(match tail {
            Some(n) => {
                let lines: Vec<&str> = logs.lines().collect();
                lines[lines.len().saturating_sub(n)..].join("\n")
            }
            None => logs,
        })
    }

    async fn exec(&self, name: &str, cmd: &[String]) -> Result<ExecOutput> {
        self.record(Call::Exec(name.to_string(), cmd.to_vec()));
        self.with(|s| {
            match s.containers.get(name) {
                Some(c) if c.status.is_running() => {}
                _ => return Err(anyhow!("Container '{}' is not running", name)),
            }
            let key = cmd.last().cloned().unwrap_or_default();
            Ok(s.exec_results.get(&key).cloned().unwrap_or(ExecOutput {
                exit_code: 0,
                output: String::new(),
            }))
        })
    }

    async fn commit(&self, container: &str, repository: &str, tag: &str) -> Result<()> {
        let target = format!("{}:{}", repository, tag);
        self.record(Call::Commit(container.to_string(), target.clone()));
        self.with(|s| {
            let image_id = s
                .containers
                .get(container)
                .map(|c| c.image_id.clone())
                .ok_or_else(|| anyhow!("No such container: {}", container))?;
            let base = s.images[&image_id].clone();
            let created = s.tick();
            s.insert_image(&target, created, base.size + 100, base.details);
            Ok(())
        })
    }

    async fn tag_image(&self, source: &str, repository: &str, tag: &str) -> Result<()> {
        let target = format!("{}:{}", repository, tag);
        self.record(Call::Tag(source.to_string(), target.clone()));
        self.with(|s| {
            if s.fail_tag_prefixes.iter().any(|p| tag.starts_with(p.as_str())) {
                return Err(anyhow!("tag '{}' rejected", target));
            }
            // A displaced image stays addressable by id, like a dangling image.
            let id = s.resolve_or_missing(source)?;
            s.tags.insert(target, id);
            Ok(())
        })
    }

    async fn list_images(&self, reference: &str) -> Result<Vec<ImageSummary>> {
        self.record(Call::List(reference.to_string()));
        let prefix = reference.trim_end_matches('*');
        Ok(self.with(|s| {
            s.images
                .iter()
                .filter_map(|(id, image)| {
                    let repo_tags = s.tags_of(id);
                    repo_tags.iter().any(|t| t.starts_with(prefix)).then(|| ImageSummary {
                        id: id.clone(),
                        repo_tags,
                        created: image.created,
                        size: image.size,
                    })
                })
                .collect()
        }))
    }

    async fn inspect_image(&self, reference: &str) -> Result<ImageDetails> {
        self.record(Call::Inspect(reference.to_string()));
        self.with(|s| {
            let id = s.resolve_or_missing(reference)?;
            let image = &s.images[&id];
            Ok(ImageDetails {
                id,
                size: image.size,
                ..image.details.clone()
            })
        })
    }

    async fn remove_image(&self, reference: &str, force: bool) -> Result<()> {
        self.record(Call::RemoveImage(reference.to_string(), force));
        self.with(|s| {
            if s.fail_remove.contains(reference) {
                return Err(anyhow!("conflict: unable to remove '{}'", reference));
            }
            if let Some(id) = s.tags.remove(reference) {
                s.drop_untagged(&id);
                return Ok(());
            }
            if s.images.remove(reference).is_some() {
                s.tags.retain(|_, v| v != reference);
                return Ok(());
            }
            Err(anyhow!(EnvkeepError::ImageNotFound {
                name: reference.to_string()
            }))
        })
    }

    async fn flatten(&self, id: &str, repository: &str, tag: &str) -> Result<()> {
        let target = format!("{}:{}", repository, tag);
        self.record(Call::Flatten(id.to_string(), target.clone()));
        self.with(|s| {
            if let Some(message) = s.fail_flatten.clone() {
                return Err(anyhow!("Failed to import '{}': {}", target, message));
            }
            let key = s
                .container_key(id)
                .ok_or_else(|| anyhow!("No such container: {}", id))?;
            let source_id = s.containers[&key].image_id.clone();
            let size = s.images[&source_id].size / 2;
            let created = s.tick();
            s.insert_image(&target, created, size, ImageDetails::default());
            Ok(())
        })
    }

    async fn build_image(
        &self,
        context_dir: &Path,
        dockerfile: &str,
        tag: &str,
        _no_cache: bool,
    ) -> Result<()> {
        self.record(Call::Build(tag.to_string()));
        let text = std::fs::read_to_string(context_dir.join(dockerfile))?;
        self.with(|s| {
            s.build_contexts.push(context_dir.to_path_buf());
            if let Some(message) = s.fail_build.clone() {
                return Err(anyhow!(EnvkeepError::BuildFailure {
                    tag: tag.to_string(),
                    message,
                    log: text.clone(),
                }));
            }
            let (base, details) = apply_dockerfile(&text, ImageDetails::default());
            let base_id = s.resolve(&base).ok_or_else(|| {
                anyhow!(EnvkeepError::BuildFailure {
                    tag: tag.to_string(),
                    message: format!("base image '{}' not found", base),
                    log: text.clone(),
                })
            })?;
            let size = s.images[&base_id].size;
            let created = s.tick();
            s.insert_image(tag, created, size, details);
            Ok(())
        })
    }
}

/// Compose stand-in acting on a `FakeEngine`'s containers.
pub struct FakeSupervisor<'e> {
    engine: &'e FakeEngine,
    name: String,
    image: String,
    verbs: Mutex<Vec<String>>,
    /// `down` succeeds but the container stays.
    stuck: bool,
}

impl<'e> FakeSupervisor<'e> {
    pub fn new(engine: &'e FakeEngine, name: &str, image: &str) -> Self {
        FakeSupervisor {
            engine,
            name: name.to_string(),
            image: image.to_string(),
            verbs: Mutex::new(Vec::new()),
            stuck: false,
        }
    }

    /// `down` reports success without removing the container.
    pub fn leaving_container_on_down(mut self) -> Self {
        self.stuck = true;
        self
    }

    pub fn verbs(&self) -> Vec<String> {
        self.verbs.lock().unwrap().clone()
    }

    fn record(&self, verb: &str) {
        self.verbs.lock().unwrap().push(verb.to_string());
    }
}

#[async_trait]
impl Supervisor for FakeSupervisor<'_> {
    async fn up(&self) -> Result<()> {
        self.record("up");
        self.engine.compose_up(&self.name, &self.image)
    }

    async fn down(&self) -> Result<()> {
        self.record("down");
        if !self.stuck {
            self.engine.compose_down(&self.name);
        }
        Ok(())
    }

    async fn logs(&self) -> Result<String> {
        self.record("logs");
        Ok(self.engine.with(|s| s.logs.clone()))
    }
}
