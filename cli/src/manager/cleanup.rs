//! # Envkeep Cleanup Runner (`manager::cleanup`)
//!
//! File: cli/src/manager/cleanup.rs
//!
//! ## Overview
//!
//! Frees disk space inside the running container before it is committed.
//!
//! 1. Built-in cache steps (apt, pip, huggingface, jupyter) run one exec each.
//!    A failing step is logged as a partial failure and the run continues. The
//!    apt/pip/huggingface steps are skipped when an exclude path protects them.
//! 2. The effective deletion set (`CleanupPolicy::effective_paths`) is removed
//!    with a single `rm -rf` exec, minus the directories a built-in step
//!    already cleared. A non-zero exit there fails the run.
//!
use crate::core::error::{EnvkeepError, Result};
use crate::manager::lifecycle::LifecycleController;
use crate::manager::model::{CleanupPolicy, SkippedPath};
use anyhow::anyhow;
use tracing::{debug, info, instrument, warn};

const SHELL: &str = "/bin/sh";

/// A best-effort step and the include path whose exclusion disables it.
struct BuiltinStep {
    name: &'static str,
    script: &'static str,
    guards: Option<&'static str>,
}

const BUILTIN_STEPS: &[BuiltinStep] = &[
    BuiltinStep {
        name: "apt-get clean",
        script: "apt-get clean",
        guards: Some("/var/cache/apt/"),
    },
    BuiltinStep {
        name: "pip cache",
        script: "rm -rf /root/.cache/pip",
        guards: Some("/root/.cache/pip/"),
    },
    BuiltinStep {
        name: "huggingface cache",
        script: "rm -rf /root/.cache/huggingface",
        guards: Some("/root/.cache/huggingface/"),
    },
    BuiltinStep {
        name: "jupyter lab clean",
        script: "command -v jupyter >/dev/null 2>&1 || exit 0; jupyter lab clean",
        guards: None,
    },
];

/// What a cleanup run did.
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    /// Paths passed to `rm -rf`.
    pub removed: Vec<String>,
    /// Include paths protected by an exclude path.
    pub skipped: Vec<SkippedPath>,
    /// `(step, reason)` for each built-in step that failed.
    pub step_failures: Vec<(String, String)>,
    /// Output of the removal exec.
    pub output: String,
}

pub struct CleanupRunner<'c, 'a> {
    lifecycle: &'c LifecycleController<'a>,
    policy: &'c CleanupPolicy,
}

fn shell(script: impl Into<String>) -> Vec<String> {
    vec![SHELL.to_string(), "-c".to_string(), script.into()]
}

impl<'c, 'a> CleanupRunner<'c, 'a> {
    /// Uses the environment's configured policy.
    pub fn new(lifecycle: &'c LifecycleController<'a>) -> Self {
        Self::with_policy(lifecycle, &lifecycle.config().cleanup)
    }

    pub fn with_policy(lifecycle: &'c LifecycleController<'a>, policy: &'c CleanupPolicy) -> Self {
        CleanupRunner { lifecycle, policy }
    }

    /// # Errors
    ///
    /// * `NotRunning` if the container is absent or stopped.
    /// * `ExternalCommand` if the removal exec exits non-zero.
    #[instrument(skip(self), fields(container = %self.lifecycle.name()))]
    pub async fn run(&self) -> Result<CleanupReport> {
        self.lifecycle.require_running().await?;
        let name = self.lifecycle.name();
        let engine = self.lifecycle.engine();

        let (effective, skipped) = self.policy.effective_paths();
        for skip in &skipped {
            info!("Skipping '{}' (excluded by '{}')", skip.path, skip.excluded_by);
        }

        let mut report = CleanupReport {
            skipped,
            ..Default::default()
        };

        let mut handled: Vec<&str> = Vec::new();
        for step in BUILTIN_STEPS {
            if step.guards.is_some_and(|path| self.policy.is_excluded(path)) {
                debug!("Built-in step '{}' protected by exclude list", step.name);
                continue;
            }
            let failure = match engine.exec(name, &shell(step.script)).await {
                Ok(out) if out.exit_code == 0 => None,
                Ok(out) => Some(format!("exit code {}: {}", out.exit_code, out.output.trim())),
                Err(e) => Some(format!("{:#}", e)),
            };
            match failure {
                Some(reason) => {
                    let err = EnvkeepError::PartialCleanupFailure {
                        step: step.name.to_string(),
                        reason: reason.clone(),
                    };
                    warn!("{}", err);
                    report.step_failures.push((step.name.to_string(), reason));
                }
                None => handled.extend(step.guards),
            }
        }

        // Directories of successful built-in steps are done; a failed step's
        // directory stays in the removal set.
        report.removed = effective
            .into_iter()
            .filter(|path| !handled.contains(&path.as_str()))
            .collect();

        if report.removed.is_empty() {
            info!("Nothing left to remove.");
            return Ok(report);
        }

        let script = format!("rm -rf -- {}", report.removed.join(" "));
        info!("Removing: {}", report.removed.join(", "));
        let out = engine.exec(name, &shell(script.clone())).await?;
        if out.exit_code != 0 {
            return Err(anyhow!(EnvkeepError::ExternalCommand {
                cmd: script,
                status: out.exit_code.to_string(),
                output: out.output,
            }));
        }
        report.output = out.output;
        info!("Cleanup of '{}' finished.", name);
        Ok(report)
    }
}
