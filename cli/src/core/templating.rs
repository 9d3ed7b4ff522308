//! # Envkeep Build Descriptor Templates
//!
//! File: cli/src/core/templating.rs
//!
//! ## Overview
//!
//! Renders the Dockerfile used by image compaction to put runtime metadata back
//! onto a flattened image. Flattening (export + import) keeps the filesystem
//! but drops `CMD`, `ENTRYPOINT`, `WORKDIR` and `ENV`; the rendered descriptor
//! re-emits them on top of the flattened base.
//!
//! ## Architecture
//!
//! The descriptor is a Tera template rendered with autoescaping off. Values are
//! prepared before rendering:
//! - `CMD` / `ENTRYPOINT` are emitted in exec (JSON array) form, so an empty
//!   entrypoint stays distinguishable from a missing one and no shell is
//!   implied.
//! - Every `ENV` value is double-quoted with `\`, `"` and `$` backslash-escaped,
//!   the three escapes the Dockerfile parser undoes inside quotes, so values are
//!   carried literally rather than expanded by the builder. A value containing
//!   a line break cannot be written on one instruction line and is skipped
//!   with a warning.
//!
//! ## Example output
//!
//! ```text
//! FROM ml-dev:compressed
//! WORKDIR /workspace
//! ENV FOO="bar"
//! ENTRYPOINT ["/bin/bash","-c"]
//! CMD ["python","app.py"]
//! ```
//!
use crate::core::error::{EnvkeepError, Result};
use crate::manager::model::{ImageRef, RuntimeMetadata};
use anyhow::{anyhow, Context};
use tera::Tera;
use tracing::{debug, warn};

const METADATA_DOCKERFILE: &str = "\
FROM {{ base }}
WORKDIR {{ working_dir }}
{% for line in env %}ENV {{ line }}
{% endfor %}ENTRYPOINT {{ entrypoint }}
CMD {{ cmd }}
";

/// `KEY=VALUE` as a Dockerfile `ENV` argument, or `None` for entries that
/// cannot be written (no key, whitespace in the key, line break in the value).
fn env_line(entry: &str) -> Option<String> {
    let (key, value) = entry.split_once('=')?;
    if key.is_empty() || key.chars().any(char::is_whitespace) {
        return None;
    }
    if value.contains(|c: char| c == '\n' || c == '\r') {
        return None;
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Some(format!("{}={}", key, quoted))
}

/// Renders the Dockerfile that rebuilds `metadata` on top of `base`.
///
/// # Errors
///
/// `EnvkeepError::Template` if rendering fails.
pub fn render_metadata_dockerfile(base: &ImageRef, metadata: &RuntimeMetadata) -> Result<String> {
    let mut env = Vec::with_capacity(metadata.env.len());
    for entry in &metadata.env {
        match env_line(entry) {
            Some(line) => env.push(line),
            None => warn!("Skipping malformed environment entry '{}'", entry),
        }
    }

    let mut context = tera::Context::new();
    context.insert("base", &base.to_string());
    context.insert("working_dir", &metadata.working_dir);
    context.insert("env", &env);
    context.insert(
        "entrypoint",
        &serde_json::to_string(&metadata.entrypoint).context("Failed to encode ENTRYPOINT")?,
    );
    context.insert(
        "cmd",
        &serde_json::to_string(&metadata.cmd).context("Failed to encode CMD")?,
    );

    let rendered = Tera::one_off(METADATA_DOCKERFILE, &context, false).map_err(|e| {
        anyhow!(EnvkeepError::Template { source: e })
            .context("Failed to render metadata Dockerfile")
    })?;
    debug!("Rendered metadata Dockerfile:\n{}", rendered);
    Ok(rendered)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> RuntimeMetadata {
        RuntimeMetadata {
            cmd: vec!["python".into(), "app.py".into()],
            entrypoint: vec!["/bin/bash".into(), "-c".into()],
            working_dir: "/workspace".into(),
            env: vec!["FOO=bar".into(), "PATH=/usr/bin:$HOME/bin".into()],
        }
    }

    #[test]
    fn test_render_full_descriptor() -> Result<()> {
        let text = render_metadata_dockerfile(&ImageRef::new("ml-dev", "compressed"), &metadata())?;
        assert_eq!(
            text,
            "FROM ml-dev:compressed\n\
             WORKDIR /workspace\n\
             ENV FOO=\"bar\"\n\
             ENV PATH=\"/usr/bin:\\$HOME/bin\"\n\
             ENTRYPOINT [\"/bin/bash\",\"-c\"]\n\
             CMD [\"python\",\"app.py\"]\n"
        );
        Ok(())
    }

    #[test]
    fn test_no_env_lines() -> Result<()> {
        let mut meta = metadata();
        meta.env.clear();
        let text = render_metadata_dockerfile(&ImageRef::new("r", "compressed"), &meta)?;
        assert!(!text.contains("ENV"));
        assert!(text.contains("WORKDIR /workspace\nENTRYPOINT"));
        Ok(())
    }

    #[test]
    fn test_env_value_with_equals_and_quotes() {
        assert_eq!(env_line("A=b=c").unwrap(), "A=\"b=c\"");
        assert_eq!(env_line("Q=say \"hi\"").unwrap(), "Q=\"say \\\"hi\\\"\"");
        assert_eq!(env_line("EMPTY=").unwrap(), "EMPTY=\"\"");
        assert_eq!(env_line("WIN=C:\\tools").unwrap(), "WIN=\"C:\\\\tools\"");
        assert_eq!(env_line("TAB=a\tb").unwrap(), "TAB=\"a\tb\"");
        assert_eq!(env_line("UNI=café").unwrap(), "UNI=\"café\"");
        assert!(env_line("MULTI=line1\nline2").is_none());
        assert!(env_line("NOEQUALS").is_none());
        assert!(env_line("=value").is_none());
    }
}
