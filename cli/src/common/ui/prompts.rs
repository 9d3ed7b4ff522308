//! # Envkeep Confirmation Prompts (`common::ui::prompts`)
//!
//! File: cli/src/common/ui/prompts.rs
//!
//! ## Overview
//!
//! Resolves a yes/no answer for destructive operations:
//! 1. `--yes` given → yes, no prompt.
//! 2. stdin is not a terminal → no (scripts must opt in with `--yes`).
//! 3. otherwise ask with a `dialoguer::Confirm` defaulting to "no".
//!
use crate::core::error::{EnvkeepError, Result};
use anyhow::{anyhow, Context};
use dialoguer::Confirm;
use std::io::IsTerminal;
use tracing::debug;

/// Returns the user's answer to `question`.
pub fn ask(question: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        debug!("'{}' pre-confirmed with --yes", question);
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        debug!("No terminal attached; treating '{}' as declined", question);
        return Ok(false);
    }
    Confirm::new()
        .with_prompt(question)
        .default(false)
        .interact()
        .context("Failed to read confirmation from terminal")
}

/// Like [`ask`], but a "no" becomes `EnvkeepError::ConfirmationRequired`.
pub fn require(question: &str, assume_yes: bool, operation: &str) -> Result<()> {
    if ask(question, assume_yes)? {
        Ok(())
    } else {
        Err(anyhow!(EnvkeepError::ConfirmationRequired {
            operation: operation.to_string()
        }))
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assume_yes_skips_prompt() {
        assert!(ask("Delete everything?", true).unwrap());
        assert!(require("Delete everything?", true, "backup delete").is_ok());
    }
}
