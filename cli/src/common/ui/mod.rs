//! # Envkeep UI Utilities Module (`common::ui`)
//!
//! File: cli/src/common/ui/mod.rs
//!
//! ## Overview
//!
//! Terminal-facing helpers shared by the command handlers:
//!
//! - **`prompts`**: the y/N confirmation gate in front of destructive commands
//!   (`dialoguer`), honouring `--yes` and refusing when no terminal is attached.
//! - **`tables`**: aligned plain-text tables and human-readable sizes for
//!   snapshot listings and compaction reports.
//!
//! The core (`crate::manager`) never prompts; it only receives the resolved
//! answer as a `confirmed: bool`.
//!
pub mod prompts;
pub mod tables;
