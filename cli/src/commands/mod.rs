//! # Envkeep Command Modules
//!
//! File: cli/src/commands/mod.rs
//!
//! ## Overview
//!
//! Top-level command groups of the `envkeep` CLI. Each group has a `mod.rs`
//! with its `*Args` struct, a `Subcommand` enum and a `handle_*` router; each
//! subcommand has its own file with its arguments and handler.
//!
//! - **`env`**: lifecycle of the environment container, saving and building its image.
//! - **`backup`**: snapshot listing, creation, rotation, deletion and restore.
//! - **`image`**: image compaction.
//! - **`config`**: environment descriptors.
//!
//! Handlers receive the per-invocation `Session`; they prompt, call into
//! `crate::manager`, and print results. Core logic stays in the managers.
//!
pub mod backup;
pub mod config;
pub mod env;
pub mod image;
pub mod report;
