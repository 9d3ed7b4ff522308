//! # Envkeep Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//!
//! ## Overview
//!
//! Shared utilities used by the managers and the command handlers. Nothing in
//! here knows about snapshots or environments; it wraps the outside world.
//!
//! ## Architecture
//!
//! - **`archive`**: the gzipped tar build context sent to the engine.
//! - **`docker`**: the `Engine` trait and its `bollard` implementation, plus the
//!   compose `Supervisor`.
//! - **`process`**: external commands with captured output (`tokio::process`).
//! - **`ui`**: confirmation prompts, tables and size formatting.
//!
pub mod archive;
pub mod docker;
pub mod process;
pub mod ui;
