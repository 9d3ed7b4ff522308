//! # Envkeep Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//!
//! ## Overview
//!
//! Foundations shared by the managers and the command layer:
//! - `config`: environment descriptors (layers, typed merge, validation, persistence)
//! - `error`: error kinds and the crate-wide `Result`
//! - `templating`: the Dockerfile rendered during image compaction
//!
pub mod config;
pub mod error;
pub mod templating;
