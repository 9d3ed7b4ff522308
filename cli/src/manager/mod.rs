//! # Envkeep Environment Manager (`manager`)
//!
//! File: cli/src/manager/mod.rs
//!
//! ## Overview
//!
//! The core of envkeep: lifecycle, snapshots, compaction and cleanup for one
//! environment container. Nothing here prompts or prints; destructive calls take
//! an explicit `confirmed` flag and results come back as typed outcomes for the
//! command layer to render.
//!
//! ## Architecture
//!
//! - **`model`**: image references, snapshot records, runtime metadata, cleanup policy.
//! - **`lifecycle`**: `LifecycleController` (start/stop/restart/logs/save).
//! - **`cleanup`**: `CleanupRunner`, in-container cache removal.
//! - **`snapshots`**: `SnapshotStore` (list/create/rotate/delete/restore/auto).
//! - **`compactor`**: `ImageCompactor` (flatten, restore metadata, adopt).
//! - **`builder`**: `ImageBuilder`, rebuilding the image from its Dockerfile.
//! - **`context`**: `Session` / `EnvContext`, the per-invocation handles.
//!
//! All managers borrow a `LifecycleController`, which in turn borrows the engine
//! and the resolved configuration from the `EnvContext`.
//!
pub mod builder;
pub mod cleanup;
pub mod compactor;
pub mod context;
pub mod lifecycle;
pub mod model;
pub mod snapshots;

#[cfg(test)]
pub mod testing;
