//! # Envkeep Archive Utilities (`common::archive`)
//!
//! File: cli/src/common/archive/mod.rs
//!
//! ## Overview
//!
//! Archive helpers. The only archive envkeep produces itself is the gzipped
//! build context sent to the engine's build endpoint (`tar::create_context_tar`).
//! Container exports are opaque tar streams, piped straight into `docker import`
//! by `common::docker::operations::flatten_container`.
//!
pub mod tar;
