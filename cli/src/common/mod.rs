//! # Decking Common Modules (`common`)
//!
//! File: cli/src/common/mod.rs
//!
//! Shared building blocks below the orchestration layer.
//!
//! - **`archive`**: Gzipped tar build contexts.
//! - **`docker`**: The `Engine` trait and its bollard implementation.
//! - **`ui`**: The terminal reporter.
//!
pub mod archive;
pub mod docker;
pub mod ui;
