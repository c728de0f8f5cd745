//! # Decking Orchestration (`orchestration`)
//!
//! File: cli/src/orchestration/mod.rs
//!
//! ## Overview
//!
//! Everything that drives the engine on behalf of a definition.
//!
//! - **`live`**: Per-operation snapshot of what the engine knows about the
//!   configured containers.
//! - **`executor`**: The cluster verbs (`Operation`) run over a cluster in
//!   dependency order.
//! - **`logs`**: Concurrent log aggregation for `attach`.
//! - **`decking`**: The facade used by the command layer, including the image
//!   operations.
//!
pub mod decking;
pub mod executor;
pub mod live;
pub mod logs;

pub use decking::Decking;
