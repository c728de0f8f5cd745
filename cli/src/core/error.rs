//! # Decking Error Types
//!
//! File: cli/src/core/error.rs
//!
//! ## Overview
//!
//! This module defines the error taxonomy used throughout decking. Every
//! failure the orchestrator can report falls into one of a small number of
//! categories, and each category has a fixed propagation policy:
//!
//! - **Configuration errors** (`Schema`, `ConfigReference`, `UnknownTarget`,
//!   `UnknownCluster`, `Settings`) are raised while loading the definition file or building the
//!   entity model. They are fail-fast: no container is touched.
//! - **`CircularOrMissingDependency`** comes from the dependency resolver when
//!   a full pass makes no progress. Fatal for the requested operation.
//! - **`NotCreated`** is raised when an operation needing a live container runs
//!   before the container exists. It aborts the rest of the sequence but not
//!   the work already done for earlier containers.
//! - **`EngineApi` / `Engine`** wrap failures reported by the container engine.
//!   For create/start they halt the cluster operation. For stop/remove the
//!   executor catches them, reports them, and moves on to the next container.
//! - **`UnsupportedOperation`** is raised for an operation verb outside the
//!   known command set, before any container is touched.
//!
//! ## Architecture
//!
//! - `DeckingError`: a `thiserror` enum with one variant per category.
//! - `Result<T>`: an alias for `anyhow::Result<T>`, so call sites can attach
//!   context with `anyhow::Context` and callers can still branch on the kind
//!   with `downcast_ref::<DeckingError>()`.
//!
//! ## Examples
//!
//! ```rust
//! match result {
//!     Err(e) if e.downcast_ref::<DeckingError>().map_or(false, |de| matches!(de, DeckingError::NotCreated { .. })) => {
//!         println!("create the cluster first");
//!     }
//!     other => other?,
//! }
//! ```
//!
use thiserror::Error;

/// Custom error type for decking.
#[derive(Error, Debug)]
pub enum DeckingError {
    /// The definition file violates the schema. Carries every violation found.
    #[error("Invalid definition file:\n  - {}", .0.join("\n  - "))]
    Schema(Vec<String>),

    /// A declared name (dependency, group member, cluster member, group) has
    /// no matching definition.
    #[error("{kind} '{name}' refers to undefined {reference_kind} '{reference}'")]
    ConfigReference {
        kind: &'static str,
        name: String,
        reference_kind: &'static str,
        reference: String,
    },

    /// A build/push/pull or cluster target that is neither `all`, a cluster
    /// nor an image.
    #[error("'{0}' wasn't found among the configured clusters or images")]
    UnknownTarget(String),

    #[error("Cluster '{0}' is not defined")]
    UnknownCluster(String),

    /// The resolver made no progress in a full pass.
    #[error("Circular or missing dependencies between: {}", .stuck.join(", "))]
    CircularOrMissingDependency { stuck: Vec<String> },

    /// An operation requiring a live container was invoked before creation.
    #[error("Container '{name}' is not created")]
    NotCreated { name: String },

    #[error("Container engine API call failed: {source}")]
    EngineApi {
        #[from]
        source: bollard::errors::Error,
    },

    /// A failure reported by the engine inside a progress stream (e.g. a
    /// failing build step).
    #[error("Container engine reported an error: {0}")]
    Engine(String),

    #[error("Unsupported operation '{0}'")]
    UnsupportedOperation(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Operation interrupted by user")]
    Interrupted,
}

impl DeckingError {
    /// `true` for errors raised by the container engine itself.
    pub fn is_engine_error(&self) -> bool {
        matches!(self, DeckingError::EngineApi { .. } | DeckingError::Engine(_))
    }
}

/// Type alias for Result using anyhow::Error for broad compatibility.
pub type Result<T> = anyhow::Result<T>;

/// Returns `true` when `err` (anywhere in its chain) is an engine failure.
pub fn is_engine_error(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<DeckingError>())
        .any(DeckingError::is_engine_error)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn test_error_display() {
        let reference = DeckingError::ConfigReference {
            kind: "container",
            name: "alice".into(),
            reference_kind: "container",
            reference: "bob".into(),
        };
        assert_eq!(
            reference.to_string(),
            "container 'alice' refers to undefined container 'bob'"
        );

        let stuck = DeckingError::CircularOrMissingDependency {
            stuck: vec!["zen".into()],
        };
        assert_eq!(stuck.to_string(), "Circular or missing dependencies between: zen");

        let schema = DeckingError::Schema(vec!["a: bad".into(), "b: worse".into()]);
        assert_eq!(
            schema.to_string(),
            "Invalid definition file:\n  - a: bad\n  - b: worse"
        );
    }

    #[test]
    fn test_engine_error_detection_through_context() {
        let err = anyhow!(DeckingError::Engine("boom".into())).context("removing 'x'");
        assert!(is_engine_error(&err));

        let err = Err::<(), _>(anyhow!(DeckingError::NotCreated { name: "x".into() }))
            .context("starting")
            .unwrap_err();
        assert!(!is_engine_error(&err));
    }
}
