//! # Decking Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//!
//! ## Overview
//!
//! Foundational pieces shared by the entity model, the executor and the
//! command handlers:
//! - `definition`: Definition file loading and schema validation
//! - `error`: The `DeckingError` taxonomy and the `Result` alias
//! - `resolver`: The dependency-ordered scheduler (waves, order, teardown order)
//! - `settings`: User settings (timeouts, cooldown, default registry)
//!
//! ```rust
//! use crate::core::definition; // For loading decking.json
//! use crate::core::error::{DeckingError, Result};
//! use crate::core::resolver; // For ordering named entities
//! ```
//!
pub mod definition;
pub mod error;
pub mod resolver;
pub mod settings;
