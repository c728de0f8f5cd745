//! # Decking Command Handlers (`commands`)
//!
//! File: cli/src/commands/mod.rs
//!
//! ## Overview
//!
//! Clap argument structs and the handlers behind each subcommand.
//!
//! - **`cluster`**: `create`, `start`, `run`, `stop`, `restart`, `remove`, `status`.
//! - **`attach`**: Aggregated logs of a cluster.
//! - **`image`**: `build`, `push`, `pull`.
//!
//! Every handler starts from a `Session`: the user settings, the entity model
//! built from the definition file, and the Docker connection. The definition
//! is fully loaded and checked before the engine is contacted.
//!
use crate::common::docker::DockerEngine;
use crate::common::ui::{Reporter, Terminal};
use crate::core::definition::load_definition;
use crate::core::error::Result;
use crate::core::settings::{load_settings, Settings, SettingsOverrides};
use crate::model::Model;
use anyhow::Context;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub mod attach;
pub mod cluster;
pub mod image;

/// Options shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    /// Path of the definition file.
    pub config: PathBuf,
    pub overrides: SettingsOverrides,
    /// Fired on Ctrl-C.
    pub cancel: CancellationToken,
}

/// The loaded state a command runs against.
pub struct Session {
    pub model: Model,
    pub engine: DockerEngine,
    pub settings: Settings,
}

static TERMINAL: Terminal = Terminal;

impl Session {
    pub fn open(options: &GlobalOptions) -> Result<Self> {
        let loaded = load_definition(&options.config)?;
        let model = Model::from_definition(&loaded)
            .with_context(|| format!("Invalid cluster definition file {}", options.config.display()))?;
        debug!(
            "Model: {} image(s), {} container(s), {} cluster(s)",
            model.images.len(),
            model.containers.len(),
            model.clusters.len()
        );
        let settings = load_settings(&options.overrides)?;
        let engine = DockerEngine::connect(settings.engine_timeout())?;
        Ok(Self {
            model,
            engine,
            settings,
        })
    }
}

/// The reporter user-visible progress goes to.
pub fn reporter() -> &'static dyn Reporter {
    &TERMINAL
}
