//! # Decking User Settings
//!
//! File: cli/src/core/settings.rs
//!
//! ## Overview
//!
//! Runtime knobs that are not part of a cluster definition: engine call
//! timeouts, the stop grace period, the cooldown between dependency waves
//! during `start`, and the default registry for `push`/`pull`.
//!
//! Sources, in order of precedence:
//! 1. Command-line flags (`--timeout`, `--cooldown`, `--registry`, ...)
//! 2. `settings.toml` in the user config directory
//!    (e.g. `~/.config/decking/settings.toml` on Linux)
//! 3. Defaults defined in this module
//!
//! ```toml
//! [engine]
//! timeout_secs = 10
//! stop_grace_secs = 8
//!
//! [start]
//! cooldown_secs = 6
//!
//! [registry]
//! default = "registry.example.com:5000"
//! insecure = false
//! ```
//!
//! The stop grace period must stay strictly below the engine timeout: a stop
//! request blocks for up to the grace period, and a slow container must
//! surface as a stop timeout rather than a generic network failure.
//!
use crate::core::error::{DeckingError, Result};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

const SETTINGS_FILENAME: &str = "settings.toml";

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub start: StartSettings,
    #[serde(default)]
    pub registry: RegistrySettings,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EngineSettings {
    /// Network timeout for every engine call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Grace period handed to the engine's stop call.
    #[serde(default = "default_stop_grace_secs")]
    pub stop_grace_secs: u64,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StartSettings {
    /// Pause between dependency waves while starting a cluster.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RegistrySettings {
    pub default: Option<String>,
    #[serde(default)]
    pub insecure: bool,
}

fn default_timeout_secs() -> u64 {
    10
}
fn default_stop_grace_secs() -> u64 {
    8
}
fn default_cooldown_secs() -> u64 {
    6
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            stop_grace_secs: default_stop_grace_secs(),
        }
    }
}

impl Default for StartSettings {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

/// Command-line values that take precedence over the settings file.
#[derive(Debug, Default, Clone)]
pub struct SettingsOverrides {
    pub timeout_secs: Option<u64>,
    pub stop_grace_secs: Option<u64>,
    pub cooldown_secs: Option<u64>,
}

impl Settings {
    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine.timeout_secs)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.engine.stop_grace_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.start.cooldown_secs)
    }

    /// Applies command-line overrides on top of the loaded values.
    pub fn with_overrides(mut self, overrides: &SettingsOverrides) -> Self {
        if let Some(timeout) = overrides.timeout_secs {
            self.engine.timeout_secs = timeout;
        }
        if let Some(grace) = overrides.stop_grace_secs {
            self.engine.stop_grace_secs = grace;
        }
        if let Some(cooldown) = overrides.cooldown_secs {
            self.start.cooldown_secs = cooldown;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine.timeout_secs == 0 {
            return Err(anyhow!(DeckingError::Settings(
                "engine.timeout_secs must be greater than zero".to_string()
            )));
        }
        if self.engine.stop_grace_secs >= self.engine.timeout_secs {
            return Err(anyhow!(DeckingError::Settings(format!(
                "engine.stop_grace_secs ({}) must be shorter than engine.timeout_secs ({})",
                self.engine.stop_grace_secs, self.engine.timeout_secs
            ))));
        }
        Ok(())
    }
}

/// Loads the user settings file (if any), applies `overrides` and validates
/// the result.
pub fn load_settings(overrides: &SettingsOverrides) -> Result<Settings> {
    let settings = load_user_settings()?.unwrap_or_default().with_overrides(overrides);
    settings.validate().context("Settings validation failed")?;
    debug!("Effective settings: {:?}", settings);
    Ok(settings)
}

fn load_user_settings() -> Result<Option<Settings>> {
    let Some(proj_dirs) = ProjectDirs::from("", "", "decking") else {
        warn!("Could not determine user config directory.");
        return Ok(None);
    };
    let settings_path = proj_dirs.config_dir().join(SETTINGS_FILENAME);
    if settings_path.exists() {
        info!("Loading user settings from: {}", settings_path.display());
        load_settings_from_path(&settings_path).map(Some)
    } else {
        debug!("User settings file not found at {}", settings_path.display());
        Ok(None)
    }
}

fn load_settings_from_path(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}
