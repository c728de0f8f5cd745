//! # Decking Live State
//!
//! File: cli/src/orchestration/live.rs
//!
//! What the engine currently knows about the configured containers, keyed by
//! container name. Queried fresh at the start of every cluster operation,
//! updated by the executor as it creates and removes containers, and dropped
//! at the end of the operation. Entities never carry this state.
//!
use crate::common::docker::{ContainerInfo, Engine};
use crate::core::error::Result;
use anyhow::Context;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Default, Clone)]
pub struct LiveState {
    entries: HashMap<String, ContainerInfo>,
}

impl LiveState {
    /// Lists every container the engine has and keeps those named in `names`.
    pub async fn query(engine: &dyn Engine, names: &[&str]) -> Result<Self> {
        let listing = engine
            .list_containers()
            .await
            .context("Failed to query existing containers")?;
        Ok(Self::from_listing(listing, names))
    }

    pub fn from_listing(listing: Vec<ContainerInfo>, names: &[&str]) -> Self {
        let mut entries = HashMap::new();
        for info in listing {
            if let Some(name) = info.names.iter().find(|n| names.contains(&n.as_str())) {
                debug!("Found existing container '{}' ({})", name, info.short_id());
                entries.insert(name.clone(), info);
            }
        }
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&ContainerInfo> {
        self.entries.get(name)
    }

    pub fn record(&mut self, name: &str, info: ContainerInfo) {
        self.entries.insert(name.to_string(), info);
    }

    pub fn forget(&mut self, name: &str) {
        self.entries.remove(name);
    }
}
