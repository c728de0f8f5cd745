//! # Decking Containers
//!
//! File: cli/src/model/container.rs
//!
//! ## Overview
//!
//! `ContainerData` is pure container configuration: image, port bindings,
//! environment, network mode, privileged flag and volume bindings. It is what
//! a container definition holds, and also what a group override holds (with
//! only some fields set).
//!
//! `Container` adds the dependency links: direct references to the containers
//! it depends on, each with the alias it is linked under. Containers are
//! immutable once built. What the engine currently knows about a container
//! lives in `orchestration::live::LiveState`, never on the entity.
//!
//! ## Override layering
//!
//! The configuration a cluster operation uses for a container is computed by
//! `Container::effective`: the container's own data, then the group options,
//! then the group's per-container override. Mapping fields are merged key by
//! key and scalar fields are replaced only by a layer that sets them, so a
//! layer never erases a value it does not mention.
//!
use super::group::Group;
use crate::core::definition::OptionsSpec;
use crate::core::error::Result;
use anyhow::Context;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerData {
    pub name: String,
    pub image: Option<String>,
    /// Container port -> host port.
    pub port_bindings: BTreeMap<String, String>,
    pub environment: BTreeMap<String, String>,
    pub net: Option<String>,
    pub privileged: Option<bool>,
    /// Host path -> container path.
    pub volume_bindings: BTreeMap<String, String>,
}

impl ContainerData {
    /// Builds the data from definition options; relative host mount paths are
    /// resolved against `base_dir`.
    pub fn from_options(
        name: &str,
        image: Option<&str>,
        options: &OptionsSpec,
        base_dir: &Path,
    ) -> Result<Self> {
        let port_bindings = options
            .port
            .iter()
            .filter_map(|entry| entry.split_once(':'))
            .map(|(host, container)| (container.to_string(), host.to_string()))
            .collect();
        let environment = options
            .env
            .iter()
            .filter_map(|entry| entry.split_once('='))
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        let mut volume_bindings = BTreeMap::new();
        for entry in &options.mount {
            if let Some((host, container)) = entry.split_once(':') {
                let host = normalize_path(base_dir, host)
                    .with_context(|| format!("Invalid mount '{}' for '{}'", entry, name))?;
                volume_bindings.insert(host.display().to_string(), container.to_string());
            }
        }
        Ok(Self {
            name: name.to_string(),
            image: image.map(String::from),
            port_bindings,
            environment,
            net: options.net.clone(),
            privileged: options.privileged,
            volume_bindings,
        })
    }

    /// Layers `other` on top of `self`.
    pub fn overlay(&mut self, other: &ContainerData) {
        self.port_bindings
            .extend(other.port_bindings.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.environment
            .extend(other.environment.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.volume_bindings
            .extend(other.volume_bindings.iter().map(|(k, v)| (k.clone(), v.clone())));
        if other.image.is_some() {
            self.image = other.image.clone();
        }
        if other.net.is_some() {
            self.net = other.net.clone();
        }
        if other.privileged.is_some() {
            self.privileged = other.privileged;
        }
    }
}

/// A dependency edge: the container depended on and the alias it is linked
/// under.
#[derive(Debug, Clone)]
pub struct Link {
    pub container: Arc<Container>,
    pub alias: String,
}

#[derive(Debug)]
pub struct Container {
    pub data: ContainerData,
    pub links: Vec<Link>,
}

impl Container {
    pub fn new(data: ContainerData, links: Vec<Link>) -> Self {
        Self { data, links }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn image(&self) -> &str {
        self.data.image.as_deref().unwrap_or_default()
    }

    /// Names of the containers this one depends on.
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(|link| link.container.name())
    }

    /// The configuration to use for this container inside a cluster with
    /// `group`.
    pub fn effective(&self, group: Option<&Group>) -> ContainerData {
        let mut data = self.data.clone();
        if let Some(group) = group {
            data.overlay(&group.options);
            if let Some(specific) = group.overrides.get(self.name()) {
                data.overlay(specific);
            }
        }
        data
    }
}

/// Expands `~` and environment variables in `raw` and resolves it against
/// `base_dir` when relative. `.` components are dropped.
pub fn normalize_path(base_dir: &Path, raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw).with_context(|| format!("Failed to expand path '{}'", raw))?;
    let joined = base_dir.join(expanded.as_ref());
    Ok(joined
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect())
}
