//! # Decking Entity Model (`model`)
//!
//! File: cli/src/model/mod.rs
//!
//! ## Overview
//!
//! The in-memory form of a validated definition: images, containers, groups
//! and clusters with their relationships resolved to direct references.
//!
//! ## Construction
//!
//! `Model::from_definition` performs, in order:
//! 1. Image entities, build contexts resolved against the definition's
//!    directory. `Dockerfile`s are not read here.
//! 2. Reference checks. Every container dependency, group override and
//!    cluster member must name a defined container, and every cluster group a
//!    defined group; otherwise `DeckingError::ConfigReference` is returned
//!    before any ordering work.
//! 3. Containers, built in resolver order so each one links to the already
//!    built containers it depends on. A dependency cycle fails here with
//!    `DeckingError::CircularOrMissingDependency`.
//! 4. Groups, then clusters (members kept in declared order).
//!
//! ## Submodules
//!
//! - **`image`**: `Image` with its lazily parsed base image.
//! - **`container`**: `ContainerData`, `Container`, `Link`, override layering.
//! - **`group`**: `Group`.
//! - **`cluster`**: `Cluster` and its execution order.
//!
use crate::core::definition::{split_alias, ContainerSpec, LoadedDefinition};
use crate::core::error::{DeckingError, Result};
use crate::core::resolver::resolve;
use anyhow::anyhow;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

pub mod cluster;
pub mod container;
pub mod group;
pub mod image;

pub use cluster::Cluster;
pub use container::{Container, ContainerData, Link};
pub use group::Group;
pub use image::Image;

#[derive(Debug, Default)]
pub struct Model {
    pub images: BTreeMap<String, Arc<Image>>,
    pub containers: BTreeMap<String, Arc<Container>>,
    pub groups: BTreeMap<String, Arc<Group>>,
    pub clusters: BTreeMap<String, Cluster>,
}

fn reference_error(kind: &'static str, name: &str, reference_kind: &'static str, reference: &str) -> anyhow::Error {
    anyhow!(DeckingError::ConfigReference {
        kind,
        name: name.to_string(),
        reference_kind,
        reference: reference.to_string(),
    })
}

impl Model {
    /// Builds the entity graph from a loaded definition.
    pub fn from_definition(loaded: &LoadedDefinition) -> Result<Self> {
        let definition = &loaded.definition;
        let base_dir = &loaded.base_dir;

        let mut images = BTreeMap::new();
        for (name, path) in &definition.images {
            let path = container::normalize_path(base_dir, path)?;
            images.insert(name.clone(), Arc::new(Image::new(name.clone(), path)));
        }

        check_references(loaded)?;

        let specs: Vec<(&String, &ContainerSpec)> = definition.containers.iter().collect();
        let ordered = resolve(
            specs,
            |(name, _)| name.to_string(),
            |(_, spec)| {
                spec.options
                    .dependencies
                    .iter()
                    .map(|entry| split_alias(entry).0.to_string())
                    .collect::<Vec<_>>()
            },
        )?;

        let mut built: HashMap<&str, Arc<Container>> = HashMap::new();
        for (name, spec) in ordered {
            let data = ContainerData::from_options(name, Some(spec.image.as_str()), &spec.options, base_dir)?;
            let mut links = Vec::with_capacity(spec.options.dependencies.len());
            for entry in &spec.options.dependencies {
                let (dependency, alias) = split_alias(entry);
                let target = built
                    .get(dependency)
                    .ok_or_else(|| reference_error("container", name, "container", dependency))?;
                links.push(Link {
                    container: Arc::clone(target),
                    alias: alias.to_string(),
                });
            }
            debug!("Built container '{}' with {} link(s)", name, links.len());
            built.insert(name.as_str(), Arc::new(Container::new(data, links)));
        }
        let containers: BTreeMap<String, Arc<Container>> = built
            .into_iter()
            .map(|(name, container)| (name.to_string(), container))
            .collect();

        let mut groups = BTreeMap::new();
        for (name, spec) in &definition.groups {
            groups.insert(name.clone(), Arc::new(Group::from_spec(name, spec, base_dir)?));
        }

        let mut clusters = BTreeMap::new();
        for (name, spec) in &definition.clusters {
            let members = spec
                .members()
                .iter()
                .map(|member| {
                    containers
                        .get(member)
                        .cloned()
                        .ok_or_else(|| reference_error("cluster", name, "container", member))
                })
                .collect::<Result<Vec<_>>>()?;
            let group = match spec.group() {
                Some(group) => Some(
                    groups
                        .get(group)
                        .cloned()
                        .ok_or_else(|| reference_error("cluster", name, "group", group))?,
                ),
                None => None,
            };
            clusters.insert(
                name.clone(),
                Cluster {
                    name: name.clone(),
                    containers: members,
                    group,
                },
            );
        }

        Ok(Self {
            images,
            containers,
            groups,
            clusters,
        })
    }

    pub fn cluster(&self, name: &str) -> Result<&Cluster> {
        self.clusters
            .get(name)
            .ok_or_else(|| anyhow!(DeckingError::UnknownCluster(name.to_string())))
    }
}

fn check_references(loaded: &LoadedDefinition) -> Result<()> {
    let definition = &loaded.definition;
    for (name, spec) in &definition.containers {
        for entry in &spec.options.dependencies {
            let (dependency, _) = split_alias(entry);
            if !definition.containers.contains_key(dependency) {
                return Err(reference_error("container", name, "container", dependency));
            }
        }
    }
    for (name, group) in &definition.groups {
        for member in group.containers.keys() {
            if !definition.containers.contains_key(member) {
                return Err(reference_error("group", name, "container", member));
            }
        }
    }
    for (name, cluster) in &definition.clusters {
        for member in cluster.members() {
            if !definition.containers.contains_key(member) {
                return Err(reference_error("cluster", name, "container", member));
            }
        }
        if let Some(group) = cluster.group() {
            if !definition.groups.contains_key(group) {
                return Err(reference_error("cluster", name, "group", group));
            }
        }
    }
    Ok(())
}
