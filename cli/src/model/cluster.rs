//! # Decking Clusters
//!
//! File: cli/src/model/cluster.rs
//!
//! A cluster is the unit of multi-container operations: its containers in
//! the order they were declared, plus an optional group of overrides.
//! Execution order is not declaration order; `waves` derives it from the
//! container links.
//!
use super::container::Container;
use super::group::Group;
use crate::core::error::Result;
use crate::core::resolver::{resolve_reversed, resolve_waves};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Cluster {
    pub name: String,
    pub containers: Vec<Arc<Container>>,
    pub group: Option<Arc<Group>>,
}

impl Cluster {
    pub fn member_names(&self) -> Vec<&str> {
        self.containers.iter().map(|c| c.name()).collect()
    }

    /// Members followed by the containers they link to that are not members
    /// themselves.
    pub fn linked_names(&self) -> Vec<&str> {
        let mut names = self.member_names();
        for container in &self.containers {
            for dependency in container.dependency_names() {
                if !names.contains(&dependency) {
                    names.push(dependency);
                }
            }
        }
        names
    }

    /// The members grouped into dependency waves.
    ///
    /// A dependency on a container outside the cluster does not hold a member
    /// back; linking to it still requires that it exists.
    pub fn waves(&self) -> Result<Vec<Vec<Arc<Container>>>> {
        let members = self.member_set();
        resolve_waves(
            self.containers.clone(),
            |container| container.name().to_string(),
            |container| member_dependencies(container, &members),
        )
    }

    /// Members in dependency order.
    pub fn ordered(&self) -> Result<Vec<Arc<Container>>> {
        Ok(self.waves()?.into_iter().flatten().collect())
    }

    /// Members with every dependent before the containers it links to.
    pub fn teardown_order(&self) -> Result<Vec<Arc<Container>>> {
        let members = self.member_set();
        resolve_reversed(
            self.containers.clone(),
            |container| container.name().to_string(),
            |container| member_dependencies(container, &members),
        )
    }

    fn member_set(&self) -> HashSet<String> {
        self.containers.iter().map(|c| c.name().to_string()).collect()
    }
}

fn member_dependencies(container: &Container, members: &HashSet<String>) -> Vec<String> {
    container
        .dependency_names()
        .filter(|dep| members.contains(*dep))
        .map(String::from)
        .collect()
}
