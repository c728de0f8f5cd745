//! # Decking Groups
//!
//! File: cli/src/model/group.rs
//!
//! A group is a named bundle of overrides: `options` apply to every member of
//! a cluster using the group, `overrides` only to the container they are keyed
//! by.
//!
use super::container::ContainerData;
use crate::core::definition::GroupSpec;
use crate::core::error::Result;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub options: ContainerData,
    /// Container name -> override data.
    pub overrides: BTreeMap<String, ContainerData>,
}

impl Group {
    pub fn from_spec(name: &str, spec: &GroupSpec, base_dir: &Path) -> Result<Self> {
        let options = ContainerData::from_options(name, None, &spec.options, base_dir)?;
        let overrides = spec
            .containers
            .iter()
            .map(|(member, options)| {
                ContainerData::from_options(member, None, options, base_dir).map(|data| (member.clone(), data))
            })
            .collect::<Result<_>>()?;
        Ok(Self {
            name: name.to_string(),
            options,
            overrides,
        })
    }
}
