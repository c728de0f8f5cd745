//! # Decking Definition Files
//!
//! File: cli/src/core/definition.rs
//!
//! ## Overview
//!
//! Loads the cluster definition file (`decking.json` by default) and checks it
//! against the fixed definition schema before anything else happens. A
//! definition describes four kinds of entities:
//!
//! ```yaml
//! images:                      # image name -> build context path
//!   repo/alice: ./alice
//! containers:                  # container name -> container options
//!   alice:
//!     image: repo/alice
//!     port: ["8080:80"]        # HOST:CONTAINER
//!     env: ["MODE=dev"]        # KEY=VALUE
//!     dependencies: ["bob:db"] # NAME[:ALIAS]
//!     mount: ["./data:/data"]  # HOST_PATH:CONTAINER_PATH
//!     net: host
//!     privileged: false
//! groups:                      # override bundles
//!   dev:
//!     options: { env: ["MODE=dev"] }
//!     containers: { alice: { net: bridge } }
//! clusters:                    # list of names, or {group, containers}
//!   office: [alice, bob]
//!   office-dev: { group: dev, containers: [alice, bob] }
//! ```
//!
//! ## Architecture
//!
//! Loading runs in three steps:
//! 1. The file is parsed into a `serde_json::Value`. The format is picked by
//!    extension: `.toml` uses `toml`, `.json` uses `serde_json`, anything
//!    else is read as YAML with `serde_yaml`.
//! 2. `validate` walks that document and collects **every** schema violation.
//!    Any violation fails the load with `DeckingError::Schema`.
//! 3. The validated document is deserialized into the typed `Definition`.
//!
//! Name references between entities are *not* checked here; the entity model
//! does that when it is built (`model::Model::from_definition`).
//!
use crate::core::error::{DeckingError, Result};
use anyhow::{anyhow, Context};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default definition file name, looked up in the working directory.
pub const DEFAULT_DEFINITION_FILE: &str = "decking.json";

/// The typed form of a validated definition file.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct Definition {
    /// Image name -> build context path (relative to the definition file).
    #[serde(default)]
    pub images: BTreeMap<String, String>,
    pub containers: BTreeMap<String, ContainerSpec>,
    #[serde(default)]
    pub groups: BTreeMap<String, GroupSpec>,
    #[serde(default)]
    pub clusters: BTreeMap<String, ClusterSpec>,
}

/// Raw container options as written in the definition.
#[derive(Deserialize, Debug, Clone)]
pub struct ContainerSpec {
    pub image: String,
    #[serde(flatten)]
    pub options: OptionsSpec,
}

/// Container options shared by containers and group overrides.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct OptionsSpec {
    #[serde(default)]
    pub port: Vec<String>,
    #[serde(default)]
    pub env: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub mount: Vec<String>,
    pub net: Option<String>,
    pub privileged: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct GroupSpec {
    #[serde(default)]
    pub options: OptionsSpec,
    #[serde(default)]
    pub containers: BTreeMap<String, OptionsSpec>,
}

/// A cluster is either a plain list of container names or a mapping with an
/// optional group.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ClusterSpec {
    Members(Vec<String>),
    Grouped {
        group: Option<String>,
        #[serde(default)]
        containers: Vec<String>,
    },
}

impl ClusterSpec {
    pub fn members(&self) -> &[String] {
        match self {
            ClusterSpec::Members(members) => members,
            ClusterSpec::Grouped { containers, .. } => containers,
        }
    }

    pub fn group(&self) -> Option<&str> {
        match self {
            ClusterSpec::Members(_) => None,
            ClusterSpec::Grouped { group, .. } => group.as_deref(),
        }
    }
}

/// A definition together with the directory its relative paths resolve
/// against.
#[derive(Debug, Clone)]
pub struct LoadedDefinition {
    pub definition: Definition,
    pub base_dir: PathBuf,
}

/// Reads, validates and deserializes the definition file at `path`.
pub fn load_definition(path: &Path) -> Result<LoadedDefinition> {
    info!("Loading cluster definition from: {}", path.display());
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not open cluster definition file {}", path.display()))?;
    let document = parse_document(path, &content)?;
    let definition = definition_from_value(document)
        .with_context(|| format!("Invalid cluster definition file {}", path.display()))?;
    let base_dir = base_dir_of(path)?;
    debug!("Definition base directory: {}", base_dir.display());
    Ok(LoadedDefinition { definition, base_dir })
}

/// Validates a parsed document and converts it into a `Definition`.
pub fn definition_from_value(document: Value) -> Result<Definition> {
    let violations = validate(&document);
    if !violations.is_empty() {
        return Err(anyhow!(DeckingError::Schema(violations)));
    }
    serde_json::from_value(document).context("Failed to deserialize validated definition")
}

fn parse_document(path: &Path, content: &str) -> Result<Value> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let document = match extension.as_deref() {
        Some("toml") => toml::from_str(content)
            .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))?,
        Some("json") => serde_json::from_str(content)
            .with_context(|| format!("Failed to parse JSON from file: {}", path.display()))?,
        _ => serde_yaml::from_str(content)
            .with_context(|| format!("Failed to parse YAML from file: {}", path.display()))?,
    };
    Ok(document)
}

fn base_dir_of(path: &Path) -> Result<PathBuf> {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    if parent.is_absolute() {
        return Ok(parent.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    Ok(cwd.join(parent))
}

// --- Schema ---

const TOP_LEVEL_FIELDS: &[&str] = &["images", "containers", "groups", "clusters"];
const OVERRIDE_FIELDS: &[&str] = &["port", "env", "mount", "net", "privileged"];
const CONTAINER_FIELDS: &[&str] = &["image", "port", "env", "dependencies", "mount", "net", "privileged"];

/// Checks `document` against the definition schema and returns every
/// violation found, as `path: problem` strings. An empty result means the
/// document is valid.
pub fn validate(document: &Value) -> Vec<String> {
    let mut violations = Vec::new();
    let Some(root) = document.as_object() else {
        violations.push("<root>: must be a mapping".to_string());
        return violations;
    };

    check_unknown_fields("<root>", root, TOP_LEVEL_FIELDS, &mut violations);

    if let Some(images) = optional_mapping(root, "images", "images", &mut violations) {
        for (name, path) in images {
            if !path.is_string() {
                violations.push(format!("images.{}: build context path must be a string", name));
            }
        }
    }

    match root.get("containers") {
        None => violations.push("containers: required field is missing".to_string()),
        Some(value) => match value.as_object() {
            None => violations.push("containers: must be a mapping".to_string()),
            Some(containers) => {
                for (name, spec) in containers {
                    validate_options(&format!("containers.{}", name), spec, CONTAINER_FIELDS, &mut violations);
                    if let Some(spec) = spec.as_object() {
                        match spec.get("image") {
                            None => violations.push(format!("containers.{}.image: required field is missing", name)),
                            Some(Value::String(_)) => {}
                            Some(_) => violations.push(format!("containers.{}.image: must be a string", name)),
                        }
                    }
                }
            }
        },
    }

    if let Some(groups) = optional_mapping(root, "groups", "groups", &mut violations) {
        for (name, group) in groups {
            let path = format!("groups.{}", name);
            let Some(group) = group.as_object() else {
                violations.push(format!("{}: must be a mapping", path));
                continue;
            };
            check_unknown_fields(&path, group, &["options", "containers"], &mut violations);
            if let Some(options) = group.get("options") {
                validate_options(&format!("{}.options", path), options, OVERRIDE_FIELDS, &mut violations);
            }
            if let Some(per_container) =
                optional_mapping(group, "containers", &format!("{}.containers", path), &mut violations)
            {
                for (member, options) in per_container {
                    validate_options(
                        &format!("{}.containers.{}", path, member),
                        options,
                        OVERRIDE_FIELDS,
                        &mut violations,
                    );
                }
            }
        }
    }

    if let Some(clusters) = optional_mapping(root, "clusters", "clusters", &mut violations) {
        for (name, cluster) in clusters {
            validate_cluster(&format!("clusters.{}", name), cluster, &mut violations);
        }
    }

    violations
}

fn optional_mapping<'a>(
    parent: &'a Map<String, Value>,
    field: &str,
    path: &str,
    violations: &mut Vec<String>,
) -> Option<&'a Map<String, Value>> {
    match parent.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => {
            violations.push(format!("{}: must be a mapping", path));
            None
        }
    }
}

fn check_unknown_fields(path: &str, map: &Map<String, Value>, allowed: &[&str], violations: &mut Vec<String>) {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            violations.push(format!("{}.{}: unknown field", path, key));
        }
    }
}

fn validate_options(path: &str, value: &Value, allowed: &[&str], violations: &mut Vec<String>) {
    let Some(options) = value.as_object() else {
        violations.push(format!("{}: must be a mapping", path));
        return;
    };
    check_unknown_fields(path, options, allowed, violations);

    for (field, check) in [
        ("port", check_port as fn(&str) -> Option<&'static str>),
        ("env", check_env),
        ("dependencies", check_dependency),
        ("mount", check_mount),
    ] {
        if !allowed.contains(&field) {
            continue;
        }
        let Some(entries) = options.get(field) else { continue };
        let Some(entries) = entries.as_array() else {
            violations.push(format!("{}.{}: must be a list of strings", path, field));
            continue;
        };
        for (index, entry) in entries.iter().enumerate() {
            match entry.as_str() {
                None => violations.push(format!("{}.{}[{}]: must be a string", path, field, index)),
                Some(text) => {
                    if let Some(problem) = check(text) {
                        violations.push(format!("{}.{}[{}]: '{}' {}", path, field, index, text, problem));
                    }
                }
            }
        }
    }

    if let Some(net) = options.get("net") {
        if !net.is_string() {
            violations.push(format!("{}.net: must be a string", path));
        }
    }
    if let Some(privileged) = options.get("privileged") {
        if !privileged.is_boolean() {
            violations.push(format!("{}.privileged: must be a boolean", path));
        }
    }
}

fn validate_cluster(path: &str, value: &Value, violations: &mut Vec<String>) {
    match value {
        Value::Array(members) => check_member_list(path, members, violations),
        Value::Object(cluster) => {
            check_unknown_fields(path, cluster, &["group", "containers"], violations);
            if let Some(group) = cluster.get("group") {
                if !group.is_string() {
                    violations.push(format!("{}.group: must be a string", path));
                }
            }
            match cluster.get("containers") {
                None => {}
                Some(Value::Array(members)) => {
                    check_member_list(&format!("{}.containers", path), members, violations)
                }
                Some(_) => violations.push(format!("{}.containers: must be a list of container names", path)),
            }
        }
        _ => violations.push(format!("{}: must be a list of container names or a mapping", path)),
    }
}

fn check_member_list(path: &str, members: &[Value], violations: &mut Vec<String>) {
    for (index, member) in members.iter().enumerate() {
        if !member.is_string() {
            violations.push(format!("{}[{}]: cluster definition list item {} is not a container name", path, index, member));
        }
    }
}

fn check_port(entry: &str) -> Option<&'static str> {
    match entry.split_once(':') {
        Some((host, container)) if !host.is_empty() && !container.is_empty() && !container.contains(':') => None,
        _ => Some("must have the form HOST:CONTAINER"),
    }
}

fn check_env(entry: &str) -> Option<&'static str> {
    match entry.split_once('=') {
        Some((key, _)) if !key.is_empty() => None,
        _ => Some("must have the form KEY=VALUE"),
    }
}

fn check_dependency(entry: &str) -> Option<&'static str> {
    let (name, alias) = split_alias(entry);
    if name.is_empty() || alias.is_empty() {
        Some("must have the form NAME or NAME:ALIAS")
    } else {
        None
    }
}

fn check_mount(entry: &str) -> Option<&'static str> {
    match entry.split_once(':') {
        Some((host, container)) if !host.is_empty() && container.starts_with('/') => None,
        _ => Some("must have the form HOST_PATH:/CONTAINER_PATH"),
    }
}

/// Splits `name:alias`; a bare `name` is its own alias.
pub fn split_alias(entry: &str) -> (&str, &str) {
    entry.split_once(':').unwrap_or((entry, entry))
}
