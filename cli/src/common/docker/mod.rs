//! # Decking Container Engine Interface
//!
//! File: cli/src/common/docker/mod.rs
//!
//! ## Overview
//!
//! Every container operation decking performs is delegated to an external
//! container engine. This module defines that collaborator as the `Engine`
//! trait, together with the request and response types that cross it, and
//! provides the Docker implementation (`DockerEngine`) built on `bollard`.
//!
//! The orchestration layer only ever talks to `&dyn Engine`, so the executor,
//! the facade and the log aggregator can be exercised against an in-memory
//! engine in tests.
//!
//! ## Architecture
//!
//! - **`connect`**: Opens the bollard client with a bounded network timeout.
//! - **`containers`**: Container primitives (create, start, stop, remove, list, attach).
//! - **`images`**: Image primitives (build, tag, push, pull, remove).
//! - **`progress`**: Consumes build/push/pull progress streams for the reporter.
//!
//! Host configuration (volume binds, links, port bindings, privileged mode,
//! network mode) travels in the `CreateRequest`: the Docker API applies it
//! when the container is created, and `start` only needs the identity.
//!
use crate::core::error::Result;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Opens the connection to the local Docker daemon.
pub mod connect;
/// Container lifecycle primitives on top of bollard.
pub mod containers;
/// Image primitives on top of bollard.
pub mod images;
/// Consumption of build/push/pull progress streams.
pub mod progress;

pub use connect::DockerEngine;

/// One event of a build, push or pull progress stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Output meant for the user (build step output).
    Output(String),
    /// Status/progress chatter (layer downloads etc.).
    Status(String),
    /// A failure reported by the engine inside the stream.
    Error(String),
}

pub type ProgressStream = BoxStream<'static, Result<ProgressEvent>>;
/// Output lines of an attached container.
pub type LineStream = BoxStream<'static, Result<String>>;

/// Host-side configuration of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostOptions {
    /// Host path -> container path.
    pub volume_bindings: BTreeMap<String, String>,
    /// (target identity, alias) pairs.
    pub links: Vec<(String, String)>,
    /// Container port -> host port.
    pub port_bindings: BTreeMap<String, String>,
    pub privileged: bool,
    pub network_mode: Option<String>,
}

/// Everything the engine needs to create a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateRequest {
    pub image: String,
    pub name: String,
    pub environment: BTreeMap<String, String>,
    pub host: HostOptions,
}

impl CreateRequest {
    /// The container ports to expose: the keys of the port bindings.
    pub fn exposed_ports(&self) -> impl Iterator<Item = &str> {
        self.host.port_bindings.keys().map(String::as_str)
    }
}

/// A published port as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPort {
    pub protocol: String,
    pub ip: Option<String>,
    pub private_port: u16,
    pub public_port: Option<u16>,
}

/// Point-in-time information about one existing container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub id: String,
    /// Names without the leading `/` the engine reports.
    pub names: Vec<String>,
    pub status: String,
    pub ports: Vec<PublishedPort>,
}

impl ContainerInfo {
    /// The first 12 characters of the id, as shown to users.
    pub fn short_id(&self) -> &str {
        let end = self.id.char_indices().nth(12).map_or(self.id.len(), |(i, _)| i);
        &self.id[..end]
    }

    pub fn is_up(&self) -> bool {
        self.status.starts_with("Up")
    }
}

/// The container engine collaborator.
///
/// Engine failures are reported as `DeckingError::EngineApi` (rejected calls)
/// or `DeckingError::Engine` (errors inside progress streams).
#[async_trait]
pub trait Engine: Send + Sync {
    /// Builds `context` (a directory holding a `Dockerfile`) and tags it `tag`.
    async fn build(&self, context: &Path, tag: &str) -> Result<ProgressStream>;

    /// Creates a container and returns its identity.
    async fn create(&self, request: &CreateRequest) -> Result<String>;

    async fn start(&self, id: &str) -> Result<()>;

    /// Stops a container, letting it shut down for at most `grace`.
    async fn stop(&self, id: &str, grace: Duration) -> Result<()>;

    async fn remove(&self, id: &str) -> Result<()>;

    /// Adds the reference `target` to the image `source`.
    async fn tag(&self, source: &str, target: &str) -> Result<()>;

    async fn push(&self, image: &str, insecure: bool) -> Result<ProgressStream>;

    async fn pull(&self, image: &str, insecure: bool) -> Result<ProgressStream>;

    async fn remove_image(&self, image: &str) -> Result<()>;

    /// Lists all containers, running or not.
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>>;

    /// Streams the output of a running container line by line.
    async fn attach(&self, name: &str) -> Result<LineStream>;
}

/// Splits an image reference into repository and tag (`latest` when absent).
///
/// A `:` before the last `/` belongs to a registry host and is not a tag
/// separator.
pub fn split_reference(reference: &str) -> (&str, &str) {
    let name_start = reference.rfind('/').map_or(0, |i| i + 1);
    match reference[name_start..].rfind(':') {
        Some(i) => (&reference[..name_start + i], &reference[name_start + i + 1..]),
        None => (reference, "latest"),
    }
}
