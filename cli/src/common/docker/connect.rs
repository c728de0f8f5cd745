//! # Decking Docker Connection
//!
//! File: cli/src/common/docker/connect.rs
//!
//! ## Overview
//!
//! Establishes the connection to the local Docker daemon and wraps it in
//! `DockerEngine`, the `Engine` implementation used by the CLI. The
//! connection carries a bounded network timeout so that an unresponsive
//! daemon fails the call instead of hanging the orchestrator. Stop requests
//! use a grace period shorter than this timeout (see `core::settings`).
//!
//! `connect_with_local_defaults` honours `DOCKER_HOST`, falling back to the
//! platform socket (`/var/run/docker.sock` on Unix, a named pipe on Windows).
//! The client connects lazily, so opening it never blocks; the first engine
//! call surfaces an unreachable daemon.
//!
use super::{ContainerInfo, CreateRequest, Engine, LineStream, ProgressStream};
use crate::core::error::{DeckingError, Result};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use bollard::Docker;
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

/// `Engine` backed by a bollard Docker client.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    pub(super) docker: Docker,
}

impl DockerEngine {
    /// Connects to the local Docker daemon with `timeout` applied to every call.
    #[instrument]
    pub fn connect(timeout: Duration) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| anyhow!(DeckingError::EngineApi { source: e }))
            .context("Failed to connect to Docker daemon. Is it running and accessible?")?
            .with_timeout(timeout);
        Ok(Self { docker })
    }
}

#[async_trait]
impl Engine for DockerEngine {
    async fn build(&self, context: &Path, tag: &str) -> Result<ProgressStream> {
        self.build_image(context, tag).await
    }

    async fn create(&self, request: &CreateRequest) -> Result<String> {
        self.create_container(request).await
    }

    async fn start(&self, id: &str) -> Result<()> {
        self.start_container(id).await
    }

    async fn stop(&self, id: &str, grace: Duration) -> Result<()> {
        self.stop_container(id, grace).await
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.remove_container(id).await
    }

    async fn tag(&self, source: &str, target: &str) -> Result<()> {
        self.tag_image(source, target).await
    }

    async fn push(&self, image: &str, insecure: bool) -> Result<ProgressStream> {
        self.push_image(image, insecure).await
    }

    async fn pull(&self, image: &str, insecure: bool) -> Result<ProgressStream> {
        self.pull_image(image, insecure).await
    }

    async fn remove_image(&self, image: &str) -> Result<()> {
        self.remove_image_reference(image).await
    }

    async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        self.list_all_containers().await
    }

    async fn attach(&self, name: &str) -> Result<LineStream> {
        self.attach_container(name).await
    }
}
