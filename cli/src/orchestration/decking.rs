//! # Decking Orchestration Facade
//!
//! File: cli/src/orchestration/decking.rs
//!
//! ## Overview
//!
//! `Decking` ties a built `Model` to an engine, a reporter and the user
//! settings, and exposes what the command layer needs:
//!
//! - cluster verbs (`execute`, or `dispatch` for a verb given as text),
//! - `attach` for the aggregated logs of a cluster,
//! - `build`, `push` and `pull` over an image *target*.
//!
//! ## Image targets
//!
//! A target is `all`, a cluster name (the configured images its containers
//! use) or an image name, checked in that order. Anything else fails with
//! `DeckingError::UnknownTarget`.
//!
//! Builds run in dependency order: an image whose `Dockerfile` is `FROM`
//! another image of the same target is built after it. Base images outside
//! the target are assumed to exist. Push and pull need no ordering and never
//! read `Dockerfile`s, so they work without the build contexts.
//!
use super::executor::{Executor, Operation};
use super::logs::{self, Ending};
use crate::common::docker::{progress, Engine};
use crate::common::ui::Reporter;
use crate::core::error::{DeckingError, Result};
use crate::core::resolver::resolve;
use crate::core::settings::Settings;
use crate::model::{Image, Model};
use anyhow::{anyhow, Context};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Target naming every configured image.
pub const ALL_TARGET: &str = "all";

pub struct Decking<'a> {
    model: Model,
    engine: &'a dyn Engine,
    reporter: &'a dyn Reporter,
    settings: Settings,
    cancel: CancellationToken,
}

impl<'a> Decking<'a> {
    pub fn new(model: Model, engine: &'a dyn Engine, reporter: &'a dyn Reporter, settings: Settings) -> Self {
        Self {
            model,
            engine,
            reporter,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn executor(&self) -> Executor<'a> {
        Executor::new(self.engine, self.reporter)
            .with_stop_grace(self.settings.stop_grace())
            .with_cooldown(self.settings.cooldown())
            .with_cancellation(self.cancel.clone())
    }

    fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(anyhow!(DeckingError::Interrupted));
        }
        Ok(())
    }

    /// Runs `operation` on the cluster named `cluster`.
    pub async fn execute(&self, cluster: &str, operation: Operation) -> Result<Vec<String>> {
        let cluster = self.model.cluster(cluster)?;
        self.executor().execute(cluster, operation).await
    }

    /// Like `execute`, with the operation given by its verb.
    #[allow(dead_code)] // The CLI maps its subcommands to operations directly.
    pub async fn dispatch(&self, verb: &str, cluster: &str) -> Result<Vec<String>> {
        let operation: Operation = verb.parse()?;
        self.execute(cluster, operation).await
    }

    /// Streams the output of every container of `cluster`.
    pub async fn attach(&self, cluster: &str) -> Result<Ending> {
        let cluster = self.model.cluster(cluster)?;
        let ordered = cluster.ordered()?;
        let names: Vec<&str> = ordered.iter().map(|c| c.name()).collect();
        logs::attach_all(self.engine, &names, self.reporter, self.cancel.clone()).await
    }

    /// The images a target names, without duplicates.
    pub fn images_for(&self, target: &str) -> Result<Vec<Arc<Image>>> {
        if target == ALL_TARGET {
            return Ok(self.model.images.values().cloned().collect());
        }
        if let Some(cluster) = self.model.clusters.get(target) {
            let mut seen = HashSet::new();
            return Ok(cluster
                .containers
                .iter()
                .filter_map(|container| self.model.images.get(container.image()))
                .filter(|image| seen.insert(image.name.clone()))
                .cloned()
                .collect());
        }
        if let Some(image) = self.model.images.get(target) {
            return Ok(vec![Arc::clone(image)]);
        }
        Err(anyhow!(DeckingError::UnknownTarget(target.to_string())))
    }

    /// Orders `images` so each comes after the image it is built from.
    fn build_order(&self, images: Vec<Arc<Image>>) -> Result<Vec<Arc<Image>>> {
        let selected: HashSet<String> = images.iter().map(|image| image.name.clone()).collect();
        let mut entries = Vec::with_capacity(images.len());
        for image in images {
            let base = image
                .base_image()?
                .map(local_name)
                .filter(|base| selected.contains(*base))
                .map(String::from);
            entries.push((image, base));
        }
        let ordered = resolve(
            entries,
            |(image, _)| image.name.clone(),
            |(_, base)| base.clone(),
        )?;
        Ok(ordered.into_iter().map(|(image, _)| image).collect())
    }

    #[instrument(skip(self))]
    pub async fn build(&self, target: &str) -> Result<Vec<String>> {
        let images = self.build_order(self.images_for(target)?)?;
        let mut built = Vec::with_capacity(images.len());
        for image in images {
            self.checkpoint()?;
            self.reporter.step(&format!("building image '{}'...", image.name));
            let stream = self.engine.build(&image.path, &image.name).await?;
            progress::consume(stream, self.reporter)
                .await
                .with_context(|| format!("Failed to build image '{}'", image.name))?;
            built.push(image.name.clone());
        }
        info!("Built {} image(s) for '{}'", built.len(), target);
        Ok(built)
    }

    /// Tags each image as `registry/name`, pushes it and drops the remote tag.
    #[instrument(skip(self))]
    pub async fn push(&self, target: &str, registry: Option<&str>, insecure: bool) -> Result<Vec<String>> {
        let images = self.images_for(target)?;
        let registry = registry
            .or(self.settings.registry.default.as_deref())
            .ok_or_else(|| {
                anyhow!(DeckingError::Settings(
                    "push needs a registry: pass --registry or set registry.default".to_string()
                ))
            })?;
        let insecure = insecure || self.settings.registry.insecure;

        let mut pushed = Vec::with_capacity(images.len());
        for image in images {
            self.checkpoint()?;
            let remote = format!("{}/{}", registry, image.name);
            self.engine.tag(&image.name, &remote).await?;
            self.reporter.step(&format!("pushing image {}...", remote));
            let stream = self.engine.push(&remote, insecure).await?;
            progress::consume(stream, self.reporter)
                .await
                .with_context(|| format!("Failed to push image '{}'", remote))?;
            self.engine.remove_image(&remote).await?;
            pushed.push(image.name.clone());
        }
        Ok(pushed)
    }

    /// Pulls each image, from `registry` when one is given; a remote image is
    /// re-tagged under its local name.
    #[instrument(skip(self))]
    pub async fn pull(&self, target: &str, registry: Option<&str>, insecure: bool) -> Result<Vec<String>> {
        let images = self.images_for(target)?;
        let registry = registry.or(self.settings.registry.default.as_deref());
        let insecure = insecure || self.settings.registry.insecure;

        let mut pulled = Vec::with_capacity(images.len());
        for image in images {
            self.checkpoint()?;
            let remote = match registry {
                Some(registry) => format!("{}/{}", registry, image.name),
                None => image.name.clone(),
            };
            self.reporter.step(&format!("pulling image {}...", remote));
            let stream = self.engine.pull(&remote, insecure).await?;
            progress::consume(stream, self.reporter)
                .await
                .with_context(|| format!("Failed to pull image '{}'", remote))?;
            if remote != image.name {
                self.engine.tag(&remote, &image.name).await?;
                self.engine.remove_image(&remote).await?;
            }
            pulled.push(image.name.clone());
        }
        Ok(pulled)
    }
}

/// `repo/app:latest` and `repo/app` name the same local image.
fn local_name(reference: &str) -> &str {
    reference.strip_suffix(":latest").unwrap_or(reference)
}
