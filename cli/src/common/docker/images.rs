//! # Decking Docker Image Primitives
//!
//! File: cli/src/common/docker/images.rs
//!
//! ## Overview
//!
//! The image half of `DockerEngine`: build, tag, push, pull and remove.
//! Build, push and pull return a `ProgressStream` of decking's own
//! `ProgressEvent`s; consuming the stream (and failing on an error event) is
//! the caller's job, see `progress::consume`.
//!
//! bollard's progress streams borrow the client. Each one is driven on its
//! own task holding a clone of the client, and its events are relayed over a
//! bounded channel, so the returned stream owns everything it needs.
//!
//! The Docker API no longer accepts a per-request "insecure registry" flag:
//! insecure registries are declared in the daemon configuration. The flag is
//! still accepted so other engines can honour it, and is logged here.
//!
use super::{split_reference, DockerEngine, ProgressEvent, ProgressStream};
use crate::common::archive::tar::create_context_tar;
use crate::core::error::{DeckingError, Result};
use anyhow::{anyhow, Context};
use bollard::image::{BuildImageOptions, CreateImageOptions, PushImageOptions, RemoveImageOptions, TagImageOptions};
use bollard::models::{BuildInfo, CreateImageInfo, PushImageInfo};
use bollard::Docker;
use futures_util::stream::{self, Stream, StreamExt};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Progress events buffered between a relay task and its consumer.
const PROGRESS_BUFFER: usize = 64;

fn engine_error(e: bollard::errors::Error, action: String) -> anyhow::Error {
    anyhow!(DeckingError::EngineApi { source: e }).context(action)
}

fn warn_insecure(insecure: bool, image: &str) {
    if insecure {
        warn!(
            "Insecure registry access for '{}' must be allowed in the Docker daemon configuration.",
            image
        );
    }
}

impl DockerEngine {
    #[instrument(skip(self, context), fields(context = %context.display()))]
    pub(super) async fn build_image(&self, context: &Path, tag: &str) -> Result<ProgressStream> {
        let tar_gz = create_context_tar(context).context("Failed to create build context tarball")?;
        let options = BuildImageOptions {
            dockerfile: "Dockerfile".to_string(),
            t: tag.to_string(),
            rm: true,
            ..Default::default()
        };
        info!("Starting image build for tag: {}", tag);
        let action = format!("Failed to build image '{}'", tag);
        Ok(relay(self.docker.clone(), move |docker, tx| async move {
            let source = docker.build_image(options, None, Some(tar_gz.into()));
            pump(source, tx, build_event, action).await;
        }))
    }

    #[instrument(skip(self))]
    pub(super) async fn tag_image(&self, source: &str, target: &str) -> Result<()> {
        let (repo, tag) = split_reference(target);
        let options = Some(TagImageOptions {
            repo: repo.to_string(),
            tag: tag.to_string(),
        });
        self.docker
            .tag_image(source, options)
            .await
            .map_err(|e| engine_error(e, format!("Failed to tag image '{}' as '{}'", source, target)))
    }

    #[instrument(skip(self))]
    pub(super) async fn push_image(&self, image: &str, insecure: bool) -> Result<ProgressStream> {
        warn_insecure(insecure, image);
        let (repo, tag) = split_reference(image);
        let options = Some(PushImageOptions { tag: tag.to_string() });
        let repo = repo.to_string();
        let action = format!("Failed to push image '{}'", image);
        Ok(relay(self.docker.clone(), move |docker, tx| async move {
            let source = docker.push_image(&repo, options, None);
            pump(source, tx, push_event, action).await;
        }))
    }

    #[instrument(skip(self))]
    pub(super) async fn pull_image(&self, image: &str, insecure: bool) -> Result<ProgressStream> {
        warn_insecure(insecure, image);
        let (repo, tag) = split_reference(image);
        let options = Some(CreateImageOptions {
            from_image: repo.to_string(),
            tag: tag.to_string(),
            ..Default::default()
        });
        let action = format!("Failed to pull image '{}'", image);
        Ok(relay(self.docker.clone(), move |docker, tx| async move {
            let source = docker.create_image(options, None, None);
            pump(source, tx, pull_event, action).await;
        }))
    }

    #[instrument(skip(self))]
    pub(super) async fn remove_image_reference(&self, image: &str) -> Result<()> {
        let options = Some(RemoveImageOptions {
            force: false,
            noprune: true,
        });
        let removed = self
            .docker
            .remove_image(image, options, None)
            .await
            .map_err(|e| engine_error(e, format!("Failed to remove image '{}'", image)))?;
        debug!("Removed image reference '{}': {:?}", image, removed);
        Ok(())
    }
}

type ProgressSender = mpsc::Sender<Result<ProgressEvent>>;

/// Spawns `drive` with its own client and a sender, and returns the stream of
/// what it sends. Dropping the stream ends the task at its next send.
fn relay<F, Fut>(docker: Docker, drive: F) -> ProgressStream
where
    F: FnOnce(Docker, ProgressSender) -> Fut,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(PROGRESS_BUFFER);
    tokio::spawn(drive(docker, tx));
    receiver_stream(rx)
}

fn receiver_stream(rx: mpsc::Receiver<Result<ProgressEvent>>) -> ProgressStream {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed()
}

/// Forwards `source` into `tx`, mapping each item with `to_event` and each
/// failure to an engine error with `action` as context.
async fn pump<S, T, M>(source: S, tx: ProgressSender, to_event: M, action: String)
where
    S: Stream<Item = std::result::Result<T, bollard::errors::Error>>,
    M: Fn(T) -> ProgressEvent,
{
    let mut source = std::pin::pin!(source);
    while let Some(item) = source.next().await {
        let event = item.map(&to_event).map_err(|e| engine_error(e, action.clone()));
        if tx.send(event).await.is_err() {
            debug!("Progress consumer went away: {}", action);
            return;
        }
    }
}

fn build_event(info: BuildInfo) -> ProgressEvent {
    match info {
        BuildInfo { error: Some(err), error_detail, .. } => {
            let detail = error_detail.and_then(|d| d.message).unwrap_or_default();
            if detail.is_empty() || detail == err {
                ProgressEvent::Error(err)
            } else {
                ProgressEvent::Error(format!("{} - {}", err, detail))
            }
        }
        BuildInfo { stream: Some(s), .. } => ProgressEvent::Output(s),
        BuildInfo { status: Some(s), .. } => ProgressEvent::Status(s),
        other => ProgressEvent::Status(format!("{:?}", other)),
    }
}

fn push_event(info: PushImageInfo) -> ProgressEvent {
    match info {
        PushImageInfo { error: Some(err), .. } => ProgressEvent::Error(err),
        PushImageInfo { status: Some(s), progress, .. } => {
            ProgressEvent::Status(progress.map_or(s.clone(), |p| format!("{} {}", s, p)))
        }
        other => ProgressEvent::Status(format!("{:?}", other)),
    }
}

fn pull_event(info: CreateImageInfo) -> ProgressEvent {
    match info {
        CreateImageInfo { error: Some(err), .. } => ProgressEvent::Error(err),
        CreateImageInfo { status: Some(s), id, .. } => match id {
            Some(id) => ProgressEvent::Status(format!("{}: {}", id, s)),
            None => ProgressEvent::Status(s),
        },
        other => ProgressEvent::Status(format!("{:?}", other)),
    }
}
