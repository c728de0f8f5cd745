//! # Decking Docker Container Primitives
//!
//! File: cli/src/common/docker/containers.rs
//!
//! ## Overview
//!
//! The container half of `DockerEngine`: create, start, stop, remove, list and
//! attach, each a thin translation between decking's request types and the
//! bollard API. Errors are wrapped as `DeckingError::EngineApi` with the
//! container named in the context; no error is swallowed here, the executor
//! decides which failures are fatal.
//!
use super::{ContainerInfo, CreateRequest, DockerEngine, HostOptions, LineStream, PublishedPort};
use crate::core::error::{DeckingError, Result};
use anyhow::anyhow;
use bollard::container::{
    AttachContainerOptions, Config as ContainerConfig, CreateContainerOptions, ListContainersOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::models::{ContainerSummary, HostConfig, PortBinding};
use bytes::BytesMut;
use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::codec::{Decoder, LinesCodec};
use tracing::{debug, error, info, instrument, warn};

fn engine_error(e: bollard::errors::Error, action: String) -> anyhow::Error {
    anyhow!(DeckingError::EngineApi { source: e }).context(action)
}

impl DockerEngine {
    #[instrument(skip(self, request), fields(container = %request.name))]
    pub(super) async fn create_container(&self, request: &CreateRequest) -> Result<String> {
        let env: Vec<String> = request
            .environment
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        let exposed_ports: HashMap<String, HashMap<(), ()>> = request
            .exposed_ports()
            .map(|port| (with_protocol(port), HashMap::new()))
            .collect();

        let config = ContainerConfig {
            image: Some(request.image.clone()),
            env: if env.is_empty() { None } else { Some(env) },
            exposed_ports: if exposed_ports.is_empty() { None } else { Some(exposed_ports) },
            host_config: Some(host_config(&request.host)),
            ..Default::default()
        };
        let options = Some(CreateContainerOptions {
            name: request.name.clone(),
            platform: None,
        });

        info!("Creating container '{}' from image '{}'", request.name, request.image);
        let response = self
            .docker
            .create_container(options, config)
            .await
            .map_err(|e| engine_error(e, format!("Failed to create container '{}'", request.name)))?;
        for warning in &response.warnings {
            debug!("Engine warning while creating '{}': {}", request.name, warning);
        }
        Ok(response.id)
    }

    #[instrument(skip(self))]
    pub(super) async fn start_container(&self, id: &str) -> Result<()> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| engine_error(e, format!("Failed to start container '{}'", id)))
    }

    #[instrument(skip(self))]
    pub(super) async fn stop_container(&self, id: &str, grace: Duration) -> Result<()> {
        let options = StopContainerOptions {
            t: grace.as_secs() as i64,
        };
        match self.docker.stop_container(id, Some(options)).await {
            Ok(()) => Ok(()),
            // 304: already stopped.
            Err(bollard::errors::Error::DockerResponseServerError { status_code: 304, .. }) => {
                debug!("Container '{}' was already stopped.", id);
                Ok(())
            }
            Err(e) => {
                error!("Failed to stop container '{}': {:?}", id, e);
                Err(engine_error(e, format!("Failed to stop container '{}'", id)))
            }
        }
    }

    #[instrument(skip(self))]
    pub(super) async fn remove_container(&self, id: &str) -> Result<()> {
        let options = Some(RemoveContainerOptions {
            force: false,
            v: false,
            link: false,
        });
        self.docker
            .remove_container(id, options)
            .await
            .map_err(|e| engine_error(e, format!("Failed to remove container '{}'", id)))
    }

    #[instrument(skip(self))]
    pub(super) async fn list_all_containers(&self) -> Result<Vec<ContainerInfo>> {
        let options = Some(ListContainersOptions::<String> {
            all: true,
            ..Default::default()
        });
        let summaries = self
            .docker
            .list_containers(options)
            .await
            .map_err(|e| engine_error(e, "Failed to list containers".to_string()))?;
        Ok(summaries.into_iter().map(container_info).collect())
    }

    #[instrument(skip(self))]
    pub(super) async fn attach_container(&self, name: &str) -> Result<LineStream> {
        let options = Some(AttachContainerOptions::<String> {
            stdout: Some(true),
            stderr: Some(true),
            stream: Some(true),
            logs: Some(false),
            ..Default::default()
        });
        let attached = self
            .docker
            .attach_container(name, options)
            .await
            .map_err(|e| engine_error(e, format!("Failed to attach to container '{}'", name)))?;

        let owner = name.to_string();
        let frames = attached.output;
        let lines = stream::unfold(Some((frames, LineAssembler::new())), move |state| {
            let owner = owner.clone();
            async move {
                let (mut frames, mut assembler) = state?;
                let batch: Vec<Result<String>> = match frames.next().await {
                    Some(Ok(output)) => {
                        let lines = assembler.push(&output.into_bytes());
                        return Some((lines.into_iter().map(Ok).collect(), Some((frames, assembler))));
                    }
                    Some(Err(e)) => {
                        let mut batch: Vec<Result<String>> = assembler.finish().into_iter().map(Ok).collect();
                        batch.push(Err(engine_error(e, format!("Error reading output of '{}'", owner))));
                        batch
                    }
                    None => assembler.finish().into_iter().map(Ok).collect(),
                };
                Some((batch, None))
            }
        })
        .flat_map(stream::iter)
        .boxed();
        Ok(lines)
    }
}

/// Docker keys ports as `port/protocol`; a bare port is TCP.
fn with_protocol(port: &str) -> String {
    if port.contains('/') {
        port.to_string()
    } else {
        format!("{}/tcp", port)
    }
}

fn host_config(host: &HostOptions) -> HostConfig {
    let binds: Vec<String> = host
        .volume_bindings
        .iter()
        .map(|(host_path, container_path)| format!("{}:{}:rw", host_path, container_path))
        .collect();
    let links: Vec<String> = host
        .links
        .iter()
        .map(|(target, alias)| format!("{}:{}", target, alias))
        .collect();
    let port_bindings: HashMap<String, Option<Vec<PortBinding>>> = host
        .port_bindings
        .iter()
        .map(|(container_port, host_port)| {
            let binding = PortBinding {
                host_ip: None,
                host_port: Some(host_port.clone()),
            };
            (with_protocol(container_port), Some(vec![binding]))
        })
        .collect();

    HostConfig {
        binds: if binds.is_empty() { None } else { Some(binds) },
        links: if links.is_empty() { None } else { Some(links) },
        port_bindings: if port_bindings.is_empty() { None } else { Some(port_bindings) },
        privileged: Some(host.privileged),
        network_mode: host.network_mode.clone(),
        ..Default::default()
    }
}

fn container_info(summary: ContainerSummary) -> ContainerInfo {
    let names = summary
        .names
        .unwrap_or_default()
        .into_iter()
        .map(|name| name.trim_start_matches('/').to_string())
        .collect();
    let ports = summary
        .ports
        .unwrap_or_default()
        .into_iter()
        .map(|port| PublishedPort {
            protocol: port.typ.map(|t| t.to_string()).unwrap_or_else(|| "tcp".to_string()),
            ip: port.ip,
            private_port: port.private_port,
            public_port: port.public_port,
        })
        .collect();
    ContainerInfo {
        id: summary.id.unwrap_or_default(),
        names,
        status: summary.status.unwrap_or_default(),
        ports,
    }
}

/// Reassembles attached output frames into lines. A line split across
/// frames comes out once, when its end arrives.
struct LineAssembler {
    codec: LinesCodec,
    buffer: BytesMut,
}

impl LineAssembler {
    fn new() -> Self {
        Self {
            codec: LinesCodec::new(),
            buffer: BytesMut::new(),
        }
    }

    /// The lines `frame` completes.
    fn push(&mut self, frame: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(frame);
        let mut lines = Vec::new();
        loop {
            match self.codec.decode(&mut self.buffer) {
                Ok(Some(line)) => keep_line(&mut lines, line),
                Ok(None) => break,
                // The offending line has been consumed.
                Err(e) => warn!("Dropped undecodable output line: {}", e),
            }
        }
        lines
    }

    /// The unterminated tail left when the stream ends.
    fn finish(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            match self.codec.decode_eof(&mut self.buffer) {
                Ok(Some(line)) => keep_line(&mut lines, line),
                Ok(None) => break,
                Err(e) => {
                    warn!("Dropped undecodable output line: {}", e);
                    self.buffer.clear();
                    break;
                }
            }
        }
        lines
    }
}

fn keep_line(lines: &mut Vec<String>, line: String) {
    let line = line.trim_end();
    if !line.is_empty() {
        lines.push(line.to_string());
    }
}
