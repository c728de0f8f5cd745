//! # Decking Test Doubles
//!
//! File: cli/src/testing.rs
//!
//! In-memory `Engine` and `Reporter` implementations shared by the unit
//! tests. `RecordingEngine` behaves like a tiny container engine: created
//! containers show up in `list_containers`, start/stop change their status and
//! remove deletes them. Every call is recorded so tests can assert on order and
//! count.
//!
use crate::common::docker::{
    ContainerInfo, CreateRequest, Engine, LineStream, ProgressEvent, ProgressStream,
};
use crate::common::ui::Reporter;
use crate::core::error::{DeckingError, Result};
use anyhow::anyhow;
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Build { context: PathBuf, tag: String },
    Create(CreateRequest),
    Start(String),
    Stop { id: String, grace: Duration },
    Remove(String),
    Tag { source: String, target: String },
    Push { image: String, insecure: bool },
    Pull { image: String, insecure: bool },
    RemoveImage(String),
    List,
    Attach(String),
}

#[derive(Default)]
struct EngineState {
    calls: Vec<EngineCall>,
    containers: Vec<ContainerInfo>,
    failures: HashSet<(&'static str, String)>,
    attach_lines: HashMap<String, Vec<String>>,
    held_streams: HashSet<String>,
    progress: Vec<ProgressEvent>,
}

#[derive(Default)]
pub struct RecordingEngine {
    state: Mutex<EngineState>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a container the engine already knows about.
    pub fn with_container(self, name: &str, status: &str) -> Self {
        self.state.lock().unwrap().containers.push(ContainerInfo {
            id: format!("{}-0123456789abcdef", name),
            names: vec![name.to_string()],
            status: status.to_string(),
            ports: vec![],
        });
        self
    }

    pub fn with_listed(self, info: ContainerInfo) -> Self {
        self.state.lock().unwrap().containers.push(info);
        self
    }

    /// Makes `operation` (`create`, `start`, `stop`, `remove`, `tag`, `push`,
    /// `pull`, `build`, `attach`) fail for `target` (a container name, an id or
    /// an image reference).
    pub fn failing(self, operation: &'static str, target: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert((operation, target.to_string()));
        self
    }

    /// Lines `attach` returns for `name` before the stream ends.
    pub fn with_attach_lines(self, name: &str, lines: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .attach_lines
            .insert(name.to_string(), lines.iter().map(|l| l.to_string()).collect());
        self
    }

    /// Keeps the attach stream of `name` open after its lines.
    pub fn holding_stream(self, name: &str) -> Self {
        self.state.lock().unwrap().held_streams.insert(name.to_string());
        self
    }

    /// Events every build/push/pull stream yields.
    pub fn with_progress(self, events: Vec<ProgressEvent>) -> Self {
        self.state.lock().unwrap().progress = events;
        self
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls other than `List`, which every cluster operation starts with.
    pub fn mutations(&self) -> Vec<EngineCall> {
        self.calls()
            .into_iter()
            .filter(|call| *call != EngineCall::List)
            .collect()
    }

    pub fn created_names(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::Create(request) => Some(request.name),
                _ => None,
            })
            .collect()
    }

    pub fn create_request(&self, name: &str) -> Option<CreateRequest> {
        self.calls().into_iter().find_map(|call| match call {
            EngineCall::Create(request) if request.name == name => Some(request),
            _ => None,
        })
    }

    pub fn count(&self, matches: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls().iter().filter(|call| matches(call)).count()
    }

    fn record(&self, call: EngineCall) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn check(&self, operation: &'static str, target: &str) -> Result<()> {
        let state = self.state.lock().unwrap();
        let fails = state.failures.contains(&(operation, target.to_string()))
            || state.containers.iter().any(|info| {
                info.id == target
                    && info
                        .names
                        .iter()
                        .any(|name| state.failures.contains(&(operation, name.clone())))
            });
        if fails {
            return Err(anyhow!(DeckingError::EngineApi {
                source: bollard::errors::Error::DockerResponseServerError {
                    status_code: 500,
                    message: format!("{} {} failed", operation, target),
                },
            }));
        }
        Ok(())
    }

    fn set_status(&self, id: &str, status: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(info) = state.containers.iter_mut().find(|info| info.id == id) {
            info.status = status.to_string();
        }
    }

    fn progress_stream(&self) -> ProgressStream {
        let events = self.state.lock().unwrap().progress.clone();
        stream::iter(events.into_iter().map(Ok)).boxed()
    }
}

#[async_trait]
impl Engine for RecordingEngine {
    async fn build(&self, context: &Path, tag: &str) -> Result<ProgressStream> {
        self.record(EngineCall::Build {
            context: context.to_path_buf(),
            tag: tag.to_string(),
        });
        self.check("build", tag)?;
        Ok(self.progress_stream())
    }

    async fn create(&self, request: &CreateRequest) -> Result<String> {
        self.record(EngineCall::Create(request.clone()));
        self.check("create", &request.name)?;
        let id = format!("id-{}-0123456789", request.name);
        self.state.lock().unwrap().containers.push(ContainerInfo {
            id: id.clone(),
            names: vec![request.name.clone()],
            status: "Created".to_string(),
            ports: vec![],
        });
        Ok(id)
    }

    async fn start(&self, id: &str) -> Result<()> {
        self.record(EngineCall::Start(id.to_string()));
        self.check("start", id)?;
        self.set_status(id, "Up 1 second");
        Ok(())
    }

    async fn stop(&self, id: &str, grace: Duration) -> Result<()> {
        self.record(EngineCall::Stop {
            id: id.to_string(),
            grace,
        });
        self.check("stop", id)?;
        self.set_status(id, "Exited (0) 1 second ago");
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.record(EngineCall::Remove(id.to_string()));
        self.check("remove", id)?;
        self.state.lock().unwrap().containers.retain(|info| info.id != id);
        Ok(())
    }

    async fn tag(&self, source: &str, target: &str) -> Result<()> {
        self.record(EngineCall::Tag {
            source: source.to_string(),
            target: target.to_string(),
        });
        self.check("tag", target)
    }

    async fn push(&self, image: &str, insecure: bool) -> Result<ProgressStream> {
        self.record(EngineCall::Push {
            image: image.to_string(),
            insecure,
        });
        self.check("push", image)?;
        Ok(self.progress_stream())
    }

    async fn pull(&self, image: &str, insecure: bool) -> Result<ProgressStream> {
        self.record(EngineCall::Pull {
            image: image.to_string(),
            insecure,
        });
        self.check("pull", image)?;
        Ok(self.progress_stream())
    }

    async fn remove_image(&self, image: &str) -> Result<()> {
        self.record(EngineCall::RemoveImage(image.to_string()));
        self.check("remove_image", image)
    }

    async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        self.record(EngineCall::List);
        Ok(self.state.lock().unwrap().containers.clone())
    }

    async fn attach(&self, name: &str) -> Result<LineStream> {
        self.record(EngineCall::Attach(name.to_string()));
        self.check("attach", name)?;
        let (lines, held) = {
            let state = self.state.lock().unwrap();
            (
                state.attach_lines.get(name).cloned().unwrap_or_default(),
                state.held_streams.contains(name),
            )
        };
        let lines = stream::iter(lines.into_iter().map(Ok));
        if held {
            Ok(lines.chain(stream::pending()).boxed())
        } else {
            Ok(lines.boxed())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Step(String),
    Line(String),
    Warning(String),
    Error(String, Option<String>),
}

#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<Report>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }

    pub fn steps(&self) -> Vec<String> {
        self.collect(|report| match report {
            Report::Step(title) => Some(title),
            _ => None,
        })
    }

    pub fn lines(&self) -> Vec<String> {
        self.collect(|report| match report {
            Report::Line(line) => Some(line),
            _ => None,
        })
    }

    pub fn warnings(&self) -> Vec<String> {
        self.collect(|report| match report {
            Report::Warning(title) => Some(title),
            _ => None,
        })
    }

    pub fn errors(&self) -> Vec<String> {
        self.collect(|report| match report {
            Report::Error(title, _) => Some(title),
            _ => None,
        })
    }

    fn collect(&self, pick: impl Fn(Report) -> Option<String>) -> Vec<String> {
        self.reports().into_iter().filter_map(pick).collect()
    }

    fn push(&self, report: Report) {
        self.reports.lock().unwrap().push(report);
    }
}

impl Reporter for RecordingReporter {
    fn step(&self, title: &str) {
        self.push(Report::Step(title.to_string()));
    }

    fn line(&self, line: &str) {
        self.push(Report::Line(line.to_string()));
    }

    fn warning(&self, title: &str) {
        self.push(Report::Warning(title.to_string()));
    }

    fn error(&self, title: &str, detail: Option<&str>) {
        self.push(Report::Error(title.to_string(), detail.map(String::from)));
    }
}
