//! # Decking Cluster Executor
//!
//! File: cli/src/orchestration/executor.rs
//!
//! ## Overview
//!
//! Runs one `Operation` across the containers of a cluster, strictly one
//! container at a time:
//!
//! - `create`, `start`, `run` and `status` walk the members in dependency
//!   order; `stop` and `remove` walk them in reverse so dependents go first.
//! - `start` and `run` pause for the configured cooldown between dependency
//!   waves, a crude readiness heuristic since the engine is not polled.
//! - `restart` is a full `stop` followed by a full `start`.
//!
//! Live container information is queried once per operation into a
//! `LiveState` side-table and updated as containers are created or removed.
//! The table also covers containers outside the cluster that members link
//! to, so those can be linked when they already exist.
//!
//! ## Failure policy
//!
//! Engine errors while creating or starting abort the rest of the sequence,
//! since later containers may depend on the failed one. Engine errors while
//! stopping or removing are reported and the executor moves on, so teardown
//! gets as far as it can. `NotCreated` aborts the sequence without undoing the
//! work already done.
//!
//! Every operation returns the names of the containers it went through, in
//! order.
//!
use super::live::LiveState;
use crate::common::docker::{ContainerInfo, CreateRequest, Engine, HostOptions, PublishedPort};
use crate::common::ui::Reporter;
use crate::core::error::{is_engine_error, DeckingError, Result};
use crate::model::{Cluster, Container, Group};
use anyhow::{anyhow, Context};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// The cluster verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Start,
    Run,
    Stop,
    Restart,
    Remove,
    Status,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::Create,
        Operation::Start,
        Operation::Run,
        Operation::Stop,
        Operation::Restart,
        Operation::Remove,
        Operation::Status,
    ];

    pub fn verb(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Start => "start",
            Operation::Run => "run",
            Operation::Stop => "stop",
            Operation::Restart => "restart",
            Operation::Remove => "remove",
            Operation::Status => "status",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

impl FromStr for Operation {
    type Err = DeckingError;

    fn from_str(verb: &str) -> std::result::Result<Self, Self::Err> {
        if verb == "rm" {
            return Ok(Operation::Remove);
        }
        Operation::ALL
            .into_iter()
            .find(|operation| operation.verb() == verb)
            .ok_or_else(|| DeckingError::UnsupportedOperation(verb.to_string()))
    }
}

pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(8);
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(6);

pub struct Executor<'a> {
    engine: &'a dyn Engine,
    reporter: &'a dyn Reporter,
    stop_grace: Duration,
    cooldown: Duration,
    cancel: CancellationToken,
}

impl<'a> Executor<'a> {
    pub fn new(engine: &'a dyn Engine, reporter: &'a dyn Reporter) -> Self {
        Self {
            engine,
            reporter,
            stop_grace: DEFAULT_STOP_GRACE,
            cooldown: DEFAULT_COOLDOWN,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Cancelling `token` stops the operation before the next container.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    #[instrument(skip(self, cluster), fields(cluster = %cluster.name))]
    pub async fn execute(&self, cluster: &Cluster, operation: Operation) -> Result<Vec<String>> {
        let waves = cluster.waves()?;
        let mut live = LiveState::query(self.engine, &cluster.linked_names()).await?;
        let group = cluster.group.as_deref();
        info!("Running '{}' on cluster '{}'", operation, cluster.name);

        let mut processed = Vec::new();
        match operation {
            Operation::Create => {
                for container in waves.iter().flatten() {
                    self.checkpoint()?;
                    self.create(container, group, &mut live).await?;
                    processed.push(container.name().to_string());
                }
            }
            Operation::Start => self.start_waves(&waves, &live, &mut processed).await?,
            Operation::Run => {
                for (index, wave) in waves.iter().enumerate() {
                    if index > 0 {
                        self.cool_down().await?;
                    }
                    for container in wave {
                        self.checkpoint()?;
                        self.create(container, group, &mut live).await?;
                        self.start(container, &live).await?;
                        processed.push(container.name().to_string());
                    }
                }
            }
            Operation::Stop => self.stop_all(&cluster.teardown_order()?, &live, &mut processed).await?,
            Operation::Restart => {
                self.stop_all(&cluster.teardown_order()?, &live, &mut processed).await?;
                self.start_waves(&waves, &live, &mut processed).await?;
            }
            Operation::Remove => {
                for container in cluster.teardown_order()? {
                    self.checkpoint()?;
                    self.remove(&container, &mut live).await?;
                    processed.push(container.name().to_string());
                }
            }
            Operation::Status => {
                for container in waves.iter().flatten() {
                    self.status(container, &live);
                    processed.push(container.name().to_string());
                }
            }
        }
        debug!("'{}' processed {:?}", operation, processed);
        Ok(processed)
    }

    async fn start_waves(
        &self,
        waves: &[Vec<Arc<Container>>],
        live: &LiveState,
        processed: &mut Vec<String>,
    ) -> Result<()> {
        for (index, wave) in waves.iter().enumerate() {
            if index > 0 {
                self.cool_down().await?;
            }
            for container in wave {
                self.checkpoint()?;
                self.start(container, live).await?;
                processed.push(container.name().to_string());
            }
        }
        Ok(())
    }

    async fn stop_all(&self, teardown: &[Arc<Container>], live: &LiveState, processed: &mut Vec<String>) -> Result<()> {
        for container in teardown {
            self.checkpoint()?;
            self.stop(container, live).await?;
            processed.push(container.name().to_string());
        }
        Ok(())
    }

    fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(anyhow!(DeckingError::Interrupted));
        }
        Ok(())
    }

    async fn cool_down(&self) -> Result<()> {
        if self.cooldown.is_zero() {
            return Ok(());
        }
        debug!("Waiting {:?} before the next wave", self.cooldown);
        tokio::select! {
            _ = tokio::time::sleep(self.cooldown) => Ok(()),
            _ = self.cancel.cancelled() => Err(anyhow!(DeckingError::Interrupted)),
        }
    }

    #[instrument(skip_all, fields(container = %container.name()))]
    async fn create(&self, container: &Container, group: Option<&Group>, live: &mut LiveState) -> Result<()> {
        let name = container.name();
        if let Some(info) = live.get(name) {
            self.reporter
                .step(&format!("'{}' is already created ({})", name, info.short_id()));
            return Ok(());
        }
        self.reporter.step(&format!("creating container '{}'...", name));

        let effective = container.effective(group);
        let links = container
            .links
            .iter()
            .map(|link| {
                let target = link.container.name();
                live.get(target)
                    .map(|info| (info.id.clone(), link.alias.clone()))
                    .ok_or_else(|| anyhow!(DeckingError::NotCreated { name: target.to_string() }))
            })
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("Container '{}' can't be linked to its dependencies", name))?;
        let request = CreateRequest {
            image: container.image().to_string(),
            name: name.to_string(),
            environment: effective.environment,
            host: HostOptions {
                volume_bindings: effective.volume_bindings,
                links,
                port_bindings: effective.port_bindings,
                privileged: effective.privileged.unwrap_or(false),
                network_mode: effective.net,
            },
        };

        let id = self
            .engine
            .create(&request)
            .await
            .with_context(|| format!("Failed to create container '{}'", name))?;
        let info = ContainerInfo {
            id,
            names: vec![name.to_string()],
            status: "Created".to_string(),
            ports: Vec::new(),
        };
        self.reporter.line(&format!("({})", info.short_id()));
        live.record(name, info);
        Ok(())
    }

    #[instrument(skip_all, fields(container = %container.name()))]
    async fn start(&self, container: &Container, live: &LiveState) -> Result<()> {
        let name = container.name();
        let info = live
            .get(name)
            .ok_or_else(|| anyhow!(DeckingError::NotCreated { name: name.to_string() }))?;
        self.reporter
            .step(&format!("starting container '{}' ({})...", name, info.short_id()));
        self.engine
            .start(&info.id)
            .await
            .with_context(|| format!("Failed to start container '{}'", name))
    }

    #[instrument(skip_all, fields(container = %container.name()))]
    async fn stop(&self, container: &Container, live: &LiveState) -> Result<()> {
        let name = container.name();
        let Some(info) = live.get(name) else {
            debug!("'{}' isn't created, nothing to stop", name);
            return Ok(());
        };
        self.reporter
            .step(&format!("stopping container '{}' ({})...", name, info.short_id()));
        if let Err(e) = self.engine.stop(&info.id, self.stop_grace).await {
            self.isolate(e, format!("couldn't stop container '{}' ({})", name, info.short_id()))?;
        }
        Ok(())
    }

    #[instrument(skip_all, fields(container = %container.name()))]
    async fn remove(&self, container: &Container, live: &mut LiveState) -> Result<()> {
        let name = container.name();
        let Some(info) = live.get(name) else {
            self.reporter
                .warning(&format!("container '{}' isn't created, nothing to remove", name));
            return Ok(());
        };
        let id = info.id.clone();
        let short_id = info.short_id().to_string();
        self.reporter
            .step(&format!("removing container '{}' ({})...", name, short_id));
        match self.engine.remove(&id).await {
            Ok(()) => live.forget(name),
            Err(e) => self.isolate(e, format!("couldn't remove container '{}' ({})", name, short_id))?,
        }
        Ok(())
    }

    fn status(&self, container: &Container, live: &LiveState) {
        let name = container.name();
        match live.get(name) {
            None => self.reporter.step(&format!("container '{}' isn't created", name)),
            Some(info) => {
                let title = format!("'{}' ({}): {}", name, info.short_id(), info.status);
                if info.is_up() {
                    self.reporter.step(&title);
                } else {
                    self.reporter.warning(&title);
                }
                for port in &info.ports {
                    self.reporter.line(&format_port(port));
                }
            }
        }
    }

    /// Reports an engine failure and swallows it; anything else propagates.
    fn isolate(&self, err: anyhow::Error, title: String) -> Result<()> {
        if !is_engine_error(&err) {
            return Err(err);
        }
        warn!("{}: {:#}", title, err);
        self.reporter.error(&title, Some(&format!("{:#}", err)));
        Ok(())
    }
}

/// `tcp 0.0.0.0 [80=>8080]` for a published port, `tcp [80]` otherwise.
pub fn format_port(port: &PublishedPort) -> String {
    match (&port.ip, port.public_port) {
        (Some(ip), Some(public)) => format!("{} {} [{}=>{}]", port.protocol, ip, port.private_port, public),
        _ => format!("{} [{}]", port.protocol, port.private_port),
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::definition::{definition_from_value, LoadedDefinition};
    use crate::model::Model;
    use crate::testing::{EngineCall, RecordingEngine, RecordingReporter};
    use serde_json::{json, Value};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn model(document: Value) -> Model {
        Model::from_definition(&LoadedDefinition {
            definition: definition_from_value(document).unwrap(),
            base_dir: PathBuf::from("/project"),
        })
        .unwrap()
    }

    fn office() -> Model {
        model(json!({
            "containers": {
                "bob": {"image": "repo/bob", "port": ["8080:80"]},
                "alice": {"image": "repo/alice", "dependencies": ["bob:bob_alias"]}
            },
            "clusters": {"office": ["alice", "bob"]}
        }))
    }

    fn executor<'a>(engine: &'a RecordingEngine, reporter: &'a RecordingReporter) -> Executor<'a> {
        Executor::new(engine, reporter).with_cooldown(Duration::ZERO)
    }

    fn kind(err: &anyhow::Error) -> Option<&DeckingError> {
        err.downcast_ref::<DeckingError>()
    }

    #[test]
    fn test_operation_from_str() {
        assert_eq!("create".parse::<Operation>().unwrap(), Operation::Create);
        assert_eq!("rm".parse::<Operation>().unwrap(), Operation::Remove);
        assert_eq!("restart".parse::<Operation>().unwrap(), Operation::Restart);
        for operation in Operation::ALL {
            assert_eq!(operation.to_string().parse::<Operation>().unwrap(), operation);
        }
        let err = "explode".parse::<Operation>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported operation 'explode'");
    }

    #[tokio::test]
    async fn test_create_follows_dependency_order_and_links_aliases() {
        let model = office();
        let engine = RecordingEngine::new();
        let reporter = RecordingReporter::default();
        let processed = executor(&engine, &reporter)
            .execute(model.cluster("office").unwrap(), Operation::Create)
            .await
            .unwrap();

        assert_eq!(processed, vec!["bob", "alice"]);
        assert_eq!(engine.created_names(), vec!["bob", "alice"]);

        let bob = engine.create_request("bob").unwrap();
        assert_eq!(bob.image, "repo/bob");
        assert_eq!(bob.host.port_bindings, BTreeMap::from([("80".to_string(), "8080".to_string())]));
        let alice = engine.create_request("alice").unwrap();
        assert_eq!(
            alice.host.links,
            vec![("id-bob-0123456789".to_string(), "bob_alias".to_string())]
        );
        assert_eq!(
            reporter.steps(),
            vec!["creating container 'bob'...", "creating container 'alice'..."]
        );
        assert_eq!(reporter.lines(), vec!["(id-bob-01234)", "(id-alice-012)"]);
    }

    fn split_office() -> Model {
        model(json!({
            "containers": {
                "db": {"image": "repo/db"},
                "api": {"image": "repo/api", "dependencies": ["db:database"]}
            },
            "clusters": {"back": ["db"], "front": ["api"]}
        }))
    }

    #[tokio::test]
    async fn test_create_links_to_existing_container_outside_the_cluster() {
        let model = split_office();
        let engine = RecordingEngine::new().with_container("db", "Up 1 minute");
        let reporter = RecordingReporter::default();
        let processed = executor(&engine, &reporter)
            .execute(model.cluster("front").unwrap(), Operation::Create)
            .await
            .unwrap();

        assert_eq!(processed, vec!["api"]);
        assert_eq!(engine.created_names(), vec!["api"]);
        let api = engine.create_request("api").unwrap();
        assert_eq!(
            api.host.links,
            vec![("db-0123456789abcdef".to_string(), "database".to_string())]
        );
    }

    #[tokio::test]
    async fn test_create_fails_when_outside_dependency_is_missing() {
        let model = split_office();
        let engine = RecordingEngine::new();
        let reporter = RecordingReporter::default();
        let err = executor(&engine, &reporter)
            .execute(model.cluster("front").unwrap(), Operation::Create)
            .await
            .unwrap_err();

        assert!(matches!(kind(&err), Some(DeckingError::NotCreated { name }) if name == "db"));
        assert!(err.to_string().contains("Container 'api' can't be linked"));
        assert!(engine.created_names().is_empty());
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let model = office();
        let engine = RecordingEngine::new();
        let reporter = RecordingReporter::default();
        let executor = executor(&engine, &reporter);
        let cluster = model.cluster("office").unwrap();
        executor.execute(cluster, Operation::Create).await.unwrap();
        executor.execute(cluster, Operation::Create).await.unwrap();

        assert_eq!(engine.created_names(), vec!["bob", "alice"]);
        assert!(reporter
            .steps()
            .contains(&"'bob' is already created (id-bob-01234)".to_string()));
    }

    #[tokio::test]
    async fn test_start_requires_creation() {
        let model = office();
        let engine = RecordingEngine::new();
        let reporter = RecordingReporter::default();
        let err = executor(&engine, &reporter)
            .execute(model.cluster("office").unwrap(), Operation::Start)
            .await
            .unwrap_err();
        assert!(matches!(kind(&err), Some(DeckingError::NotCreated { name }) if name == "bob"));
        assert_eq!(engine.count(|call| matches!(call, EngineCall::Start(_))), 0);
    }

    #[tokio::test]
    async fn test_group_overrides_are_merged_per_container() {
        let model = model(json!({
            "containers": {
                "x": {"image": "repo/x", "env": ["C=3"]},
                "y": {"image": "repo/y", "env": ["A=0"], "net": "bridge"}
            },
            "groups": {
                "fluffy": {
                    "options": {"env": ["A=1", "B=2"]},
                    "containers": {"x": {"env": ["B=9"], "privileged": true}}
                }
            },
            "clusters": {"pets": {"group": "fluffy", "containers": ["x", "y"]}}
        }));
        let engine = RecordingEngine::new();
        let reporter = RecordingReporter::default();
        executor(&engine, &reporter)
            .execute(model.cluster("pets").unwrap(), Operation::Create)
            .await
            .unwrap();

        let env = |pairs: &[(&str, &str)]| -> BTreeMap<String, String> {
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
        };
        let x = engine.create_request("x").unwrap();
        assert_eq!(x.environment, env(&[("A", "1"), ("B", "9"), ("C", "3")]));
        assert!(x.host.privileged);
        let y = engine.create_request("y").unwrap();
        assert_eq!(y.environment, env(&[("A", "1"), ("B", "2")]));
        assert!(!y.host.privileged);
        assert_eq!(y.host.network_mode.as_deref(), Some("bridge"));
    }

    #[tokio::test]
    async fn test_run_creates_then_starts_each_container() {
        let model = office();
        let engine = RecordingEngine::new();
        let reporter = RecordingReporter::default();
        let processed = executor(&engine, &reporter)
            .execute(model.cluster("office").unwrap(), Operation::Run)
            .await
            .unwrap();
        assert_eq!(processed, vec!["bob", "alice"]);

        let sequence: Vec<String> = engine
            .mutations()
            .into_iter()
            .map(|call| match call {
                EngineCall::Create(request) => format!("create {}", request.name),
                EngineCall::Start(id) => format!("start {}", id),
                other => format!("{:?}", other),
            })
            .collect();
        assert_eq!(
            sequence,
            vec![
                "create bob",
                "start id-bob-0123456789",
                "create alice",
                "start id-alice-0123456789"
            ]
        );
    }

    #[tokio::test]
    async fn test_stop_runs_in_reverse_order_with_grace() {
        let model = office();
        let engine = RecordingEngine::new()
            .with_container("bob", "Up 1 minute")
            .with_container("alice", "Up 1 minute");
        let reporter = RecordingReporter::default();
        let processed = executor(&engine, &reporter)
            .with_stop_grace(Duration::from_secs(3))
            .execute(model.cluster("office").unwrap(), Operation::Stop)
            .await
            .unwrap();

        assert_eq!(processed, vec!["alice", "bob"]);
        assert_eq!(
            engine.mutations(),
            vec![
                EngineCall::Stop {
                    id: "alice-0123456789abcdef".into(),
                    grace: Duration::from_secs(3)
                },
                EngineCall::Stop {
                    id: "bob-0123456789abcdef".into(),
                    grace: Duration::from_secs(3)
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_stop_skips_containers_that_were_never_created() {
        let model = office();
        let engine = RecordingEngine::new().with_container("bob", "Up 1 minute");
        let reporter = RecordingReporter::default();
        let processed = executor(&engine, &reporter)
            .execute(model.cluster("office").unwrap(), Operation::Stop)
            .await
            .unwrap();
        assert_eq!(processed, vec!["alice", "bob"]);
        assert_eq!(engine.count(|call| matches!(call, EngineCall::Stop { .. })), 1);
    }

    #[tokio::test]
    async fn test_remove_failure_is_reported_and_teardown_continues() {
        let model = office();
        let engine = RecordingEngine::new()
            .with_container("bob", "Exited (0)")
            .with_container("alice", "Exited (0)")
            .failing("remove", "alice");
        let reporter = RecordingReporter::default();
        let processed = executor(&engine, &reporter)
            .execute(model.cluster("office").unwrap(), Operation::Remove)
            .await
            .unwrap();

        assert_eq!(processed, vec!["alice", "bob"]);
        assert_eq!(engine.count(|call| matches!(call, EngineCall::Remove(_))), 2);
        assert_eq!(
            reporter.errors(),
            vec!["couldn't remove container 'alice' (alice-012345)"]
        );
    }

    #[tokio::test]
    async fn test_stop_failure_is_reported_and_teardown_continues() {
        let model = office();
        let engine = RecordingEngine::new()
            .with_container("bob", "Up 1 minute")
            .with_container("alice", "Up 1 minute")
            .failing("stop", "alice");
        let reporter = RecordingReporter::default();
        let processed = executor(&engine, &reporter)
            .execute(model.cluster("office").unwrap(), Operation::Stop)
            .await
            .unwrap();

        assert_eq!(processed, vec!["alice", "bob"]);
        assert_eq!(engine.count(|call| matches!(call, EngineCall::Stop { .. })), 2);
        assert_eq!(reporter.errors(), vec!["couldn't stop container 'alice' (alice-012345)"]);
    }

    #[tokio::test]
    async fn test_start_failure_aborts_the_sequence() {
        let model = office();
        let engine = RecordingEngine::new()
            .with_container("bob", "Exited (0)")
            .with_container("alice", "Exited (0)")
            .failing("start", "bob");
        let reporter = RecordingReporter::default();
        let err = executor(&engine, &reporter)
            .execute(model.cluster("office").unwrap(), Operation::Start)
            .await
            .unwrap_err();

        assert!(is_engine_error(&err));
        assert!(err.to_string().contains("Failed to start container 'bob'"));
        assert_eq!(
            engine.mutations(),
            vec![EngineCall::Start("bob-0123456789abcdef".into())]
        );
        assert!(reporter.errors().is_empty());
    }

    #[tokio::test]
    async fn test_run_keeps_the_container_when_start_fails() {
        let model = office();
        let engine = RecordingEngine::new().failing("start", "bob");
        let reporter = RecordingReporter::default();
        let err = executor(&engine, &reporter)
            .execute(model.cluster("office").unwrap(), Operation::Run)
            .await
            .unwrap_err();

        assert!(is_engine_error(&err));
        assert_eq!(engine.created_names(), vec!["bob"]);
        let listed = engine.list_containers().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].names, vec!["bob"]);
        assert_eq!(listed[0].status, "Created");
        assert_eq!(engine.count(|call| matches!(call, EngineCall::Remove(_))), 0);
    }

    #[tokio::test]
    async fn test_remove_without_live_info_warns() {
        let model = office();
        let engine = RecordingEngine::new();
        let reporter = RecordingReporter::default();
        executor(&engine, &reporter)
            .execute(model.cluster("office").unwrap(), Operation::Remove)
            .await
            .unwrap();
        assert!(engine.mutations().is_empty());
        assert_eq!(
            reporter.warnings(),
            vec![
                "container 'alice' isn't created, nothing to remove",
                "container 'bob' isn't created, nothing to remove"
            ]
        );
    }

    #[tokio::test]
    async fn test_create_failure_aborts_the_sequence() {
        let model = office();
        let engine = RecordingEngine::new().failing("create", "bob");
        let reporter = RecordingReporter::default();
        let err = executor(&engine, &reporter)
            .execute(model.cluster("office").unwrap(), Operation::Create)
            .await
            .unwrap_err();
        assert!(is_engine_error(&err));
        assert_eq!(engine.created_names(), vec!["bob"]);
    }

    #[tokio::test]
    async fn test_restart_stops_everything_then_starts() {
        let model = office();
        let engine = RecordingEngine::new()
            .with_container("bob", "Up 1 minute")
            .with_container("alice", "Up 1 minute");
        let reporter = RecordingReporter::default();
        let processed = executor(&engine, &reporter)
            .execute(model.cluster("office").unwrap(), Operation::Restart)
            .await
            .unwrap();
        assert_eq!(processed, vec!["alice", "bob", "bob", "alice"]);
        let kinds: Vec<&str> = engine
            .mutations()
            .iter()
            .map(|call| match call {
                EngineCall::Stop { .. } => "stop",
                EngineCall::Start(_) => "start",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["stop", "stop", "start", "start"]);
    }

    #[tokio::test]
    async fn test_status_report() {
        let model = office();
        let engine = RecordingEngine::new().with_listed(ContainerInfo {
            id: "183612dfe2c984e7".into(),
            names: vec!["bob".into()],
            status: "Up 3 minutes".into(),
            ports: vec![
                PublishedPort {
                    protocol: "tcp".into(),
                    ip: Some("0.0.0.0".into()),
                    private_port: 80,
                    public_port: Some(8080),
                },
                PublishedPort {
                    protocol: "tcp".into(),
                    ip: None,
                    private_port: 443,
                    public_port: None,
                },
            ],
        });
        let reporter = RecordingReporter::default();
        executor(&engine, &reporter)
            .execute(model.cluster("office").unwrap(), Operation::Status)
            .await
            .unwrap();

        assert!(engine.mutations().is_empty());
        assert_eq!(
            reporter.steps(),
            vec!["'bob' (183612dfe2c9): Up 3 minutes", "container 'alice' isn't created"]
        );
        assert_eq!(reporter.lines(), vec!["tcp 0.0.0.0 [80=>8080]", "tcp [443]"]);
    }

    #[tokio::test]
    async fn test_stopped_container_status_is_a_warning() {
        let model = office();
        let engine = RecordingEngine::new().with_container("alice", "Exited (137) 5 seconds ago");
        let reporter = RecordingReporter::default();
        executor(&engine, &reporter)
            .execute(model.cluster("office").unwrap(), Operation::Status)
            .await
            .unwrap();
        assert_eq!(
            reporter.warnings(),
            vec!["'alice' (alice-012345): Exited (137) 5 seconds ago"]
        );
    }

    #[tokio::test]
    async fn test_cancelled_operation_touches_nothing() {
        let model = office();
        let engine = RecordingEngine::new();
        let reporter = RecordingReporter::default();
        let token = CancellationToken::new();
        token.cancel();
        let err = executor(&engine, &reporter)
            .with_cancellation(token)
            .execute(model.cluster("office").unwrap(), Operation::Create)
            .await
            .unwrap_err();
        assert!(matches!(kind(&err), Some(DeckingError::Interrupted)));
        assert!(engine.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_cooldown() {
        let model = office();
        let engine = RecordingEngine::new();
        let reporter = RecordingReporter::default();
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });
        let err = Executor::new(&engine, &reporter)
            .with_cooldown(Duration::from_secs(3600))
            .with_cancellation(token)
            .execute(model.cluster("office").unwrap(), Operation::Run)
            .await
            .unwrap_err();
        assert!(matches!(kind(&err), Some(DeckingError::Interrupted)));
        assert_eq!(engine.created_names(), vec!["bob"]);
    }
}
