//! # Decking Log Aggregator
//!
//! File: cli/src/orchestration/logs.rs
//!
//! ## Overview
//!
//! Interleaves the output of several attached containers into one feed.
//!
//! One tokio task per container stream forwards its lines, tagged with the
//! container name, into a bounded channel; when its stream ends the task
//! sends a `Detached` marker. The calling task is the only consumer: it
//! prints a header (`step`) whenever the source differs from the previous
//! line's source and a `name: detached` warning when a stream ends.
//!
//! Aggregation ends when every stream has detached or when the cancellation
//! token fires. Either way the producer tasks are cancelled and joined before
//! returning.
//!
use crate::common::docker::{Engine, LineStream};
use crate::common::ui::Reporter;
use crate::core::error::Result;
use anyhow::Context;
use futures_util::stream::StreamExt;
use std::collections::HashSet;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lines buffered between the producers and the printer.
pub const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
enum LogEvent {
    Line { source: String, line: String },
    Detached { source: String },
}

/// How an aggregation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    AllDetached,
    Cancelled,
}

/// Attaches to every container in `names` and prints their output until all
/// streams end or `cancel` fires.
pub async fn attach_all(
    engine: &dyn Engine,
    names: &[&str],
    reporter: &dyn Reporter,
    cancel: CancellationToken,
) -> Result<Ending> {
    let mut streams = Vec::with_capacity(names.len());
    for name in names {
        let stream = engine
            .attach(name)
            .await
            .with_context(|| format!("Failed to attach to container '{}'", name))?;
        streams.push((name.to_string(), stream));
    }
    Ok(aggregate(streams, reporter, cancel).await)
}

/// Drains `streams` concurrently into `reporter`.
pub async fn aggregate(
    streams: Vec<(String, LineStream)>,
    reporter: &dyn Reporter,
    cancel: CancellationToken,
) -> Ending {
    let shutdown = cancel.child_token();
    let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
    let mut attached = HashSet::new();
    let mut handles = Vec::with_capacity(streams.len());
    for (source, stream) in streams {
        attached.insert(source.clone());
        handles.push(spawn_forwarder(source, stream, tx.clone(), shutdown.clone()));
    }
    drop(tx);

    let mut current: Option<String> = None;
    let ending = loop {
        if attached.is_empty() {
            break Ending::AllDetached;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break Ending::Cancelled,
            event = rx.recv() => match event {
                Some(LogEvent::Line { source, line }) => {
                    if current.as_deref() != Some(source.as_str()) {
                        reporter.step(&source);
                        current = Some(source);
                    }
                    reporter.line(line.trim());
                }
                Some(LogEvent::Detached { source }) => {
                    attached.remove(&source);
                    reporter.warning(&format!("{}: detached", source));
                }
                None => break Ending::AllDetached,
            },
        }
    };

    if ending == Ending::AllDetached {
        reporter.warning("All containers detached");
    } else {
        info!("Log aggregation cancelled");
    }

    shutdown.cancel();
    drop(rx);
    for handle in handles {
        if let Err(e) = handle.await {
            warn!("Log forwarder task failed: {}", e);
        }
    }
    ending
}

fn spawn_forwarder(
    source: String,
    mut stream: LineStream,
    tx: mpsc::Sender<LogEvent>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let item = tokio::select! {
                _ = shutdown.cancelled() => return,
                item = stream.next() => item,
            };
            match item {
                Some(Ok(line)) => {
                    let event = LogEvent::Line {
                        source: source.clone(),
                        line,
                    };
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
                Some(Err(e)) => {
                    warn!("Output stream of '{}' failed: {:#}", source, e);
                    break;
                }
                None => break,
            }
        }
        debug!("Output stream of '{}' ended", source);
        let _ = tx.send(LogEvent::Detached { source }).await;
    })
}
