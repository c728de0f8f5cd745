//! # Decking Progress Stream Consumption
//!
//! File: cli/src/common/docker/progress.rs
//!
//! Drains a build/push/pull `ProgressStream`: output lines go to the
//! reporter, status chatter goes to the debug log, and the first error event
//! (or stream error) fails the whole operation.
//!
use super::{ProgressEvent, ProgressStream};
use crate::common::ui::Reporter;
use crate::core::error::{DeckingError, Result};
use anyhow::anyhow;
use futures_util::stream::StreamExt;
use tracing::debug;

pub async fn consume(mut stream: ProgressStream, reporter: &dyn Reporter) -> Result<()> {
    while let Some(event) = stream.next().await {
        match event? {
            ProgressEvent::Output(text) => {
                for line in text.trim().lines() {
                    reporter.line(line);
                }
            }
            ProgressEvent::Status(status) => debug!("{}", status),
            ProgressEvent::Error(message) => return Err(anyhow!(DeckingError::Engine(message))),
        }
    }
    Ok(())
}
