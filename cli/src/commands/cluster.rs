//! # Decking Cluster Commands
//!
//! File: cli/src/commands/cluster.rs
//!
//! `decking <verb> <CLUSTER>` for the cluster verbs. clap has already mapped
//! the subcommand to an `Operation`; this handler opens the session and runs
//! it through the facade.
//!
use super::{reporter, GlobalOptions, Session};
use crate::core::error::Result;
use crate::orchestration::executor::Operation;
use crate::orchestration::Decking;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
pub struct ClusterArgs {
    /// Name of a cluster from the definition file.
    pub cluster: String,
}

pub async fn handle_cluster(operation: Operation, args: ClusterArgs, options: &GlobalOptions) -> Result<()> {
    info!("Handling '{}' for cluster '{}'", operation, args.cluster);
    let Session {
        model,
        engine,
        settings,
    } = Session::open(options)?;
    let decking = Decking::new(model, &engine, reporter(), settings).with_cancellation(options.cancel.clone());
    let processed = decking.execute(&args.cluster, operation).await?;
    info!("'{}' went through {} container(s): {:?}", operation, processed.len(), processed);
    Ok(())
}
