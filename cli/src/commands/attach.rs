//! # Decking Attach Command
//!
//! File: cli/src/commands/attach.rs
//!
//! `decking attach <CLUSTER>`: follows the output of every container in the
//! cluster until they all detach or Ctrl-C is pressed. Ctrl-C is the normal
//! way out here, so it is not reported as an interruption.
//!
use super::cluster::ClusterArgs;
use super::{reporter, GlobalOptions, Session};
use crate::core::error::Result;
use crate::orchestration::logs::Ending;
use crate::orchestration::Decking;
use tracing::info;

pub async fn handle_attach(args: ClusterArgs, options: &GlobalOptions) -> Result<()> {
    let Session {
        model,
        engine,
        settings,
    } = Session::open(options)?;
    let decking = Decking::new(model, &engine, reporter(), settings).with_cancellation(options.cancel.clone());
    match decking.attach(&args.cluster).await? {
        Ending::AllDetached => info!("Every container of '{}' detached", args.cluster),
        Ending::Cancelled => info!("Stopped following '{}'", args.cluster),
    }
    Ok(())
}
