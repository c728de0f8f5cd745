//! # Decking Image Commands
//!
//! File: cli/src/commands/image.rs
//!
//! `decking build|push|pull <TARGET>`, where the target is `all`, a cluster
//! or an image name.
//!
use super::{reporter, GlobalOptions, Session};
use crate::core::error::Result;
use crate::orchestration::decking::ALL_TARGET;
use crate::orchestration::Decking;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// `all`, a cluster name or an image name.
    #[arg(default_value = ALL_TARGET)]
    pub target: String,
}

#[derive(Parser, Debug)]
pub struct RegistryArgs {
    /// `all`, a cluster name or an image name.
    #[arg(default_value = ALL_TARGET)]
    pub target: String,

    /// Registry host (and port) to push to or pull from. Falls back to
    /// `registry.default` in the settings file.
    #[arg(long, short)]
    pub registry: Option<String>,

    /// Allow plain HTTP / self-signed registries.
    #[arg(long)]
    pub insecure: bool,
}

/// Which registry operation `RegistryArgs` are for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    Push,
    Pull,
}

pub async fn handle_build(args: BuildArgs, options: &GlobalOptions) -> Result<()> {
    let Session {
        model,
        engine,
        settings,
    } = Session::open(options)?;
    let decking = Decking::new(model, &engine, reporter(), settings).with_cancellation(options.cancel.clone());
    let built = decking.build(&args.target).await?;
    info!("Built: {:?}", built);
    Ok(())
}

pub async fn handle_transfer(transfer: Transfer, args: RegistryArgs, options: &GlobalOptions) -> Result<()> {
    let Session {
        model,
        engine,
        settings,
    } = Session::open(options)?;
    let decking = Decking::new(model, &engine, reporter(), settings).with_cancellation(options.cancel.clone());
    let registry = args.registry.as_deref();
    let images = match transfer {
        Transfer::Push => decking.push(&args.target, registry, args.insecure).await?,
        Transfer::Pull => decking.pull(&args.target, registry, args.insecure).await?,
    };
    info!("{:?} done for {:?}", transfer, images);
    Ok(())
}
