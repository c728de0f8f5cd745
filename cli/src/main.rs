//! # Decking Main Entry Point
//!
//! File: cli/src/main.rs
//!
//! ## Overview
//!
//! Entry point of the `decking` CLI. Reads a definition file describing
//! images, containers, groups and clusters, and drives a Docker daemon to
//! build the images and run the clusters in dependency order.
//!
//! It handles:
//! - Command-line argument parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Ctrl-C, which cancels the running operation
//! - Routing execution to the command handlers
//! - Reporting a failure as a single message (`--debug` prints the full chain)
//!
//! ## Examples
//!
//! ```bash
//! decking build all
//! decking --config cluster.yml run office
//! decking -vv status office
//! decking attach office
//! decking push office --registry registry.local:5000
//! ```
//!
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod common;
mod core;
mod model;
mod orchestration;
#[cfg(test)]
mod testing;

use crate::commands::cluster::ClusterArgs;
use crate::commands::image::{BuildArgs, RegistryArgs, Transfer};
use crate::commands::GlobalOptions;
use crate::core::definition::DEFAULT_DEFINITION_FILE;
use crate::core::error::DeckingError;
use crate::core::settings::SettingsOverrides;
use crate::orchestration::executor::Operation;

/// Exit status when Ctrl-C interrupted an operation.
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser, Debug)]
#[command(
    name = "decking",
    about = "Declarative multi-container orchestration",
    long_about = "Build images and create, start, stop and remove clusters of Docker containers\n\
                  in dependency order, as described by a definition file.",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Definition file (JSON, YAML or TOML).
    #[arg(short, long, global = true, env = "DECKING_CONFIG", default_value = DEFAULT_DEFINITION_FILE)]
    config: PathBuf,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print the full error chain on failure.
    #[arg(long, global = true)]
    debug: bool,

    /// Timeout for each engine call, in seconds.
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Grace period for stopping a container, in seconds. Must be below the timeout.
    #[arg(long, global = true, value_name = "SECS")]
    stop_grace: Option<u64>,

    /// Pause between dependency waves while starting, in seconds.
    #[arg(long, global = true, value_name = "SECS")]
    cooldown: Option<u64>,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Create the containers of a cluster.
    Create(ClusterArgs),
    /// Start the (created) containers of a cluster.
    Start(ClusterArgs),
    /// Create and start the containers of a cluster.
    Run(ClusterArgs),
    /// Stop the containers of a cluster, dependents first.
    Stop(ClusterArgs),
    /// Stop, then start the containers of a cluster.
    Restart(ClusterArgs),
    /// Remove the containers of a cluster, dependents first.
    #[command(alias = "rm")]
    Remove(ClusterArgs),
    /// Show the status and published ports of a cluster's containers.
    Status(ClusterArgs),
    /// Follow the output of every container of a cluster.
    Attach(ClusterArgs),
    /// Build images.
    Build(BuildArgs),
    /// Push images to a registry.
    Push(RegistryArgs),
    /// Pull images, optionally from a registry.
    Pull(RegistryArgs),
}

fn init_tracing(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

async fn run(command: Commands, options: &GlobalOptions) -> anyhow::Result<()> {
    use commands::{attach, cluster, image};
    match command {
        Commands::Create(args) => cluster::handle_cluster(Operation::Create, args, options).await,
        Commands::Start(args) => cluster::handle_cluster(Operation::Start, args, options).await,
        Commands::Run(args) => cluster::handle_cluster(Operation::Run, args, options).await,
        Commands::Stop(args) => cluster::handle_cluster(Operation::Stop, args, options).await,
        Commands::Restart(args) => cluster::handle_cluster(Operation::Restart, args, options).await,
        Commands::Remove(args) => cluster::handle_cluster(Operation::Remove, args, options).await,
        Commands::Status(args) => cluster::handle_cluster(Operation::Status, args, options).await,
        Commands::Attach(args) => attach::handle_attach(args, options).await,
        Commands::Build(args) => image::handle_build(args, options).await,
        Commands::Push(args) => image::handle_transfer(Transfer::Push, args, options).await,
        Commands::Pull(args) => image::handle_transfer(Transfer::Pull, args, options).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling");
            interrupt.cancel();
        }
    });

    let options = GlobalOptions {
        config: cli.config,
        overrides: SettingsOverrides {
            timeout_secs: cli.timeout,
            stop_grace_secs: cli.stop_grace,
            cooldown_secs: cli.cooldown,
        },
        cancel,
    };

    if let Err(e) = run(cli.command, &options).await {
        tracing::error!("Command execution failed: {:?}", e);
        if cli.debug {
            eprintln!("Error: {:?}", e);
        } else {
            eprintln!("Error: {:#}", e);
        }
        let interrupted = e
            .downcast_ref::<DeckingError>()
            .is_some_and(|de| matches!(de, DeckingError::Interrupted));
        std::process::exit(if interrupted { EXIT_INTERRUPTED } else { 1 });
    }
}
