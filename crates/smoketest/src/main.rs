//! Binary entrypoint for the ymaps-host smoketest tool.
//!
//! Drives the loader and the event manager end to end against mock hosts
//! and targets, failing loudly when any observable property does not hold.

use std::{path::PathBuf, process};

use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;

mod cases;

#[derive(Parser, Debug)]
#[command(name = "smoketest", about = "ymaps-host smoketest tool", version)]
/// Command-line interface for the `smoketest` binary.
struct Cli {
    /// Enable logging to stdout/stderr at info level (respect RUST_LOG)
    #[arg(long)]
    logs: bool,

    /// JSON file with the configuration to drive the load case with
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive the loader cache and single-flight paths against a mock host
    Load,
    /// Drive event subscription, rebinding and teardown against mock targets
    Events,
    /// Run every case
    All,
}

fn main() {
    let cli = Cli::parse();
    if cli.logs {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info".into());
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().without_time())
            .try_init();
    }

    let config = match cases::read_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("config: ERROR: {error}");
            process::exit(2);
        }
    };

    let outcome = match cli.command {
        Commands::Load => cases::run_load(config),
        Commands::Events => cases::run_events(),
        Commands::All => cases::run_load(config).and_then(|()| cases::run_events()),
    };
    match outcome {
        Ok(()) => println!("smoketest: OK"),
        Err(error) => {
            eprintln!("smoketest: ERROR: {error}");
            process::exit(1);
        }
    }
}
