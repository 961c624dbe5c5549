// SPDX-License-Identifier: MIT OR Apache-2.0
//! `dspflow` - dataflow graph layout and code generation.
//!
//! Loads stored signal-processing graphs and:
//! - Prints their layered, crossing-minimized layout
//! - Generates Rust source implementing them
//! - Dumps and imports their records as RON
//! - Lists the node kinds available to them
//! - Writes a default configuration
//!
//! Settings are read from `dspflow.ron` (see [`config::ToolConfig`]). Logs go
//! to stderr and honour `RUST_LOG`.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::{ToolConfig, CONFIG_FILE_NAME};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "dspflow")]
#[command(author, version, about = "Dataflow graph layout and code generation", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the arranged layers of a graph
    Layers(commands::layers::LayersArgs),

    /// Generate Rust source for a graph
    Generate(commands::generate::GenerateArgs),

    /// Print a stored graph as RON
    Dump(commands::dump::DumpArgs),

    /// Store a graph written as RON
    Import(commands::import::ImportArgs),

    /// List available node kinds
    Nodes(commands::nodes::NodesArgs),

    /// Write a default configuration file
    Init(commands::init::InitArgs),
}

fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("dspflow=info".parse()?);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::debug!(command = ?cli.command, "starting dspflow v{}", env!("CARGO_PKG_VERSION"));

    let config = match cli.command {
        Commands::Init(args) => return commands::init::run(args, &cli.config),
        _ => ToolConfig::load(&cli.config)?,
    };
    match cli.command {
        Commands::Layers(args) => commands::layers::run(args, &config),
        Commands::Generate(args) => commands::generate::run(args, &config),
        Commands::Dump(args) => commands::dump::run(args, &config),
        Commands::Import(args) => commands::import::run(args, &config),
        Commands::Nodes(args) => commands::nodes::run(args, &config),
        Commands::Init(_) => Ok(()),
    }
}
