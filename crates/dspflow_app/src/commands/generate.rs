// SPDX-License-Identifier: MIT OR Apache-2.0
//! Generate Rust source for a graph.

use super::common::GraphArgs;
use crate::config::ToolConfig;
use clap::Args;
use dspflow_graph::generate_source;

/// Compile a graph to Rust source
#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    graph: GraphArgs,

    /// Print the source instead of writing it to the output directory
    #[arg(long)]
    stdout: bool,
}

/// Run the generate command.
pub fn run(args: GenerateArgs, config: &ToolConfig) -> anyhow::Result<()> {
    let store = config.store()?;
    let graph = args.graph.load(&store)?;
    if graph.is_empty() {
        tracing::warn!(name = %graph.name, "graph has no nodes");
    }

    let source = generate_source(&graph, &config.arrange)?;
    if args.stdout {
        print!("{source}");
        return Ok(());
    }
    let path = store.save_source(&graph, &source)?;
    println!("Generated {}", path.display());
    Ok(())
}
