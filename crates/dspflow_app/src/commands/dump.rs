// SPDX-License-Identifier: MIT OR Apache-2.0
//! Print a graph file as RON.

use super::common::GraphArgs;
use crate::config::ToolConfig;
use clap::Args;

/// Show the stored record of a graph
#[derive(Args, Debug)]
pub struct DumpArgs {
    #[command(flatten)]
    graph: GraphArgs,
}

/// Run the dump command.
pub fn run(args: DumpArgs, config: &ToolConfig) -> anyhow::Result<()> {
    let store = config.store()?;
    let graph = args.graph.load(&store)?;
    print!("{}", dspflow_graph::persist::to_ron(&graph)?);
    println!();
    Ok(())
}
