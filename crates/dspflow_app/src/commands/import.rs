// SPDX-License-Identifier: MIT OR Apache-2.0
//! Store a graph written as RON.

use crate::config::ToolConfig;
use clap::Args;
use std::path::PathBuf;

/// Convert a RON graph record (as printed by `dump`) into a graph file
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// RON file to read
    pub file: PathBuf,
}

/// Run the import command.
pub fn run(args: ImportArgs, config: &ToolConfig) -> anyhow::Result<()> {
    let store = config.store()?;
    let text = std::fs::read_to_string(&args.file)?;
    let graph = dspflow_graph::persist::from_ron(&text, store.manifest())?;
    let path = store.save(&graph)?;
    println!(
        "Imported {} ({} nodes, {} connections) to {}",
        graph.name,
        graph.node_count(),
        graph.connection_count(),
        path.display()
    );
    Ok(())
}
