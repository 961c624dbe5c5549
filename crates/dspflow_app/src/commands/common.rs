// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared CLI helpers used across multiple commands.

use clap::Args;
use dspflow_graph::{Graph, GraphStore};
use std::path::PathBuf;

/// Which graph a command works on
#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Graph name, looked up in the graph directory
    #[arg(value_name = "NAME", required_unless_present = "path")]
    pub name: Option<String>,

    /// Graph file to read instead of looking up a name
    #[arg(long, conflicts_with = "name")]
    pub path: Option<PathBuf>,
}

impl GraphArgs {
    /// Load the selected graph.
    ///
    /// A name with no file yet yields an empty graph, an explicit path must
    /// exist.
    pub fn load(&self, store: &GraphStore) -> anyhow::Result<Graph> {
        if let Some(path) = &self.path {
            return Ok(store.load_path(path)?);
        }
        match &self.name {
            Some(name) => Ok(store.load(name)?),
            None => anyhow::bail!("no graph given, pass a NAME or --path"),
        }
    }
}
