// SPDX-License-Identifier: MIT OR Apache-2.0
//! Print the arranged layers of a graph.

use super::common::GraphArgs;
use crate::config::ToolConfig;
use clap::Args;
use dspflow_graph::{arrange, Arrangement, CrossingStrategy, Graph, Slot};
use std::fmt::Write;

/// Show how a graph is laid out
#[derive(Args, Debug)]
pub struct LayersArgs {
    #[command(flatten)]
    graph: GraphArgs,

    /// Search every ordering (small graphs only)
    #[arg(long)]
    exhaustive: bool,

    /// Override the configured random seed
    #[arg(long)]
    seed: Option<u64>,
}

/// Run the layers command.
pub fn run(args: LayersArgs, config: &ToolConfig) -> anyhow::Result<()> {
    let store = config.store()?;
    let graph = args.graph.load(&store)?;

    let mut arrange_config = config.arrange.clone();
    if args.exhaustive {
        arrange_config.strategy = CrossingStrategy::Exhaustive;
    }
    if let Some(seed) = args.seed {
        arrange_config.seed = seed;
    }

    let arrangement = arrange(&graph, &arrange_config);
    print!("{}", render(&graph, &arrangement)?);
    Ok(())
}

/// One line per layer, placeholders drawn as `|`
pub fn render(graph: &Graph, arrangement: &Arrangement) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(
        out,
        "{}: {} layers, {} crossings ({} before arranging)",
        graph.name,
        arrangement.layers.len(),
        arrangement.crossings,
        arrangement.initial_crossings
    )?;
    for (i, layer) in arrangement.layers.iter().enumerate() {
        let labels: Vec<String> = layer
            .iter()
            .map(|slot| match slot {
                Slot::Node(id) => graph
                    .node(*id)
                    .map_or_else(|| id.to_string(), |n| n.origin.to_string()),
                Slot::Virtual(_) => "|".to_string(),
            })
            .collect();
        writeln!(out, "{i:>4}: {}", labels.join("  "))?;
    }
    Ok(out)
}
