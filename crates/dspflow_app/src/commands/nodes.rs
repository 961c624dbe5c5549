// SPDX-License-Identifier: MIT OR Apache-2.0
//! List the node kinds available to graphs.

use crate::config::ToolConfig;
use clap::Args;
use dspflow_graph::factory::{Capability, DELAY, STDLIB};
use dspflow_graph::node::OPERATORS;
use dspflow_graph::{Manifest, NodeFactory, SignatureResolver};

/// List node kinds
#[derive(Args, Debug)]
pub struct NodesArgs {
    /// Only show kinds from this package
    #[arg(long)]
    pkg: Option<String>,
}

/// Run the nodes command.
pub fn run(args: NodesArgs, config: &ToolConfig) -> anyhow::Result<()> {
    let manifest = config.manifest()?;
    for line in listing(&manifest, args.pkg.as_deref()) {
        println!("{line}");
    }
    Ok(())
}

/// One line per usable node kind: origin, ports and statefulness
pub fn listing(manifest: &Manifest, pkg: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    if pkg.is_none() || pkg == Some("") {
        lines.extend(OPERATORS.iter().map(|op| format!("{op:<20} 2 in  1 out")));
        lines.push(format!("{:<20} 0 in  1 out", "<number>"));
    }
    if pkg.is_none() || pkg == Some(STDLIB) {
        let delay = format!("{STDLIB}::{DELAY}");
        lines.push(format!("{delay:<20} 2 in  1 out  stateful"));
    }

    for origin in manifest.candidates() {
        if pkg.is_some_and(|p| p != origin.pkg) {
            continue;
        }
        let Some(capability) = manifest.resolve(&origin) else {
            continue;
        };
        let stateful = matches!(capability, Capability::Stateful { .. });
        let Some(node) = NodeFactory::from_capability(origin.clone(), &capability) else {
            continue;
        };
        lines.push(format!(
            "{:<20} {} in  {} out{}",
            origin.to_string(),
            node.inputs.len(),
            node.outputs.len(),
            if stateful { "  stateful" } else { "" }
        ));
    }
    lines
}
