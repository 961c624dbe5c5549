// SPDX-License-Identifier: MIT OR Apache-2.0
//! Write a default configuration file.

use crate::config::ToolConfig;
use clap::Args;
use std::path::Path;

/// Create a configuration file with default settings
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing file
    #[arg(long)]
    force: bool,
}

/// Run the init command.
pub fn run(args: InitArgs, path: &Path) -> anyhow::Result<()> {
    if path.exists() && !args.force {
        anyhow::bail!("{} already exists, pass --force to overwrite", path.display());
    }
    let config = ToolConfig::default();
    config.save(path)?;
    std::fs::create_dir_all(&config.graph_dir)?;
    println!("Wrote {}", path.display());
    Ok(())
}
