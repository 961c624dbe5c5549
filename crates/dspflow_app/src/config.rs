// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tool configuration.
//!
//! Settings live in a RON file next to the graphs. A missing file is not an
//! error: every setting has a default.

use dspflow_graph::factory::FactoryError;
use dspflow_graph::{ArrangeConfig, GraphStore, Manifest};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "dspflow.ron";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid RON
    #[error("Invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Rendering the config failed
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// The node manifest could not be loaded
    #[error(transparent)]
    Manifest(#[from] FactoryError),
}

/// Settings for the `dspflow` tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Directory holding graph files
    pub graph_dir: PathBuf,
    /// Directory receiving generated sources
    pub output_dir: PathBuf,
    /// Layout settings
    pub arrange: ArrangeConfig,
    /// Extra node kinds, merged over the standard library
    pub manifest: Option<PathBuf>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            graph_dir: PathBuf::from("graphs"),
            output_dir: PathBuf::from("src/generated"),
            arrange: ArrangeConfig::default(),
            manifest: None,
        }
    }
}

impl ToolConfig {
    /// Load configuration, falling back to defaults when the file is missing
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: ToolConfig = ron::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let pretty = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, pretty)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The standard library plus the configured manifest, if any
    pub fn manifest(&self) -> Result<Manifest, ConfigError> {
        let mut manifest = Manifest::stdlib();
        if let Some(path) = &self.manifest {
            manifest.extend(Manifest::load(path)?);
        }
        Ok(manifest)
    }

    /// Graph store for the configured directories
    pub fn store(&self) -> Result<GraphStore, ConfigError> {
        Ok(GraphStore::new(&self.graph_dir, self.manifest()?).with_source_dir(&self.output_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dspflow_graph::CrossingStrategy;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolConfig::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, ToolConfig::default());
        assert_eq!(config.arrange.iterations, 1000);
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut config = ToolConfig::default();
        config.graph_dir = PathBuf::from("patches");
        config.arrange.strategy = CrossingStrategy::Exhaustive;
        config.arrange.seed = 42;
        config.save(&path).unwrap();

        assert_eq!(ToolConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "(graph_dir: \"patches\", arrange: (seed: 9))").unwrap();

        let config = ToolConfig::load(&path).unwrap();
        assert_eq!(config.graph_dir, PathBuf::from("patches"));
        assert_eq!(config.output_dir, ToolConfig::default().output_dir);
        assert_eq!(config.arrange.seed, 9);
        assert_eq!(config.arrange.iterations, 1000);
    }

    #[test]
    fn test_invalid_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "(graph_dir: 3").unwrap();
        assert!(matches!(ToolConfig::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_manifest_merges_over_stdlib() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.ron");
        std::fs::write(
            &path,
            r#"[(
                origin: (pkg: "fx", name: "fold"),
                capability: Function((params: [(name: "x", kind: F32)], results: [(kind: F32)])),
            )]"#,
        )
        .unwrap();

        let config = ToolConfig {
            manifest: Some(path),
            ..ToolConfig::default()
        };
        let manifest = config.manifest().unwrap();
        assert_eq!(manifest.len(), Manifest::stdlib().len() + 1);
        assert!(manifest
            .candidates()
            .contains(&dspflow_graph::Origin::new("fx", "fold")));
    }
}
