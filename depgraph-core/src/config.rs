use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analyze::centrality::CentralityConfig;
use crate::analyze::classify::ClassifyConfig;
use crate::analyze::SearchLimits;
use crate::error::ConfigError;
use crate::persist::{GraphFormat, PersistMode};

/// Top-level depgraph configuration, matching `depgraph.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepGraphConfig {
    #[serde(default)]
    pub graph: GraphSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub classify: ClassifyConfig,
    #[serde(default)]
    pub centrality: CentralityConfig,
    #[serde(default)]
    pub search: SearchLimits,
}

/// How graphs are written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSection {
    pub format: GraphFormat,
    pub mode: PersistMode,
}

impl Default for GraphSection {
    fn default() -> Self {
        Self {
            format: GraphFormat::GraphMl,
            mode: PersistMode::StructureOnly,
        }
    }
}

/// Where the code-object database lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub database: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            database: PathBuf::from("code_objects.db"),
        }
    }
}

impl DepGraphConfig {
    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.classify
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let c = &self.centrality;
        if !(c.damping > 0.0 && c.damping < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "centrality.damping must be in (0, 1), got {}",
                c.damping
            )));
        }
        if c.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "centrality.max_iterations must be at least 1".into(),
            ));
        }
        if c.sample_size == Some(0) {
            return Err(ConfigError::Invalid(
                "centrality.sample_size must be at least 1".into(),
            ));
        }

        self.search.validate()
    }
}
