//! Planner configuration
//!
//! Tunables for index selection and chain construction. Every field has a
//! default, so an empty JSON object is a valid configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Io(_) => "CHAINPLAN_CONFIG_IO",
            ConfigError::Parse(_) => "CHAINPLAN_CONFIG_PARSE",
            ConfigError::Invalid(_) => "CHAINPLAN_CONFIG_INVALID",
        }
    }
}

/// Planner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Longest field chain that may be resolved through indexes (default: 32)
    #[serde(default = "default_max_chain_depth")]
    pub max_chain_depth: usize,

    /// Record index usage statistics while probing (default: true)
    #[serde(default = "default_true")]
    pub statistics_enabled: bool,

    /// Resolve multi-hop field chains through chained indexes (default: true)
    #[serde(default = "default_true")]
    pub use_chained_indexes: bool,

    /// Try indexes with fewer fields first (default: true)
    #[serde(default = "default_true")]
    pub prefer_narrow_indexes: bool,
}

fn default_max_chain_depth() -> usize {
    32
}

fn default_true() -> bool {
    true
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_chain_depth: default_max_chain_depth(),
            statistics_enabled: default_true(),
            use_chained_indexes: default_true(),
            prefer_narrow_indexes: default_true(),
        }
    }
}

impl PlannerConfig {
    /// Loads and validates a JSON config file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parses and validates a JSON config string
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        let config: PlannerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_chain_depth < 2 {
            return Err(ConfigError::Invalid(format!(
                "max_chain_depth must be at least 2, got {}",
                self.max_chain_depth
            )));
        }
        Ok(())
    }

    pub fn with_max_chain_depth(mut self, depth: usize) -> Self {
        self.max_chain_depth = depth;
        self
    }

    pub fn with_statistics(mut self, enabled: bool) -> Self {
        self.statistics_enabled = enabled;
        self
    }

    pub fn with_chained_indexes(mut self, enabled: bool) -> Self {
        self.use_chained_indexes = enabled;
        self
    }

    pub fn with_narrow_preference(mut self, enabled: bool) -> Self {
        self.prefer_narrow_indexes = enabled;
        self
    }
}
