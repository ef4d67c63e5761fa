//! Configuration system for TensorForge.
//!
//! Load evaluation configuration from TOML or YAML to control how model
//! functions are optimized without code changes.
//!
//! # Examples
//!
//! ```
//! use tensorforge_config::{EvaluationConfig, ForestBackend};
//!
//! let config = EvaluationConfig::from_toml_str(r#"
//!     [optimization]
//!     backend = "jit"
//!     min_tree_count = 10
//! "#).unwrap();
//!
//! assert_eq!(config.optimization.backend, ForestBackend::Jit);
//! assert!(config.optimization.tree_ensembles);
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use tensorforge_config::EvaluationConfig;
//!
//! let config = EvaluationConfig::load("evaluation.toml").unwrap_or_default();
//! ```

#[cfg(test)]
mod tests;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Evaluation configuration shared by every model of a registry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EvaluationConfig {
    #[serde(default)]
    pub optimization: OptimizationConfig,
}

impl EvaluationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist, contains invalid TOML, or fails
    /// [`validate`](Self::validate).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_optimization(mut self, optimization: OptimizationConfig) -> Self {
        self.optimization = optimization;
        self
    }

    /// Checks values that deserialize fine but make no sense together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.optimization.validate()
    }
}

/// How sums of condition trees are evaluated.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct OptimizationConfig {
    /// Recognize sums of condition trees and evaluate them from a compact
    /// branch table instead of walking the expression.
    #[serde(default = "default_true")]
    pub tree_ensembles: bool,

    #[serde(default)]
    pub backend: ForestBackend,

    /// Smallest number of trees worth optimizing.
    #[serde(default = "default_min_tree_count")]
    pub min_tree_count: usize,

    /// Compile every eligible function when the model is built rather than
    /// on first evaluation.
    #[serde(default)]
    pub precompile: bool,

    /// Evaluate optimized functions both ways and fail on any difference.
    #[serde(default)]
    pub verify_optimized: bool,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            tree_ensembles: true,
            backend: ForestBackend::default(),
            min_tree_count: default_min_tree_count(),
            precompile: false,
            verify_optimized: false,
        }
    }
}

impl OptimizationConfig {
    /// No optimization: every function is interpreted.
    pub fn disabled() -> Self {
        Self {
            tree_ensembles: false,
            ..Self::default()
        }
    }

    pub fn with_backend(mut self, backend: ForestBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_min_tree_count(mut self, count: usize) -> Self {
        self.min_tree_count = count;
        self
    }

    pub fn with_precompile(mut self, precompile: bool) -> Self {
        self.precompile = precompile;
        self
    }

    pub fn with_verify_optimized(mut self, verify: bool) -> Self {
        self.verify_optimized = verify;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_tree_count == 0 {
            return Err(ConfigError::Invalid(
                "optimization.min_tree_count must be at least 1".to_string(),
            ));
        }
        if !self.tree_ensembles && (self.precompile || self.verify_optimized) {
            return Err(ConfigError::Invalid(
                "optimization.precompile and optimization.verify_optimized require tree_ensembles"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Backend for optimized tree ensembles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForestBackend {
    /// Compact branch table walked in Rust.
    #[default]
    Table,

    /// Native code generated with Cranelift, falling back to the table.
    Jit,
}

fn default_true() -> bool {
    true
}

fn default_min_tree_count() -> usize {
    1
}
