//! Run configuration.
//!
//! A run is described by a JSON file holding the engine parameters, the
//! operator names, the optional constant range, the sample file and an
//! optional seed. Missing fields fall back to their defaults.
//!
//! ```json
//! {
//!   "engine": { "population_size": 500, "cost_evaluation_budget": 1000000 },
//!   "operators": ["add", "sub", "mul", "div"],
//!   "constants": { "min": -5.0, "max": 5.0 },
//!   "data": "problem.txt",
//!   "seed": 42
//! }
//! ```

use crate::error::GpError;
use crate::gp::EngineConfig;
use crate::symreg::{self, DatasetError, RegressionEngine, Sample};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use crate::symreg::ConstantRange;

/// Errors raised while loading or applying a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for a [`RunConfig`].
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// No sample file was given.
    #[error("no data file configured")]
    MissingData,

    /// The sample file is unusable.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// The engine rejected the configuration.
    #[error(transparent)]
    Engine(#[from] GpError),
}

/// Everything needed to start a regression run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Engine parameters.
    pub engine: EngineConfig,
    /// Operator names, see [`symreg::OPERATOR_NAMES`].
    pub operators: Vec<String>,
    /// Range of generated constants; no constants when absent.
    pub constants: Option<ConstantRange>,
    /// Sample file. Relative paths are resolved against the configuration
    /// file's directory by [`RunConfig::load`].
    pub data: PathBuf,
    /// RNG seed; a random one is drawn when absent.
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            operators: symreg::OPERATOR_NAMES.iter().map(ToString::to_string).collect(),
            constants: None,
            data: PathBuf::new(),
            seed: None,
        }
    }
}

impl RunConfig {
    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if config.data.is_relative()
            && !config.data.as_os_str().is_empty()
            && let Some(dir) = path.parent()
        {
            config.data = dir.join(&config.data);
        }
        log::debug!("loaded configuration from {}: {config:?}", path.display());
        Ok(config)
    }

    /// Check the configuration without reading samples.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingData`] without a data path, or
    /// [`ConfigError::Engine`] for invalid engine parameters, operator
    /// names or constant range, or an operator set the engine cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.as_os_str().is_empty() {
            return Err(ConfigError::MissingData);
        }
        // A one-column placeholder sample stands in for the data set.
        let placeholder = vec![Sample::new(vec![0.0], 0.0)];
        symreg::regression_engine(self.engine, &self.operators, self.constants, placeholder, 0)?;
        Ok(())
    }

    /// Read the configured sample file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingData`] or [`ConfigError::Dataset`].
    pub fn load_samples(&self) -> Result<Vec<Sample>, ConfigError> {
        if self.data.as_os_str().is_empty() {
            return Err(ConfigError::MissingData);
        }
        Ok(symreg::load_samples(&self.data)?)
    }

    /// The configured seed, or a fresh random one.
    #[must_use]
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }

    /// Build an engine fitting `samples`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Engine`] if the engine rejects the
    /// configuration.
    pub fn build_engine(&self, samples: Vec<Sample>, seed: u64) -> Result<RegressionEngine, ConfigError> {
        Ok(symreg::regression_engine(
            self.engine,
            &self.operators,
            self.constants,
            samples,
            seed,
        )?)
    }
}
