//! CLI command implementations for gpsr.

pub(crate) mod check;
pub(crate) mod evolve;

mod output;

use clap::ValueEnum;
use gpsr::{ConfigError, GpError, RunConfig};
use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Output format for the `evolve` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Command-line values that take precedence over the configuration file.
#[derive(Debug, Clone, Default)]
pub(crate) struct Overrides {
    /// Sample file.
    pub(crate) data: Option<PathBuf>,
    /// RNG seed.
    pub(crate) seed: Option<u64>,
    /// Cost evaluation budget.
    pub(crate) budget: Option<usize>,
    /// Population size.
    pub(crate) population: Option<usize>,
}

impl Overrides {
    /// Apply the given values to `config`.
    pub(crate) fn apply(self, config: &mut RunConfig) {
        if let Some(data) = self.data {
            config.data = data;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(budget) = self.budget {
            config.engine.cost_evaluation_budget = budget;
        }
        if let Some(population) = self.population {
            config.engine.population_size = population;
        }
    }
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<GpError> for CliError {
    fn from(e: GpError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("JSON serialization failed: {e}"))
    }
}
