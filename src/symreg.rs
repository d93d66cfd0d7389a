//! Symbolic regression on top of the GP engine.
//!
//! Samples are read from tabular files, each input column becomes a
//! variable terminal `x1..xN`, and trees are scored by the root of their
//! summed squared residuals.

mod dataset;
mod operators;
mod penalty;

pub use dataset::{DatasetError, Sample, load_samples, parse_samples};
pub use operators::{ConstantRange, OPERATOR_NAMES, build_catalog, operator, variable};
pub use penalty::RootSumSquaredError;

use crate::error::GpResult;
use crate::gp::{Engine, EngineConfig};
use std::sync::Arc;

/// Engine evolving regression trees.
pub type RegressionEngine = Engine<Sample, RootSumSquaredError>;

/// Set up an engine fitting `samples` with the named operators.
///
/// One variable is created per input column of the first sample.
///
/// # Errors
///
/// Returns [`GpError::Configuration`](crate::GpError::Configuration) if the
/// operator names, constant range or engine configuration are invalid.
pub fn regression_engine<S: AsRef<str>>(
    config: EngineConfig,
    operators: &[S],
    constants: Option<ConstantRange>,
    samples: Vec<Sample>,
    seed: u64,
) -> GpResult<RegressionEngine> {
    let inputs = samples.first().map_or(0, |s| s.inputs.len());
    let catalog = Arc::new(build_catalog(operators, inputs, constants)?);
    log::info!("catalog: {catalog:?}");
    Engine::with_seed(config, catalog, RootSumSquaredError, samples, seed)
}
