//! Check command implementation.

use super::CliError;
use gpsr::RunConfig;
use std::path::Path;

/// Execute the check command.
///
/// Loads the configuration and its samples and builds the engine without
/// running it.
///
/// # Errors
///
/// Returns an error describing the first problem found.
pub(crate) fn execute(config_path: &Path) -> Result<(), CliError> {
    let config = RunConfig::load(config_path)?;
    config.validate()?;

    let samples = config.load_samples()?;
    let count = samples.len();
    let inputs = samples.first().map_or(0, |s| s.inputs.len());
    let engine = config.build_engine(samples, config.resolve_seed())?;

    println!("Configuration OK: {}", config_path.display());
    println!("  Samples: {count} with {inputs} input(s)");
    println!("  Operators: {}", config.operators.join(", "));
    if let Some(range) = config.constants {
        println!("  Constants: [{}, {}]", range.min, range.max);
    }
    println!(
        "  Population: {}, depth <= {} (full <= {}), nodes <= {}",
        config.engine.population_size,
        config.engine.max_tree_depth,
        engine.max_depth_full(),
        config.engine.max_tree_nodes
    );
    println!("  Budget: {} cost evaluations", config.engine.cost_evaluation_budget);

    Ok(())
}
