//! Evolve command implementation.

use super::output::{JsonRunResult, format_text};
use super::{CliError, OutputFormat, Overrides};
use gpsr::RunConfig;
use indicatif::{ProgressBar, ProgressStyle};
use std::ops::ControlFlow;
use std::path::Path;

/// Execute the evolve command.
///
/// # Errors
///
/// Returns an error if the configuration or data set is invalid.
pub(crate) fn execute(
    config_path: &Path,
    overrides: Overrides,
    format: OutputFormat,
    progress: bool,
) -> Result<(), CliError> {
    let mut config = RunConfig::load(config_path)?;
    overrides.apply(&mut config);

    let samples = config.load_samples()?;
    let seed = config.resolve_seed();
    log::info!("seed: {seed}");
    let mut engine = config.build_engine(samples, seed)?;

    let budget = u64::try_from(config.engine.cost_evaluation_budget).unwrap_or(u64::MAX);
    let pb = if progress {
        let pb = ProgressBar::new(budget);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} evaluations {msg}")
                .expect("valid template")
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let stats = engine.run_with(|generation| {
        if let Some(pb) = &pb {
            let spent = u64::try_from(generation.cost_evaluations).unwrap_or(u64::MAX);
            pb.set_position(spent.min(budget));
            pb.set_message(format!("best {:.6}", generation.best_penalty));
        }
        ControlFlow::Continue(())
    })?;

    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }

    let best = engine
        .best()
        .ok_or_else(|| CliError::new("evolution finished with an empty population"))?;

    match format {
        OutputFormat::Text => {
            print!("{}", format_text(best, &stats, seed));
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&JsonRunResult::new(best, &stats, seed))?;
            println!("{json}");
        }
    }

    Ok(())
}
