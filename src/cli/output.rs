//! Output formatting utilities for CLI.

use gpsr::gp::{EvolutionStats, GenerationStats, Tree};
use gpsr::symreg::Sample;
use serde::Serialize;
use std::fmt::Write;

/// JSON-serializable run result.
#[derive(Debug, Serialize)]
pub(super) struct JsonRunResult {
    /// Seed the engine was started with.
    pub(super) seed: u64,
    /// Penalty of the best tree.
    pub(super) best_penalty: f64,
    /// Best tree in infix notation.
    pub(super) expression: String,
    /// Best tree in prefix notation.
    pub(super) prefix: String,
    /// Node count of the best tree.
    pub(super) size: usize,
    /// Depth of the best tree.
    pub(super) depth: usize,
    /// Generations produced after initialization.
    pub(super) generations: usize,
    /// Generation where the best penalty first appeared.
    pub(super) best_generation: usize,
    /// Penalty calculations spent.
    pub(super) cost_evaluations: usize,
    /// Wall time in seconds.
    pub(super) elapsed_seconds: f64,
    /// Per-generation statistics.
    pub(super) history: Vec<GenerationStats>,
}

impl JsonRunResult {
    /// Create from the best tree and run statistics.
    pub(super) fn new(best: &Tree<Sample>, stats: &EvolutionStats, seed: u64) -> Self {
        Self {
            seed,
            best_penalty: best.penalty_or_max(),
            expression: best.to_string(),
            prefix: best.to_prefix(),
            size: best.size(),
            depth: best.depth(),
            generations: stats.generations.len().saturating_sub(1),
            best_generation: stats.best_generation,
            cost_evaluations: stats.cost_evaluations,
            elapsed_seconds: stats.elapsed_seconds,
            history: stats.generations.clone(),
        }
    }
}

/// Format a run result as human-readable text.
pub(super) fn format_text(best: &Tree<Sample>, stats: &EvolutionStats, seed: u64) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Best penalty: {}", best.penalty_or_max());
    let _ = writeln!(output, "{best}");
    let _ = writeln!(output);
    let _ = writeln!(output, "  Prefix: {}", best.to_prefix());
    let _ = writeln!(output, "  Size: {} nodes, depth {}", best.size(), best.depth());
    let _ = writeln!(
        output,
        "  Generations: {} (best found in generation {})",
        stats.generations.len().saturating_sub(1),
        stats.best_generation
    );
    let _ = writeln!(output, "  Cost evaluations: {}", stats.cost_evaluations);
    let _ = writeln!(output, "  Seed: {seed}");
    let _ = writeln!(output, "  Duration: {:.2}s", stats.elapsed_seconds);

    output
}
