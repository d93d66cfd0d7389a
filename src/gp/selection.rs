//! Selection operators for genetic programming.
//!
//! Parents are picked by tournament: a random group of competitors is
//! drawn and the lowest-penalty ones win. Elitism relies on the population
//! being sorted by penalty before the next generation is filled.

// Statistics use intentional casts
#![allow(clippy::cast_precision_loss)]

use crate::gp::tree::Tree;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Run one tournament over `population`.
///
/// The population is shuffled in place, its first `tournament_size` members
/// compete, and the indices of the `winners` lowest-penalty competitors are
/// returned, best first. Unevaluated members rank last. Indices refer to the
/// shuffled order and stay valid until the population is reordered again.
pub fn tournament<C, R: Rng>(
    population: &mut [Tree<C>],
    tournament_size: usize,
    winners: usize,
    rng: &mut R,
) -> Vec<usize> {
    population.shuffle(rng);

    let mut competitors: Vec<usize> = (0..tournament_size.min(population.len())).collect();
    competitors.sort_by(|&a, &b| population[a].penalty_or_max().total_cmp(&population[b].penalty_or_max()));
    competitors.truncate(winners);
    competitors
}

/// Sort the population by ascending penalty, best first.
///
/// The sort is stable, so equally scored members keep their relative order.
pub fn sort_by_penalty<C>(population: &mut [Tree<C>]) {
    population.sort_by(|a, b| a.penalty_or_max().total_cmp(&b.penalty_or_max()));
}

/// Index of the lowest-penalty member, or `None` for an empty population.
#[must_use]
pub fn best_index<C>(population: &[Tree<C>]) -> Option<usize> {
    population
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.penalty_or_max().total_cmp(&b.penalty_or_max()))
        .map(|(i, _)| i)
}

/// Penalty distribution of a population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionStats {
    /// Mean penalty.
    pub mean_penalty: f64,
    /// Lowest penalty.
    pub best_penalty: f64,
    /// Highest penalty.
    pub worst_penalty: f64,
    /// Standard deviation of the penalties.
    pub penalty_std: f64,
}

impl SelectionStats {
    /// Calculate statistics from penalty values.
    #[must_use]
    pub fn from_penalties(penalties: &[f64]) -> Self {
        if penalties.is_empty() {
            return Self {
                mean_penalty: 0.0,
                best_penalty: 0.0,
                worst_penalty: 0.0,
                penalty_std: 0.0,
            };
        }

        let sum: f64 = penalties.iter().sum();
        let mean = sum / penalties.len() as f64;

        let best = penalties.iter().copied().fold(f64::INFINITY, f64::min);
        let worst = penalties.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let variance: f64 = penalties.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / penalties.len() as f64;

        Self {
            mean_penalty: mean,
            best_penalty: best,
            worst_penalty: worst,
            penalty_std: variance.sqrt(),
        }
    }

    /// Statistics over the evaluated members of `population`.
    #[must_use]
    pub fn from_population<C>(population: &[Tree<C>]) -> Self {
        let penalties: Vec<f64> = population.iter().filter_map(Tree::penalty).collect();
        Self::from_penalties(&penalties)
    }
}
