//! Main evolution loop for genetic programming.
//!
//! The engine owns the population, the penalty, the sample contexts and the
//! random source. It seeds the population with ramped half-and-half, then
//! replaces it generation by generation until the cost-evaluation budget is
//! spent. Every penalty calculation counts against that budget; cloning a
//! tournament winner does not.

use crate::error::{GpError, GpResult};
use crate::gp::catalog::Catalog;
use crate::gp::crossover;
use crate::gp::generate::Generator;
use crate::gp::mutation;
use crate::gp::penalty::Penalty;
use crate::gp::selection::{self, SelectionStats};
use crate::gp::tree::{Tree, TreeLimits};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::ControlFlow;
use std::slice;
use std::sync::Arc;
use std::time::Instant;

/// Configuration for the evolution process.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of individuals per generation.
    pub population_size: usize,
    /// Maximum tree depth (a single leaf has depth 1).
    pub max_tree_depth: usize,
    /// Maximum number of nodes per tree.
    pub max_tree_nodes: usize,
    /// Number of individuals competing in each tournament.
    pub tournament_size: usize,
    /// Number of best individuals copied unchanged into the next generation.
    pub elitism: usize,
    /// Probability of cloning a tournament winner.
    pub p_clone: f64,
    /// Probability of mutating a tournament winner.
    pub p_mutate: f64,
    /// Probability of crossing two tournament winners.
    ///
    /// Crossover takes whatever probability mass cloning and mutation leave,
    /// so this value is informational.
    pub p_cross: f64,
    /// Penalty calculations allowed before the run stops.
    pub cost_evaluation_budget: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            population_size: 500,
            max_tree_depth: 7,
            max_tree_nodes: 200,
            tournament_size: 7,
            elitism: 1,
            p_clone: 0.01,
            p_mutate: 0.14,
            p_cross: 0.85,
            cost_evaluation_budget: 1_000_000,
        }
    }
}

impl EngineConfig {
    /// Tree bounds every population member must satisfy.
    #[must_use]
    pub fn limits(&self) -> TreeLimits {
        TreeLimits {
            max_depth: self.max_tree_depth,
            max_nodes: self.max_tree_nodes,
        }
    }

    /// Check the configuration on its own, without an operator catalog.
    ///
    /// # Errors
    ///
    /// Returns [`GpError::Configuration`] describing the first problem found.
    pub fn validate(&self) -> GpResult<()> {
        if self.population_size == 0 {
            return Err(GpError::config("population_size must be at least 1"));
        }
        if self.max_tree_nodes == 0 {
            return Err(GpError::config("max_tree_nodes must be at least 1"));
        }
        if self.max_tree_depth < 2 {
            return Err(GpError::config(format!(
                "max_tree_depth must be at least 2, got {}",
                self.max_tree_depth
            )));
        }
        if self.tournament_size == 0 || self.tournament_size > self.population_size {
            return Err(GpError::config(format!(
                "tournament_size must be in 1..={}, got {}",
                self.population_size, self.tournament_size
            )));
        }
        if self.elitism > self.population_size {
            return Err(GpError::config(format!(
                "elitism {} exceeds population_size {}",
                self.elitism, self.population_size
            )));
        }
        for (name, p) in [("p_clone", self.p_clone), ("p_mutate", self.p_mutate), ("p_cross", self.p_cross)] {
            if !(0.0..=1.0).contains(&p) {
                return Err(GpError::config(format!("{name} must be within [0, 1], got {p}")));
            }
        }
        if self.p_clone + self.p_mutate < 1.0 && self.tournament_size < 2 {
            return Err(GpError::config("crossover needs tournament_size of at least 2"));
        }
        Ok(())
    }
}

/// Statistics for a single generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Generation number, 0 for the initial population.
    pub generation: usize,
    /// Penalty calculations spent so far.
    pub cost_evaluations: usize,
    /// Lowest penalty in this generation.
    pub best_penalty: f64,
    /// Mean penalty.
    pub mean_penalty: f64,
    /// Penalty standard deviation.
    pub penalty_std: f64,
}

/// Overall statistics from an evolution run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Statistics per generation.
    pub generations: Vec<GenerationStats>,
    /// Lowest penalty seen during the run.
    pub best_penalty: f64,
    /// Generation where the lowest penalty first appeared.
    pub best_generation: usize,
    /// Penalty calculations spent in total.
    pub cost_evaluations: usize,
    /// Total time in seconds.
    pub elapsed_seconds: f64,
}

/// Evolutionary engine over trees evaluated in context `C`.
pub struct Engine<C, P, R = SmallRng> {
    config: EngineConfig,
    generator: Generator<C>,
    max_depth_full: usize,
    penalty: P,
    contexts: Vec<C>,
    population: Vec<Tree<C>>,
    cost_evaluations: usize,
    generation: usize,
    rng: R,
}

impl<C, P: Penalty<C>> Engine<C, P, SmallRng> {
    /// Create an engine driven by a `SmallRng` seeded with `seed`.
    ///
    /// # Errors
    ///
    /// See [`Engine::new`].
    pub fn with_seed(
        config: EngineConfig,
        catalog: Arc<Catalog<C>>,
        penalty: P,
        contexts: Vec<C>,
        seed: u64,
    ) -> GpResult<Self> {
        Self::new(config, catalog, penalty, contexts, SmallRng::seed_from_u64(seed))
    }
}

impl<C, P: Penalty<C>, R: Rng> Engine<C, P, R> {
    /// Create an engine. The population stays empty until
    /// [`initialize_population`](Self::initialize_population) or
    /// [`run`](Self::run).
    ///
    /// # Errors
    ///
    /// Returns [`GpError::Configuration`] if the configuration is invalid,
    /// the catalog has no non-terminal, or `max_tree_nodes` cannot hold a
    /// non-terminal root.
    pub fn new(
        config: EngineConfig,
        catalog: Arc<Catalog<C>>,
        penalty: P,
        contexts: Vec<C>,
        rng: R,
    ) -> GpResult<Self> {
        config.validate()?;

        let min_arity = catalog
            .min_non_zero_arity()
            .ok_or_else(|| GpError::config("catalog has no non-terminal operator"))?;
        if config.max_tree_nodes < 1 + min_arity {
            return Err(GpError::config(format!(
                "max_tree_nodes {} cannot hold a root of arity {min_arity} and its children",
                config.max_tree_nodes
            )));
        }

        let generator = Generator::new(catalog, config.max_tree_depth);
        let max_depth_full = generator
            .max_depth_full(config.max_tree_depth, config.max_tree_nodes)
            .ok_or_else(|| GpError::config("max_tree_nodes is too small for a depth-2 full tree"))?;

        log::info!(
            "engine: population={} depth={} (full up to {}) nodes={} tournament={} elitism={} budget={}",
            config.population_size,
            config.max_tree_depth,
            max_depth_full,
            config.max_tree_nodes,
            config.tournament_size,
            config.elitism,
            config.cost_evaluation_budget
        );

        Ok(Self {
            config,
            generator,
            max_depth_full,
            penalty,
            contexts,
            population: Vec::new(),
            cost_evaluations: 0,
            generation: 0,
            rng,
        })
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Tree generator bound to the engine's catalog.
    #[must_use]
    pub fn generator(&self) -> &Generator<C> {
        &self.generator
    }

    /// Deepest depth used by the `full` half of the initial population.
    #[must_use]
    pub fn max_depth_full(&self) -> usize {
        self.max_depth_full
    }

    /// Sample contexts handed to the penalty.
    #[must_use]
    pub fn contexts(&self) -> &[C] {
        &self.contexts
    }

    /// Current population.
    #[must_use]
    pub fn population(&self) -> &[Tree<C>] {
        &self.population
    }

    /// Penalty calculations spent so far.
    #[must_use]
    pub fn cost_evaluations(&self) -> usize {
        self.cost_evaluations
    }

    /// Number of generations produced since initialization.
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Lowest-penalty member of the current population.
    #[must_use]
    pub fn best(&self) -> Option<&Tree<C>> {
        selection::best_index(&self.population).map(|i| &self.population[i])
    }

    /// Score `tree` and count one cost evaluation.
    ///
    /// A NaN penalty is stored as infinity so that ranking stays total.
    pub fn evaluate(&mut self, tree: &mut Tree<C>) {
        let penalty = self.penalty.calculate(&self.contexts, tree);
        tree.set_penalty(if penalty.is_nan() { f64::INFINITY } else { penalty });
        self.cost_evaluations += 1;
    }

    /// Replace the population using ramped half-and-half.
    ///
    /// The first half is built with `full` at depths cycling through
    /// `2..=max_depth_full`, the second half with `grow` at depths cycling
    /// through `2..=max_tree_depth` and a non-terminal root. Every member is
    /// evaluated.
    ///
    /// # Errors
    ///
    /// Propagates generator errors, which a validated engine never produces.
    pub fn initialize_population(&mut self) -> GpResult<()> {
        let n = self.config.population_size;
        let max_nodes = self.config.max_tree_nodes;
        let half = n / 2;

        let mut population = Vec::with_capacity(n);
        for i in 0..n {
            let tree = if i < half {
                let depth = 2 + i % (self.max_depth_full - 1);
                self.generator.full(depth, max_nodes, &mut self.rng)?
            } else {
                let depth = 2 + i % (self.config.max_tree_depth - 1);
                self.generator.grow(depth, max_nodes, true, &mut self.rng)?
            };
            population.push(tree);
        }

        for tree in &mut population {
            let root = tree.root();
            tree.recalculate_subtree_sizes(root);
            self.evaluate(tree);
        }

        self.population = population;
        self.generation = 0;
        Ok(())
    }

    /// Run one tournament and return the indices of its `winners` best
    /// competitors. Shuffles the population.
    pub fn tournament(&mut self, winners: usize) -> Vec<usize> {
        selection::tournament(&mut self.population, self.config.tournament_size, winners, &mut self.rng)
    }

    /// Mutate a copy of `parent` and evaluate it.
    ///
    /// # Errors
    ///
    /// Propagates generator errors, which a validated engine never produces.
    pub fn mutate(&mut self, parent: &Tree<C>) -> GpResult<Tree<C>> {
        let mut child = mutation::mutate(parent, &self.generator, self.config.limits(), &mut self.rng)?;
        self.evaluate_offspring(slice::from_mut(&mut child));
        Ok(child)
    }

    /// Cross `first` with `second` and evaluate the valid offspring.
    pub fn cross(&mut self, first: &Tree<C>, second: &Tree<C>) -> Vec<Tree<C>> {
        let mut offspring = crossover::cross(first, second, self.config.limits(), &mut self.rng);
        self.evaluate_offspring(&mut offspring);
        offspring
    }

    /// Score freshly bred offspring, one cost evaluation each.
    fn evaluate_offspring(&mut self, offspring: &mut [Tree<C>]) {
        for child in offspring {
            self.evaluate(child);
        }
    }

    /// Replace the population with the next generation.
    ///
    /// The `elitism` best members are carried over unchanged; the rest is
    /// filled by cloning, mutating or crossing tournament winners.
    ///
    /// # Errors
    ///
    /// Propagates generator errors, which a validated engine never produces.
    pub fn new_generation(&mut self) -> GpResult<()> {
        let n = self.config.population_size;
        let limits = self.config.limits();
        let mutate_below = self.config.p_clone + self.config.p_mutate;

        selection::sort_by_penalty(&mut self.population);
        let mut next = Vec::with_capacity(n);
        next.extend(self.population.iter().take(self.config.elitism).cloned());

        while next.len() < n {
            let roll: f64 = self.rng.r#gen();
            if roll < self.config.p_clone {
                let winner = self.tournament(1)[0];
                next.push(self.population[winner].clone());
            } else if roll < mutate_below {
                let winner = self.tournament(1)[0];
                let mut child = mutation::mutate(&self.population[winner], &self.generator, limits, &mut self.rng)?;
                self.evaluate_offspring(slice::from_mut(&mut child));
                next.push(child);
            } else {
                let winners = self.tournament(2);
                let mut offspring = crossover::cross(
                    &self.population[winners[0]],
                    &self.population[winners[1]],
                    limits,
                    &mut self.rng,
                );
                self.evaluate_offspring(&mut offspring);
                let room = n - next.len();
                next.extend(offspring.into_iter().take(room));
            }
        }

        self.population = next;
        self.generation += 1;
        Ok(())
    }

    /// Statistics of the current population.
    #[must_use]
    pub fn stats(&self) -> GenerationStats {
        let stats = SelectionStats::from_population(&self.population);
        GenerationStats {
            generation: self.generation,
            cost_evaluations: self.cost_evaluations,
            best_penalty: stats.best_penalty,
            mean_penalty: stats.mean_penalty,
            penalty_std: stats.penalty_std,
        }
    }

    /// Evolve until the cost-evaluation budget is spent.
    ///
    /// # Errors
    ///
    /// Propagates generator errors, which a validated engine never produces.
    pub fn run(&mut self) -> GpResult<EvolutionStats> {
        self.run_with(|_| ControlFlow::Continue(()))
    }

    /// Evolve until the budget is spent or `observer` breaks.
    ///
    /// The population is initialized first if it is empty. `observer` sees
    /// the statistics of every generation, the initial one included, and
    /// may stop the run between generations.
    ///
    /// # Errors
    ///
    /// Propagates generator errors, which a validated engine never produces.
    pub fn run_with<F>(&mut self, mut observer: F) -> GpResult<EvolutionStats>
    where
        F: FnMut(&GenerationStats) -> ControlFlow<()>,
    {
        let start_time = Instant::now();
        if self.population.is_empty() {
            self.initialize_population()?;
        }

        let mut history = Vec::new();
        let mut best_penalty = f64::INFINITY;
        let mut best_generation = self.generation;

        loop {
            let stats = self.stats();
            if stats.best_penalty < best_penalty {
                best_penalty = stats.best_penalty;
                best_generation = stats.generation;
            }
            log::debug!(
                "Gen {:>5}: best={:.4} mean={:.4} std={:.4} evals={}",
                stats.generation,
                stats.best_penalty,
                stats.mean_penalty,
                stats.penalty_std,
                stats.cost_evaluations
            );
            history.push(stats);

            if observer(&stats).is_break() {
                log::info!("run stopped by observer at generation {}", self.generation);
                break;
            }
            if self.cost_evaluations >= self.config.cost_evaluation_budget {
                break;
            }
            self.new_generation()?;
        }

        let elapsed = start_time.elapsed().as_secs_f64();
        log::info!(
            "finished after {} generations and {} evaluations in {elapsed:.2}s, best penalty {best_penalty}",
            self.generation,
            self.cost_evaluations
        );

        Ok(EvolutionStats {
            generations: history,
            best_penalty,
            best_generation,
            cost_evaluations: self.cost_evaluations,
            elapsed_seconds: elapsed,
        })
    }
}

impl<C, P, R> fmt::Debug for Engine<C, P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("max_depth_full", &self.max_depth_full)
            .field("population", &self.population.len())
            .field("contexts", &self.contexts.len())
            .field("cost_evaluations", &self.cost_evaluations)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
