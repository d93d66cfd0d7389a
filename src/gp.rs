//! Tree-based genetic programming.
//!
//! Programs are expression trees over a user-supplied operator catalog,
//! evaluated against an opaque context type `C`. The engine evolves a
//! population of such trees toward a lower penalty under fixed depth and
//! node-count bounds.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │         Evolution Engine            │
//! ├─────────────────────────────────────┤
//! │  Selection │ Crossover │ Mutation   │
//! ├─────────────────────────────────────┤
//! │   Generators (grow / full)          │
//! ├─────────────────────────────────────┤
//! │   Arena Tree  →  Penalty            │
//! ├─────────────────────────────────────┤
//! │   Operator Catalog                  │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use gpsr::gp::{Catalog, Engine, EngineConfig, Operator, Tree};
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(Catalog::new(vec![
//!     Operator::new("*", 2, |n, x: &f64| n.child(0).evaluate(x) * n.child(1).evaluate(x)),
//!     Operator::terminal("x", |x: &f64| *x),
//! ])?);
//!
//! let penalty = |xs: &[f64], tree: &Tree<f64>| {
//!     xs.iter().map(|x| (tree.evaluate(x) - x * x).abs()).sum::<f64>()
//! };
//! let config = EngineConfig {
//!     population_size: 20,
//!     tournament_size: 3,
//!     max_tree_nodes: 15,
//!     cost_evaluation_budget: 200,
//!     ..EngineConfig::default()
//! };
//! let mut engine = Engine::with_seed(config, catalog, penalty, vec![1.0, 2.0, 3.0], 42)?;
//! let stats = engine.run()?;
//! assert!(stats.cost_evaluations >= 200);
//! # Ok::<(), gpsr::GpError>(())
//! ```

mod catalog;
mod crossover;
mod evolution;
mod generate;
pub mod invariants;
mod mutation;
mod penalty;
mod selection;
mod tree;

pub use catalog::{Catalog, EvalFn, OpId, Operator};
pub use crossover::cross;
pub use evolution::{Engine, EngineConfig, EvolutionStats, GenerationStats};
pub use generate::Generator;
pub use mutation::mutate;
pub use penalty::Penalty;
pub use selection::{SelectionStats, best_index, sort_by_penalty, tournament};
pub use tree::{NodeId, NodeView, Tree, TreeLimits};
