//! End-to-end tests for the evolution engine and the regression driver.
//!
//! Run with: cargo test --release engine_integration

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::io::Write;
use std::ops::ControlFlow;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::SmallRng;

use gpsr::gp::invariants::{check_bounds, check_tree};
use gpsr::gp::{Catalog, Engine, EngineConfig, Generator, Operator, Tree};
use gpsr::symreg::{self, RootSumSquaredError, Sample};
use gpsr::{ConfigError, RunConfig};

fn arithmetic() -> Arc<Catalog<f64>> {
    Arc::new(
        Catalog::new(vec![
            Operator::new("+", 2, |n, x| n.child(0).evaluate(x) + n.child(1).evaluate(x)),
            Operator::new("*", 2, |n, x| n.child(0).evaluate(x) * n.child(1).evaluate(x)),
            Operator::terminal("x", |x: &f64| *x),
            Operator::constant(-1.0, 1.0),
        ])
        .unwrap(),
    )
}

#[test]
fn test_full_and_grow_on_small_budget() {
    let generator = Generator::new(arithmetic(), 3);
    let mut rng = SmallRng::seed_from_u64(42);

    for _ in 0..100 {
        let full = generator.full(3, 7, &mut rng).unwrap();
        assert_eq!(full.size(), 7);
        assert_eq!(full.depth(), 3);
        for id in full.node_ids() {
            let children = full.children(id).len();
            assert!(children == 2 || (children == 0 && full.node(id).arity() == 0));
        }

        let grown = generator.grow(3, 7, true, &mut rng).unwrap();
        assert!(grown.depth() <= 3);
        assert!(grown.size() <= 7);
        assert!(!grown.operator(grown.root()).is_terminal());
    }
}

#[test]
fn test_square_of_two() {
    let catalog = Arc::new(
        Catalog::new(vec![
            Operator::new("*", 2, |n, p: &(f64, f64)| n.child(0).evaluate(p) * n.child(1).evaluate(p)),
            Operator::terminal("x", |p: &(f64, f64)| p.0),
        ])
        .unwrap(),
    );
    let tree = Tree::from_prefix(Arc::clone(&catalog), &["*", "x", "x"], &mut SmallRng::seed_from_u64(0)).unwrap();
    assert!((tree.evaluate(&(2.0, 4.0)) - 4.0).abs() < 1e-12);

    let penalty = |points: &[(f64, f64)], tree: &Tree<(f64, f64)>| {
        points
            .iter()
            .map(|p| (tree.evaluate(p) - p.1).powi(2))
            .sum::<f64>()
            .sqrt()
    };
    let config = EngineConfig {
        population_size: 10,
        tournament_size: 3,
        max_tree_nodes: 7,
        max_tree_depth: 3,
        cost_evaluation_budget: 10,
        ..EngineConfig::default()
    };
    let mut engine = Engine::with_seed(config, catalog, penalty, vec![(2.0, 4.0)], 1).unwrap();

    let mut scored = tree.clone();
    engine.evaluate(&mut scored);
    assert_eq!(scored.penalty(), Some(0.0));

    // Every depth-2 tree over {*, x} is x*x.
    let stats = engine.run().unwrap();
    assert!(stats.best_penalty.abs() < 1e-12);
    assert_eq!(engine.best().unwrap().to_string(), "(x*x)");
}

#[test]
fn test_run_keeps_population_sound() {
    let penalty = |xs: &[f64], tree: &Tree<f64>| {
        xs.iter()
            .map(|x| (tree.evaluate(x) - (x * x * x - x)).abs())
            .sum::<f64>()
    };
    let config = EngineConfig {
        population_size: 50,
        max_tree_depth: 6,
        max_tree_nodes: 30,
        tournament_size: 5,
        elitism: 3,
        cost_evaluation_budget: 2_000,
        ..EngineConfig::default()
    };
    let xs: Vec<f64> = (-10..=10).map(|i| f64::from(i) / 5.0).collect();
    let mut engine = Engine::with_seed(config, arithmetic(), penalty, xs, 2024).unwrap();

    let mut seen = Vec::new();
    let stats = engine
        .run_with(|generation| {
            seen.push(generation.cost_evaluations);
            ControlFlow::Continue(())
        })
        .unwrap();

    assert_eq!(seen.len(), stats.generations.len());
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert!(engine.cost_evaluations() >= 2_000);
    for pair in stats.generations.windows(2) {
        assert!(pair[1].best_penalty <= pair[0].best_penalty);
    }
    for tree in engine.population() {
        assert!(check_tree(tree).is_empty());
        assert!(check_bounds(tree, 6, 30).is_empty());
    }
}

#[test]
fn test_injected_rng() {
    let config = EngineConfig {
        population_size: 20,
        tournament_size: 4,
        max_tree_nodes: 15,
        cost_evaluation_budget: 200,
        ..EngineConfig::default()
    };
    let penalty = |xs: &[f64], tree: &Tree<f64>| xs.iter().map(|x| (tree.evaluate(x) - 2.0 * x).abs()).sum::<f64>();

    let run = |seed: u64| {
        let mut engine = Engine::new(config, arithmetic(), penalty, vec![1.0, 2.0, 3.0], SmallRng::seed_from_u64(seed)).unwrap();
        let stats = engine.run().unwrap();
        (stats.generations, engine.best().unwrap().to_prefix())
    };
    assert_eq!(run(5), run(5));
}

#[test]
fn test_regression_from_files() {
    let dir = tempfile::tempdir().unwrap();

    let mut data = std::fs::File::create(dir.path().join("problem.txt")).unwrap();
    for i in 0..20 {
        let x1 = f64::from(i) / 4.0;
        let x2 = f64::from(20 - i) / 8.0;
        writeln!(data, "{x1}\t{x2}\t{}", x1 * x2 + x1).unwrap();
    }

    let config_path = dir.path().join("run.json");
    std::fs::write(
        &config_path,
        r#"{
            "engine": {
                "population_size": 100,
                "tournament_size": 5,
                "max_tree_depth": 5,
                "max_tree_nodes": 25,
                "cost_evaluation_budget": 3000
            },
            "operators": ["add", "sub", "mul", "div"],
            "constants": { "min": -1.0, "max": 1.0 },
            "data": "problem.txt",
            "seed": 11
        }"#,
    )
    .unwrap();

    let config = RunConfig::load(&config_path).unwrap();
    config.validate().unwrap();
    let samples = config.load_samples().unwrap();
    assert_eq!(samples.len(), 20);
    assert_eq!(samples[0].inputs.len(), 2);

    let mut engine = config.build_engine(samples.clone(), config.resolve_seed()).unwrap();
    let stats = engine.run().unwrap();
    let best = engine.best().unwrap();

    let rescored = gpsr::Penalty::calculate(&RootSumSquaredError, &samples, best);
    assert!((rescored - best.penalty().unwrap()).abs() < 1e-9);
    assert!(stats.best_penalty <= stats.generations[0].best_penalty);
    assert!(check_bounds(best, 5, 25).is_empty());
}

#[test]
fn test_bad_data_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("problem.txt"), "1\t2\n3\n").unwrap();
    let config = RunConfig {
        data: dir.path().join("problem.txt"),
        ..RunConfig::default()
    };
    let err = config.load_samples().unwrap_err();
    assert!(matches!(err, ConfigError::Dataset(_)));
    assert!(err.to_string().contains("line 2"));
}

#[test]
fn test_regression_engine_single_input() {
    let samples: Vec<Sample> = (1..=8)
        .map(|i| {
            let x = f64::from(i);
            Sample::new(vec![x], x.sqrt())
        })
        .collect();
    let config = EngineConfig {
        population_size: 40,
        tournament_size: 4,
        max_tree_depth: 4,
        max_tree_nodes: 15,
        cost_evaluation_budget: 500,
        ..EngineConfig::default()
    };
    let mut engine = symreg::regression_engine(config, &["sqrt", "add", "mul"], None, samples, 8).unwrap();
    let stats = engine.run().unwrap();
    // sqrt(x1) is among the smallest trees the initial population holds.
    assert!(stats.best_penalty < 1e-9);
}
