//! Property-based tests for tree construction and variation.
//!
//! These tests verify that generators, mutation and crossover keep every
//! tree structurally sound and within its depth and node bounds.
//! Run with: cargo test --release prop_tree

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::sync::Arc;

use gpsr::gp::invariants::{check_bounds, check_tree};
use gpsr::gp::{Catalog, Generator, Operator, Tree, TreeLimits, cross, mutate};

/// Catalog with unary, binary and ternary operators plus two terminals.
fn catalog() -> Arc<Catalog<f64>> {
    Arc::new(
        Catalog::new(vec![
            Operator::terminal("x", |x: &f64| *x),
            Operator::constant(-1.0, 1.0),
            Operator::new("neg", 1, |n, x| -n.child(0).evaluate(x)),
            Operator::new("+", 2, |n, x| n.child(0).evaluate(x) + n.child(1).evaluate(x)),
            Operator::new("*", 2, |n, x| n.child(0).evaluate(x) * n.child(1).evaluate(x)),
            Operator::new("if", 3, |n, x| {
                if n.child(0).evaluate(x) > 0.0 {
                    n.child(1).evaluate(x)
                } else {
                    n.child(2).evaluate(x)
                }
            }),
        ])
        .unwrap(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// grow never exceeds its depth and node budgets.
    #[test]
    fn prop_grow_respects_budget(
        depth in 1usize..9,
        nodes in 1usize..80,
        seed in any::<u64>()
    ) {
        let generator = Generator::new(catalog(), 8);
        let mut rng = SmallRng::seed_from_u64(seed);
        let tree = generator.grow(depth, nodes, false, &mut rng).unwrap();

        prop_assert!(check_tree(&tree).is_empty());
        prop_assert!(check_bounds(&tree, depth, nodes).is_empty());
    }

    /// With terminals banned at the root, grow always starts with an operator.
    #[test]
    fn prop_grow_banned_root(
        depth in 2usize..9,
        nodes in 2usize..80,
        seed in any::<u64>()
    ) {
        let generator = Generator::new(catalog(), 8);
        let mut rng = SmallRng::seed_from_u64(seed);
        let tree = generator.grow(depth, nodes, true, &mut rng).unwrap();

        prop_assert!(!tree.operator(tree.root()).is_terminal());
        prop_assert!(check_bounds(&tree, depth, nodes).is_empty());
    }

    /// full reaches exactly the requested depth whenever the budget allows a
    /// chain of unary operators.
    #[test]
    fn prop_full_reaches_depth(
        depth in 1usize..9,
        extra in 0usize..60,
        seed in any::<u64>()
    ) {
        let generator = Generator::new(catalog(), 8);
        let mut rng = SmallRng::seed_from_u64(seed);
        let nodes = depth + extra;
        let tree = generator.full(depth, nodes, &mut rng).unwrap();

        prop_assert!(check_tree(&tree).is_empty());
        prop_assert_eq!(tree.depth(), depth);
        prop_assert!(tree.size() <= nodes);
    }

    /// Random nodes are never the root and always sit in the reported slot.
    #[test]
    fn prop_random_node_not_root(seed in any::<u64>()) {
        let generator = Generator::new(catalog(), 6);
        let mut rng = SmallRng::seed_from_u64(seed);
        let tree = generator.grow(6, 40, true, &mut rng).unwrap();

        for _ in 0..20 {
            let (node, slot) = tree.random_node(&mut rng).unwrap();
            prop_assert_ne!(node, tree.root());
            let parent = tree.parent(node).unwrap();
            prop_assert_eq!(tree.children(parent)[slot], node);
        }
    }

    /// Mutation keeps the tree sound and within bounds, and never touches
    /// the parent.
    #[test]
    fn prop_mutation_preserves_bounds(
        max_depth in 2usize..8,
        max_nodes in 4usize..60,
        seed in any::<u64>()
    ) {
        let generator = Generator::new(catalog(), max_depth);
        let limits = TreeLimits { max_depth, max_nodes };
        let mut rng = SmallRng::seed_from_u64(seed);
        let parent = generator.grow(max_depth, max_nodes, true, &mut rng).unwrap();
        let snapshot = parent.clone();

        let mut child = parent.clone();
        for _ in 0..10 {
            child = mutate(&child, &generator, limits, &mut rng).unwrap();
            prop_assert!(check_tree(&child).is_empty());
            prop_assert!(limits.admits(&child));
        }
        prop_assert!(parent.same_structure(&snapshot));
    }

    /// Crossover only returns offspring within bounds, and returns both when
    /// the bounds cannot be broken.
    #[test]
    fn prop_crossover_rejection_law(
        max_depth in 2usize..7,
        max_nodes in 4usize..40,
        seed in any::<u64>()
    ) {
        let generator = Generator::new(catalog(), max_depth);
        let limits = TreeLimits { max_depth, max_nodes };
        let mut rng = SmallRng::seed_from_u64(seed);
        let a = generator.grow(max_depth, max_nodes, true, &mut rng).unwrap();
        let b = generator.full(max_depth.min(3), max_nodes, &mut rng).unwrap();

        let offspring = cross(&a, &b, limits, &mut rng);
        prop_assert!(offspring.len() <= 2);
        for child in &offspring {
            prop_assert!(check_tree(child).is_empty());
            prop_assert!(limits.admits(child));
        }

        let roomy = TreeLimits {
            max_depth: a.depth() + b.depth(),
            max_nodes: a.size() + b.size(),
        };
        let offspring = cross(&a, &b, roomy, &mut rng);
        prop_assert_eq!(offspring.len(), 2);
        prop_assert_eq!(offspring[0].size() + offspring[1].size(), a.size() + b.size());
    }
}

#[test]
fn test_random_node_is_uniform() {
    let tree = Tree::from_prefix(catalog(), &["+", "*", "x", "x", "neg", "x"], &mut SmallRng::seed_from_u64(0)).unwrap();
    let mut rng = SmallRng::seed_from_u64(42);

    let mut counts = [0usize; 6];
    for _ in 0..50_000 {
        let (node, _) = tree.random_node(&mut rng).unwrap();
        counts[node.index()] += 1;
    }

    assert_eq!(counts[tree.root().index()], 0);
    // Five candidates, 10_000 expected hits each.
    for (i, &count) in counts.iter().enumerate() {
        if i != tree.root().index() {
            assert!((9_000..11_000).contains(&count), "node {i} drawn {count} times");
        }
    }
}

#[test]
fn test_edits_on_clone_leave_original() {
    let generator = Generator::new(catalog(), 5);
    let mut rng = SmallRng::seed_from_u64(7);
    let original = generator.full(4, 30, &mut rng).unwrap();
    let snapshot = original.clone();

    let mut copy = original.clone();
    let donor = generator.grow(2, 3, false, &mut rng).unwrap();
    let (node, slot) = copy.random_node(&mut rng).unwrap();
    let parent = copy.parent(node).unwrap();
    copy.replace_child(parent, slot, &donor);

    assert!(original.same_structure(&snapshot));
    assert!(check_tree(&copy).is_empty());
}
