//! Subtree crossover.
//!
//! One non-root subtree is picked uniformly in each parent and the two are
//! exchanged. Offspring that break the population bounds are discarded, so
//! a crossover yields zero, one or two children.

use crate::gp::tree::{Tree, TreeLimits};
use rand::Rng;

/// Cross `first` with `second`.
///
/// Returns the offspring that fit `limits`, in parent order. The offspring
/// are unevaluated and both parents are left untouched. Either parent being
/// a single node leaves nothing to exchange and yields no offspring.
#[must_use]
pub fn cross<C, R: Rng>(first: &Tree<C>, second: &Tree<C>, limits: TreeLimits, rng: &mut R) -> Vec<Tree<C>> {
    let (Some((a, _)), Some((b, _))) = (first.random_node(rng), second.random_node(rng)) else {
        return Vec::new();
    };

    let mut left = first.clone();
    let mut right = second.clone();
    Tree::swap_subtrees(&mut left, a, &mut right, b);

    let offspring: Vec<_> = [left, right].into_iter().filter(|child| limits.admits(child)).collect();
    if offspring.len() < 2 {
        log::trace!("crossover dropped {} of 2 offspring", 2 - offspring.len());
    }
    offspring
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::catalog::{Catalog, Operator};
    use crate::gp::generate::Generator;
    use crate::gp::invariants::{check_bounds, check_tree};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::sync::Arc;

    fn catalog() -> Arc<Catalog<f64>> {
        Arc::new(
            Catalog::new(vec![
                Operator::terminal("x", |x: &f64| *x),
                Operator::terminal("y", |_: &f64| 2.0),
                Operator::new("neg", 1, |n, x| -n.child(0).evaluate(x)),
                Operator::new("+", 2, |n, x| n.child(0).evaluate(x) + n.child(1).evaluate(x)),
            ])
            .unwrap(),
        )
    }

    fn parse(catalog: &Arc<Catalog<f64>>, tokens: &[&str]) -> Tree<f64> {
        Tree::from_prefix(Arc::clone(catalog), tokens, &mut SmallRng::seed_from_u64(0)).unwrap()
    }

    #[test]
    fn test_offspring_fit_limits() {
        let catalog = catalog();
        let generator = Generator::new(Arc::clone(&catalog), 5);
        let limits = TreeLimits {
            max_depth: 5,
            max_nodes: 15,
        };
        let mut rng = SmallRng::seed_from_u64(42);

        for _ in 0..300 {
            let a = generator.grow(5, 15, true, &mut rng).unwrap();
            let b = generator.full(4, 15, &mut rng).unwrap();
            let offspring = cross(&a, &b, limits, &mut rng);
            assert!(offspring.len() <= 2);
            for child in &offspring {
                assert!(check_tree(child).is_empty());
                assert!(check_bounds(child, 5, 15).is_empty());
                assert!(child.penalty().is_none());
            }
        }
    }

    #[test]
    fn test_unbounded_crossover_yields_two() {
        let catalog = catalog();
        let a = parse(&catalog, &["+", "x", "neg", "x"]);
        let b = parse(&catalog, &["+", "y", "+", "y", "y"]);
        let limits = TreeLimits {
            max_depth: 10,
            max_nodes: 100,
        };
        let mut rng = SmallRng::seed_from_u64(5);

        for _ in 0..50 {
            let offspring = cross(&a, &b, limits, &mut rng);
            assert_eq!(offspring.len(), 2);
            // Node counts are conserved by an exchange.
            assert_eq!(offspring[0].size() + offspring[1].size(), a.size() + b.size());
        }
    }

    #[test]
    fn test_oversized_offspring_dropped() {
        // Grafting a long chain into `a` overflows the node limit, while the
        // 8 nodes shared between both children keep the other one valid.
        let catalog = catalog();
        let a = parse(&catalog, &["+", "x", "x"]);
        let b = parse(&catalog, &["neg", "neg", "neg", "neg", "y"]);
        let limits = TreeLimits {
            max_depth: 5,
            max_nodes: 5,
        };
        let mut rng = SmallRng::seed_from_u64(17);

        let mut saw_single = false;
        for _ in 0..200 {
            let offspring = cross(&a, &b, limits, &mut rng);
            assert!(!offspring.is_empty());
            for child in &offspring {
                assert!(child.size() <= 5 && child.depth() <= 5);
            }
            saw_single |= offspring.len() == 1;
        }
        assert!(saw_single);
    }

    #[test]
    fn test_both_offspring_rejected() {
        // Swapping leaf for leaf leaves both children as oversized as their
        // parents, so that exchange must yield nothing.
        let catalog = catalog();
        let chain = parse(&catalog, &["neg", "neg", "neg", "neg", "x"]);
        let wide = parse(&catalog, &["+", "+", "x", "x", "+", "x", "x"]);
        let limits = TreeLimits {
            max_depth: 4,
            max_nodes: 6,
        };
        let mut rng = SmallRng::seed_from_u64(29);

        let mut empty = 0;
        for _ in 0..200 {
            let offspring = cross(&chain, &wide, limits, &mut rng);
            for child in &offspring {
                assert!(limits.admits(child));
            }
            if offspring.is_empty() {
                empty += 1;
            }
        }
        assert!(empty > 0 && empty < 200, "{empty} of 200 crossings were empty");
    }

    #[test]
    fn test_single_node_parent_yields_nothing() {
        let catalog = catalog();
        let leaf = parse(&catalog, &["x"]);
        let other = parse(&catalog, &["+", "x", "y"]);
        let limits = TreeLimits {
            max_depth: 4,
            max_nodes: 10,
        };
        let mut rng = SmallRng::seed_from_u64(3);

        assert!(cross(&leaf, &other, limits, &mut rng).is_empty());
        assert!(cross(&other, &leaf, limits, &mut rng).is_empty());
    }

    #[test]
    fn test_parents_untouched() {
        let catalog = catalog();
        let a = parse(&catalog, &["+", "x", "neg", "x"]);
        let b = parse(&catalog, &["+", "y", "y"]);
        let (a0, b0) = (a.clone(), b.clone());
        let mut rng = SmallRng::seed_from_u64(21);

        let limits = TreeLimits {
            max_depth: 6,
            max_nodes: 20,
        };
        for _ in 0..20 {
            let _ = cross(&a, &b, limits, &mut rng);
        }
        assert!(a.same_structure(&a0));
        assert!(b.same_structure(&b0));
    }
}
