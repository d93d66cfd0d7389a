//! Tree invariants - sanity checks that detect bugs in structural edits.
//!
//! Generators, mutation and crossover maintain these by construction. If a
//! check ever reports a violation, an edit forgot to relink a parent or to
//! recompute sizes.

use crate::gp::tree::{NodeId, Tree};

/// Invariant violation error.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub message: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invariant violation: {}", self.message)
    }
}

impl std::error::Error for InvariantViolation {}

/// Check the structural invariants of a tree.
///
/// Verifies that the root is the only parentless node, that every parent
/// link matches the owning node, that child counts match operator arities,
/// that memoized sizes and depths follow their recurrences, and that every
/// node in the arena is reachable from the root.
///
/// Returns a list of violations found, or empty if all invariants hold.
#[must_use]
pub fn check_tree<C>(tree: &Tree<C>) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let mut report = |message: String| violations.push(InvariantViolation { message });

    if let Some(parent) = tree.parent(tree.root()) {
        report(format!("root {:?} has parent {parent:?}", tree.root()));
    }

    let mut reachable = 0usize;
    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        reachable += 1;
        let children = tree.children(id);
        let arity = tree.operator(id).arity();

        if children.len() != arity {
            report(format!(
                "node {id:?} ({}) has {} children, arity is {arity}",
                tree.operator(id).symbol(),
                children.len()
            ));
        }

        let mut size = 1;
        let mut depth = 0;
        for &child in children {
            if tree.parent(child) != Some(id) {
                report(format!(
                    "child {child:?} of {id:?} points to parent {:?}",
                    tree.parent(child)
                ));
            }
            size += tree.subtree_size(child);
            depth = depth.max(tree.subtree_depth(child));
            stack.push(child);
        }

        if tree.subtree_size(id) != size {
            report(format!(
                "node {id:?} memoizes size {}, children sum to {size}",
                tree.subtree_size(id)
            ));
        }
        if tree.subtree_depth(id) != depth + 1 {
            report(format!(
                "node {id:?} memoizes depth {}, expected {}",
                tree.subtree_depth(id),
                depth + 1
            ));
        }
        if reachable > tree.node_ids().count() {
            report("cycle detected while walking from the root".to_string());
            break;
        }
    }

    let total = tree.node_ids().count();
    if reachable != total {
        report(format!("{reachable} of {total} arena nodes reachable from root"));
    }

    violations
}

/// Check that a tree fits the population bounds.
#[must_use]
pub fn check_bounds<C>(tree: &Tree<C>, max_depth: usize, max_nodes: usize) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    if tree.depth() > max_depth {
        violations.push(InvariantViolation {
            message: format!("depth {} exceeds maximum {max_depth}", tree.depth()),
        });
    }
    if tree.size() > max_nodes {
        violations.push(InvariantViolation {
            message: format!("size {} exceeds maximum {max_nodes}", tree.size()),
        });
    }
    violations
}

/// Ids of every node reachable from the root, in preorder.
#[must_use]
pub fn preorder<C>(tree: &Tree<C>) -> Vec<NodeId> {
    let mut order = Vec::with_capacity(tree.size());
    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        order.push(id);
        stack.extend(tree.children(id).iter().rev());
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::catalog::{Catalog, Operator};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::sync::Arc;

    fn tree(tokens: &[&str]) -> Tree<f64> {
        let catalog = Arc::new(
            Catalog::new(vec![
                Operator::terminal("x", |x: &f64| *x),
                Operator::new("+", 2, |n, x| n.child(0).evaluate(x) + n.child(1).evaluate(x)),
            ])
            .unwrap(),
        );
        Tree::from_prefix(catalog, tokens, &mut SmallRng::seed_from_u64(0)).unwrap()
    }

    #[test]
    fn test_valid_tree_has_no_violations() {
        let t = tree(&["+", "x", "+", "x", "x"]);
        assert!(check_tree(&t).is_empty());
        assert!(check_bounds(&t, 3, 5).is_empty());
    }

    #[test]
    fn test_bounds_violations() {
        let t = tree(&["+", "x", "+", "x", "x"]);
        assert_eq!(check_bounds(&t, 2, 4).len(), 2);
    }

    #[test]
    fn test_preorder() {
        let t = tree(&["+", "x", "+", "x", "x"]);
        let order = preorder(&t);
        assert_eq!(order.len(), 5);
        assert_eq!(order[0], t.root());
    }
}
