//! Subtree mutation.
//!
//! A uniformly chosen non-root subtree is replaced by a freshly grown one.
//! The replacement gets exactly the slack the rest of the tree leaves, so a
//! parent within the population bounds always yields a child within them.

use crate::error::GpResult;
use crate::gp::generate::Generator;
use crate::gp::tree::{Tree, TreeLimits};
use rand::Rng;

/// Produce a mutated copy of `parent`.
///
/// The copy is unevaluated and `parent` is left untouched. A single-node
/// parent has no subtree to replace and is swapped for a whole new tree
/// grown to `limits`.
///
/// # Errors
///
/// Propagates generator errors. These only occur when `limits` cannot hold
/// even a single node.
pub fn mutate<C, R: Rng>(
    parent: &Tree<C>,
    generator: &Generator<C>,
    limits: TreeLimits,
    rng: &mut R,
) -> GpResult<Tree<C>> {
    let Some((target, slot)) = parent.random_node(rng) else {
        return generator.grow(limits.max_depth, limits.max_nodes, false, rng);
    };

    let max_depth = limits.max_depth.saturating_sub(parent.depth()) + parent.subtree_depth(target);
    let max_nodes = limits.max_nodes.saturating_sub(parent.size()) + parent.subtree_size(target);
    let replacement = generator.grow(max_depth, max_nodes, false, rng)?;

    let mut child = parent.clone();
    // Non-root nodes always have a parent.
    if let Some(attach) = child.parent(target) {
        child.replace_child(attach, slot, &replacement);
    }
    Ok(child)
}
