//! Penalty (cost) interface.
//!
//! A penalty scores a tree against a set of sample contexts; lower is
//! better. The engine calls it exactly once per evaluated individual and
//! counts every call against its evaluation budget, so implementations
//! should depend only on the tree and the contexts.

use crate::gp::tree::Tree;

/// Scores a tree against sample contexts.
pub trait Penalty<C> {
    /// Penalty of `tree` over `contexts`. Lower is better.
    fn calculate(&self, contexts: &[C], tree: &Tree<C>) -> f64;
}

impl<C, F> Penalty<C> for F
where
    F: Fn(&[C], &Tree<C>) -> f64,
{
    fn calculate(&self, contexts: &[C], tree: &Tree<C>) -> f64 {
        self(contexts, tree)
    }
}
