//! Budgeted tree generators.
//!
//! Both generators take a depth budget and a node budget and always return a
//! tree that fits both. The node budget of an internal node is split among
//! its children with random split points, so no child ever has to be rebuilt.

use crate::error::{GpError, GpResult};
use crate::gp::catalog::Catalog;
use crate::gp::tree::{NodeId, Tree, TreeBuilder};
use rand::Rng;
use std::sync::Arc;

/// Builds random trees from a catalog under size and depth budgets.
pub struct Generator<C> {
    catalog: Arc<Catalog<C>>,
    /// Minimum node count of a complete minimal-arity tree of depth `d + 1`.
    min_arity_series: Vec<usize>,
}

impl<C> Generator<C> {
    /// Create a generator able to build `full` trees up to `max_depth`.
    #[must_use]
    pub fn new(catalog: Arc<Catalog<C>>, max_depth: usize) -> Self {
        let min_arity_series = catalog.min_arity_series(max_depth.max(1));
        Self {
            catalog,
            min_arity_series,
        }
    }

    /// The catalog trees are built from.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog<C>> {
        &self.catalog
    }

    /// The precomputed minimal complete-tree sizes.
    #[must_use]
    pub fn min_arity_series(&self) -> &[usize] {
        &self.min_arity_series
    }

    /// Largest depth in `2..=max_depth` a complete tree of minimal-arity
    /// operators can reach within `max_nodes` nodes.
    #[must_use]
    pub fn max_depth_full(&self, max_depth: usize, max_nodes: usize) -> Option<usize> {
        (2..=max_depth.min(self.min_arity_series.len()))
            .rev()
            .find(|&d| max_nodes >= self.min_arity_series[d - 1])
    }

    /// Build a tree of depth at most `max_depth` and at most `max_nodes` nodes.
    ///
    /// Each node draws any operator whose arity still fits the node budget.
    /// With `ban_terminals` the root is never a terminal.
    ///
    /// # Errors
    ///
    /// Returns [`GpError::ConstructionInfeasible`] if a budget is zero, or if
    /// terminals are banned and the budget leaves room for none of the
    /// catalog's non-terminals.
    pub fn grow<R: Rng>(
        &self,
        max_depth: usize,
        max_nodes: usize,
        ban_terminals: bool,
        rng: &mut R,
    ) -> GpResult<Tree<C>> {
        let mut builder = TreeBuilder::new(Arc::clone(&self.catalog), max_nodes.min(64));
        grow_into(&mut builder, None, max_depth, max_nodes, ban_terminals, rng)?;
        Ok(builder.finish())
    }

    /// Build a tree whose every leaf sits at exactly `max_depth`, using at
    /// most `max_nodes` nodes.
    ///
    /// At each node the highest arity that still leaves enough budget for
    /// minimal-arity subtrees on every branch is chosen, then an operator is
    /// drawn among the non-terminals of arity up to that bound. This leans
    /// toward wide trees whenever the budget allows.
    ///
    /// # Errors
    ///
    /// Returns [`GpError::ConstructionInfeasible`] if `max_nodes` is too
    /// small for a complete tree of depth `max_depth`, or `max_depth` exceeds
    /// the depth this generator was created for.
    pub fn full<R: Rng>(&self, max_depth: usize, max_nodes: usize, rng: &mut R) -> GpResult<Tree<C>> {
        let mut builder = TreeBuilder::new(Arc::clone(&self.catalog), max_nodes.min(64));
        self.full_into(&mut builder, None, max_depth, max_nodes, rng)?;
        Ok(builder.finish())
    }

    fn full_into<R: Rng>(
        &self,
        builder: &mut TreeBuilder<C>,
        parent: Option<NodeId>,
        max_depth: usize,
        max_nodes: usize,
        rng: &mut R,
    ) -> GpResult<()> {
        let infeasible = |reason| GpError::ConstructionInfeasible {
            max_depth,
            max_nodes,
            reason,
        };
        if max_depth == 0 || max_nodes == 0 {
            return Err(infeasible("empty budget"));
        }

        let catalog = builder.catalog();
        if max_depth == 1 {
            let op = catalog
                .sample(0, false, rng)
                .ok_or_else(|| infeasible("catalog has no terminal"))?;
            builder.add(op, parent, rng);
            return Ok(());
        }

        let floor = *self
            .min_arity_series
            .get(max_depth - 2)
            .ok_or_else(|| infeasible("depth beyond precomputed series"))?;
        let min_arity = catalog
            .min_non_zero_arity()
            .ok_or_else(|| infeasible("catalog has no non-terminal"))?;
        let arity = (min_arity..=catalog.max_arity())
            .rev()
            .find(|&a| catalog.has_arity(a) && max_nodes > a.saturating_mul(floor))
            .ok_or_else(|| infeasible("node budget too small to reach depth"))?;
        let op = catalog
            .sample(arity, true, rng)
            .ok_or_else(|| infeasible("no non-terminal fits the budget"))?;

        let id = builder.add(op, parent, rng);
        let arity = builder.catalog().get(op).arity();
        let spare = max_nodes - arity * floor - 1;
        for gap in split_budget(spare, arity, rng) {
            self.full_into(builder, Some(id), max_depth - 1, floor + gap, rng)?;
        }
        Ok(())
    }
}

impl<C> std::fmt::Debug for Generator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("operators", &self.catalog.len())
            .field("min_arity_series", &self.min_arity_series)
            .finish()
    }
}

fn grow_into<C, R: Rng>(
    builder: &mut TreeBuilder<C>,
    parent: Option<NodeId>,
    max_depth: usize,
    max_nodes: usize,
    ban_terminals: bool,
    rng: &mut R,
) -> GpResult<()> {
    if max_depth == 0 || max_nodes == 0 {
        return Err(GpError::ConstructionInfeasible {
            max_depth,
            max_nodes,
            reason: "empty budget",
        });
    }

    let catalog = builder.catalog();
    let max_arity = if max_depth == 1 {
        0
    } else {
        catalog.max_arity().min(max_nodes - 1)
    };
    let op = catalog
        .sample(max_arity, ban_terminals, rng)
        .ok_or(GpError::ConstructionInfeasible {
            max_depth,
            max_nodes,
            reason: "no operator fits the budget",
        })?;
    let arity = catalog.get(op).arity();

    let id = builder.add(op, parent, rng);
    if arity == 0 {
        return Ok(());
    }

    // One node is this one, and every child needs at least one.
    let spare = max_nodes - arity - 1;
    for gap in split_budget(spare, arity, rng) {
        grow_into(builder, Some(id), max_depth - 1, 1 + gap, false, rng)?;
    }
    Ok(())
}

/// Split `spare` extra nodes among `parts` children.
///
/// Draws `parts - 1` cut points in `[0, spare]`, adds both ends, sorts, and
/// returns the gaps between consecutive points. The gaps sum to `spare`.
pub(crate) fn split_budget<R: Rng>(spare: usize, parts: usize, rng: &mut R) -> Vec<usize> {
    if parts == 0 {
        return Vec::new();
    }
    let mut cuts = Vec::with_capacity(parts + 1);
    cuts.push(0);
    cuts.push(spare);
    for _ in 1..parts {
        cuts.push(rng.gen_range(0..=spare));
    }
    cuts.sort_unstable();
    cuts.windows(2).map(|w| w[1] - w[0]).collect()
}
