//! Operator catalog for expression trees.
//!
//! The catalog holds every operator and terminal a tree may use. Operators
//! are kept sorted by arity with a prefix count per arity, so "a random
//! operator of arity at most k" is a single uniform draw over a slice.

use crate::error::{GpError, GpResult};
use crate::gp::tree::NodeView;
use rand::Rng;
use std::fmt;
use std::sync::Arc;

/// Evaluation function of an operator.
///
/// Receives a view of the node being evaluated (children are reached through
/// [`NodeView::child`]) and the sample context.
pub type EvalFn<C> = dyn Fn(&NodeView<'_, C>, &C) -> f64 + Send + Sync;

/// Index of an operator inside a [`Catalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpId(usize);

impl OpId {
    /// Position of the operator in the catalog.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A function or terminal symbol usable in a tree.
pub struct Operator<C> {
    symbol: String,
    arity: usize,
    generated: bool,
    eval: Arc<EvalFn<C>>,
}

impl<C> Operator<C> {
    /// Create an operator with the given symbol, arity and evaluation function.
    pub fn new<F>(symbol: impl Into<String>, arity: usize, eval: F) -> Self
    where
        F: Fn(&NodeView<'_, C>, &C) -> f64 + Send + Sync + 'static,
    {
        Self {
            symbol: symbol.into(),
            arity,
            generated: false,
            eval: Arc::new(eval),
        }
    }

    /// Create a terminal (arity 0) whose value depends only on the context.
    pub fn terminal<F>(symbol: impl Into<String>, value: F) -> Self
    where
        C: 'static,
        F: Fn(&C) -> f64 + Send + Sync + 'static,
    {
        Self::new(symbol, 0, move |_, ctx| value(ctx))
    }

    /// Create a generated-constant terminal.
    ///
    /// Each node using this operator draws its literal uniformly from
    /// `[min, max]` the first time it is evaluated and keeps it afterwards.
    #[must_use]
    pub fn constant(min: f64, max: f64) -> Self
    where
        C: 'static,
    {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        Self {
            symbol: String::new(),
            arity: 0,
            generated: true,
            eval: Arc::new(move |node: &NodeView<'_, C>, _: &C| {
                node.constant(|rng| rng.gen_range(lo..=hi))
            }),
        }
    }

    /// Symbol used when rendering the tree. Empty for generated constants.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Number of children a node with this operator owns.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Whether this is a generated-constant terminal.
    #[must_use]
    pub fn is_generated_constant(&self) -> bool {
        self.generated
    }

    /// Whether this operator is a terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.arity == 0
    }

    pub(crate) fn evaluate(&self, node: &NodeView<'_, C>, ctx: &C) -> f64 {
        (self.eval)(node, ctx)
    }
}

impl<C> Clone for Operator<C> {
    fn clone(&self) -> Self {
        Self {
            symbol: self.symbol.clone(),
            arity: self.arity,
            generated: self.generated,
            eval: Arc::clone(&self.eval),
        }
    }
}

impl<C> fmt::Debug for Operator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("symbol", &self.symbol)
            .field("arity", &self.arity)
            .field("generated", &self.generated)
            .finish_non_exhaustive()
    }
}

/// Immutable operator table, sorted and prefix-counted by arity.
pub struct Catalog<C> {
    operators: Vec<Operator<C>>,
    /// `count_up_to[a]` = number of operators with arity <= a.
    count_up_to: Vec<usize>,
    min_non_zero_arity: Option<usize>,
}

impl<C> Catalog<C> {
    /// Build a catalog from an operator table.
    ///
    /// # Errors
    ///
    /// Returns [`GpError::Configuration`] if the table is empty or has no
    /// terminal.
    pub fn new(mut operators: Vec<Operator<C>>) -> GpResult<Self> {
        if operators.is_empty() {
            return Err(GpError::config("operator table is empty"));
        }
        operators.sort_by_key(Operator::arity);

        let max_arity = operators.last().map_or(0, Operator::arity);
        let mut count_up_to = vec![0usize; max_arity + 1];
        for op in &operators {
            count_up_to[op.arity] += 1;
        }
        for a in 1..=max_arity {
            count_up_to[a] += count_up_to[a - 1];
        }

        if count_up_to[0] == 0 {
            return Err(GpError::config("operator table has no terminal (arity 0)"));
        }

        let min_non_zero_arity = operators.iter().map(Operator::arity).find(|&a| a > 0);

        Ok(Self {
            operators,
            count_up_to,
            min_non_zero_arity,
        })
    }

    /// Number of operators, terminals included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    /// Always false: construction rejects empty tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Look up an operator.
    #[must_use]
    pub fn get(&self, id: OpId) -> &Operator<C> {
        &self.operators[id.0]
    }

    /// Iterate over all operators in arity order.
    pub fn iter(&self) -> impl Iterator<Item = (OpId, &Operator<C>)> {
        self.operators.iter().enumerate().map(|(i, op)| (OpId(i), op))
    }

    /// Largest arity in the table.
    #[must_use]
    pub fn max_arity(&self) -> usize {
        self.count_up_to.len() - 1
    }

    /// Smallest non-zero arity, if the table has any non-terminal.
    #[must_use]
    pub fn min_non_zero_arity(&self) -> Option<usize> {
        self.min_non_zero_arity
    }

    /// Number of terminals.
    #[must_use]
    pub fn terminal_count(&self) -> usize {
        self.count_up_to[0]
    }

    /// Whether at least one operator has exactly this arity.
    #[must_use]
    pub fn has_arity(&self, arity: usize) -> bool {
        match arity {
            0 => self.count_up_to[0] > 0,
            a if a < self.count_up_to.len() => self.count_up_to[a] > self.count_up_to[a - 1],
            _ => false,
        }
    }

    /// Draw a uniformly random operator with arity in `[0, max_arity]`, or
    /// `[1, max_arity]` when terminals are banned.
    ///
    /// Returns `None` when no operator falls in the range.
    pub fn sample<R: Rng>(&self, max_arity: usize, ban_terminals: bool, rng: &mut R) -> Option<OpId> {
        let k = max_arity.min(self.max_arity());
        let lo = if ban_terminals { self.count_up_to[0] } else { 0 };
        let hi = self.count_up_to[k];
        (lo < hi).then(|| OpId(rng.gen_range(lo..hi)))
    }

    /// Minimum node counts of complete trees built from the smallest
    /// non-zero arity.
    ///
    /// Entry `d` is the size of such a tree of depth `d + 1`:
    /// `series[0] = 1`, `series[d] = series[d - 1] + m^d`. Values saturate at
    /// `usize::MAX`; without non-terminals every entry past the first is
    /// `usize::MAX`.
    #[must_use]
    pub fn min_arity_series(&self, len: usize) -> Vec<usize> {
        let mut series = Vec::with_capacity(len);
        if len == 0 {
            return series;
        }
        series.push(1usize);
        let mut power = 1usize;
        for d in 1..len {
            let next = match self.min_non_zero_arity {
                Some(m) => {
                    power = power.saturating_mul(m);
                    series[d - 1].saturating_add(power)
                }
                None => usize::MAX,
            };
            series.push(next);
        }
        series
    }
}

impl<C> fmt::Debug for Catalog<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("operators", &self.operators)
            .field("count_up_to", &self.count_up_to)
            .finish()
    }
}
