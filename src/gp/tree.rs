//! Expression tree genotype.
//!
//! A tree is an arena of nodes addressed by [`NodeId`]. Children are owned
//! by their parent through the `children` list; the `parent` field is a plain
//! index used only for upward traversal. Every node memoizes the size and
//! depth of its subtree, kept current by [`Tree::recalculate_subtree_sizes`].
//!
//! Node ids are stable until the next structural edit. Edits compact the
//! arena so it only ever holds nodes reachable from the root.

use crate::error::{GpError, GpResult};
use crate::gp::catalog::{Catalog, OpId, Operator};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

/// Index of a node inside its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single arena slot.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    op: OpId,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    size: usize,
    depth: usize,
    /// Seed for this node's generated constant.
    seed: u64,
    /// Generated constant, drawn on first evaluation.
    constant: OnceCell<f64>,
}

impl Node {
    fn new(op: OpId, arity: usize, parent: Option<NodeId>, seed: u64) -> Self {
        Self {
            op,
            parent,
            children: Vec::with_capacity(arity),
            size: 1,
            depth: 1,
            seed,
            constant: OnceCell::new(),
        }
    }
}

/// Incremental builder used by the generators.
///
/// Nodes must be added parent-first; the first node added is the root.
pub(crate) struct TreeBuilder<C> {
    catalog: Arc<Catalog<C>>,
    nodes: Vec<Node>,
}

impl<C> TreeBuilder<C> {
    pub(crate) fn new(catalog: Arc<Catalog<C>>, capacity: usize) -> Self {
        Self {
            catalog,
            nodes: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn catalog(&self) -> &Catalog<C> {
        &self.catalog
    }

    /// Add a node under `parent` (appended to its child list).
    pub(crate) fn add<R: Rng>(&mut self, op: OpId, parent: Option<NodeId>, rng: &mut R) -> NodeId {
        let arity = self.catalog.get(op).arity();
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(op, arity, parent, rng.r#gen()));
        if let Some(p) = parent {
            self.nodes[p.0].children.push(id);
        }
        id
    }

    pub(crate) fn finish(self) -> Tree<C> {
        let mut tree = Tree {
            catalog: self.catalog,
            nodes: self.nodes,
            root: NodeId(0),
            penalty: None,
        };
        tree.recalculate_subtree_sizes(tree.root);
        tree
    }
}

/// An expression tree owning all of its nodes.
pub struct Tree<C> {
    catalog: Arc<Catalog<C>>,
    nodes: Vec<Node>,
    root: NodeId,
    penalty: Option<f64>,
}

impl<C> Tree<C> {
    /// Build a tree from operator symbols in prefix order.
    ///
    /// A token matches the first operator with that symbol. `C` stands for an
    /// undrawn generated constant and a numeric token for a generated
    /// constant with that value. Each node's constant seed is drawn from
    /// `rng`.
    ///
    /// # Errors
    ///
    /// Returns [`GpError::InvalidExpression`] for unknown symbols, missing
    /// operands or trailing tokens.
    pub fn from_prefix<R: Rng>(catalog: Arc<Catalog<C>>, tokens: &[&str], rng: &mut R) -> GpResult<Self> {
        if tokens.is_empty() {
            return Err(GpError::InvalidExpression("empty expression".to_string()));
        }
        let constant_op = catalog
            .iter()
            .find(|(_, op)| op.is_generated_constant())
            .map(|(id, _)| id);

        let mut nodes: Vec<Node> = Vec::with_capacity(tokens.len());
        // Nodes still waiting for children, with the number of missing slots.
        let mut open: Vec<(NodeId, usize)> = Vec::new();

        for (pos, token) in tokens.iter().enumerate() {
            let parent = match open.last_mut() {
                Some((id, missing)) => {
                    *missing -= 1;
                    Some(*id)
                }
                None if pos == 0 => None,
                None => {
                    return Err(GpError::InvalidExpression(format!(
                        "unexpected token '{token}' after complete expression"
                    )));
                }
            };
            if open.last().is_some_and(|&(_, missing)| missing == 0) {
                open.pop();
            }

            let named = catalog
                .iter()
                .find(|(_, op)| !op.is_generated_constant() && op.symbol() == *token)
                .map(|(id, _)| id);
            let (op, value) = match (named, constant_op, token.parse::<f64>()) {
                (Some(id), _, _) => (id, None),
                (None, Some(id), _) if *token == "C" => (id, None),
                (None, Some(id), Ok(v)) => (id, Some(v)),
                _ => {
                    return Err(GpError::InvalidExpression(format!("unknown symbol '{token}'")));
                }
            };

            let arity = catalog.get(op).arity();
            let id = NodeId(nodes.len());
            let node = Node::new(op, arity, parent, rng.r#gen());
            if let Some(v) = value {
                let _ = node.constant.set(v);
            }
            nodes.push(node);
            if let Some(p) = parent {
                nodes[p.0].children.push(id);
            }
            if arity > 0 {
                open.push((id, arity));
            }
        }

        if let Some(&(id, missing)) = open.last() {
            let symbol = catalog.get(nodes[id.0].op).symbol().to_string();
            return Err(GpError::InvalidExpression(format!(
                "operator '{symbol}' is missing {missing} operand(s)"
            )));
        }

        let mut tree = Self {
            catalog,
            nodes,
            root: NodeId(0),
            penalty: None,
        };
        tree.recalculate_subtree_sizes(tree.root);
        Ok(tree)
    }

    /// The catalog this tree's operators come from.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog<C>> {
        &self.catalog
    }

    /// Root node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the whole tree.
    #[must_use]
    pub fn size(&self) -> usize {
        self.nodes[self.root.0].size
    }

    /// Depth of the whole tree (a single leaf has depth 1).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.nodes[self.root.0].depth
    }

    /// Penalty of this tree, if it has been evaluated.
    #[must_use]
    pub fn penalty(&self) -> Option<f64> {
        self.penalty
    }

    /// Record the penalty of this tree.
    pub fn set_penalty(&mut self, penalty: f64) {
        self.penalty = Some(penalty);
    }

    /// Penalty used for ordering; unevaluated trees sort last.
    #[must_use]
    pub fn penalty_or_max(&self) -> f64 {
        self.penalty.unwrap_or(f64::INFINITY)
    }

    /// View of a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> NodeView<'_, C> {
        NodeView { tree: self, id }
    }

    /// Ids of all nodes in the arena.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + use<C> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Operator of a node.
    #[must_use]
    pub fn operator(&self, id: NodeId) -> &Operator<C> {
        self.catalog.get(self.nodes[id.0].op)
    }

    /// Operator id of a node.
    #[must_use]
    pub fn op_id(&self, id: NodeId) -> OpId {
        self.nodes[id.0].op
    }

    /// Parent of a node; `None` for the root.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Children of a node, in slot order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Memoized size of the subtree rooted at `id`.
    #[must_use]
    pub fn subtree_size(&self, id: NodeId) -> usize {
        self.nodes[id.0].size
    }

    /// Memoized depth of the subtree rooted at `id`.
    #[must_use]
    pub fn subtree_depth(&self, id: NodeId) -> usize {
        self.nodes[id.0].depth
    }

    /// Drawn value of a generated-constant node, if any.
    #[must_use]
    pub fn constant_value(&self, id: NodeId) -> Option<f64> {
        self.nodes[id.0].constant.get().copied()
    }

    /// Evaluate the whole tree against a context.
    pub fn evaluate(&self, ctx: &C) -> f64 {
        self.node(self.root).evaluate(ctx)
    }

    /// Recompute size and depth of the subtree at `id`, then of every
    /// ancestor up to the root.
    ///
    /// Must follow any structural edit.
    pub fn recalculate_subtree_sizes(&mut self, id: NodeId) {
        self.recalculate_down(id);

        let mut current = self.nodes[id.0].parent;
        while let Some(node) = current {
            self.refresh_from_children(node);
            current = self.nodes[node.0].parent;
        }
    }

    fn recalculate_down(&mut self, id: NodeId) {
        for k in 0..self.nodes[id.0].children.len() {
            let child = self.nodes[id.0].children[k];
            self.recalculate_down(child);
        }
        self.refresh_from_children(id);
    }

    fn refresh_from_children(&mut self, id: NodeId) {
        let (size, depth) = self.nodes[id.0]
            .children
            .iter()
            .fold((1, 0), |(size, depth), &c| {
                let child = &self.nodes[c.0];
                (size + child.size, depth.max(child.depth))
            });
        let node = &mut self.nodes[id.0];
        node.size = size;
        node.depth = depth + 1;
    }

    /// Pick a uniformly random non-root node.
    ///
    /// Returns the node and its slot in its parent's child list, or `None`
    /// when the tree is a single node.
    pub fn random_node<R: Rng>(&self, rng: &mut R) -> Option<(NodeId, usize)> {
        let size = self.size();
        if size < 2 {
            return None;
        }

        let mut budget = rng.gen_range(1..size);
        let mut node = self.root;
        let mut slot = 0;
        // Each child covers a contiguous rank range as wide as its subtree.
        while budget != 0 {
            for (i, &child) in self.nodes[node.0].children.iter().enumerate() {
                let child_size = self.nodes[child.0].size;
                if budget > child_size {
                    budget -= child_size;
                } else {
                    budget -= 1;
                    node = child;
                    slot = i;
                    break;
                }
            }
        }

        Some((node, slot))
    }

    /// Deep copy of the subtree rooted at `id` as an independent tree.
    ///
    /// The copy is unevaluated.
    #[must_use]
    pub fn subtree(&self, id: NodeId) -> Self {
        let mut nodes = Vec::with_capacity(self.nodes[id.0].size);
        self.copy_preorder(id, None, &mut nodes);
        Self {
            catalog: Arc::clone(&self.catalog),
            nodes,
            root: NodeId(0),
            penalty: None,
        }
    }

    /// Replace the child in `slot` of `parent` with a copy of `donor`.
    ///
    /// The replaced subtree is dropped, sizes are recomputed up to the root
    /// and the penalty is cleared. Node ids are renumbered; the id of the
    /// installed subtree root is returned.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not a valid child slot of `parent`.
    pub fn replace_child(&mut self, parent: NodeId, slot: usize, donor: &Self) -> NodeId {
        assert!(
            slot < self.nodes[parent.0].children.len(),
            "slot {slot} out of range for node with {} children",
            self.nodes[parent.0].children.len()
        );

        let base = self.nodes.len();
        donor.copy_preorder(donor.root, Some(parent), &mut self.nodes);
        let grafted = NodeId(base);
        self.nodes[parent.0].children[slot] = grafted;
        self.penalty = None;

        let remap = self.compact();
        let grafted = remap[grafted.0].unwrap_or(grafted);
        let parent = remap[parent.0].unwrap_or(parent);
        self.recalculate_subtree_sizes(parent);
        grafted
    }

    /// Exchange the subtree at `a` in `left` with the subtree at `b` in
    /// `right`.
    ///
    /// Both nodes must be non-root. Returns the new ids of the swapped-in
    /// subtrees (`(in left, in right)`).
    ///
    /// # Panics
    ///
    /// Panics if either node is a root.
    pub fn swap_subtrees(left: &mut Self, a: NodeId, right: &mut Self, b: NodeId) -> (NodeId, NodeId) {
        let (Some(parent_a), Some(parent_b)) = (left.parent(a), right.parent(b)) else {
            panic!("cannot swap a root subtree");
        };
        let slot_a = left.slot_of(a);
        let slot_b = right.slot_of(b);

        let from_left = left.subtree(a);
        let from_right = right.subtree(b);

        let in_left = left.replace_child(parent_a, slot_a, &from_right);
        let in_right = right.replace_child(parent_b, slot_b, &from_left);
        (in_left, in_right)
    }

    /// Whether two trees have the same operators, shape and drawn constants.
    #[must_use]
    pub fn same_structure(&self, other: &Self) -> bool {
        self.same_subtree(self.root, other, other.root)
    }

    fn same_subtree(&self, a: NodeId, other: &Self, b: NodeId) -> bool {
        let (na, nb) = (&self.nodes[a.0], &other.nodes[b.0]);
        na.op == nb.op
            && na.children.len() == nb.children.len()
            && na.constant.get().copied().map(f64::to_bits) == nb.constant.get().copied().map(f64::to_bits)
            && na
                .children
                .iter()
                .zip(&nb.children)
                .all(|(&ca, &cb)| self.same_subtree(ca, other, cb))
    }

    /// Render in prefix order, one token per node.
    #[must_use]
    pub fn to_prefix(&self) -> String {
        let mut tokens = Vec::with_capacity(self.size());
        self.prefix_tokens(self.root, &mut tokens);
        tokens.join(" ")
    }

    fn prefix_tokens(&self, id: NodeId, tokens: &mut Vec<String>) {
        tokens.push(self.node_label(id));
        for &child in &self.nodes[id.0].children {
            self.prefix_tokens(child, tokens);
        }
    }

    fn node_label(&self, id: NodeId) -> String {
        let op = self.operator(id);
        if op.is_generated_constant() {
            self.constant_value(id)
                .map_or_else(|| "C".to_string(), |v| v.to_string())
        } else {
            op.symbol().to_string()
        }
    }

    fn write_infix(&self, id: NodeId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let children = &self.nodes[id.0].children;
        let symbol = self.node_label(id);
        match children.as_slice() {
            [] => write!(f, "{symbol}"),
            [only] => {
                write!(f, "{symbol}(")?;
                self.write_infix(*only, f)?;
                write!(f, ")")
            }
            [lhs, rhs] => {
                write!(f, "(")?;
                self.write_infix(*lhs, f)?;
                write!(f, "{symbol}")?;
                self.write_infix(*rhs, f)?;
                write!(f, ")")
            }
            many => {
                write!(f, "{symbol}(")?;
                for (i, &child) in many.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    self.write_infix(child, f)?;
                }
                write!(f, ")")
            }
        }
    }

    fn slot_of(&self, id: NodeId) -> usize {
        self.nodes[id.0]
            .parent
            .and_then(|p| self.nodes[p.0].children.iter().position(|&c| c == id))
            .unwrap_or(0)
    }

    /// Append a preorder copy of the subtree at `id` to `out`, attached to
    /// `parent` (an index into `out`).
    fn copy_preorder(&self, id: NodeId, parent: Option<NodeId>, out: &mut Vec<Node>) {
        let source = &self.nodes[id.0];
        let new_id = NodeId(out.len());
        out.push(Node {
            op: source.op,
            parent,
            children: Vec::with_capacity(source.children.len()),
            size: source.size,
            depth: source.depth,
            seed: source.seed,
            constant: source.constant.clone(),
        });
        for &child in &source.children {
            let child_id = NodeId(out.len());
            out[new_id.0].children.push(child_id);
            self.copy_preorder(child, Some(new_id), out);
        }
    }

    /// Drop unreachable nodes and renumber the rest in preorder.
    ///
    /// Returns the old-to-new id mapping.
    fn compact(&mut self) -> Vec<Option<NodeId>> {
        let mut remap = vec![None; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            remap[id.0] = Some(NodeId(order.len()));
            order.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev());
        }

        let mut old: Vec<Option<Node>> = std::mem::take(&mut self.nodes).into_iter().map(Some).collect();
        let mut nodes = Vec::with_capacity(order.len());
        for id in order {
            let Some(mut node) = old[id.0].take() else {
                continue;
            };
            node.parent = node.parent.and_then(|p| remap[p.0]);
            for child in &mut node.children {
                if let Some(new) = remap[child.0] {
                    *child = new;
                }
            }
            nodes.push(node);
        }
        self.nodes = nodes;
        self.root = NodeId(0);
        remap
    }
}

impl<C> Clone for Tree<C> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            nodes: self.nodes.clone(),
            root: self.root,
            penalty: self.penalty,
        }
    }
}

impl<C> fmt::Display for Tree<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_infix(self.root, f)
    }
}

impl<C> fmt::Debug for Tree<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("expr", &self.to_prefix())
            .field("size", &self.size())
            .field("depth", &self.depth())
            .field("penalty", &self.penalty)
            .finish()
    }
}

/// Depth and node-count bounds every population member must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeLimits {
    /// Maximum depth (a single leaf has depth 1).
    pub max_depth: usize,
    /// Maximum number of nodes.
    pub max_nodes: usize,
}

impl TreeLimits {
    /// Whether `tree` fits within these bounds.
    #[must_use]
    pub fn admits<C>(&self, tree: &Tree<C>) -> bool {
        tree.depth() <= self.max_depth && tree.size() <= self.max_nodes
    }
}

/// Borrowed view of one node, handed to operator evaluation functions.
pub struct NodeView<'a, C> {
    tree: &'a Tree<C>,
    id: NodeId,
}

impl<'a, C> NodeView<'a, C> {
    /// Id of the viewed node.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Operator of the viewed node.
    #[must_use]
    pub fn operator(&self) -> &'a Operator<C> {
        self.tree.operator(self.id)
    }

    /// Number of children.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.tree.nodes[self.id.0].children.len()
    }

    /// View of the child in `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= self.arity()`.
    #[must_use]
    pub fn child(&self, slot: usize) -> NodeView<'a, C> {
        NodeView {
            tree: self.tree,
            id: self.tree.nodes[self.id.0].children[slot],
        }
    }

    /// Evaluate the subtree rooted at this node.
    pub fn evaluate(&self, ctx: &C) -> f64 {
        self.operator().evaluate(self, ctx)
    }

    /// Value of this node's generated constant.
    ///
    /// The first call draws it with `init` from a generator seeded by the
    /// node; later calls (and clones of the node) return the same value.
    pub fn constant<F>(&self, init: F) -> f64
    where
        F: FnOnce(&mut SmallRng) -> f64,
    {
        let node = &self.tree.nodes[self.id.0];
        *node.constant.get_or_init(|| {
            let mut rng = SmallRng::seed_from_u64(node.seed);
            init(&mut rng)
        })
    }
}

impl<C> Clone for NodeView<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for NodeView<'_, C> {}

impl<C> fmt::Debug for NodeView<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeView")
            .field("id", &self.id)
            .field("symbol", &self.operator().symbol())
            .finish()
    }
}
