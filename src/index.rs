//! Per-search tree index
//!
//! A [`TreeIndex`] is built once for each search and dropped with it. It
//! holds the preorder layout of the tree (for O(1) dominance tests and
//! contiguous descendant slices), the leaf span of every node (for the
//! precedence relations) and an inverted label index used to pick
//! top-level candidates before running the VM.

use lasso::Spur;
use rustc_hash::FxHashMap;

use crate::tree::{NodeId, Tree};

#[derive(Debug)]
pub struct TreeIndex<'t> {
    tree: &'t Tree,
    /// Nodes in preorder (roots in id order)
    preorder: Vec<NodeId>,
    /// Preorder position of each node
    position: Vec<usize>,
    /// One past the last preorder position of each node's subtree
    subtree_end: Vec<usize>,
    /// Leaf ordinal of the first and last leaf under each node
    first_leaf: Vec<usize>,
    last_leaf: Vec<usize>,
    /// Nodes whose span starts (ends) at each leaf ordinal, in preorder
    starting_at: Vec<Vec<NodeId>>,
    ending_at: Vec<Vec<NodeId>>,
    by_label: FxHashMap<Spur, Vec<NodeId>>,
}

impl<'t> TreeIndex<'t> {
    /// Build an index from a tree
    pub fn build(tree: &'t Tree) -> Self {
        let n = tree.len();
        let mut preorder = Vec::with_capacity(n);

        let mut stack: Vec<NodeId> = tree
            .nodes
            .iter()
            .filter(|node| node.parent.is_none())
            .map(|node| node.id)
            .rev()
            .collect();
        while let Some(id) = stack.pop() {
            preorder.push(id);
            stack.extend(tree.children(id).iter().rev());
        }

        let mut position = vec![0; n];
        for (pos, &id) in preorder.iter().enumerate() {
            position[id] = pos;
        }

        let leaf_count = preorder.iter().filter(|&&id| tree.is_leaf(id)).count();

        // Spans and subtree ends bottom-up (reverse preorder visits children first)
        let mut subtree_end = vec![0; n];
        let mut first_leaf = vec![0; n];
        let mut last_leaf = vec![0; n];
        let mut leaf_ordinal = leaf_count;
        for &id in preorder.iter().rev() {
            let children = tree.children(id);
            match (children.first(), children.last()) {
                (Some(&first), Some(&last)) => {
                    subtree_end[id] = subtree_end[last];
                    first_leaf[id] = first_leaf[first];
                    last_leaf[id] = last_leaf[last];
                }
                _ => {
                    leaf_ordinal -= 1;
                    subtree_end[id] = position[id] + 1;
                    first_leaf[id] = leaf_ordinal;
                    last_leaf[id] = leaf_ordinal;
                }
            }
        }

        let mut starting_at = vec![Vec::new(); leaf_count];
        let mut ending_at = vec![Vec::new(); leaf_count];
        let mut by_label: FxHashMap<Spur, Vec<NodeId>> = FxHashMap::default();
        for &id in &preorder {
            starting_at[first_leaf[id]].push(id);
            ending_at[last_leaf[id]].push(id);
            by_label.entry(tree.nodes[id].label).or_default().push(id);
        }

        Self {
            tree,
            preorder,
            position,
            subtree_end,
            first_leaf,
            last_leaf,
            starting_at,
            ending_at,
            by_label,
        }
    }

    pub fn tree(&self) -> &'t Tree {
        self.tree
    }

    /// All nodes in preorder
    pub fn preorder(&self) -> &[NodeId] {
        &self.preorder
    }

    pub fn position(&self, id: NodeId) -> usize {
        self.position[id]
    }

    /// True if `b` is a proper descendant of `a`
    #[inline]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        let pos = self.position[b];
        self.position[a] < pos && pos < self.subtree_end[a]
    }

    /// Proper descendants of a node, in preorder
    pub fn descendants(&self, id: NodeId) -> &[NodeId] {
        &self.preorder[self.position[id] + 1..self.subtree_end[id]]
    }

    pub fn first_leaf(&self, id: NodeId) -> usize {
        self.first_leaf[id]
    }

    pub fn last_leaf(&self, id: NodeId) -> usize {
        self.last_leaf[id]
    }

    /// Nodes whose yield starts after leaf ordinal `leaf`, in preorder.
    ///
    /// First leaves never decrease along the preorder, so this is a suffix.
    pub fn starting_after(&self, leaf: usize) -> &[NodeId] {
        let start = self
            .preorder
            .partition_point(|&id| self.first_leaf[id] <= leaf);
        &self.preorder[start..]
    }

    /// Nodes whose yield starts at leaf ordinal `leaf`
    pub fn starting_at(&self, leaf: usize) -> &[NodeId] {
        self.starting_at.get(leaf).map_or(&[], |v| v.as_slice())
    }

    /// Nodes whose yield ends at leaf ordinal `leaf`
    pub fn ending_at(&self, leaf: usize) -> &[NodeId] {
        self.ending_at.get(leaf).map_or(&[], |v| v.as_slice())
    }

    /// Nodes carrying exactly `label`, in preorder
    pub fn nodes_with_label(&self, label: &str) -> &[NodeId] {
        self.tree
            .label_symbol(label)
            .and_then(|sym| self.by_label.get(&sym))
            .map_or(&[], |v| v.as_slice())
    }
}
