//! Constituency tree data structures
//!
//! Trees are arenas: nodes live in a `Vec` and refer to each other by
//! [`NodeId`], which is also a node's identity for the duration of a search.
//! Labels are interned in a per-tree `lasso::Rodeo`.

use lasso::{Rodeo, Spur};
use thiserror::Error;

/// Unique identifier for a node (its index in the arena)
pub type NodeId = usize;

/// Error raised while building a tree by hand
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("Tree error: no node with id {0}")]
    UnknownNode(NodeId),

    #[error("Tree error: node {0} already has a parent")]
    AlreadyAttached(NodeId),

    #[error("Tree error: attaching {child} under {parent} would create a cycle")]
    Cycle { child: NodeId, parent: NodeId },
}

/// A node in a constituency tree
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub label: Spur,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// A constituency tree (one sentence)
#[derive(Debug)]
pub struct Tree {
    pub nodes: Vec<Node>,
    labels: Rodeo,
}

impl Tree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            labels: Rodeo::default(),
        }
    }

    /// Add a detached node and return its id
    pub fn add_node(&mut self, label: &str) -> NodeId {
        let id = self.nodes.len();
        let label = self.labels.get_or_intern(label);
        self.nodes.push(Node {
            id,
            label,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Add a node as the last child of `parent`
    pub fn add_child(&mut self, parent: NodeId, label: &str) -> Result<NodeId, TreeError> {
        if parent >= self.nodes.len() {
            return Err(TreeError::UnknownNode(parent));
        }
        let id = self.add_node(label);
        self.nodes[id].parent = Some(parent);
        self.nodes[parent].children.push(id);
        Ok(id)
    }

    /// Attach a detached node as the last child of `parent`
    pub fn set_parent(&mut self, child_id: NodeId, parent_id: NodeId) -> Result<(), TreeError> {
        let child = self
            .nodes
            .get(child_id)
            .ok_or(TreeError::UnknownNode(child_id))?;
        if child.parent.is_some() {
            return Err(TreeError::AlreadyAttached(child_id));
        }
        if parent_id >= self.nodes.len() {
            return Err(TreeError::UnknownNode(parent_id));
        }

        // Walk up from the new parent; meeting the child means a cycle
        let mut current = Some(parent_id);
        while let Some(id) = current {
            if id == child_id {
                return Err(TreeError::Cycle {
                    child: child_id,
                    parent: parent_id,
                });
            }
            current = self.nodes[id].parent;
        }

        self.nodes[child_id].parent = Some(parent_id);
        self.nodes[parent_id].children.push(child_id);
        Ok(())
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// The first node without a parent
    pub fn root(&self) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.parent.is_none()).map(|n| n.id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Label of a node.
    ///
    /// Panics if `id` is not a node of this tree.
    pub fn label(&self, id: NodeId) -> &str {
        self.labels.resolve(&self.nodes[id].label)
    }

    /// Interned symbol for `label`, if any node carries it
    pub fn label_symbol(&self, label: &str) -> Option<Spur> {
        self.labels.get(label)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Children of a node, left to right
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], |n| n.children.as_slice())
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.children(id).is_empty()
    }

    /// Position of a node among its parent's children
    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Render the subtree rooted at `id` in Penn Treebank bracket notation
    pub fn to_bracketed(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_bracketed(id, &mut out);
        out
    }

    fn write_bracketed(&self, id: NodeId, out: &mut String) {
        // `None` closes the bracket opened by the node below it on the stack
        let mut stack = vec![Some(id)];
        while let Some(item) = stack.pop() {
            let Some(node) = item else {
                out.push(')');
                continue;
            };
            if node != id {
                out.push(' ');
            }
            if self.is_leaf(node) && self.parent(node).is_some() {
                out.push_str(self.label(node));
                continue;
            }
            out.push('(');
            out.push_str(self.label(node));
            stack.push(None);
            stack.extend(self.children(node).iter().rev().map(|&c| Some(c)));
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_creation() {
        let mut tree = Tree::new();
        let s = tree.add_node("S");
        let np = tree.add_child(s, "NP").unwrap();
        let vp = tree.add_child(s, "VP").unwrap();
        let runs = tree.add_child(vp, "runs").unwrap();

        assert_eq!(tree.len(), 4);
        assert_eq!(tree.root(), Some(s));
        assert_eq!(tree.parent(np), Some(s));
        assert_eq!(tree.children(s), &[np, vp]);
        assert_eq!(tree.label(vp), "VP");
        assert!(tree.is_leaf(runs));
        assert_eq!(tree.child_index(vp), Some(1));
        assert_eq!(tree.child_index(s), None);
    }

    #[test]
    fn test_set_parent() {
        let mut tree = Tree::new();
        tree.add_node("S");
        tree.add_node("NP");
        tree.set_parent(1, 0).unwrap();

        assert_eq!(tree.parent(1), Some(0));
        assert_eq!(tree.set_parent(1, 0), Err(TreeError::AlreadyAttached(1)));
        assert_eq!(tree.set_parent(7, 0), Err(TreeError::UnknownNode(7)));
        assert_eq!(tree.set_parent(0, 1), Err(TreeError::Cycle { child: 0, parent: 1 }));
    }

    #[test]
    fn test_labels_are_interned() {
        let mut tree = Tree::new();
        let a = tree.add_node("NP");
        let b = tree.add_child(a, "NP").unwrap();

        assert_eq!(tree.nodes[a].label, tree.nodes[b].label);
        assert!(tree.label_symbol("NP").is_some());
        assert!(tree.label_symbol("VP").is_none());
    }

    #[test]
    fn test_to_bracketed() {
        let mut tree = Tree::new();
        let s = tree.add_node("S");
        let np = tree.add_child(s, "NP").unwrap();
        let nn = tree.add_child(np, "NN").unwrap();
        tree.add_child(nn, "dog").unwrap();
        let vp = tree.add_child(s, "VP").unwrap();
        tree.add_child(vp, "barks").unwrap();

        assert_eq!(tree.to_bracketed(s), "(S (NP (NN dog)) (VP barks))");
        assert_eq!(tree.to_bracketed(nn), "(NN dog)");
    }
}
