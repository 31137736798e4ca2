//! Structural relations between tree nodes
//!
//! Every relation answers two questions about a pair of nodes `A op B`:
//! [`Relation::holds`] tests a given pair, and [`Relation::candidates`]
//! lists every `B` for a given `A`, in the order the matcher should try
//! them. The two always agree: `b` is a candidate of `a` exactly when the
//! relation holds.
//!
//! Candidate order:
//! - downward and precedence relations: preorder
//! - upward relations: nearest ancestor first
//! - sister relations: nearest sister first (left to right for `$`)

use crate::config::Config;
use crate::index::TreeIndex;
use crate::pattern::NodeTest;
use crate::tree::NodeId;

/// Relations that take a node description argument (`<+(VP)`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    Dominates,
    DominatedBy,
    Precedes,
    Follows,
}

/// Which end of a parent/child pair the left operand is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildSide {
    Parent,
    Child,
}

/// What an operator lexeme resolves to in the relation table
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    /// A fixed relation
    Simple(Relation),
    /// A relation that takes an optional child number (`<`, `<2`, `<-1`)
    Indexable {
        /// Relation when no number follows
        plain: Relation,
        side: ChildSide,
        /// Count children from the right (`<-2`)
        from_end: bool,
    },
    /// A relation that takes a parenthesized node description
    Chained(Chain),
}

impl Operator {
    /// Relation for an indexable operator followed by child number `n`.
    ///
    /// Returns `None` for `n == 0` and for operators without an index.
    pub fn with_index(&self, n: u32) -> Option<Relation> {
        let Operator::Indexable { side, from_end, .. } = self else {
            return None;
        };
        let n = i32::try_from(n).ok().filter(|&n| n > 0)?;
        let i = if *from_end { -n } else { n };
        Some(match side {
            ChildSide::Parent => Relation::HasIthChild(i),
            ChildSide::Child => Relation::IthChildOf(i),
        })
    }
}

/// A structural relation between a left node `A` and a right node `B`
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    /// `<`: B is a child of A
    ParentOf,
    /// `>`: A is a child of B
    ChildOf,
    /// `<<`
    Dominates,
    /// `>>`
    DominatedBy,
    /// `<:`
    HasOnlyChild,
    /// `>:`
    OnlyChildOf,
    /// `<,`
    HasFirstChild,
    /// `>,`
    FirstChildOf,
    /// `<-`, `` <` ``
    HasLastChild,
    /// `>-`, `` >` ``
    LastChildOf,
    /// `<i`: B is the i-th child of A, negative `i` counts from the right
    HasIthChild(i32),
    /// `>i`: A is the i-th child of B
    IthChildOf(i32),
    /// `<<,`: B is on A's leftmost path
    HasLeftmostDescendant,
    /// `>>,`
    LeftmostDescendantOf,
    /// `<<-`: B is on A's rightmost path
    HasRightmostDescendant,
    /// `>>-`
    RightmostDescendantOf,
    /// `<<<`: B is a leaf dominated by A
    AncestorOfLeaf,
    /// `<<:`: A dominates B through a chain of single-child nodes
    UnaryPathAncestorOf,
    /// `>>:`
    UnaryPathDescendantOf,
    /// `$`
    SisterOf,
    /// `$++`: A is a sister to the left of B
    LeftSisterOf,
    /// `$--`: A is a sister to the right of B
    RightSisterOf,
    /// `$+`: B is A's next sister
    ImmediateLeftSisterOf,
    /// `$-`: B is A's previous sister
    ImmediateRightSisterOf,
    /// `..`: A's yield ends before B's begins
    Precedes,
    /// `,,`
    Follows,
    /// `.`: B's yield starts right after A's
    ImmediatelyPrecedes,
    /// `,`
    ImmediatelyFollows,
    /// `==`
    Equals,
    /// `<=`: A is B or B is a child of A
    ParentEquals,
    /// `<+(C)`, `>+(C)`, `.+(C)`, `,+(C)`: every intermediate node matches C
    Unbroken(Chain, NodeTest),
    /// `:`: B is any node of the tree
    AnyNode,
}

impl Relation {
    /// Canonical operator spelling
    pub fn symbol(&self) -> String {
        use Relation::*;

        let s = match self {
            ParentOf => "<",
            ChildOf => ">",
            Dominates => "<<",
            DominatedBy => ">>",
            HasOnlyChild => "<:",
            OnlyChildOf => ">:",
            HasFirstChild => "<,",
            FirstChildOf => ">,",
            HasLastChild => "<-",
            LastChildOf => ">-",
            HasIthChild(i) => return format!("<{i}"),
            IthChildOf(i) => return format!(">{i}"),
            HasLeftmostDescendant => "<<,",
            LeftmostDescendantOf => ">>,",
            HasRightmostDescendant => "<<-",
            RightmostDescendantOf => ">>-",
            AncestorOfLeaf => "<<<",
            UnaryPathAncestorOf => "<<:",
            UnaryPathDescendantOf => ">>:",
            SisterOf => "$",
            LeftSisterOf => "$++",
            RightSisterOf => "$--",
            ImmediateLeftSisterOf => "$+",
            ImmediateRightSisterOf => "$-",
            Precedes => "..",
            Follows => ",,",
            ImmediatelyPrecedes => ".",
            ImmediatelyFollows => ",",
            Equals => "==",
            ParentEquals => "<=",
            Unbroken(chain, test) => {
                let op = match chain {
                    Chain::Dominates => "<+",
                    Chain::DominatedBy => ">+",
                    Chain::Precedes => ".+",
                    Chain::Follows => ",+",
                };
                return format!("{op}({test})");
            }
            AnyNode => ":",
        };
        s.to_string()
    }

    /// Does `a op b` hold?
    pub fn holds(&self, index: &TreeIndex, config: &Config, a: NodeId, b: NodeId) -> bool {
        use Relation::*;

        let tree = index.tree();
        match self {
            ParentOf => tree.parent(b) == Some(a),
            ChildOf => tree.parent(a) == Some(b),
            Dominates => index.dominates(a, b),
            DominatedBy => index.dominates(b, a),
            HasOnlyChild => tree.children(a) == [b],
            OnlyChildOf => tree.children(b) == [a],
            HasFirstChild => tree.children(a).first() == Some(&b),
            FirstChildOf => tree.children(b).first() == Some(&a),
            HasLastChild => tree.children(a).last() == Some(&b),
            LastChildOf => tree.children(b).last() == Some(&a),
            HasIthChild(i) => ith_child(index, a, *i) == Some(b),
            IthChildOf(i) => ith_child(index, b, *i) == Some(a),
            HasLeftmostDescendant => leftmost_path(index, a).any(|n| n == b),
            LeftmostDescendantOf => leftmost_path(index, b).any(|n| n == a),
            HasRightmostDescendant => rightmost_path(index, a).any(|n| n == b),
            RightmostDescendantOf => rightmost_path(index, b).any(|n| n == a),
            AncestorOfLeaf => index.dominates(a, b) && tree.is_leaf(b),
            UnaryPathAncestorOf => unary_path(index, a).any(|n| n == b),
            UnaryPathDescendantOf => unary_path(index, b).any(|n| n == a),
            SisterOf => a != b && tree.parent(a).is_some() && tree.parent(a) == tree.parent(b),
            LeftSisterOf => sister_offset(index, a, b).is_some_and(|d| d > 0),
            RightSisterOf => sister_offset(index, a, b).is_some_and(|d| d < 0),
            ImmediateLeftSisterOf => sister_offset(index, a, b) == Some(1),
            ImmediateRightSisterOf => sister_offset(index, a, b) == Some(-1),
            Precedes => index.last_leaf(a) < index.first_leaf(b),
            Follows => index.last_leaf(b) < index.first_leaf(a),
            ImmediatelyPrecedes => index.first_leaf(b) == index.last_leaf(a) + 1,
            ImmediatelyFollows => index.first_leaf(a) == index.last_leaf(b) + 1,
            Equals => a == b,
            ParentEquals => a == b || tree.parent(b) == Some(a),
            Unbroken(Chain::Dominates, test) => unbroken_up(index, config, b, a, test),
            Unbroken(Chain::DominatedBy, test) => unbroken_up(index, config, a, b, test),
            Unbroken(Chain::Precedes | Chain::Follows, _) => {
                self.candidates(index, config, a).contains(&b)
            }
            AnyNode => true,
        }
    }

    /// Every `b` with `a op b`, in matching order
    pub fn candidates(&self, index: &TreeIndex, config: &Config, a: NodeId) -> Vec<NodeId> {
        use Relation::*;

        let tree = index.tree();
        match self {
            ParentOf => tree.children(a).to_vec(),
            ChildOf => tree.parent(a).into_iter().collect(),
            Dominates => index.descendants(a).to_vec(),
            DominatedBy => ancestors(index, a).collect(),
            HasOnlyChild => match tree.children(a) {
                &[only] => vec![only],
                _ => Vec::new(),
            },
            OnlyChildOf => tree
                .parent(a)
                .filter(|&p| tree.children(p).len() == 1)
                .into_iter()
                .collect(),
            HasFirstChild => tree.children(a).first().copied().into_iter().collect(),
            FirstChildOf => tree
                .parent(a)
                .filter(|&p| tree.children(p).first() == Some(&a))
                .into_iter()
                .collect(),
            HasLastChild => tree.children(a).last().copied().into_iter().collect(),
            LastChildOf => tree
                .parent(a)
                .filter(|&p| tree.children(p).last() == Some(&a))
                .into_iter()
                .collect(),
            HasIthChild(i) => ith_child(index, a, *i).into_iter().collect(),
            IthChildOf(i) => tree
                .parent(a)
                .filter(|&p| ith_child(index, p, *i) == Some(a))
                .into_iter()
                .collect(),
            HasLeftmostDescendant => leftmost_path(index, a).collect(),
            LeftmostDescendantOf => climb(index, a, |p, child| {
                tree.children(p).first() == Some(&child)
            }),
            HasRightmostDescendant => rightmost_path(index, a).collect(),
            RightmostDescendantOf => climb(index, a, |p, child| {
                tree.children(p).last() == Some(&child)
            }),
            AncestorOfLeaf => index
                .descendants(a)
                .iter()
                .copied()
                .filter(|&d| tree.is_leaf(d))
                .collect(),
            UnaryPathAncestorOf => unary_path(index, a).collect(),
            UnaryPathDescendantOf => climb(index, a, |p, _| tree.children(p).len() == 1),
            SisterOf => sisters(index, a)
                .map(|(sisters, _)| sisters.iter().copied().filter(|&s| s != a).collect())
                .unwrap_or_default(),
            LeftSisterOf => sisters(index, a)
                .map(|(sisters, i)| sisters[i + 1..].to_vec())
                .unwrap_or_default(),
            RightSisterOf => sisters(index, a)
                .map(|(sisters, i)| sisters[..i].iter().rev().copied().collect())
                .unwrap_or_default(),
            ImmediateLeftSisterOf => sisters(index, a)
                .and_then(|(sisters, i)| sisters.get(i + 1).copied())
                .into_iter()
                .collect(),
            ImmediateRightSisterOf => sisters(index, a)
                .and_then(|(sisters, i)| i.checked_sub(1).map(|j| sisters[j]))
                .into_iter()
                .collect(),
            Precedes => index.starting_after(index.last_leaf(a)).to_vec(),
            Follows => {
                let first = index.first_leaf(a);
                index
                    .preorder()
                    .iter()
                    .copied()
                    .filter(|&b| index.last_leaf(b) < first)
                    .collect()
            }
            ImmediatelyPrecedes => adjacent(index, a, true).to_vec(),
            ImmediatelyFollows => adjacent(index, a, false).to_vec(),
            Equals => vec![a],
            ParentEquals => std::iter::once(a)
                .chain(tree.children(a).iter().copied())
                .collect(),
            Unbroken(Chain::Dominates, test) => unbroken_down(index, config, a, test),
            Unbroken(Chain::DominatedBy, test) => {
                let mut out = Vec::new();
                for p in ancestors(index, a) {
                    out.push(p);
                    if !test.matches_node(tree, p, config) {
                        break;
                    }
                }
                out
            }
            Unbroken(Chain::Precedes, test) => unbroken_linear(index, config, a, test, true),
            Unbroken(Chain::Follows, test) => unbroken_linear(index, config, a, test, false),
            AnyNode => index.preorder().to_vec(),
        }
    }
}

/// Proper ancestors, nearest first
fn ancestors<'a>(index: &'a TreeIndex, a: NodeId) -> impl Iterator<Item = NodeId> + 'a {
    let tree = index.tree();
    std::iter::successors(tree.parent(a), move |&p| tree.parent(p))
}

/// Ancestors reached while `step(parent, child)` holds, nearest first
fn climb(index: &TreeIndex, a: NodeId, step: impl Fn(NodeId, NodeId) -> bool) -> Vec<NodeId> {
    let tree = index.tree();
    let mut out = Vec::new();
    let mut child = a;
    while let Some(p) = tree.parent(child) {
        if !step(p, child) {
            break;
        }
        out.push(p);
        child = p;
    }
    out
}

fn leftmost_path<'a>(index: &'a TreeIndex, a: NodeId) -> impl Iterator<Item = NodeId> + 'a {
    let tree = index.tree();
    std::iter::successors(tree.children(a).first().copied(), move |&n| {
        tree.children(n).first().copied()
    })
}

fn rightmost_path<'a>(index: &'a TreeIndex, a: NodeId) -> impl Iterator<Item = NodeId> + 'a {
    let tree = index.tree();
    std::iter::successors(tree.children(a).last().copied(), move |&n| {
        tree.children(n).last().copied()
    })
}

/// Descendants reached through single-child nodes only
fn unary_path<'a>(index: &'a TreeIndex, a: NodeId) -> impl Iterator<Item = NodeId> + 'a {
    let tree = index.tree();
    let only = move |n: &NodeId| match tree.children(*n) {
        &[only] => Some(only),
        _ => None,
    };
    std::iter::successors(only(&a), only)
}

fn ith_child(index: &TreeIndex, a: NodeId, i: i32) -> Option<NodeId> {
    let children = index.tree().children(a);
    let idx = if i > 0 {
        usize::try_from(i - 1).ok()?
    } else {
        children.len().checked_sub(usize::try_from(i.unsigned_abs()).ok()?)?
    };
    children.get(idx).copied()
}

/// All children of `a`'s parent and `a`'s position among them
fn sisters<'a>(index: &'a TreeIndex, a: NodeId) -> Option<(&'a [NodeId], usize)> {
    let tree = index.tree();
    let parent = tree.parent(a)?;
    let sisters = tree.children(parent);
    let i = sisters.iter().position(|&s| s == a)?;
    Some((sisters, i))
}

/// Distance from `a` to sister `b` (positive when `b` is to the right)
fn sister_offset(index: &TreeIndex, a: NodeId, b: NodeId) -> Option<isize> {
    let tree = index.tree();
    if a == b || tree.parent(a).is_none() || tree.parent(a) != tree.parent(b) {
        return None;
    }
    let i = tree.child_index(a)? as isize;
    let j = tree.child_index(b)? as isize;
    Some(j - i)
}

/// `top` properly dominates `bottom` and every node strictly between matches `test`
fn unbroken_up(
    index: &TreeIndex,
    config: &Config,
    bottom: NodeId,
    top: NodeId,
    test: &NodeTest,
) -> bool {
    let tree = index.tree();
    for p in ancestors(index, bottom) {
        if p == top {
            return true;
        }
        if !test.matches_node(tree, p, config) {
            return false;
        }
    }
    false
}

/// Preorder walk below `a` that only descends through nodes matching `test`
fn unbroken_down(index: &TreeIndex, config: &Config, a: NodeId, test: &NodeTest) -> Vec<NodeId> {
    let tree = index.tree();
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = tree.children(a).iter().rev().copied().collect();
    while let Some(n) = stack.pop() {
        out.push(n);
        if test.matches_node(tree, n, config) {
            stack.extend(tree.children(n).iter().rev());
        }
    }
    out
}

/// Nodes reachable from `a` by a chain of immediate precedence (or
/// following) steps whose intermediate nodes all match `test`, in preorder
fn unbroken_linear(
    index: &TreeIndex,
    config: &Config,
    a: NodeId,
    test: &NodeTest,
    forward: bool,
) -> Vec<NodeId> {
    let tree = index.tree();
    let mut seen = vec![false; tree.len()];
    let mut stack = vec![a];
    while let Some(n) = stack.pop() {
        for &b in adjacent(index, n, forward) {
            if !seen[b] {
                seen[b] = true;
                if test.matches_node(tree, b, config) {
                    stack.push(b);
                }
            }
        }
    }

    index
        .preorder()
        .iter()
        .copied()
        .filter(|&b| seen[b])
        .collect()
}

/// Nodes immediately after (or before) `n` in the yield
fn adjacent<'a>(index: &'a TreeIndex, n: NodeId, forward: bool) -> &'a [NodeId] {
    if forward {
        index.starting_at(index.last_leaf(n) + 1)
    } else {
        index
            .first_leaf(n)
            .checked_sub(1)
            .map_or(&[], |leaf| index.ending_at(leaf))
    }
}
