//! End-to-end tree search combining index lookup + VM execution
//!
//! The search pipeline:
//! 1. Tokenize and parse the pattern string
//! 2. Compile the AST into a VM program
//! 3. Build a [`TreeIndex`] for the tree being searched
//! 4. Use the labels the pattern's root node must carry to pick candidates
//! 5. Run the VM from each candidate, in preorder
//! 6. Yield matches lazily

use log::debug;
use std::borrow::Cow;
use std::sync::Arc;
use thiserror::Error;

use crate::compiler::compile_program;
use crate::config::{Config, MatchMode};
use crate::index::TreeIndex;
use crate::lexer::{LexError, tokenize};
use crate::parser::{ParseError, Parser};
use crate::pattern::{Expr, Pattern};
use crate::tree::{NodeId, Tree};
use crate::vm::{Bindings, Execution};

/// Error while compiling a pattern string
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Compile a pattern with the default configuration
pub fn compile(pattern: &str) -> Result<Pattern, CompileError> {
    compile_with(pattern, Config::shared())
}

/// Compile a pattern, resolving operators through `config`'s relation table
pub fn compile_with(pattern: &str, config: &Config) -> Result<Pattern, CompileError> {
    let result = tokenize(pattern)
        .map_err(CompileError::from)
        .and_then(|tokens| {
            Parser::new(tokens, config)
                .parse()
                .map_err(CompileError::from)
        });
    let parsed = match result {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("failed to compile {pattern:?}: {e}");
            return Err(e);
        }
    };

    let program = compile_program(&parsed.expr);
    debug!("compiled {pattern:?}\n{program}");
    Ok(Pattern::new(
        pattern,
        parsed.expr,
        parsed.var_names,
        program,
    ))
}

/// Result of pattern matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    node: NodeId,
    bindings: Bindings,
    var_names: Arc<[String]>,
}

impl Match {
    /// The node the whole pattern matched at
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Get the node bound to a capture name
    ///
    /// Returns None if the name is not in the pattern or was not bound
    pub fn binding(&self, name: &str) -> Option<NodeId> {
        let var = self.var_names.iter().position(|n| n == name)?;
        self.bindings.get(var).copied().flatten()
    }

    /// Bound captures as (name, node) pairs, in declaration order
    pub fn iter_named(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.var_names
            .iter()
            .zip(&self.bindings)
            .filter_map(|(name, node)| node.map(|node| (name.as_str(), node)))
    }
}

/// Lazy iterator over the matches of a pattern in one tree
pub struct Matches<'p, 't> {
    pattern: Cow<'p, Pattern>,
    config: &'p Config,
    index: TreeIndex<'t>,
    candidates: std::vec::IntoIter<NodeId>,
    current: Option<(NodeId, Execution)>,
}

impl<'p, 't> Matches<'p, 't> {
    fn new(pattern: Cow<'p, Pattern>, tree: &'t Tree, config: &'p Config) -> Self {
        let index = TreeIndex::build(tree);
        let candidates = root_candidates(pattern.expr(), &index);
        debug!(
            "searching {:?}: {} of {} nodes are candidates",
            pattern.source(),
            candidates.len(),
            tree.len()
        );
        Self {
            pattern,
            config,
            index,
            candidates: candidates.into_iter(),
            current: None,
        }
    }
}

impl Iterator for Matches<'_, '_> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        loop {
            if let Some((node, execution)) = self.current.as_mut() {
                let node = *node;
                match execution.resume(self.pattern.program(), &self.index, self.config) {
                    Some(bindings) => {
                        if self.config.match_mode == MatchMode::FirstPerNode {
                            self.current = None;
                        }
                        return Some(Match {
                            node,
                            bindings,
                            var_names: self.pattern.var_names().clone(),
                        });
                    }
                    None => self.current = None,
                }
            }

            let node = self.candidates.next()?;
            let bindings = vec![None; self.pattern.var_names().len()];
            self.current = Some((node, Execution::new(node, bindings)));
        }
    }
}

/// Search a tree with a pre-compiled pattern
///
/// Returns an iterator over all matches in the tree.
pub fn find_all<'p, 't>(pattern: &'p Pattern, tree: &'t Tree) -> Matches<'p, 't> {
    search_with(pattern, tree, Config::shared())
}

/// Search with an explicit configuration (label conventions, match mode)
pub fn search_with<'p, 't>(
    pattern: &'p Pattern,
    tree: &'t Tree,
    config: &'p Config,
) -> Matches<'p, 't> {
    Matches::new(Cow::Borrowed(pattern), tree, config)
}

/// The first match in preorder, if any
pub fn find_first(pattern: &Pattern, tree: &Tree) -> Option<Match> {
    find_all(pattern, tree).next()
}

/// Does the pattern match anywhere in the tree?
pub fn exists(pattern: &Pattern, tree: &Tree) -> bool {
    find_first(pattern, tree).is_some()
}

/// Search a tree with a query string
///
/// Compiles the query and then searches the tree.
pub fn search_query<'t>(tree: &'t Tree, query: &str) -> Result<Matches<'static, 't>, CompileError> {
    let pattern = compile(query)?;
    Ok(Matches::new(Cow::Owned(pattern), tree, Config::shared()))
}

/// Nodes the pattern could match at, in preorder
fn root_candidates(expr: &Expr, index: &TreeIndex) -> Vec<NodeId> {
    let Some(labels) = anchor_labels(expr) else {
        return index.preorder().to_vec();
    };

    let mut candidates: Vec<NodeId> = labels
        .iter()
        .flat_map(|label| index.nodes_with_label(label))
        .copied()
        .collect();
    if labels.len() > 1 {
        candidates.sort_unstable_by_key(|&id| index.position(id));
        candidates.dedup();
    }
    candidates
}

/// Labels the node at the pattern's root must carry, when they are fixed
fn anchor_labels(expr: &Expr) -> Option<Vec<&str>> {
    match expr {
        Expr::NodeTest(test) => test.exact_labels(),
        Expr::Relation { left, .. } => anchor_labels(left),
        Expr::Capture { expr, .. } => anchor_labels(expr),
        Expr::And(items) => items.iter().find_map(anchor_labels),
        Expr::Or(branches) => {
            let mut labels = Vec::new();
            for branch in branches {
                labels.extend(anchor_labels(branch)?);
            }
            Some(labels)
        }
        Expr::Not(_) | Expr::Optional(_) | Expr::BackReference(_) => None,
    }
}
