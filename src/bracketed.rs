//! Penn Treebank bracketed tree reading
//!
//! Reads trees written as nested brackets, `(S (NP (DT the) (NN dog)) (VP
//! (VBZ runs)))`, from an in-memory string. Several trees may follow each
//! other in one string; [`BracketedReader`] yields them one at a time.

use pest::Parser;
use pest::iterators::Pairs;
use pest_derive::Parser;
use std::iter::Peekable;
use thiserror::Error;

use crate::tree::{NodeId, Tree, TreeError};

#[derive(Parser)]
#[grammar = "bracketed.pest"]
struct BracketParser;

/// Label given to an outermost bracket that has none, as in `( (S ...))`
pub const EMPTY_ROOT_LABEL: &str = "ROOT";

/// Error during bracketed tree reading
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Tree error: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),

    #[error("Tree error: expected '(' but found '{found}' at position {position}")]
    Unexpected { found: String, position: usize },

    #[error("Tree error: unclosed bracket opened at position {position}")]
    Unclosed { position: usize },

    #[error("Tree error: expected exactly one tree, found {0}")]
    TreeCount(usize),

    #[error(transparent)]
    Structure(#[from] TreeError),
}

/// Reader that iterates over the trees in a string
pub struct BracketedReader<'a> {
    tokens: Option<Peekable<Pairs<'a, Rule>>>,
    pending: Option<ReadError>,
}

impl<'a> BracketedReader<'a> {
    pub fn from_str(input: &'a str) -> Self {
        match BracketParser::parse(Rule::tokens, input) {
            Ok(mut pairs) => Self {
                tokens: pairs.next().map(|tokens| tokens.into_inner().peekable()),
                pending: None,
            },
            Err(e) => Self {
                tokens: None,
                pending: Some(Box::new(e).into()),
            },
        }
    }

    /// Build one tree from the token stream, starting at its opening bracket
    fn read_tree(&mut self) -> Option<Result<Tree, ReadError>> {
        let tokens = self.tokens.as_mut()?;
        let first = tokens.next().filter(|p| p.as_rule() != Rule::EOI)?;
        if first.as_rule() != Rule::open {
            return Some(Err(ReadError::Unexpected {
                found: first.as_str().to_string(),
                position: first.as_span().start(),
            }));
        }

        let mut tree = Tree::new();
        // Open brackets: (node, position of its '(')
        let mut open: Vec<(NodeId, usize)> = Vec::new();
        let mut next = Some(first);
        loop {
            let Some(pair) = next.take().or_else(|| tokens.next()) else {
                let position = open.last().map_or(0, |&(_, position)| position);
                return Some(Err(ReadError::Unclosed { position }));
            };
            match pair.as_rule() {
                Rule::open => {
                    let label = match tokens.peek() {
                        Some(p) if p.as_rule() == Rule::atom => {
                            let label = p.as_str();
                            tokens.next();
                            label
                        }
                        _ if open.is_empty() => EMPTY_ROOT_LABEL,
                        _ => "",
                    };
                    let id = match open.last() {
                        Some(&(parent, _)) => match tree.add_child(parent, label) {
                            Ok(id) => id,
                            Err(e) => return Some(Err(e.into())),
                        },
                        None => tree.add_node(label),
                    };
                    open.push((id, pair.as_span().start()));
                }
                Rule::close => {
                    open.pop();
                    if open.is_empty() {
                        return Some(Ok(tree));
                    }
                }
                Rule::atom => {
                    if let Some(&(parent, _)) = open.last() {
                        if let Err(e) = tree.add_child(parent, pair.as_str()) {
                            return Some(Err(e.into()));
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

impl Iterator for BracketedReader<'_> {
    type Item = Result<Tree, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.pending.take() {
            self.tokens = None;
            return Some(Err(e));
        }
        let result = self.read_tree()?;
        if result.is_err() {
            // Give up on the rest of the input after a syntax error
            self.tokens = None;
        }
        Some(result)
    }
}

impl Tree {
    /// Read a single bracketed tree
    pub fn from_bracketed(input: &str) -> Result<Tree, ReadError> {
        let mut trees = BracketedReader::from_str(input).collect::<Result<Vec<_>, _>>()?;
        match trees.len() {
            1 => Ok(trees.remove(0)),
            n => Err(ReadError::TreeCount(n)),
        }
    }
}
