//! Pattern representation
//!
//! This module defines the AST for tree patterns. A [`Pattern`] is the
//! compiled form handed to the searcher: the AST, the capture name table
//! and the VM program generated from it.

use regex::Regex;
use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use crate::config::Config;
use crate::relation::Relation;
use crate::tree::{NodeId, Tree};
use crate::vm::Program;

/// Type alias for capture variable identifiers (indices into Pattern.var_names)
pub type VarId = usize;

/// One alternative of a node description
#[derive(Clone)]
pub enum LabelMatcher {
    /// Whole-label comparison
    Exact(String),
    /// Unanchored regex search: pattern source, flags, compiled regex
    Regex(String, String, Regex),
    /// `__`
    Any,
    /// `_ROOT_`: the node without a parent
    Root,
}

impl LabelMatcher {
    /// Compile a regex label from `/source/flags`
    ///
    /// Repeated flags count once.
    pub fn regex(source: &str, flags: &str) -> Result<Self, regex::Error> {
        let flags = flags.chars().fold(String::new(), |mut unique, flag| {
            if !unique.contains(flag) {
                unique.push(flag);
            }
            unique
        });
        let full = if flags.is_empty() {
            source.to_string()
        } else {
            format!("(?{flags}){source}")
        };
        let regex = Regex::new(&full)?;
        Ok(LabelMatcher::Regex(source.to_string(), flags, regex))
    }

    fn matches(&self, label: &str, is_root: bool) -> bool {
        match self {
            LabelMatcher::Exact(s) => s == label,
            LabelMatcher::Regex(_, _, regex) => regex.is_match(label),
            LabelMatcher::Any => true,
            LabelMatcher::Root => is_root,
        }
    }
}

// Manual Debug implementation
impl Debug for LabelMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelMatcher::Exact(s) => f.debug_tuple("Exact").field(s).finish(),
            LabelMatcher::Regex(source, flags, _) => {
                f.debug_tuple("Regex").field(source).field(flags).finish()
            }
            LabelMatcher::Any => f.write_str("Any"),
            LabelMatcher::Root => f.write_str("Root"),
        }
    }
}

// Manual PartialEq implementation (compare pattern strings, not compiled regex)
impl PartialEq for LabelMatcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LabelMatcher::Exact(a), LabelMatcher::Exact(b)) => a == b,
            (LabelMatcher::Regex(a, fa, _), LabelMatcher::Regex(b, fb, _)) => a == b && fa == fb,
            (LabelMatcher::Any, LabelMatcher::Any) => true,
            (LabelMatcher::Root, LabelMatcher::Root) => true,
            _ => false,
        }
    }
}

impl Display for LabelMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelMatcher::Exact(s) if is_plain_label(s) => f.write_str(s),
            LabelMatcher::Exact(s) => {
                write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
            }
            LabelMatcher::Regex(source, flags, _) => {
                write!(f, "/{}/{}", source.replace('/', "\\/"), flags)
            }
            LabelMatcher::Any => f.write_str("__"),
            LabelMatcher::Root => f.write_str("_ROOT_"),
        }
    }
}

const LABEL_STOP: &str = "(/|@!#&)=?[]><~.$:;\"";

/// Does `s` lex as a single identifier?
fn is_plain_label(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let stop = |c: char| c.is_whitespace() || LABEL_STOP.contains(c);
    !(stop(first) || first.is_ascii_digit() || "_,{}".contains(first)) && !chars.any(stop)
}

/// A node description: a disjunction of label matchers
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTest {
    pub alternatives: Vec<LabelMatcher>,
    /// `@`: compare basic categories instead of full labels
    pub basic_category: bool,
    /// `!`: the description matches when no alternative does
    pub negated: bool,
}

impl NodeTest {
    pub fn new(alternatives: Vec<LabelMatcher>, basic_category: bool) -> Self {
        Self {
            alternatives,
            basic_category,
            negated: false,
        }
    }

    pub fn exact(label: &str) -> Self {
        Self::new(vec![LabelMatcher::Exact(label.to_string())], false)
    }

    pub fn any() -> Self {
        Self::new(vec![LabelMatcher::Any], false)
    }

    pub fn matches(&self, label: &str, is_root: bool, config: &Config) -> bool {
        let label = if self.basic_category {
            config.basic_category(label)
        } else {
            label
        };
        self.alternatives
            .iter()
            .any(|alt| alt.matches(label, is_root))
            != self.negated
    }

    pub fn matches_node(&self, tree: &Tree, id: NodeId, config: &Config) -> bool {
        self.matches(tree.label(id), tree.parent(id).is_none(), config)
    }

    /// The labels this test accepts, when it only accepts a fixed set
    pub fn exact_labels(&self) -> Option<Vec<&str>> {
        if self.negated || self.basic_category {
            return None;
        }
        self.alternatives
            .iter()
            .map(|alt| match alt {
                LabelMatcher::Exact(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Display for NodeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("!")?;
        }
        if self.basic_category {
            f.write_str("@")?;
        }
        for (i, alt) in self.alternatives.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{alt}")?;
        }
        Ok(())
    }
}

/// How a relation clause constrains its base node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationMode {
    /// Some node in relation matches the right operand
    Exists,
    /// `!op`: no node in relation matches
    Negated,
    /// `?op`: bind through the relation if possible, otherwise carry on
    Optional,
}

impl RelationMode {
    fn prefix(self) -> &'static str {
        match self {
            RelationMode::Exists => "",
            RelationMode::Negated => "!",
            RelationMode::Optional => "?",
        }
    }
}

/// Pattern AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    NodeTest(NodeTest),
    /// `left op right`, evaluated at the node `left` matched at
    Relation {
        left: Box<Expr>,
        relation: Relation,
        right: Box<Expr>,
        mode: RelationMode,
    },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    /// `?[...]`: the inner alternatives, or unchanged bindings if there are none
    Optional(Box<Expr>),
    Capture {
        var: VarId,
        expr: Box<Expr>,
    },
    BackReference(VarId),
}

/// A compiled pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    expr: Expr,
    var_names: Arc<[String]>,
    program: Program,
}

impl Pattern {
    pub fn new(source: &str, expr: Expr, var_names: Vec<String>, program: Program) -> Self {
        Self {
            source: source.to_string(),
            expr,
            var_names: var_names.into(),
            program,
        }
    }

    /// The pattern text this was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Capture names, indexed by [`VarId`]
    pub fn var_names(&self) -> &Arc<[String]> {
        &self.var_names
    }

    pub fn var_id(&self, name: &str) -> Option<VarId> {
        self.var_names.iter().position(|n| n == name)
    }
}

/// Canonical rendering; parses back to the same AST
impl Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Printer {
            names: &self.var_names,
        }
        .expr(&self.expr, f)
    }
}

struct Printer<'a> {
    names: &'a [String],
}

impl Printer<'_> {
    fn name(&self, var: VarId) -> &str {
        self.names.get(var).map_or("?", |s| s.as_str())
    }

    fn expr(&self, expr: &Expr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match expr {
            Expr::NodeTest(test) => write!(f, "{test}"),
            Expr::Relation {
                left,
                relation,
                right,
                mode,
            } => {
                match **left {
                    Expr::NodeTest(_)
                    | Expr::Capture { .. }
                    | Expr::BackReference(_)
                    | Expr::Relation { .. } => self.expr(left, f)?,
                    _ => self.parenthesized(left, f)?,
                }
                write!(f, " {}{} ", mode.prefix(), relation.symbol())?;
                self.target(right, f)
            }
            Expr::And(items) => self.joined(items, " & ", f),
            Expr::Or(items) => self.joined(items, " || ", f),
            Expr::Not(inner) => {
                f.write_str("!")?;
                self.unary(inner, f)
            }
            Expr::Optional(inner) => {
                f.write_str("?")?;
                self.unary(inner, f)
            }
            Expr::Capture { var, expr } => {
                match **expr {
                    Expr::NodeTest(_) => self.expr(expr, f)?,
                    _ => self.parenthesized(expr, f)?,
                }
                write!(f, "={}", self.name(*var))
            }
            Expr::BackReference(var) => write!(f, "={}", self.name(*var)),
        }
    }

    fn joined(&self, items: &[Expr], sep: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                f.write_str(sep)?;
            }
            match item {
                Expr::Or(_) => self.parenthesized(item, f)?,
                Expr::And(_) if sep != " || " => self.parenthesized(item, f)?,
                _ => self.expr(item, f)?,
            }
        }
        Ok(())
    }

    fn unary(&self, expr: &Expr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match expr {
            Expr::And(_) | Expr::Or(_) => self.parenthesized(expr, f),
            _ => self.expr(expr, f),
        }
    }

    /// Right operand of a relation: an atom, possibly negated
    ///
    /// `!NN` reads back as a negated node description, so any other
    /// negated operand keeps its parentheses.
    fn target(&self, expr: &Expr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match expr {
            Expr::NodeTest(_) | Expr::BackReference(_) | Expr::Capture { .. } => {
                self.expr(expr, f)
            }
            Expr::Not(inner) => {
                f.write_str("!")?;
                if matches!(**inner, Expr::Not(_)) || is_negated_test(inner) {
                    self.target(inner, f)
                } else {
                    self.parenthesized(inner, f)
                }
            }
            _ => self.parenthesized(expr, f),
        }
    }

    fn parenthesized(&self, expr: &Expr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        self.expr(expr, f)?;
        f.write_str(")")
    }
}

/// A negated node description, possibly captured
fn is_negated_test(expr: &Expr) -> bool {
    match expr {
        Expr::NodeTest(test) => test.negated,
        Expr::Capture { expr, .. } => is_negated_test(expr),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_regex_labels() {
        let config = Config::default();
        let test = NodeTest::new(
            vec![
                LabelMatcher::Exact("NN".to_string()),
                LabelMatcher::regex("^VB", "").unwrap(),
            ],
            false,
        );
        assert!(test.matches("NN", false, &config));
        assert!(test.matches("VBZ", false, &config));
        assert!(!test.matches("NNS", false, &config));
    }

    #[test]
    fn test_regex_is_unanchored_search() {
        let config = Config::default();
        let test = NodeTest::new(vec![LabelMatcher::regex("P", "").unwrap()], false);
        assert!(test.matches("NP", false, &config));
        assert!(test.matches("PRP$", false, &config));

        let folded = NodeTest::new(vec![LabelMatcher::regex("^np$", "i").unwrap()], false);
        assert!(folded.matches("NP", false, &config));
    }

    #[test]
    fn test_basic_category_and_negation() {
        let config = Config::default();
        let mut test = NodeTest::new(vec![LabelMatcher::Exact("NP".to_string())], true);
        assert!(test.matches("NP-SBJ-1", false, &config));
        assert!(!test.matches("NNP", false, &config));

        test.negated = true;
        assert!(!test.matches("NP-SBJ", false, &config));
        assert!(test.matches("VP", false, &config));
    }

    #[test]
    fn test_root_and_wildcard() {
        let config = Config::default();
        let root = NodeTest::new(vec![LabelMatcher::Root], false);
        assert!(root.matches("S", true, &config));
        assert!(!root.matches("S", false, &config));
        assert!(NodeTest::any().matches("anything", false, &config));
    }

    #[test]
    fn test_exact_labels() {
        let test = NodeTest::new(
            vec![
                LabelMatcher::Exact("NN".to_string()),
                LabelMatcher::Exact("NNS".to_string()),
            ],
            false,
        );
        assert_eq!(test.exact_labels(), Some(vec!["NN", "NNS"]));
        assert_eq!(NodeTest::any().exact_labels(), None);
    }

    #[test]
    fn test_label_display() {
        assert_eq!(LabelMatcher::Exact("NP-SBJ".to_string()).to_string(), "NP-SBJ");
        assert_eq!(LabelMatcher::Exact("a b".to_string()).to_string(), "\"a b\"");
        assert_eq!(LabelMatcher::Exact(",".to_string()).to_string(), "\",\"");
        assert_eq!(LabelMatcher::Exact("1".to_string()).to_string(), "\"1\"");
        assert_eq!(
            LabelMatcher::regex("a/b", "i").unwrap().to_string(),
            "/a\\/b/i"
        );
    }

    #[test]
    fn test_repeated_regex_flags() {
        let config = Config::default();
        let matcher = LabelMatcher::regex("^np$", "ixi").unwrap();
        assert_eq!(matcher, LabelMatcher::regex("^np$", "ix").unwrap());
        assert_eq!(matcher.to_string(), "/^np$/ix");

        let test = NodeTest::new(vec![LabelMatcher::regex("np", "ii").unwrap()], false);
        assert!(test.matches("NP", false, &config));
    }

    #[test]
    fn test_regex_equality_ignores_compiled_form() {
        assert_eq!(
            LabelMatcher::regex("^NN", "").unwrap(),
            LabelMatcher::regex("^NN", "").unwrap()
        );
        assert_ne!(
            LabelMatcher::regex("^NN", "").unwrap(),
            LabelMatcher::regex("^NN", "i").unwrap()
        );
    }
}
