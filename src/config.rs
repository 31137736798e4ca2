//! Query configuration
//!
//! The operator table, label conventions and match mode are bundled in an
//! immutable [`Config`] that is built once and handed to both the parser and
//! the searcher. Nothing here is global or mutable.

use rustc_hash::FxHashMap;
use std::sync::LazyLock;

use crate::relation::{Chain, ChildSide, Operator, Relation};

static DEFAULT_CONFIG: LazyLock<Config> = LazyLock::new(Config::default);

/// Characters that introduce functional annotations in Penn Treebank labels
/// (`NP-SBJ`, `NP=2`, `PP-LOC|ADV`).
pub const PENN_ANNOTATION_CHARS: &str = "-=|#^~_";

/// Default limit on how deeply a pattern may nest
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// How many matches to report for each top-level node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Every distinct set of bindings
    #[default]
    All,
    /// At most one match per node (the first one found)
    FirstPerNode,
}

/// Lookup table from operator lexemes to relations
#[derive(Debug, Clone)]
pub struct RelationTable {
    operators: FxHashMap<&'static str, Operator>,
}

impl RelationTable {
    /// An empty table
    pub fn empty() -> Self {
        Self {
            operators: FxHashMap::default(),
        }
    }

    /// The full Tregex operator set, including the alternate spellings
    pub fn tregex() -> Self {
        use Relation::*;

        let mut table = Self::empty();

        table.insert(
            "<",
            Operator::Indexable {
                plain: ParentOf,
                side: ChildSide::Parent,
                from_end: false,
            },
        );
        table.insert(
            ">",
            Operator::Indexable {
                plain: ChildOf,
                side: ChildSide::Child,
                from_end: false,
            },
        );
        table.insert(
            "<-",
            Operator::Indexable {
                plain: HasLastChild,
                side: ChildSide::Parent,
                from_end: true,
            },
        );
        table.insert(
            ">-",
            Operator::Indexable {
                plain: LastChildOf,
                side: ChildSide::Child,
                from_end: true,
            },
        );

        let simple = [
            ("<<", Dominates),
            (">>", DominatedBy),
            ("<:", HasOnlyChild),
            (">:", OnlyChildOf),
            ("<,", HasFirstChild),
            (">,", FirstChildOf),
            ("<`", HasLastChild),
            (">`", LastChildOf),
            ("<<,", HasLeftmostDescendant),
            (">>,", LeftmostDescendantOf),
            ("<<-", HasRightmostDescendant),
            ("<<`", HasRightmostDescendant),
            (">>-", RightmostDescendantOf),
            (">>`", RightmostDescendantOf),
            ("<<<", AncestorOfLeaf),
            ("<<:", UnaryPathAncestorOf),
            (">>:", UnaryPathDescendantOf),
            ("$", SisterOf),
            ("$++", LeftSisterOf),
            ("$..", LeftSisterOf),
            ("$--", RightSisterOf),
            ("$,,", RightSisterOf),
            ("$+", ImmediateLeftSisterOf),
            ("$.", ImmediateLeftSisterOf),
            ("$-", ImmediateRightSisterOf),
            ("$,", ImmediateRightSisterOf),
            ("..", Precedes),
            (",,", Follows),
            (".", ImmediatelyPrecedes),
            (",", ImmediatelyFollows),
            ("==", Equals),
            ("<=", ParentEquals),
            (":", AnyNode),
        ];
        for (symbol, relation) in simple {
            table.insert(symbol, Operator::Simple(relation));
        }

        table.insert("<+", Operator::Chained(Chain::Dominates));
        table.insert(">+", Operator::Chained(Chain::DominatedBy));
        table.insert(".+", Operator::Chained(Chain::Precedes));
        table.insert(",+", Operator::Chained(Chain::Follows));

        table
    }

    pub fn insert(&mut self, symbol: &'static str, operator: Operator) {
        self.operators.insert(symbol, operator);
    }

    /// Remove an operator so that patterns using it are rejected
    pub fn without(mut self, symbol: &str) -> Self {
        self.operators.remove(symbol);
        self
    }

    pub fn get(&self, symbol: &str) -> Option<&Operator> {
        self.operators.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

impl Default for RelationTable {
    fn default() -> Self {
        Self::tregex()
    }
}

/// Configuration shared by the pattern compiler and the searcher
#[derive(Debug, Clone)]
pub struct Config {
    pub relations: RelationTable,
    /// Characters that start a functional annotation (see [`Config::basic_category`])
    pub annotation_chars: Vec<char>,
    pub match_mode: MatchMode,
    /// Deepest nesting of groups, negations and chained clauses the parser accepts
    pub max_depth: usize,
}

impl Config {
    /// The shared default configuration
    pub fn shared() -> &'static Config {
        &DEFAULT_CONFIG
    }

    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn with_annotation_chars(mut self, chars: &str) -> Self {
        self.annotation_chars = chars.chars().collect();
        self
    }

    pub fn with_relations(mut self, relations: RelationTable) -> Self {
        self.relations = relations;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Strip functional annotations from a label: `NP-SBJ-1` becomes `NP`.
    ///
    /// An annotation character in first position is part of the category,
    /// so `-NONE-` and `-LRB-` are left alone.
    pub fn basic_category<'a>(&self, label: &'a str) -> &'a str {
        label
            .char_indices()
            .skip(1)
            .find(|(_, c)| self.annotation_chars.contains(c))
            .map_or(label, |(i, _)| &label[..i])
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            relations: RelationTable::tregex(),
            annotation_chars: PENN_ANNOTATION_CHARS.chars().collect(),
            match_mode: MatchMode::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
