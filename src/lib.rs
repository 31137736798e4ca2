//! Treeregex: structural pattern matching over constituency trees
//!
//! Patterns in the Tregex language (`VP < VBZ`, `NP=n !$ PP`,
//! `S << (NP [< DT || < PRP])`) are compiled to a small backtracking VM
//! and run against bracketed (Penn Treebank style) trees.

// Core modules (algorithm-first approach)
pub mod bracketed; // Penn-style bracketed tree reader
pub mod compiler; // Pattern compilation to VM opcodes
pub mod config; // Relation table, label conventions, match mode
pub mod index; // Per-tree positional indices for relation lookup
pub mod lexer; // Pattern tokenizer
pub mod parser; // Pattern language parser
pub mod pattern; // Pattern AST
pub mod relation; // Structural relations between nodes
pub mod searcher; // End-to-end search (index + compiler + VM)
pub mod tree; // Tree data structures
pub mod vm; // Virtual machine executor and instruction set

// Re-exports for convenience
pub use bracketed::{BracketedReader, ReadError};
pub use config::{Config, DEFAULT_MAX_DEPTH, MatchMode, RelationTable};
pub use index::TreeIndex;
pub use lexer::{LexError, Token, TokenKind, tokenize};
pub use parser::ParseError;
pub use pattern::{Expr, LabelMatcher, NodeTest, Pattern, RelationMode};
pub use relation::Relation;
pub use searcher::{
    CompileError, Match, Matches, compile, compile_with, exists, find_all, find_first,
    search_query, search_with,
};
pub use tree::{Node, NodeId, Tree, TreeError};
pub use vm::{Instruction, Program};
