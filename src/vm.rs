//! Virtual machine for pattern matching
//!
//! This module implements the VM that executes compiled patterns against
//! constituency trees. Matching is a depth-first search: every
//! instruction that can succeed in more than one way pushes a
//! [`ChoicePoint`], and a failure resumes the most recent one with the node,
//! node stack and bindings it saved.
//!
//! Jump and split targets are absolute instruction indices. `Absent` runs a
//! subprogram from the current node and succeeds only if it finds nothing;
//! bindings made inside it are discarded.

use log::trace;
use rustc_hash::FxHashSet;
use std::fmt;

use crate::config::Config;
use crate::index::TreeIndex;
use crate::pattern::{NodeTest, VarId};
use crate::relation::Relation;
use crate::tree::NodeId;

/// Capture bindings, indexed by variable
pub type Bindings = Vec<Option<NodeId>>;

/// VM instructions for pattern matching
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Fail unless the current node matches
    Test(NodeTest),
    /// Save the current node
    Enter,
    /// Return to the node saved by the matching `Enter`
    Leave,
    /// Move to a node related to the current one, trying each candidate in turn
    Follow(Relation),
    /// Bind a variable to the current node (fail if bound elsewhere)
    Bind(VarId),
    /// Fail unless the variable is bound to the current node
    CheckBound(VarId),
    /// Continue here, and resume at the target on backtrack
    Split(usize),
    Jump(usize),
    /// Fail if the subprogram matches from the current node
    Absent(usize),
    /// Success - pattern matched
    Match,
}

/// A compiled instruction sequence and the subprograms its `Absent`s refer to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub code: Vec<Instruction>,
    pub subprograms: Vec<Program>,
}

impl Program {
    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        for (ip, instruction) in self.code.iter().enumerate() {
            match instruction {
                Instruction::Test(test) => writeln!(f, "{pad}{ip:3} Test {test}")?,
                Instruction::Follow(relation) => {
                    writeln!(f, "{pad}{ip:3} Follow {}", relation.symbol())?
                }
                Instruction::Absent(sub) => {
                    writeln!(f, "{pad}{ip:3} Absent {sub}")?;
                    if let Some(program) = self.subprograms.get(*sub) {
                        program.write_indented(f, depth + 1)?;
                    }
                }
                other => writeln!(f, "{pad}{ip:3} {other:?}")?,
            }
        }
        Ok(())
    }
}

/// Disassembly listing, used in debug logs
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

/// A choice point for backtracking
#[derive(Debug, Clone)]
struct ChoicePoint {
    /// Instruction pointer to resume at
    ip: usize,
    node_stack: Vec<NodeId>,
    /// Saved bindings from when choice was created
    bindings: Bindings,
    /// Nodes still to try, last one first
    alternatives: Vec<NodeId>,
}

/// Outcome of one instruction
enum Step {
    Next,
    Fail,
    Matched,
}

/// State of one run of a program from a start node
#[derive(Debug)]
pub struct Execution {
    ip: usize,
    node: NodeId,
    node_stack: Vec<NodeId>,
    bindings: Bindings,
    backtrack_stack: Vec<ChoicePoint>,
    seen_matches: FxHashSet<Bindings>,
    done: bool,
}

impl Execution {
    pub fn new(start_node: NodeId, bindings: Bindings) -> Self {
        Self {
            ip: 0,
            node: start_node,
            node_stack: Vec::new(),
            bindings,
            backtrack_stack: Vec::new(),
            seen_matches: FxHashSet::default(),
            done: false,
        }
    }

    /// Run until the next distinct match and return its bindings.
    ///
    /// Returns `None` once every alternative has been tried.
    pub fn resume(
        &mut self,
        program: &Program,
        index: &TreeIndex,
        config: &Config,
    ) -> Option<Bindings> {
        while !self.done {
            let step = match program.code.get(self.ip) {
                Some(instruction) => self.step(instruction, program, index, config),
                None => Step::Fail,
            };
            match step {
                Step::Next => {}
                Step::Fail => {
                    if !self.backtrack() {
                        self.done = true;
                    }
                }
                Step::Matched => {
                    let bindings = self.bindings.clone();
                    // Backtrack now so the next call continues with the next alternative
                    if !self.backtrack() {
                        self.done = true;
                    }
                    if self.seen_matches.insert(bindings.clone()) {
                        return Some(bindings);
                    }
                }
            }
        }
        None
    }

    fn step(
        &mut self,
        instruction: &Instruction,
        program: &Program,
        index: &TreeIndex,
        config: &Config,
    ) -> Step {
        match instruction {
            Instruction::Test(test) => {
                if !test.matches_node(index.tree(), self.node, config) {
                    return Step::Fail;
                }
            }

            Instruction::Enter => self.node_stack.push(self.node),

            Instruction::Leave => match self.node_stack.pop() {
                Some(node) => self.node = node,
                None => return Step::Fail,
            },

            Instruction::Follow(relation) => {
                let mut candidates = relation.candidates(index, config, self.node);
                candidates.reverse();
                let Some(first) = candidates.pop() else {
                    return Step::Fail;
                };
                if !candidates.is_empty() {
                    self.push_choice(self.ip + 1, candidates);
                }
                self.node = first;
            }

            Instruction::Bind(var) => match self.bindings.get(*var).copied() {
                Some(None) => self.bindings[*var] = Some(self.node),
                Some(Some(bound)) if bound == self.node => {}
                _ => return Step::Fail,
            },

            Instruction::CheckBound(var) => {
                if self.bindings.get(*var).copied().flatten() != Some(self.node) {
                    return Step::Fail;
                }
            }

            Instruction::Split(target) => self.push_choice(*target, vec![self.node]),

            Instruction::Jump(target) => {
                self.ip = *target;
                return Step::Next;
            }

            Instruction::Absent(sub) => {
                let Some(subprogram) = program.subprograms.get(*sub) else {
                    return Step::Fail;
                };
                let mut probe = Execution::new(self.node, self.bindings.clone());
                if probe.resume(subprogram, index, config).is_some() {
                    return Step::Fail;
                }
            }

            Instruction::Match => return Step::Matched,
        }
        self.ip += 1;
        Step::Next
    }

    fn push_choice(&mut self, ip: usize, alternatives: Vec<NodeId>) {
        self.backtrack_stack.push(ChoicePoint {
            ip,
            node_stack: self.node_stack.clone(),
            bindings: self.bindings.clone(),
            alternatives,
        });
    }

    /// Attempt to backtrack to a previous choice point
    fn backtrack(&mut self) -> bool {
        while let Some(mut choice) = self.backtrack_stack.pop() {
            let Some(next_alternative) = choice.alternatives.pop() else {
                continue;
            };
            trace!("backtrack to ip {} at node {}", choice.ip, next_alternative);
            self.ip = choice.ip;
            self.node = next_alternative;
            if choice.alternatives.is_empty() {
                self.node_stack = choice.node_stack;
                self.bindings = choice.bindings;
            } else {
                self.node_stack = choice.node_stack.clone();
                self.bindings = choice.bindings.clone();
                self.backtrack_stack.push(choice);
            }
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;

    /// (S (NP (DT the) (NN dog)) (VP (VBZ runs)))
    /// 0 S, 1 NP, 2 DT, 3 the, 4 NN, 5 dog, 6 VP, 7 VBZ, 8 runs
    fn create_test_tree() -> Tree {
        Tree::from_bracketed("(S (NP (DT the) (NN dog)) (VP (VBZ runs)))").unwrap()
    }

    fn program(code: Vec<Instruction>) -> Program {
        Program {
            code,
            subprograms: Vec::new(),
        }
    }

    fn run(program: &Program, tree: &Tree, start: NodeId, bindings: Bindings) -> Vec<Bindings> {
        let index = TreeIndex::build(tree);
        let config = Config::default();
        let mut execution = Execution::new(start, bindings);
        std::iter::from_fn(|| execution.resume(program, &index, &config)).collect()
    }

    #[test]
    fn test_simple_match() {
        let tree = create_test_tree();
        let program = program(vec![
            Instruction::Test(NodeTest::exact("S")),
            Instruction::Bind(0),
            Instruction::Match,
        ]);
        assert_eq!(run(&program, &tree, 0, vec![None]), vec![vec![Some(0)]]);
        assert!(run(&program, &tree, 1, vec![None]).is_empty());
    }

    #[test]
    fn test_follow_tries_every_candidate() {
        let tree = create_test_tree();
        let program = program(vec![
            Instruction::Enter,
            Instruction::Follow(Relation::ParentOf),
            Instruction::Bind(0),
            Instruction::Leave,
            Instruction::Match,
        ]);
        assert_eq!(
            run(&program, &tree, 0, vec![None]),
            vec![vec![Some(1)], vec![Some(6)]]
        );
    }

    #[test]
    fn test_backtrack_past_failing_candidates() {
        let tree = create_test_tree();
        let program = program(vec![
            Instruction::Enter,
            Instruction::Follow(Relation::Dominates),
            Instruction::Test(NodeTest::exact("NN")),
            Instruction::Bind(0),
            Instruction::Leave,
            Instruction::Test(NodeTest::exact("S")),
            Instruction::Match,
        ]);
        assert_eq!(run(&program, &tree, 0, vec![None]), vec![vec![Some(4)]]);
    }

    #[test]
    fn test_leave_restores_node() {
        let tree = create_test_tree();
        let program = program(vec![
            Instruction::Enter,
            Instruction::Follow(Relation::ParentOf),
            Instruction::Leave,
            Instruction::Bind(0),
            Instruction::Match,
        ]);
        // Both children lead back to the same bindings, reported once
        assert_eq!(run(&program, &tree, 1, vec![None]), vec![vec![Some(1)]]);
    }

    #[test]
    fn test_absent() {
        let tree = create_test_tree();
        let program = Program {
            code: vec![Instruction::Absent(0), Instruction::Match],
            subprograms: vec![program(vec![
                Instruction::Follow(Relation::ParentOf),
                Instruction::Test(NodeTest::exact("DT")),
                Instruction::Match,
            ])],
        };
        assert!(run(&program, &tree, 1, vec![]).is_empty());
        assert_eq!(run(&program, &tree, 6, vec![]).len(), 1);
    }

    #[test]
    fn test_split_and_jump() {
        let tree = create_test_tree();
        let program = program(vec![
            Instruction::Split(3),
            Instruction::Test(NodeTest::exact("NP")),
            Instruction::Jump(4),
            Instruction::Test(NodeTest::exact("VP")),
            Instruction::Match,
        ]);
        assert_eq!(run(&program, &tree, 1, vec![]).len(), 1);
        assert_eq!(run(&program, &tree, 6, vec![]).len(), 1);
        assert!(run(&program, &tree, 0, vec![]).is_empty());
    }

    #[test]
    fn test_bind_conflict_fails() {
        let tree = create_test_tree();
        let program = program(vec![Instruction::Bind(0), Instruction::Match]);
        assert!(run(&program, &tree, 1, vec![Some(4)]).is_empty());
        assert_eq!(run(&program, &tree, 4, vec![Some(4)]), vec![vec![Some(4)]]);
    }

    #[test]
    fn test_check_bound() {
        let tree = create_test_tree();
        let program = program(vec![Instruction::CheckBound(0), Instruction::Match]);
        assert!(run(&program, &tree, 4, vec![None]).is_empty());
        assert!(run(&program, &tree, 4, vec![Some(5)]).is_empty());
        assert_eq!(run(&program, &tree, 4, vec![Some(4)]).len(), 1);
    }

    #[test]
    fn test_duplicate_bindings_reported_once() {
        let tree = create_test_tree();
        let program = program(vec![
            Instruction::Enter,
            Instruction::Follow(Relation::Dominates),
            Instruction::Leave,
            Instruction::Match,
        ]);
        assert_eq!(run(&program, &tree, 0, vec![]), vec![Vec::<Option<NodeId>>::new()]);
    }

    #[test]
    fn test_exhausted_execution_stays_done() {
        let tree = create_test_tree();
        let index = TreeIndex::build(&tree);
        let config = Config::default();
        let program = program(vec![Instruction::Match]);

        let mut execution = Execution::new(0, vec![]);
        assert!(execution.resume(&program, &index, &config).is_some());
        assert!(execution.resume(&program, &index, &config).is_none());
        assert!(execution.resume(&program, &index, &config).is_none());
    }

    #[test]
    fn test_disassembly() {
        let program = Program {
            code: vec![
                Instruction::Test(NodeTest::exact("NN")),
                Instruction::Absent(0),
                Instruction::Match,
            ],
            subprograms: vec![program(vec![
                Instruction::Follow(Relation::ParentOf),
                Instruction::Match,
            ])],
        };
        let listing = program.to_string();
        assert!(listing.contains("  0 Test NN"));
        assert!(listing.contains("Absent 0"));
        assert!(listing.contains("    0 Follow <"));
    }
}
