//! Pattern compilation to VM programs
//!
//! Every compiled fragment starts and ends on the same current node, so
//! fragments compose by concatenation: a conjunction is its parts in
//! order, a relation saves the node (`Enter`), moves along the relation,
//! runs the right operand and comes back (`Leave`).

use crate::pattern::{Expr, RelationMode};
use crate::vm::{Instruction, Program};

/// Compile a pattern AST into a program ending in `Match`
pub fn compile_program(expr: &Expr) -> Program {
    let mut program = Program::default();
    emit(expr, &mut program);
    program.code.push(Instruction::Match);
    program
}

fn emit(expr: &Expr, program: &mut Program) {
    match expr {
        Expr::NodeTest(test) => program.code.push(Instruction::Test(test.clone())),

        Expr::Relation {
            left,
            relation,
            right,
            mode,
        } => {
            emit(left, program);
            match mode {
                RelationMode::Exists => emit_follow(relation, right, program),
                RelationMode::Negated => {
                    let sub = subprogram(program, |sub| {
                        sub.code.push(Instruction::Follow(relation.clone()));
                        emit(right, sub);
                    });
                    program.code.push(Instruction::Absent(sub));
                }
                RelationMode::Optional => {
                    let sub = subprogram(program, |sub| {
                        sub.code.push(Instruction::Follow(relation.clone()));
                        emit(right, sub);
                    });
                    either_or_absent(program, sub, |program| {
                        emit_follow(relation, right, program)
                    });
                }
            }
        }

        Expr::And(items) => {
            for item in items {
                emit(item, program);
            }
        }

        Expr::Or(branches) => {
            // Split L2; b1; Jump End; L2: Split L3; b2; Jump End; ...; bn; End:
            let mut exits = Vec::new();
            for (i, branch) in branches.iter().enumerate() {
                let is_last = i + 1 == branches.len();
                let split = program.code.len();
                if !is_last {
                    program.code.push(Instruction::Split(0));
                }
                emit(branch, program);
                if !is_last {
                    exits.push(program.code.len());
                    program.code.push(Instruction::Jump(0));
                    program.code[split] = Instruction::Split(program.code.len());
                }
            }
            let end = program.code.len();
            for exit in exits {
                program.code[exit] = Instruction::Jump(end);
            }
        }

        Expr::Not(inner) => {
            let sub = subprogram(program, |sub| emit(inner, sub));
            program.code.push(Instruction::Absent(sub));
        }

        Expr::Optional(inner) => {
            let sub = subprogram(program, |sub| emit(inner, sub));
            either_or_absent(program, sub, |program| emit(inner, program));
        }

        Expr::Capture { var, expr } => {
            emit(expr, program);
            program.code.push(Instruction::Bind(*var));
        }

        Expr::BackReference(var) => program.code.push(Instruction::CheckBound(*var)),
    }
}

/// Enter; Follow; right; Leave
fn emit_follow(relation: &crate::relation::Relation, right: &Expr, program: &mut Program) {
    program.code.push(Instruction::Enter);
    program.code.push(Instruction::Follow(relation.clone()));
    emit(right, program);
    program.code.push(Instruction::Leave);
}

/// Split Else; body; Jump End; Else: Absent(sub); End:
fn either_or_absent(program: &mut Program, sub: usize, body: impl FnOnce(&mut Program)) {
    let split = program.code.len();
    program.code.push(Instruction::Split(0));
    body(program);
    let jump = program.code.len();
    program.code.push(Instruction::Jump(0));
    program.code[split] = Instruction::Split(program.code.len());
    program.code.push(Instruction::Absent(sub));
    program.code[jump] = Instruction::Jump(program.code.len());
}

/// Build a `Match`-terminated subprogram and return its index
fn subprogram(program: &mut Program, build: impl FnOnce(&mut Program)) -> usize {
    let mut sub = Program::default();
    build(&mut sub);
    sub.code.push(Instruction::Match);
    program.subprograms.push(sub);
    program.subprograms.len() - 1
}
